//! Configuration management.
//!
//! This module resolves the data directory and loads the store settings that
//! are handed to [`LineStore`](crate::storage::LineStore) and
//! [`Repository`](crate::storage::Repository) at construction.
//!
//! # Layout
//!
//! Every table is a separate delimited text file inside one data directory:
//! - **Data**: `~/.gradebook/data/` by default, one `*.txt` file per table
//! - **Settings**: optional `gradebook.json` in the same directory
//!
//! Nothing in the crate reads a global path constant; tests point a
//! `StoreConfig` at a temporary directory.

use crate::error::{Error, Result};
use crate::storage::Table;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings file name inside the data directory.
pub const CONFIG_FILE: &str = "gradebook.json";

/// Default field delimiter.
pub const DEFAULT_DELIMITER: char = '|';

/// File name for each table, relative to the data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableFiles {
    pub users: String,
    pub lecturers: String,
    pub students: String,
    pub modules: String,
    pub assessments: String,
    pub grades: String,
    pub feedback: String,
    pub classes: String,
    pub student_classes: String,
    pub leader_lecturers: String,
    pub grade_bands: String,
    /// Read when `grade_bands` does not exist.
    pub legacy_grade_bands: String,
}

impl Default for TableFiles {
    fn default() -> Self {
        Self {
            users: "users.txt".into(),
            lecturers: "lecturers.txt".into(),
            students: "students.txt".into(),
            modules: "modules.txt".into(),
            assessments: "assessments.txt".into(),
            grades: "grades.txt".into(),
            feedback: "feedback.txt".into(),
            classes: "classes.txt".into(),
            student_classes: "student_classes.txt".into(),
            leader_lecturers: "leader_lecturers.txt".into(),
            grade_bands: "grade_bands.txt".into(),
            legacy_grade_bands: "grading_system.txt".into(),
        }
    }
}

impl TableFiles {
    fn name(&self, table: Table) -> &str {
        match table {
            Table::Users => &self.users,
            Table::Lecturers => &self.lecturers,
            Table::Students => &self.students,
            Table::Modules => &self.modules,
            Table::Assessments => &self.assessments,
            Table::Grades => &self.grades,
            Table::Feedback => &self.feedback,
            Table::Classes => &self.classes,
            Table::StudentClasses => &self.student_classes,
            Table::LeaderLecturers => &self.leader_lecturers,
            Table::GradeBands => &self.grade_bands,
        }
    }
}

/// Store settings passed explicitly into the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding every table file. Never serialized.
    #[serde(skip)]
    pub data_dir: PathBuf,

    /// Single-character field separator. Values are not escaped.
    pub delimiter: char,

    /// Rewrite files via temp file + rename instead of truncate-in-place.
    pub atomic_writes: bool,

    pub files: TableFiles,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
            delimiter: DEFAULT_DELIMITER,
            atomic_writes: true,
            files: TableFiles::default(),
        }
    }
}

impl StoreConfig {
    /// Default settings rooted at `data_dir`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load settings for `data_dir`, applying `gradebook.json` when present.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the settings file exists but cannot be read
    /// or parsed, or if it names an unusable delimiter.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;
            serde_json::from_str::<Self>(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))?
        } else {
            Self::default()
        };

        config.data_dir = data_dir.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// Write the current settings to `gradebook.json` in the data directory.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file cannot be serialized or written.
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| Error::Config(format!("Failed to create data directory: {e}")))?;

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

        fs::write(self.data_dir.join(CONFIG_FILE), content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {e}")))
    }

    fn validate(&self) -> Result<()> {
        if self.delimiter == '\n' || self.delimiter == '\r' {
            return Err(Error::Config(
                "delimiter cannot be a line terminator".to_string(),
            ));
        }
        Ok(())
    }

    /// Absolute path of a table file.
    #[must_use]
    pub fn path(&self, table: Table) -> PathBuf {
        self.data_dir.join(self.files.name(table))
    }

    /// Legacy location of the band table.
    #[must_use]
    pub fn legacy_band_path(&self) -> PathBuf {
        self.data_dir.join(&self.files.legacy_grade_bands)
    }
}

/// Get the global gradebook directory location (`~/.gradebook/`).
#[must_use]
pub fn global_gradebook_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".gradebook"))
}

/// Check if test mode is enabled via `GRADEBOOK_TEST_DATA`.
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("GRADEBOOK_TEST_DATA")
        .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
        .unwrap_or(false)
}

/// Resolve the data directory.
///
/// Priority:
/// 1. `explicit_path` (the `--data-dir` flag)
/// 2. `GRADEBOOK_TEST_DATA` → `~/.gradebook/test`
/// 3. `GRADEBOOK_DATA` environment variable
/// 4. `~/.gradebook/data`
#[must_use]
pub fn resolve_data_dir(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return global_gradebook_dir().map(|dir| dir.join("test"));
    }

    if let Ok(dir) = std::env::var("GRADEBOOK_DATA") {
        if !dir.trim().is_empty() {
            return Some(PathBuf::from(dir));
        }
    }

    global_gradebook_dir().map(|dir| dir.join("data"))
}

/// Resolve the data directory and load its settings.
///
/// # Errors
///
/// Returns `Error::NotInitialized` if no directory can be resolved or it does
/// not exist yet.
pub fn open_store_config(explicit_path: Option<&Path>) -> Result<StoreConfig> {
    let dir = resolve_data_dir(explicit_path).ok_or(Error::NotInitialized)?;
    if !dir.is_dir() {
        return Err(Error::NotInitialized);
    }
    StoreConfig::load(&dir)
}

/// Resolve the acting principal id supplied by the session collaborator.
///
/// Priority: explicit `--actor`, then `GRADEBOOK_ACTOR`.
///
/// # Errors
///
/// Returns `Error::InvalidArgument` when neither is set.
pub fn resolve_actor(explicit: Option<&str>) -> Result<String> {
    if let Some(actor) = explicit.filter(|a| !a.trim().is_empty()) {
        return Ok(actor.trim().to_string());
    }

    if let Ok(actor) = std::env::var("GRADEBOOK_ACTOR") {
        if !actor.trim().is_empty() {
            return Ok(actor.trim().to_string());
        }
    }

    Err(Error::InvalidArgument(
        "no acting user: pass --actor or set GRADEBOOK_ACTOR".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_data_dir_with_explicit() {
        let explicit = PathBuf::from("/custom/gradebook");
        assert_eq!(resolve_data_dir(Some(&explicit)), Some(explicit));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::load(temp_dir.path()).unwrap();

        assert_eq!(config.delimiter, '|');
        assert!(config.atomic_writes);
        assert_eq!(config.path(Table::Modules), temp_dir.path().join("modules.txt"));
    }

    #[test]
    fn test_partial_config_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE),
            r#"{"delimiter": ";", "files": {"grades": "marks.txt"}}"#,
        )
        .unwrap();

        let config = StoreConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.delimiter, ';');
        assert!(config.atomic_writes);
        assert_eq!(config.path(Table::Grades), temp_dir.path().join("marks.txt"));
        assert_eq!(config.path(Table::Users), temp_dir.path().join("users.txt"));
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = StoreConfig::new(temp_dir.path());
        config.atomic_writes = false;
        config.save().unwrap();

        let loaded = StoreConfig::load(temp_dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_newline_delimiter_rejected() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE), r#"{"delimiter": "\n"}"#).unwrap();

        let result = StoreConfig::load(temp_dir.path());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_resolve_actor_explicit_wins() {
        assert_eq!(resolve_actor(Some(" L1 ")).unwrap(), "L1");
    }
}
