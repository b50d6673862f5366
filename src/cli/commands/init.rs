//! Initialize a gradebook data directory.
//!
//! Creates the directory, writes `gradebook.json` with the default settings,
//! creates every missing table file, and seeds the band table when none
//! exists (neither the primary nor the legacy file).

use crate::config::{resolve_data_dir, StoreConfig, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::grading::BandTable;
use crate::storage::{Repository, Table};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Serialize)]
struct InitOutput {
    path: PathBuf,
    config: PathBuf,
    created: Vec<String>,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `Error::AlreadyInitialized` if the directory already has a
/// settings file and `force` is not set, or an I/O error.
pub fn execute(data_dir: Option<&PathBuf>, force: bool, json: bool) -> Result<()> {
    let dir = resolve_data_dir(data_dir.map(PathBuf::as_path)).ok_or_else(|| {
        Error::Config("Could not determine the gradebook data directory".to_string())
    })?;

    let config_path = dir.join(CONFIG_FILE);
    if config_path.exists() && !force {
        return Err(Error::AlreadyInitialized { path: dir });
    }

    fs::create_dir_all(&dir)?;
    let config = if config_path.exists() {
        StoreConfig::load(&dir)?
    } else {
        let config = StoreConfig::new(&dir);
        config.save()?;
        config
    };

    let repo = Repository::new(config);
    let created = repo.ensure_tables()?;
    if created.contains(&Table::GradeBands) {
        repo.replace_bands(BandTable::defaults().bands())?;
    }

    if json {
        let output = InitOutput {
            path: dir,
            config: config_path,
            created: created.iter().map(ToString::to_string).collect(),
        };
        let payload = serde_json::to_string(&output)?;
        println!("{payload}");
    } else {
        println!("Initialized gradebook data in {}", dir.display());
        println!("  Settings: {}", config_path.display());
        if created.is_empty() {
            println!("  All tables already present");
        } else {
            let names: Vec<String> = created.iter().map(ToString::to_string).collect();
            println!("  Created: {}", names.join(", "));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_tables_and_bands() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("data");

        execute(Some(&dir), false, true).unwrap();

        assert!(dir.join(CONFIG_FILE).exists());
        assert!(dir.join("modules.txt").exists());
        assert!(dir.join("leader_lecturers.txt").exists());
        let bands = fs::read_to_string(dir.join("grade_bands.txt")).unwrap();
        assert!(bands.starts_with("A|70|100\n"));
    }

    #[test]
    fn test_init_twice_requires_force() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_path_buf();

        execute(Some(&dir), false, true).unwrap();
        let result = execute(Some(&dir), false, true);
        assert!(matches!(result, Err(Error::AlreadyInitialized { .. })));

        fs::remove_file(dir.join("grades.txt")).unwrap();
        execute(Some(&dir), true, true).unwrap();
        assert!(dir.join("grades.txt").exists());
    }

    #[test]
    fn test_init_keeps_legacy_band_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_path_buf();
        fs::write(dir.join("grading_system.txt"), "P|0|100\n").unwrap();

        execute(Some(&dir), false, true).unwrap();
        assert!(!dir.join("grade_bands.txt").exists());
    }
}
