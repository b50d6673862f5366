//! Error types for the gradebook store.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=storage, 3=not_found, 4=validation, 5=rule, etc.)
//! - Retryability flags
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::sync::SyncPhase;

/// Result type alias for gradebook operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Storage (exit 2)
    NotInitialized,
    AlreadyInitialized,
    StorageError,

    // Not Found (exit 3)
    ModuleNotFound,
    AssessmentNotFound,
    UserNotFound,
    StudentNotFound,

    // Validation (exit 4)
    InvalidArgument,
    InvalidRole,
    InvalidAssessmentType,

    // Authorization / business rules (exit 5)
    AuthenticationFailed,
    NotModuleOwner,
    LecturerNotAllowed,
    LeaderModuleLimit,
    LeaderLecturerLimit,
    DuplicateModuleCode,
    LecturerAlreadyAssigned,

    // Sync (exit 6)
    PartialSync,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::StorageError => "STORAGE_ERROR",
            Self::ModuleNotFound => "MODULE_NOT_FOUND",
            Self::AssessmentNotFound => "ASSESSMENT_NOT_FOUND",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::StudentNotFound => "STUDENT_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidRole => "INVALID_ROLE",
            Self::InvalidAssessmentType => "INVALID_ASSESSMENT_TYPE",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::NotModuleOwner => "NOT_MODULE_OWNER",
            Self::LecturerNotAllowed => "LECTURER_NOT_ALLOWED",
            Self::LeaderModuleLimit => "LEADER_MODULE_LIMIT",
            Self::LeaderLecturerLimit => "LEADER_LECTURER_LIMIT",
            Self::DuplicateModuleCode => "DUPLICATE_MODULE_CODE",
            Self::LecturerAlreadyAssigned => "LECTURER_ALREADY_ASSIGNED",
            Self::PartialSync => "PARTIAL_SYNC",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::StorageError => 2,
            Self::ModuleNotFound
            | Self::AssessmentNotFound
            | Self::UserNotFound
            | Self::StudentNotFound => 3,
            Self::InvalidArgument | Self::InvalidRole | Self::InvalidAssessmentType => 4,
            Self::AuthenticationFailed
            | Self::NotModuleOwner
            | Self::LecturerNotAllowed
            | Self::LeaderModuleLimit
            | Self::LeaderLecturerLimit
            | Self::DuplicateModuleCode
            | Self::LecturerAlreadyAssigned => 5,
            Self::PartialSync => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether a caller should retry with corrected input.
    ///
    /// A partial sync is retryable: `module reconcile` replays the
    /// lecturer side from the module table.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument
                | Self::InvalidRole
                | Self::InvalidAssessmentType
                | Self::DuplicateModuleCode
                | Self::PartialSync
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in gradebook operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `gradebook init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Module not found: {id}")]
    ModuleNotFound { id: String },

    #[error("Assessment not found: {id}")]
    AssessmentNotFound { id: String },

    #[error("User not found: {id}")]
    UserNotFound { id: String },

    #[error("Student not found: {key}")]
    StudentNotFound { key: String },

    #[error("Invalid role: {input}")]
    InvalidRole {
        input: String,
        suggestion: Option<String>,
    },

    #[error("Invalid assessment type: {input}")]
    InvalidAssessmentType {
        input: String,
        suggestion: Option<String>,
    },

    #[error("Authentication failed for {username}")]
    AuthenticationFailed { username: String },

    #[error("Module {module_id} is not owned by leader {leader_id}")]
    NotModuleOwner { module_id: String, leader_id: String },

    #[error("Lecturer {lecturer_id} is not in leader {leader_id}'s lecturer list")]
    LecturerNotAllowed {
        leader_id: String,
        lecturer_id: String,
    },

    #[error("Leader {leader_id} already owns {limit} modules")]
    LeaderModuleLimit { leader_id: String, limit: usize },

    #[error("Leader {leader_id} already has {limit} lecturers")]
    LeaderLecturerLimit { leader_id: String, limit: usize },

    #[error("Module code already in use: {code}")]
    DuplicateModuleCode { code: String },

    #[error("Lecturer {lecturer_id} is already assigned to module {module_id}")]
    LecturerAlreadyAssigned {
        lecturer_id: String,
        module_id: String,
    },

    #[error("Module {module_id} sync stopped after {completed}: {source}")]
    PartialSync {
        module_id: String,
        completed: SyncPhase,
        #[source]
        source: Box<Error>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Write { .. } => ErrorCode::StorageError,
            Self::ModuleNotFound { .. } => ErrorCode::ModuleNotFound,
            Self::AssessmentNotFound { .. } => ErrorCode::AssessmentNotFound,
            Self::UserNotFound { .. } => ErrorCode::UserNotFound,
            Self::StudentNotFound { .. } => ErrorCode::StudentNotFound,
            Self::InvalidRole { .. } => ErrorCode::InvalidRole,
            Self::InvalidAssessmentType { .. } => ErrorCode::InvalidAssessmentType,
            Self::AuthenticationFailed { .. } => ErrorCode::AuthenticationFailed,
            Self::NotModuleOwner { .. } => ErrorCode::NotModuleOwner,
            Self::LecturerNotAllowed { .. } => ErrorCode::LecturerNotAllowed,
            Self::LeaderModuleLimit { .. } => ErrorCode::LeaderModuleLimit,
            Self::LeaderLecturerLimit { .. } => ErrorCode::LeaderLecturerLimit,
            Self::DuplicateModuleCode { .. } => ErrorCode::DuplicateModuleCode,
            Self::LecturerAlreadyAssigned { .. } => ErrorCode::LecturerAlreadyAssigned,
            Self::PartialSync { .. } => ErrorCode::PartialSync,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => {
                Some("Run `gradebook init` to create the data directory".to_string())
            }

            Self::AlreadyInitialized { path } => Some(format!(
                "Data directory already exists at {}. Use `--force` to rewrite missing files.",
                path.display()
            )),

            Self::ModuleNotFound { id } => Some(format!(
                "No module with ID '{id}'. Use `gradebook module list` to see modules."
            )),

            Self::AssessmentNotFound { id } => Some(format!(
                "No assessment with ID '{id}'. Use `gradebook assessment list` to see assessments."
            )),

            Self::StudentNotFound { key } => Some(format!(
                "No student with username or student ID '{key}'. Use `gradebook student list`."
            )),

            Self::InvalidRole { suggestion, .. } => Some(match suggestion {
                Some(s) => format!("Did you mean: {s}? Valid roles: STUDENT, LECTURER, LEADER, ADMIN"),
                None => "Valid roles: STUDENT, LECTURER, LEADER, ADMIN".to_string(),
            }),

            Self::InvalidAssessmentType { suggestion, .. } => Some(match suggestion {
                Some(s) => format!(
                    "Did you mean: {s}? Valid types: EXAM, ASSIGNMENT, QUIZ, PROJECT, PRESENTATION"
                ),
                None => "Valid types: EXAM, ASSIGNMENT, QUIZ, PROJECT, PRESENTATION".to_string(),
            }),

            Self::LecturerNotAllowed { leader_id, .. } => Some(format!(
                "Add the lecturer first: gradebook leader allow <lecturer-id> --actor {leader_id}"
            )),

            Self::NotModuleOwner { .. } => Some(
                "Only the module's leader can change it. Check `--actor` / GRADEBOOK_ACTOR."
                    .to_string(),
            ),

            Self::LecturerAlreadyAssigned { module_id, .. } => Some(format!(
                "Free the lecturer first: gradebook module unassign {module_id}"
            )),

            Self::PartialSync { .. } => Some(
                "The module row was written but the lecturer row was not.\n  \
                 Repair: gradebook module reconcile"
                    .to_string(),
            ),

            Self::Write { .. }
            | Self::UserNotFound { .. }
            | Self::AuthenticationFailed { .. }
            | Self::LeaderModuleLimit { .. }
            | Self::LeaderLecturerLimit { .. }
            | Self::DuplicateModuleCode { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Self::PartialSync { completed, .. } = self {
            obj["error"]["completed_phase"] = serde_json::Value::String(completed.to_string());
        }

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_violations_share_exit_code() {
        let err = Error::NotModuleOwner {
            module_id: "M001".into(),
            leader_id: "L2".into(),
        };
        assert_eq!(err.exit_code(), 5);

        let err = Error::DuplicateModuleCode { code: "CS101".into() };
        assert_eq!(err.exit_code(), 5);
        assert!(err.error_code().is_retryable());

        let err = Error::LecturerAlreadyAssigned {
            lecturer_id: "T1".into(),
            module_id: "M002".into(),
        };
        assert_eq!(err.exit_code(), 5);
        assert!(err.hint().unwrap().contains("unassign M002"));
    }

    #[test]
    fn test_partial_sync_json_reports_phase() {
        let err = Error::PartialSync {
            module_id: "M001".into(),
            completed: SyncPhase::ModuleWritten,
            source: Box::new(Error::Other("disk full".into())),
        };
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "PARTIAL_SYNC");
        assert_eq!(json["error"]["completed_phase"], "module-written");
        assert!(json["error"]["hint"].as_str().unwrap().contains("reconcile"));
    }
}
