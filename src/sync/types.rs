//! Sync outcome types.

use serde::Serialize;

/// How far a two-phase module↔lecturer sync got.
///
/// Phases are ordered; a failure reports the last phase that completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncPhase {
    /// Ownership and allow-list checks passed. Nothing written.
    Validated,
    /// The module row was rewritten.
    ModuleWritten,
    /// The lecturer-side copy was brought in line (or had nothing to update).
    LecturerWritten,
}

impl SyncPhase {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validated => "validated",
            Self::ModuleWritten => "module-written",
            Self::LecturerWritten => "lecturer-written",
        }
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one lecturer row during a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LecturerUpdate {
    /// The row keyed by `username` was rewritten.
    Written { username: String },
    /// The module had no lecturer; nothing to clear.
    NotAssigned,
    /// No user has this id, so no lecturer row can be located.
    UnknownUser { lecturer_id: String },
    /// The user exists but the lecturer table has no row for them.
    NoLecturerRow { username: String },
    /// The row already points at another module and was left alone.
    Skipped { username: String },
}

impl LecturerUpdate {
    #[must_use]
    pub const fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

/// Result of a completed module↔lecturer sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub module_id: String,
    pub phase: SyncPhase,
    /// The lecturer being assigned, or the one being cleared.
    pub lecturer: LecturerUpdate,
    /// The previously assigned lecturer, when a reassignment replaced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<LecturerUpdate>,
}

/// Result of re-deriving lecturer rows from the module table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Lecturer rows examined.
    pub checked: usize,
    /// Usernames whose row was rewritten.
    pub repaired: Vec<String>,
    /// Module lecturer ids with no matching user.
    pub unresolved: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order_and_names() {
        assert!(SyncPhase::Validated < SyncPhase::ModuleWritten);
        assert!(SyncPhase::ModuleWritten < SyncPhase::LecturerWritten);
        assert_eq!(SyncPhase::ModuleWritten.to_string(), "module-written");
        assert_eq!(
            serde_json::to_value(SyncPhase::LecturerWritten).unwrap(),
            "lecturer-written"
        );
    }

    #[test]
    fn test_lecturer_update_json_is_tagged() {
        let json = serde_json::to_value(LecturerUpdate::UnknownUser {
            lecturer_id: "T5".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "unknown_user");
        assert_eq!(json["lecturer_id"], "T5");
    }
}
