//! Modules, assessments, results and enrollment records.

use serde::{Deserialize, Serialize};

/// Prefix of generated module ids (`M001`, `M002`, ...).
pub const MODULE_ID_PREFIX: &str = "M";

/// Zero-padded width of the numeric part of a module id.
pub const MODULE_ID_WIDTH: usize = 3;

/// Most modules one academic leader may own.
pub const LEADER_MODULE_LIMIT: usize = 3;

/// Most lecturers on one leader's allow-list.
pub const LEADER_LECTURER_LIMIT: usize = 3;

/// A taught module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub module_id: String,
    pub module_name: String,
    /// Unique across all modules (case-insensitive).
    pub module_code: String,
    pub credit_hours: Option<u32>,
    /// Owning academic leader (user id).
    pub leader_id: String,
    /// Assigned lecturer (user id); empty when unassigned.
    pub lecturer_id: String,
}

impl Module {
    #[must_use]
    pub fn has_lecturer(&self) -> bool {
        !self.lecturer_id.is_empty()
    }
}

/// An assessment belonging to a module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub assessment_id: String,
    pub module_id: String,
    pub title: String,
    /// EXAM, ASSIGNMENT, QUIZ, ... (see `validate::normalize_assessment_type`).
    pub kind: String,
    pub max_marks: Option<f64>,
    pub weight: Option<f64>,
    pub date: String,
}

/// A mark recorded for one student on one assessment.
///
/// At most one live row exists per `(assessment_id, student_id)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub grade_id: String,
    pub assessment_id: String,
    pub student_id: String,
    pub marks: Option<f64>,
    /// Band label, e.g. "A". Empty when not resolved.
    pub grade: String,
    pub lecturer_id: String,
    pub date_entered: String,
}

/// Written feedback for one student on one assessment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub feedback_id: String,
    pub assessment_id: String,
    pub student_id: String,
    pub lecturer_id: String,
    pub text: String,
    pub date: String,
}

/// A class (teaching group) for a module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub class_id: String,
    pub class_name: String,
    pub module_id: String,
}

/// Join row: a student enrolled in a class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub student_id: String,
    pub class_id: String,
}

/// Join row: a lecturer a leader may assign to their modules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderLecturer {
    pub leader_id: String,
    pub lecturer_id: String,
}

/// A labelled percentage band, inclusive `min..=max` as stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeBand {
    pub label: String,
    pub min_percent: f64,
    pub max_percent: f64,
}

impl GradeBand {
    /// Whether `percent` falls in `[min, max + 1)`.
    ///
    /// The half-open upper bound keeps fractional scores such as 69.5 from
    /// falling between integer bands 60-69 and 70-100.
    #[must_use]
    pub fn contains(&self, percent: f64) -> bool {
        percent >= self.min_percent && percent < self.max_percent + 1.0
    }
}
