//! Flat-file storage layer.
//!
//! Each table is an independent delimited text file, one record per line.
//!
//! # Submodules
//!
//! - [`lines`] - Whole-file read/append/rewrite/delete-by-key primitives
//! - [`codec`] - Schema-generation decoding and canonical encoding
//! - [`schema`] - Field layouts of every table
//! - [`repository`] - Per-entity operations, composite-key upsert, writer locks

pub mod codec;
pub mod lines;
pub mod repository;
pub mod schema;

pub use codec::{Decoded, FieldError, Generation, LoadReport, Record};
pub use lines::LineStore;
pub use repository::{CompositeKeyed, Repository, UpsertOutcome};
pub use schema::{layouts, StudentJoin};

/// The logical tables of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    Lecturers,
    Students,
    Modules,
    Assessments,
    Grades,
    Feedback,
    Classes,
    StudentClasses,
    LeaderLecturers,
    GradeBands,
}

impl Table {
    /// Every table, in initialisation order.
    pub const ALL: [Self; 11] = [
        Self::Users,
        Self::Lecturers,
        Self::Students,
        Self::Modules,
        Self::Assessments,
        Self::Grades,
        Self::Feedback,
        Self::Classes,
        Self::StudentClasses,
        Self::LeaderLecturers,
        Self::GradeBands,
    ];
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Users => write!(f, "users"),
            Self::Lecturers => write!(f, "lecturers"),
            Self::Students => write!(f, "students"),
            Self::Modules => write!(f, "modules"),
            Self::Assessments => write!(f, "assessments"),
            Self::Grades => write!(f, "grades"),
            Self::Feedback => write!(f, "feedback"),
            Self::Classes => write!(f, "classes"),
            Self::StudentClasses => write!(f, "student_classes"),
            Self::LeaderLecturers => write!(f, "leader_lecturers"),
            Self::GradeBands => write!(f, "grade_bands"),
        }
    }
}

/// Key comparison used everywhere a stored key is matched: case-insensitive.
#[must_use]
pub fn keys_match(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}
