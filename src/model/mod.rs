//! Data models for the gradebook.
//!
//! - People: User, Lecturer, Student (shared `Profile`), Principal
//! - Teaching: Module, Assessment, Class, Enrollment, LeaderLecturer
//! - Results: Grade, Feedback, GradeBand

pub mod academic;
pub mod user;

pub use academic::{
    Assessment, Class, Enrollment, Feedback, Grade, GradeBand, LeaderLecturer, Module,
    LEADER_LECTURER_LIMIT, LEADER_MODULE_LIMIT, MODULE_ID_PREFIX, MODULE_ID_WIDTH,
};
pub use user::{Lecturer, Principal, Profile, Role, Student, User};
