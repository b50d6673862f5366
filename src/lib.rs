//! Gradebook - flat-file academic records
//!
//! This crate provides the storage core and the `gradebook` CLI.
//!
//! # Architecture
//!
//! - [`storage`] - Delimited line files, per-entity codecs, the repository
//! - [`model`] - Records (User, Lecturer, Student, Module, Assessment, Grade, ...)
//! - [`sync`] - Module lifecycle and module↔lecturer assignment consistency
//! - [`grading`] - Band table: marks to letter grade
//! - [`auth`] - Principal lookup by username and password
//! - [`validate`] - Role and assessment-type normalisation
//! - [`config`] - Data directory and table file configuration
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod grading;
pub mod model;
pub mod storage;
pub mod sync;
pub mod validate;

pub use error::{Error, Result};

/// Global silent mode flag for `--silent` output.
///
/// When set, create/mutate commands print only the ID or key
/// instead of full output.
pub static SILENT: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Check if silent mode is active.
#[inline]
pub fn is_silent() -> bool {
    SILENT.load(std::sync::atomic::Ordering::Relaxed)
}
