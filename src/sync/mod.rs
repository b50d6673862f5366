//! Cross-table consistency for module↔lecturer assignment.
//!
//! A module's lecturer is stored twice: in `Module.lecturer_id` and, as a
//! denormalised copy, in the lecturer row's `assigned_module_id` and
//! `academic_leader_id`. Only this module writes either side of that link.
//!
//! - [`AssignmentSync`] - Two-phase assign/unassign with phase tracking
//! - [`ModuleService`] - Module create/update/delete and `reconcile`
//! - [`SyncPhase`], [`SyncReport`] - What a sync did, or how far it got

mod assignment;
mod modules;
mod types;

pub use assignment::AssignmentSync;
pub use modules::{next_module_id, ModuleChanges, ModuleRemoval, ModuleService, NewModule};
pub use types::{LecturerUpdate, ReconcileReport, SyncPhase, SyncReport};
