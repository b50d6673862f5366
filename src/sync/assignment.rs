//! Two-phase module↔lecturer assignment.
//!
//! The assignment lives in two files: `Module.lecturer_id` and the lecturer
//! row's `assigned_module_id`/`academic_leader_id`. An [`AssignmentSync`]
//! performs the two rewrites in order and tracks which phase completed:
//!
//! 1. Validate ownership, the leader's allow-list, and that no other module
//!    already has the lecturer. Any rejection here happens before a single
//!    byte is written.
//! 2. Rewrite the module row.
//! 3. Resolve the lecturer id to a username through the user table and
//!    rewrite that lecturer row.
//!
//! The two rewrites are not transactional. If step 3 fails after step 2 has
//! landed, the error is [`Error::PartialSync`] with
//! `completed = ModuleWritten`; the module row is not rolled back and
//! [`ModuleService::reconcile`](super::ModuleService::reconcile) repairs the
//! lecturer side from the module table.

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::Module;
use crate::storage::{keys_match, Repository};
use crate::sync::types::{LecturerUpdate, SyncPhase, SyncReport};

/// One assign or unassign operation against a repository.
#[derive(Debug)]
pub struct AssignmentSync<'a> {
    repo: &'a Repository,
    phase: Option<SyncPhase>,
}

impl<'a> AssignmentSync<'a> {
    #[must_use]
    pub const fn new(repo: &'a Repository) -> Self {
        Self { repo, phase: None }
    }

    /// Last phase that completed, `None` before validation passes.
    #[must_use]
    pub const fn phase(&self) -> Option<SyncPhase> {
        self.phase
    }

    /// Assign `lecturer_id` to `module_id` on behalf of `leader_id`.
    ///
    /// If the module already had a different lecturer whose row points at
    /// this module, that row is cleared after the new lecturer is written.
    ///
    /// # Errors
    ///
    /// Before any write: `ModuleNotFound`, `NotModuleOwner`,
    /// `LecturerNotAllowed`, `LecturerAlreadyAssigned` when another module
    /// has the lecturer, `InvalidArgument` for a blank lecturer id.
    /// After the module write: `PartialSync`.
    pub fn assign(
        &mut self,
        leader_id: &str,
        module_id: &str,
        lecturer_id: &str,
    ) -> Result<SyncReport> {
        let lecturer_id = lecturer_id.trim();
        if lecturer_id.is_empty() {
            return Err(Error::InvalidArgument("lecturer id is empty".to_string()));
        }

        let mut module = self.owned_module(leader_id, module_id)?;
        let allowed = self.repo.lecturers_for_leader(leader_id)?;
        if !allowed.iter().any(|id| keys_match(id, lecturer_id)) {
            return Err(Error::LecturerNotAllowed {
                leader_id: leader_id.to_string(),
                lecturer_id: lecturer_id.to_string(),
            });
        }
        if let Some(other) = self.repo.list_modules()?.into_iter().find(|m| {
            keys_match(&m.lecturer_id, lecturer_id) && !keys_match(&m.module_id, &module.module_id)
        }) {
            return Err(Error::LecturerAlreadyAssigned {
                lecturer_id: lecturer_id.to_string(),
                module_id: other.module_id,
            });
        }
        self.phase = Some(SyncPhase::Validated);

        let previous = Some(module.lecturer_id.clone())
            .filter(|prev| !prev.is_empty() && !keys_match(prev, lecturer_id));

        module.lecturer_id = lecturer_id.to_string();
        self.write_module(&module)?;

        let lecturer = self
            .point_lecturer(lecturer_id, Some(&module), None)
            .map_err(|e| self.partial(&module.module_id, e))?;
        let previous = match previous {
            Some(prev) => Some(
                self.point_lecturer(&prev, None, Some(&module.module_id))
                    .map_err(|e| self.partial(&module.module_id, e))?,
            ),
            None => None,
        };
        self.phase = Some(SyncPhase::LecturerWritten);

        info!(
            module_id = %module.module_id,
            lecturer_id,
            written = lecturer.is_written(),
            "Assigned lecturer"
        );
        Ok(SyncReport {
            module_id: module.module_id,
            phase: SyncPhase::LecturerWritten,
            lecturer,
            previous,
        })
    }

    /// Clear the lecturer of `module_id` on behalf of `leader_id`.
    ///
    /// # Errors
    ///
    /// Before any write: `ModuleNotFound`, `NotModuleOwner`.
    /// After the module write: `PartialSync`.
    pub fn unassign(&mut self, leader_id: &str, module_id: &str) -> Result<SyncReport> {
        let mut module = self.owned_module(leader_id, module_id)?;
        self.phase = Some(SyncPhase::Validated);

        if !module.has_lecturer() {
            debug!(module_id = %module.module_id, "Module has no lecturer");
            self.phase = Some(SyncPhase::LecturerWritten);
            return Ok(SyncReport {
                module_id: module.module_id,
                phase: SyncPhase::LecturerWritten,
                lecturer: LecturerUpdate::NotAssigned,
                previous: None,
            });
        }

        let lecturer_id = std::mem::take(&mut module.lecturer_id);
        self.write_module(&module)?;

        let lecturer = self
            .point_lecturer(&lecturer_id, None, Some(&module.module_id))
            .map_err(|e| self.partial(&module.module_id, e))?;
        self.phase = Some(SyncPhase::LecturerWritten);

        info!(module_id = %module.module_id, %lecturer_id, "Unassigned lecturer");
        Ok(SyncReport {
            module_id: module.module_id,
            phase: SyncPhase::LecturerWritten,
            lecturer,
            previous: None,
        })
    }

    /// Clear the lecturer copy of a module that has just been removed.
    /// The caller has already deleted the module row.
    pub(crate) fn release(&mut self, module: &Module) -> Result<LecturerUpdate> {
        self.phase = Some(SyncPhase::ModuleWritten);
        if !module.has_lecturer() {
            self.phase = Some(SyncPhase::LecturerWritten);
            return Ok(LecturerUpdate::NotAssigned);
        }
        let update = self
            .point_lecturer(&module.lecturer_id, None, Some(&module.module_id))
            .map_err(|e| self.partial(&module.module_id, e))?;
        self.phase = Some(SyncPhase::LecturerWritten);
        Ok(update)
    }

    fn owned_module(&self, leader_id: &str, module_id: &str) -> Result<Module> {
        let module = self
            .repo
            .find_module(module_id)?
            .ok_or_else(|| Error::ModuleNotFound {
                id: module_id.to_string(),
            })?;
        if !keys_match(&module.leader_id, leader_id) {
            return Err(Error::NotModuleOwner {
                module_id: module.module_id,
                leader_id: leader_id.to_string(),
            });
        }
        Ok(module)
    }

    fn write_module(&mut self, module: &Module) -> Result<()> {
        if !self.repo.update_module(module)? {
            return Err(Error::ModuleNotFound {
                id: module.module_id.clone(),
            });
        }
        self.phase = Some(SyncPhase::ModuleWritten);
        Ok(())
    }

    /// Point the lecturer row of `lecturer_id` at `target` (or clear it when
    /// `target` is `None`).
    ///
    /// With `only_if_on` set, the row is touched only if it currently points
    /// at that module id.
    fn point_lecturer(
        &self,
        lecturer_id: &str,
        target: Option<&Module>,
        only_if_on: Option<&str>,
    ) -> Result<LecturerUpdate> {
        let Some(user) = self.repo.find_user(lecturer_id)? else {
            warn!(lecturer_id, "No user for lecturer id; lecturer row not updated");
            return Ok(LecturerUpdate::UnknownUser {
                lecturer_id: lecturer_id.to_string(),
            });
        };
        let username = user.profile.username;

        let Some(mut lecturer) = self.repo.find_lecturer(&username)? else {
            warn!(%username, "No lecturer row for user; lecturer row not updated");
            return Ok(LecturerUpdate::NoLecturerRow { username });
        };

        if let Some(module_id) = only_if_on {
            if !keys_match(&lecturer.assigned_module_id, module_id) {
                debug!(%username, module_id, "Lecturer row points elsewhere");
                return Ok(LecturerUpdate::Skipped { username });
            }
        }

        match target {
            Some(module) => {
                lecturer.assigned_module_id.clone_from(&module.module_id);
                lecturer.academic_leader_id.clone_from(&module.leader_id);
            }
            None => {
                lecturer.assigned_module_id.clear();
                lecturer.academic_leader_id.clear();
            }
        }

        if !self.repo.update_lecturer(&lecturer)? {
            return Ok(LecturerUpdate::NoLecturerRow { username });
        }
        Ok(LecturerUpdate::Written { username })
    }

    fn partial(&self, module_id: &str, source: Error) -> Error {
        let completed = self.phase.unwrap_or(SyncPhase::Validated);
        warn!(module_id, %completed, error = %source, "Module and lecturer rows disagree");
        Error::PartialSync {
            module_id: module_id.to_string(),
            completed,
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::storage::Table;
    use std::fs;
    use tempfile::TempDir;

    /// Leader L1 owns M001; T1 (tina) and T2 (tom) are lecturers; L1 may
    /// assign T1, T2 and T5 (T5 has no user row).
    fn fixture() -> (TempDir, Repository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::new(StoreConfig::new(temp_dir.path()));
        fs::write(
            repo.path(Table::Users),
            "L1|lee|pw|Lee|||||LEADER\n\
             L2|lin|pw|Lin|||||LEADER\n\
             T1|tina|pw|Tina|||||LECTURER\n\
             T2|tom|pw|Tom|||||LECTURER\n",
        )
        .unwrap();
        fs::write(
            repo.path(Table::Lecturers),
            "tina|pw|Tina|F|t@u.edu|1|||\n\
             tom|pw|Tom|M|o@u.edu|2|||\n",
        )
        .unwrap();
        fs::write(repo.path(Table::Modules), "M001|Intro|CS101|3|L1|\n").unwrap();
        fs::write(repo.path(Table::LeaderLecturers), "L1|T1\nL1|T2\nL1|T5\n").unwrap();
        (temp_dir, repo)
    }

    fn snapshot(repo: &Repository) -> (String, String) {
        (
            fs::read_to_string(repo.path(Table::Modules)).unwrap(),
            fs::read_to_string(repo.path(Table::Lecturers)).unwrap(),
        )
    }

    #[test]
    fn test_assign_updates_both_sides() {
        let (_dir, repo) = fixture();
        let mut sync = AssignmentSync::new(&repo);

        let report = sync.assign("L1", "M001", "T1").unwrap();
        assert_eq!(report.phase, SyncPhase::LecturerWritten);
        assert_eq!(
            report.lecturer,
            LecturerUpdate::Written {
                username: "tina".into()
            }
        );
        assert_eq!(sync.phase(), Some(SyncPhase::LecturerWritten));

        assert_eq!(repo.find_module("M001").unwrap().unwrap().lecturer_id, "T1");
        let tina = repo.find_lecturer("tina").unwrap().unwrap();
        assert_eq!(tina.assigned_module_id, "M001");
        assert_eq!(tina.academic_leader_id, "L1");
    }

    #[test]
    fn test_lecturer_outside_allow_list_touches_nothing() {
        let (_dir, repo) = fixture();
        let before = snapshot(&repo);

        let err = AssignmentSync::new(&repo)
            .assign("L1", "M001", "T999")
            .unwrap_err();
        assert!(matches!(err, Error::LecturerNotAllowed { .. }));
        assert_eq!(snapshot(&repo), before);
    }

    #[test]
    fn test_lecturer_on_another_module_is_rejected() {
        let (_dir, repo) = fixture();
        let mut modules = fs::read_to_string(repo.path(Table::Modules)).unwrap();
        modules.push_str("M002|Data|CS102|3|L1|\n");
        fs::write(repo.path(Table::Modules), modules).unwrap();

        AssignmentSync::new(&repo).assign("L1", "M002", "T1").unwrap();
        let before = snapshot(&repo);

        let mut sync = AssignmentSync::new(&repo);
        let err = sync.assign("L1", "M001", "t1").unwrap_err();
        assert!(matches!(
            err,
            Error::LecturerAlreadyAssigned { ref module_id, .. } if module_id == "M002"
        ));
        assert_eq!(sync.phase(), None);
        assert_eq!(snapshot(&repo), before);

        let m002 = repo.find_module("M002").unwrap().unwrap();
        let tina = repo.find_lecturer("tina").unwrap().unwrap();
        assert_eq!(m002.lecturer_id, "T1");
        assert_eq!(tina.assigned_module_id, "M002");

        // Reassigning to the module that already has them is allowed.
        assert!(sync.assign("L1", "M002", "T1").is_ok());
    }

    #[test]
    fn test_wrong_owner_touches_nothing() {
        let (_dir, repo) = fixture();
        let before = snapshot(&repo);

        let mut sync = AssignmentSync::new(&repo);
        let err = sync.assign("L2", "M001", "T1").unwrap_err();
        assert!(matches!(err, Error::NotModuleOwner { .. }));
        assert_eq!(sync.phase(), None);

        let err = sync.unassign("L2", "M001").unwrap_err();
        assert!(matches!(err, Error::NotModuleOwner { .. }));
        assert_eq!(snapshot(&repo), before);
    }

    #[test]
    fn test_unknown_user_stops_without_fabricating_row() {
        let (_dir, repo) = fixture();
        let lecturers_before = snapshot(&repo).1;

        let report = AssignmentSync::new(&repo).assign("L1", "M001", "T5").unwrap();
        assert_eq!(
            report.lecturer,
            LecturerUpdate::UnknownUser {
                lecturer_id: "T5".into()
            }
        );
        assert_eq!(repo.find_module("M001").unwrap().unwrap().lecturer_id, "T5");
        assert_eq!(snapshot(&repo).1, lecturers_before);
    }

    #[test]
    fn test_reassignment_clears_previous_lecturer() {
        let (_dir, repo) = fixture();
        AssignmentSync::new(&repo).assign("L1", "M001", "T1").unwrap();

        let report = AssignmentSync::new(&repo).assign("L1", "M001", "T2").unwrap();
        assert_eq!(
            report.previous,
            Some(LecturerUpdate::Written {
                username: "tina".into()
            })
        );

        let tina = repo.find_lecturer("tina").unwrap().unwrap();
        assert_eq!(tina.assigned_module_id, "");
        let tom = repo.find_lecturer("tom").unwrap().unwrap();
        assert_eq!(tom.assigned_module_id, "M001");
    }

    #[test]
    fn test_unassign_clears_both_sides() {
        let (_dir, repo) = fixture();
        AssignmentSync::new(&repo).assign("L1", "M001", "T1").unwrap();

        let report = AssignmentSync::new(&repo).unassign("L1", "m001").unwrap();
        assert!(report.lecturer.is_written());
        assert!(!repo.find_module("M001").unwrap().unwrap().has_lecturer());
        let tina = repo.find_lecturer("tina").unwrap().unwrap();
        assert_eq!(tina.assigned_module_id, "");
        assert_eq!(tina.academic_leader_id, "");

        let again = AssignmentSync::new(&repo).unassign("L1", "M001").unwrap();
        assert_eq!(again.lecturer, LecturerUpdate::NotAssigned);
    }

    #[test]
    fn test_lecturer_write_failure_reports_partial_sync() {
        let (_dir, repo) = fixture();
        let lecturers = repo.path(Table::Lecturers);
        fs::remove_file(&lecturers).unwrap();
        fs::create_dir(&lecturers).unwrap();

        let mut sync = AssignmentSync::new(&repo);
        let err = sync.assign("L1", "M001", "T1").unwrap_err();
        match err {
            Error::PartialSync {
                module_id,
                completed,
                ..
            } => {
                assert_eq!(module_id, "M001");
                assert_eq!(completed, SyncPhase::ModuleWritten);
            }
            other => panic!("expected PartialSync, got {other:?}"),
        }
        assert_eq!(sync.phase(), Some(SyncPhase::ModuleWritten));
        assert_eq!(repo.find_module("M001").unwrap().unwrap().lecturer_id, "T1");
    }
}
