//! Module lifecycle: create, edit, delete, lecturer assignment, repair.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{Module, LEADER_MODULE_LIMIT, MODULE_ID_PREFIX, MODULE_ID_WIDTH};
use crate::storage::{keys_match, Repository};
use crate::sync::assignment::AssignmentSync;
use crate::sync::types::{LecturerUpdate, ReconcileReport, SyncReport};

/// Fields supplied when creating a module.
#[derive(Debug, Clone, Default)]
pub struct NewModule {
    pub name: String,
    pub code: String,
    pub credit_hours: Option<u32>,
}

/// Detail edits; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ModuleChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub credit_hours: Option<u32>,
}

impl ModuleChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.code.is_none() && self.credit_hours.is_none()
    }
}

/// Outcome of deleting a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleRemoval {
    pub module_id: String,
    pub lecturer: LecturerUpdate,
}

/// Next id after the highest `M###` id in `modules`, e.g. `M001` for none.
///
/// Ids without the prefix or with a non-numeric suffix are ignored.
///
/// # Errors
///
/// Returns `Error::InvalidArgument` when the highest numeric suffix is
/// already `u32::MAX`.
pub fn next_module_id(modules: &[Module]) -> Result<String> {
    let max = modules
        .iter()
        .filter_map(|m| {
            let id = m.module_id.trim();
            let prefix = id.get(..MODULE_ID_PREFIX.len())?;
            if !prefix.eq_ignore_ascii_case(MODULE_ID_PREFIX) {
                return None;
            }
            id[MODULE_ID_PREFIX.len()..].parse::<u32>().ok()
        })
        .max()
        .unwrap_or(0);
    let next = max.checked_add(1).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "no module id left after {MODULE_ID_PREFIX}{max}"
        ))
    })?;
    Ok(format!(
        "{MODULE_ID_PREFIX}{next:0width$}",
        width = MODULE_ID_WIDTH
    ))
}

fn code_taken(modules: &[Module], code: &str, except_id: Option<&str>) -> bool {
    modules.iter().any(|m| {
        keys_match(&m.module_code, code) && except_id.is_none_or(|id| !keys_match(&m.module_id, id))
    })
}

/// Leader-facing module operations.
#[derive(Debug, Clone, Copy)]
pub struct ModuleService<'a> {
    repo: &'a Repository,
}

impl<'a> ModuleService<'a> {
    #[must_use]
    pub const fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Create a module owned by `leader_id` with the next sequential id.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a blank name or code, `LeaderModuleLimit` if
    /// the leader already owns the maximum, `DuplicateModuleCode` if the code
    /// is used by any module. Nothing is written on error.
    pub fn create(&self, leader_id: &str, new: NewModule) -> Result<Module> {
        let code = new.code.trim().to_string();
        let name = new.name.trim().to_string();
        if code.is_empty() || name.is_empty() {
            return Err(Error::InvalidArgument(
                "module name and code are required".to_string(),
            ));
        }

        let module = self.repo.append_with::<Module, _>(|existing| {
            let owned = existing
                .iter()
                .filter(|m| keys_match(&m.leader_id, leader_id))
                .count();
            if owned >= LEADER_MODULE_LIMIT {
                return Err(Error::LeaderModuleLimit {
                    leader_id: leader_id.to_string(),
                    limit: LEADER_MODULE_LIMIT,
                });
            }
            if code_taken(existing, &code, None) {
                return Err(Error::DuplicateModuleCode { code: code.clone() });
            }
            Ok(Module {
                module_id: next_module_id(existing)?,
                module_name: name,
                module_code: code.clone(),
                credit_hours: new.credit_hours,
                leader_id: leader_id.to_string(),
                lecturer_id: String::new(),
            })
        })?;

        info!(module_id = %module.module_id, leader_id, "Created module");
        Ok(module)
    }

    /// Edit name, code or credit hours. The lecturer is never changed here.
    ///
    /// # Errors
    ///
    /// `ModuleNotFound`, `NotModuleOwner`, or `DuplicateModuleCode` when the
    /// new code belongs to another module.
    pub fn update(&self, leader_id: &str, module_id: &str, changes: ModuleChanges) -> Result<Module> {
        let modules = self.repo.list_modules()?;
        let mut module = modules
            .iter()
            .find(|m| keys_match(&m.module_id, module_id))
            .cloned()
            .ok_or_else(|| Error::ModuleNotFound {
                id: module_id.to_string(),
            })?;
        if !keys_match(&module.leader_id, leader_id) {
            return Err(Error::NotModuleOwner {
                module_id: module.module_id,
                leader_id: leader_id.to_string(),
            });
        }
        if changes.is_empty() {
            debug!(module_id = %module.module_id, "No module changes");
            return Ok(module);
        }

        if let Some(code) = changes.code {
            let code = code.trim().to_string();
            if code_taken(&modules, &code, Some(&module.module_id)) {
                return Err(Error::DuplicateModuleCode { code });
            }
            module.module_code = code;
        }
        if let Some(name) = changes.name {
            module.module_name = name.trim().to_string();
        }
        if changes.credit_hours.is_some() {
            module.credit_hours = changes.credit_hours;
        }

        if !self.repo.update_module(&module)? {
            return Err(Error::ModuleNotFound {
                id: module.module_id,
            });
        }
        info!(module_id = %module.module_id, "Updated module");
        Ok(module)
    }

    /// Delete a module and clear its lecturer's copy of the assignment.
    ///
    /// # Errors
    ///
    /// `ModuleNotFound`, `NotModuleOwner` before any write; `PartialSync` if
    /// the lecturer row cannot be cleared after the module row is gone.
    pub fn delete(&self, leader_id: &str, module_id: &str) -> Result<ModuleRemoval> {
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

        self.repo.delete_module(&module.module_id)?;
        let lecturer = AssignmentSync::new(self.repo).release(&module)?;
        info!(module_id = %module.module_id, "Deleted module");
        Ok(ModuleRemoval {
            module_id: module.module_id,
            lecturer,
        })
    }

    /// See [`AssignmentSync::assign`].
    ///
    /// # Errors
    ///
    /// Propagates the assignment's rejection or `PartialSync`.
    pub fn assign(&self, leader_id: &str, module_id: &str, lecturer_id: &str) -> Result<SyncReport> {
        AssignmentSync::new(self.repo).assign(leader_id, module_id, lecturer_id)
    }

    /// See [`AssignmentSync::unassign`].
    ///
    /// # Errors
    ///
    /// Propagates the unassignment's rejection or `PartialSync`.
    pub fn unassign(&self, leader_id: &str, module_id: &str) -> Result<SyncReport> {
        AssignmentSync::new(self.repo).unassign(leader_id, module_id)
    }

    /// Re-derive every lecturer row's assignment from the module table.
    ///
    /// A lecturer referenced by several modules is pointed at the first one
    /// in file order. Lecturers referenced by none are cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if a table cannot be read or rewritten.
    pub fn reconcile(&self) -> Result<ReconcileReport> {
        let modules = self.repo.list_modules()?;
        let users = self.repo.list_users()?;
        let mut report = ReconcileReport::default();

        // username (lowercased) → (module id, leader id)
        let mut expected: HashMap<String, (String, String)> = HashMap::new();
        for module in modules.iter().filter(|m| m.has_lecturer()) {
            match users.iter().find(|u| keys_match(&u.id, &module.lecturer_id)) {
                Some(user) => {
                    expected
                        .entry(user.profile.username.to_lowercase())
                        .or_insert_with(|| (module.module_id.clone(), module.leader_id.clone()));
                }
                None => report.unresolved.push(module.lecturer_id.clone()),
            }
        }

        for mut lecturer in self.repo.list_lecturers()? {
            report.checked += 1;
            let (module_id, leader_id) = expected
                .get(&lecturer.profile.username.to_lowercase())
                .cloned()
                .unwrap_or_default();
            if lecturer.assigned_module_id == module_id && lecturer.academic_leader_id == leader_id {
                continue;
            }
            lecturer.assigned_module_id = module_id;
            lecturer.academic_leader_id = leader_id;
            if self.repo.update_lecturer(&lecturer)? {
                report.repaired.push(lecturer.profile.username);
            }
        }

        info!(
            checked = report.checked,
            repaired = report.repaired.len(),
            unresolved = report.unresolved.len(),
            "Reconciled lecturer assignments"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::storage::Table;
    use std::fs;
    use tempfile::TempDir;

    fn repo(temp_dir: &TempDir) -> Repository {
        Repository::new(StoreConfig::new(temp_dir.path()))
    }

    fn new_module(code: &str) -> NewModule {
        NewModule {
            name: format!("Module {code}"),
            code: code.into(),
            credit_hours: Some(3),
        }
    }

    #[test]
    fn test_sequential_ids_on_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        let service = ModuleService::new(&repo);

        assert_eq!(service.create("L1", new_module("CS101")).unwrap().module_id, "M001");
        assert_eq!(service.create("L1", new_module("CS102")).unwrap().module_id, "M002");
    }

    #[test]
    fn test_next_id_skips_foreign_ids() {
        let ids = ["M010", "X999", "M00A", "m004"];
        let modules: Vec<Module> = ids
            .iter()
            .map(|id| Module {
                module_id: (*id).to_string(),
                ..Module::default()
            })
            .collect();
        assert_eq!(next_module_id(&modules).unwrap(), "M011");
        assert_eq!(next_module_id(&[]).unwrap(), "M001");
    }

    #[test]
    fn test_next_id_at_suffix_limit() {
        let last = Module {
            module_id: format!("M{}", u32::MAX),
            ..Module::default()
        };
        let err = next_module_id(&[last]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let below = Module {
            module_id: format!("M{}", u32::MAX - 1),
            ..Module::default()
        };
        assert_eq!(next_module_id(&[below]).unwrap(), format!("M{}", u32::MAX));
    }

    #[test]
    fn test_leader_module_limit() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        let service = ModuleService::new(&repo);
        for code in ["A1", "A2", "A3"] {
            service.create("L1", new_module(code)).unwrap();
        }
        let before = fs::read_to_string(repo.path(Table::Modules)).unwrap();

        let err = service.create("L1", new_module("A4")).unwrap_err();
        assert!(matches!(err, Error::LeaderModuleLimit { limit: 3, .. }));
        assert_eq!(fs::read_to_string(repo.path(Table::Modules)).unwrap(), before);

        assert_eq!(service.create("L2", new_module("A4")).unwrap().module_id, "M004");
    }

    #[test]
    fn test_duplicate_code_rejected_case_insensitively() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        let service = ModuleService::new(&repo);
        service.create("L1", new_module("CS101")).unwrap();

        let err = service.create("L2", new_module("cs101")).unwrap_err();
        assert!(matches!(err, Error::DuplicateModuleCode { .. }));
        assert_eq!(repo.list_modules().unwrap().len(), 1);
    }

    #[test]
    fn test_update_checks_owner_and_code() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        let service = ModuleService::new(&repo);
        service.create("L1", new_module("CS101")).unwrap();
        service.create("L1", new_module("CS102")).unwrap();

        let rename = ModuleChanges {
            name: Some("Programming I".into()),
            code: Some("CS101".into()),
            ..ModuleChanges::default()
        };
        let updated = service.update("L1", "M001", rename.clone()).unwrap();
        assert_eq!(updated.module_name, "Programming I");

        let err = service.update("L2", "M001", rename).unwrap_err();
        assert!(matches!(err, Error::NotModuleOwner { .. }));

        let clash = ModuleChanges {
            code: Some("cs101".into()),
            ..ModuleChanges::default()
        };
        let err = service.update("L1", "M002", clash).unwrap_err();
        assert!(matches!(err, Error::DuplicateModuleCode { .. }));
    }

    #[test]
    fn test_delete_clears_lecturer_copy() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        fs::write(repo.path(Table::Users), "T1|tina|pw|Tina|LECTURER\n").unwrap();
        fs::write(repo.path(Table::Lecturers), "tina|pw|Tina||||||\n").unwrap();
        repo.allow_lecturer("L1", "T1").unwrap();

        let service = ModuleService::new(&repo);
        let module = service.create("L1", new_module("CS101")).unwrap();
        service.assign("L1", &module.module_id, "T1").unwrap();

        let removal = service.delete("L1", "M001").unwrap();
        assert!(removal.lecturer.is_written());
        assert!(repo.list_modules().unwrap().is_empty());
        assert_eq!(repo.find_lecturer("tina").unwrap().unwrap().assigned_module_id, "");
    }

    #[test]
    fn test_reconcile_repairs_lecturer_rows() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        fs::write(
            repo.path(Table::Users),
            "T1|tina|pw|Tina|LECTURER\nT2|tom|pw|Tom|LECTURER\n",
        )
        .unwrap();
        fs::write(
            repo.path(Table::Lecturers),
            "tina|pw|Tina|||||M009|L9\ntom|pw|Tom|||||M001|L1\n",
        )
        .unwrap();
        fs::write(
            repo.path(Table::Modules),
            "M001|Intro|CS101|3|L1|T1\nM002|Data|CS201|3|L1|T7\n",
        )
        .unwrap();

        let report = ModuleService::new(&repo).reconcile().unwrap();
        assert_eq!(report.checked, 2);
        assert_eq!(report.repaired, ["tina", "tom"]);
        assert_eq!(report.unresolved, ["T7"]);

        let tina = repo.find_lecturer("tina").unwrap().unwrap();
        assert_eq!((tina.assigned_module_id.as_str(), tina.academic_leader_id.as_str()), ("M001", "L1"));
        let tom = repo.find_lecturer("tom").unwrap().unwrap();
        assert_eq!(tom.assigned_module_id, "");

        let again = ModuleService::new(&repo).reconcile().unwrap();
        assert!(again.repaired.is_empty());
    }
}
