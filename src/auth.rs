//! Principal lookup by username and password.
//!
//! Tables are searched in a fixed order and the first match wins:
//!
//! 1. users, current 9-field rows, then legacy 5-field rows
//! 2. lecturers (9-field)
//! 3. students, current 10-field rows only
//!
//! Usernames compare case-insensitively; passwords compare exactly.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{Lecturer, Principal, Profile, Student, User};
use crate::storage::{keys_match, Decoded, Record, Repository, StudentJoin};

fn credentials_match(profile: &Profile, username: &str, password: &str) -> bool {
    keys_match(&profile.username, username) && profile.password == password
}

fn find_in_generation<T: Record>(
    rows: &[Decoded<T>],
    generation: usize,
    matches: impl Fn(&T) -> bool,
) -> Option<&T> {
    rows.iter()
        .filter(|d| d.generation == generation)
        .map(|d| &d.record)
        .find(|r| matches(r))
}

/// Locate the principal for a username/password pair.
///
/// # Errors
///
/// Returns `Error::AuthenticationFailed` when no table matches, or a read
/// error.
pub fn authenticate(repo: &Repository, username: &str, password: &str) -> Result<Principal> {
    let users = repo.load_tagged::<User>(&())?;
    for (generation, layout) in User::generations().iter().enumerate() {
        if let Some(user) = find_in_generation(&users, generation, |u: &User| {
            credentials_match(&u.profile, username, password)
        }) {
            debug!(layout = layout.name, "Matched user row");
            info!(username, role = %user.role, "Authenticated");
            return Ok(Principal::User(user.clone()));
        }
    }

    let lecturers = repo.load_tagged::<Lecturer>(&())?;
    if let Some(lecturer) = find_in_generation(&lecturers, 0, |l: &Lecturer| {
        credentials_match(&l.profile, username, password)
    }) {
        info!(username, role = "LECTURER", "Authenticated");
        return Ok(Principal::Lecturer(lecturer.clone()));
    }

    // Only the 10-field layout carries credentials, so no join is needed.
    let students = repo.load_tagged::<Student>(&StudentJoin::default())?;
    if let Some(student) = find_in_generation(&students, 0, |s: &Student| {
        credentials_match(&s.profile, username, password)
    }) {
        info!(username, role = "STUDENT", "Authenticated");
        return Ok(Principal::Student(student.clone()));
    }

    debug!(username, "No matching principal");
    Err(Error::AuthenticationFailed {
        username: username.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::model::Role;
    use crate::storage::Table;
    use std::fs;
    use tempfile::TempDir;

    fn repo_with_accounts() -> (TempDir, Repository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::new(StoreConfig::new(temp_dir.path()));
        fs::write(
            repo.path(Table::Users),
            "U1|old|pw5|Old Timer|ADMIN\n\
             L1|lee|pw|Lee|M|l@u.edu|1|40|LEADER\n\
             U2|dup|five|Dup Five|STUDENT\n\
             U3|dup|nine|Dup Nine||||| LECTURER\n",
        )
        .unwrap();
        fs::write(
            repo.path(Table::Lecturers),
            "tina|tpw|Tina|F|t@u.edu|2|35|M001|L1\n",
        )
        .unwrap();
        fs::write(
            repo.path(Table::Students),
            "sam|spw|Sam|M|s@u.edu|3|19|S1|2024-SEP|M001\n\
             S2|U1|2024-SEP\n",
        )
        .unwrap();
        (temp_dir, repo)
    }

    #[test]
    fn test_user_table_current_layout() {
        let (_dir, repo) = repo_with_accounts();
        let principal = authenticate(&repo, "LEE", "pw").unwrap();
        assert_eq!(principal.role(), Role::Leader);
        assert_eq!(principal.id(), "L1");
    }

    #[test]
    fn test_legacy_user_layout() {
        let (_dir, repo) = repo_with_accounts();
        let principal = authenticate(&repo, "old", "pw5").unwrap();
        assert_eq!(principal.role(), Role::Admin);
    }

    #[test]
    fn test_current_layout_searched_before_legacy() {
        let (_dir, repo) = repo_with_accounts();
        assert_eq!(authenticate(&repo, "dup", "nine").unwrap().id(), "U3");
        assert_eq!(authenticate(&repo, "dup", "five").unwrap().id(), "U2");
    }

    #[test]
    fn test_lecturer_and_student_tables() {
        let (_dir, repo) = repo_with_accounts();
        let lecturer = authenticate(&repo, "tina", "tpw").unwrap();
        assert!(matches!(lecturer, Principal::Lecturer(ref l) if l.assigned_module_id == "M001"));

        let student = authenticate(&repo, "sam", "spw").unwrap();
        assert_eq!(student.id(), "S1");
    }

    #[test]
    fn test_wrong_password_fails() {
        let (_dir, repo) = repo_with_accounts();
        let err = authenticate(&repo, "lee", "PW").unwrap_err();
        assert!(matches!(err, Error::AuthenticationFailed { .. }));
        assert_eq!(err.exit_code(), 5);
    }
}
