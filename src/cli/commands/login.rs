//! Login command: locate the account for a username and password.

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::auth::authenticate;
use crate::cli::commands::{open_repository, print_json};
use crate::error::{Error, Result};
use crate::model::Principal;
use crate::validate::normalize_role;

#[derive(Serialize)]
struct LoginOutput<'a> {
    id: &'a str,
    username: &'a str,
    name: &'a str,
    role: String,
    /// Which table the account came from.
    source: &'static str,
}

const fn source(principal: &Principal) -> &'static str {
    match principal {
        Principal::User(_) => "users",
        Principal::Lecturer(_) => "lecturers",
        Principal::Student(_) => "students",
    }
}

/// Execute the login command.
///
/// # Errors
///
/// Returns `Error::AuthenticationFailed` if no account matches, or the
/// account does not have the requested role.
pub fn execute(
    data_dir: Option<&PathBuf>,
    username: &str,
    password: &str,
    role: Option<&str>,
    json: bool,
) -> Result<()> {
    let expected = role.map(normalize_role).transpose()?;
    let repo = open_repository(data_dir)?;
    let principal = authenticate(&repo, username, password)?;

    if expected.is_some_and(|r| r != principal.role()) {
        return Err(Error::AuthenticationFailed {
            username: username.to_string(),
        });
    }
    let profile = principal.profile();

    if crate::is_silent() {
        println!("{}", principal.id());
        return Ok(());
    }

    if json {
        return print_json(&LoginOutput {
            id: principal.id(),
            username: &profile.username,
            name: &profile.name,
            role: principal.role().to_string(),
            source: source(&principal),
        });
    }

    println!(
        "{} {} ({})",
        "Authenticated".green(),
        profile.username.bold(),
        principal.role()
    );
    println!("  id: {}  name: {}", principal.id(), profile.name);
    if principal.is_leader() {
        println!("  Use --actor {} for module commands", principal.id());
    }
    Ok(())
}
