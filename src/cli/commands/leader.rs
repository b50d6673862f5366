//! Leader allow-list commands.

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::cli::commands::{open_repository, print_json};
use crate::cli::LeaderCommands;
use crate::config::resolve_actor;
use crate::error::{Error, Result};
use crate::model::LEADER_LECTURER_LIMIT;

#[derive(Serialize)]
struct AllowListOutput {
    leader_id: String,
    lecturers: Vec<String>,
    limit: usize,
}

#[derive(Serialize)]
struct ChangeOutput<'a> {
    leader_id: &'a str,
    lecturer_id: &'a str,
    changed: bool,
}

/// Execute leader commands. All of them act on `--actor`'s list.
///
/// # Errors
///
/// Returns `Error::UserNotFound` when allowing an unknown user id,
/// `Error::LeaderLecturerLimit` when the list is full, or a storage error.
pub fn execute(
    command: &LeaderCommands,
    data_dir: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let repo = open_repository(data_dir)?;
    let leader_id = resolve_actor(actor)?;

    match command {
        LeaderCommands::List => {
            let lecturers = repo.lecturers_for_leader(&leader_id)?;
            if json {
                return print_json(&AllowListOutput {
                    leader_id,
                    lecturers,
                    limit: LEADER_LECTURER_LIMIT,
                });
            }
            if lecturers.is_empty() {
                println!("No lecturers allowed for {leader_id}.");
                return Ok(());
            }
            println!(
                "Lecturers for {} ({}/{}):",
                leader_id.bold(),
                lecturers.len(),
                LEADER_LECTURER_LIMIT
            );
            for id in &lecturers {
                let name = repo
                    .find_user(id)?
                    .map(|u| u.profile.name)
                    .unwrap_or_default();
                println!("  {id} {}", name.dimmed());
            }
            Ok(())
        }

        LeaderCommands::Allow { lecturer } => {
            if repo.find_user(lecturer)?.is_none() {
                return Err(Error::UserNotFound {
                    id: lecturer.clone(),
                });
            }
            let changed = repo.allow_lecturer(&leader_id, lecturer)?;
            report(&leader_id, lecturer, changed, "Allowed", "already allowed", json)
        }

        LeaderCommands::Disallow { lecturer } => {
            let changed = repo.disallow_lecturer(&leader_id, lecturer)?;
            report(&leader_id, lecturer, changed, "Removed", "was not allowed", json)
        }
    }
}

fn report(
    leader_id: &str,
    lecturer_id: &str,
    changed: bool,
    verb: &str,
    unchanged: &str,
    json: bool,
) -> Result<()> {
    if json {
        return print_json(&ChangeOutput {
            leader_id,
            lecturer_id,
            changed,
        });
    }
    if changed {
        println!("{} {lecturer_id} for {leader_id}", verb.green());
    } else {
        println!("{lecturer_id} {unchanged}");
    }
    Ok(())
}
