//! Module command implementations.

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::cli::commands::{open_repository, print_json, show};
use crate::cli::ModuleCommands;
use crate::config::resolve_actor;
use crate::error::{Error, Result};
use crate::model::Module;
use crate::storage::{keys_match, Repository};
use crate::sync::{LecturerUpdate, ModuleChanges, ModuleService, NewModule, SyncReport};
use crate::validate::{contains_delimiter, find_similar_ids};

#[derive(Serialize)]
struct ModuleListOutput {
    modules: Vec<Module>,
    count: usize,
}

/// Execute module commands.
///
/// # Errors
///
/// Returns the service's rejection, or `NotInitialized` / I/O errors.
pub fn execute(
    command: &ModuleCommands,
    data_dir: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let repo = open_repository(data_dir)?;
    let result = run(&repo, command, actor, json);

    if let Err(Error::ModuleNotFound { id }) = &result {
        if !json {
            suggest_similar(&repo, id);
        }
    }
    result
}

fn run(repo: &Repository, command: &ModuleCommands, actor: Option<&str>, json: bool) -> Result<()> {
    let service = ModuleService::new(repo);
    let delimiter = repo.config().delimiter;

    match command {
        ModuleCommands::List { leader, mine } => {
            let owner = if *mine {
                Some(resolve_actor(actor)?)
            } else {
                leader.clone()
            };
            list(repo, owner.as_deref(), json)
        }

        ModuleCommands::Create {
            name,
            code,
            credits,
        } => {
            let leader = resolve_actor(actor)?;
            contains_delimiter("name", name, delimiter);
            contains_delimiter("code", code, delimiter);
            let module = service.create(
                &leader,
                NewModule {
                    name: name.clone(),
                    code: code.clone(),
                    credit_hours: *credits,
                },
            )?;
            print_module("Created", &module, json)
        }

        ModuleCommands::Update {
            id,
            name,
            code,
            credits,
        } => {
            let leader = resolve_actor(actor)?;
            let changes = ModuleChanges {
                name: name.clone(),
                code: code.clone(),
                credit_hours: *credits,
            };
            if changes.is_empty() {
                return Err(Error::InvalidArgument(
                    "nothing to update: pass --name, --code or --credits".to_string(),
                ));
            }
            let module = service.update(&leader, id, changes)?;
            print_module("Updated", &module, json)
        }

        ModuleCommands::Delete { id } => {
            let leader = resolve_actor(actor)?;
            let removal = service.delete(&leader, id)?;
            if json {
                return print_json(&removal);
            }
            println!("{} module {}", "Deleted".red(), removal.module_id.bold());
            print_lecturer_update("lecturer", &removal.lecturer);
            Ok(())
        }

        ModuleCommands::Assign { id, lecturer } => {
            let leader = resolve_actor(actor)?;
            let report = service.assign(&leader, id, lecturer)?;
            print_report(&format!("Assigned {lecturer} to"), &report, json)
        }

        ModuleCommands::Unassign { id } => {
            let leader = resolve_actor(actor)?;
            let report = service.unassign(&leader, id)?;
            print_report("Cleared lecturer of", &report, json)
        }

        ModuleCommands::Reconcile => {
            let report = service.reconcile()?;
            if json {
                return print_json(&report);
            }
            println!(
                "Checked {} lecturer rows, repaired {}",
                report.checked,
                report.repaired.len()
            );
            for username in &report.repaired {
                println!("  {} {username}", "fixed".green());
            }
            for id in &report.unresolved {
                println!("  {} module lecturer {id} has no user row", "unresolved".yellow());
            }
            Ok(())
        }
    }
}

fn list(repo: &Repository, leader: Option<&str>, json: bool) -> Result<()> {
    let modules: Vec<Module> = repo
        .list_modules()?
        .into_iter()
        .filter(|m| leader.is_none_or(|l| keys_match(&m.leader_id, l)))
        .collect();

    if json {
        return print_json(&ModuleListOutput {
            count: modules.len(),
            modules,
        });
    }

    if modules.is_empty() {
        println!("No modules found.");
        return Ok(());
    }

    println!("Modules ({} found):", modules.len());
    println!();
    for m in &modules {
        let lecturer = if m.has_lecturer() {
            m.lecturer_id.normal()
        } else {
            "unassigned".dimmed()
        };
        println!(
            "{} {} {} [{} credits] leader: {} lecturer: {}",
            m.module_id.bold(),
            m.module_code.cyan(),
            m.module_name,
            show(m.credit_hours),
            m.leader_id,
            lecturer
        );
    }
    Ok(())
}

fn print_module(verb: &str, module: &Module, json: bool) -> Result<()> {
    if crate::is_silent() {
        println!("{}", module.module_id);
        return Ok(());
    }
    if json {
        return print_json(module);
    }
    println!(
        "{verb} module {} {} {}",
        module.module_id.bold(),
        module.module_code.cyan(),
        module.module_name
    );
    Ok(())
}

fn print_report(verb: &str, report: &SyncReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }
    println!("{} module {}", verb, report.module_id.bold());
    print_lecturer_update("lecturer", &report.lecturer);
    if let Some(previous) = &report.previous {
        print_lecturer_update("previous lecturer", previous);
    }
    Ok(())
}

fn print_lecturer_update(label: &str, update: &LecturerUpdate) {
    match update {
        LecturerUpdate::Written { username } => {
            println!("  {label}: row {} updated", username.bold());
        }
        LecturerUpdate::NotAssigned => println!("  {label}: none"),
        LecturerUpdate::UnknownUser { lecturer_id } => println!(
            "  {label}: {} no user {lecturer_id}; lecturer row not updated",
            "warning:".yellow()
        ),
        LecturerUpdate::NoLecturerRow { username } => println!(
            "  {label}: {} no lecturer row for {username}",
            "warning:".yellow()
        ),
        LecturerUpdate::Skipped { username } => {
            println!("  {label}: {username} is on another module; row left unchanged");
        }
    }
}

fn suggest_similar(repo: &Repository, id: &str) {
    let Ok(modules) = repo.list_modules() else {
        return;
    };
    let ids: Vec<String> = modules.into_iter().map(|m| m.module_id).collect();
    let similar = find_similar_ids(id, &ids, 3);
    if !similar.is_empty() {
        eprintln!("Did you mean: {}", similar.join(", "));
    }
}
