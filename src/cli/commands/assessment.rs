//! Assessment command implementations.

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::cli::commands::{open_repository, print_json, show};
use crate::cli::AssessmentCommands;
use crate::error::{Error, Result};
use crate::model::Assessment;
use crate::storage::Repository;
use crate::validate::{contains_delimiter, normalize_assessment_type};

#[derive(Serialize)]
struct AssessmentListOutput {
    assessments: Vec<Assessment>,
    count: usize,
}

#[derive(Serialize)]
struct DeleteOutput<'a> {
    assessment_id: &'a str,
    deleted: bool,
}

fn generate_assessment_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("asm_{}", &uuid[..8])
}

fn not_found(id: &str) -> Error {
    Error::AssessmentNotFound { id: id.to_string() }
}

fn warn_delimiters(repo: &Repository, assessment: &Assessment) {
    let delimiter = repo.config().delimiter;
    contains_delimiter("assessment_id", &assessment.assessment_id, delimiter);
    contains_delimiter("title", &assessment.title, delimiter);
    contains_delimiter("date", &assessment.date, delimiter);
}

/// Execute assessment commands.
///
/// # Errors
///
/// Returns `Error::ModuleNotFound`, `Error::AssessmentNotFound`,
/// `Error::InvalidAssessmentType`, or a storage error.
pub fn execute(command: &AssessmentCommands, data_dir: Option<&PathBuf>, json: bool) -> Result<()> {
    let repo = open_repository(data_dir)?;

    match command {
        AssessmentCommands::List { module } => {
            let assessments = match module {
                Some(id) => repo.assessments_for_module(id)?,
                None => repo.list_assessments()?,
            };
            list(&assessments, json)
        }

        AssessmentCommands::Add {
            module,
            title,
            kind,
            max_marks,
            weight,
            date,
            id,
        } => {
            let kind = normalize_assessment_type(kind)?;
            let module = repo
                .find_module(module)?
                .ok_or_else(|| Error::ModuleNotFound { id: module.clone() })?;

            let assessment = Assessment {
                assessment_id: id.clone().unwrap_or_else(generate_assessment_id),
                module_id: module.module_id,
                title: title.clone(),
                kind,
                max_marks: *max_marks,
                weight: *weight,
                date: date.clone().unwrap_or_default(),
            };
            if repo.find_assessment(&assessment.assessment_id)?.is_some() {
                return Err(Error::InvalidArgument(format!(
                    "assessment id already in use: {}",
                    assessment.assessment_id
                )));
            }
            warn_delimiters(&repo, &assessment);
            repo.save_assessment(&assessment)?;
            print_assessment("Added", &assessment, json)
        }

        AssessmentCommands::Update {
            id,
            title,
            kind,
            max_marks,
            weight,
            date,
        } => {
            let mut assessment = repo.find_assessment(id)?.ok_or_else(|| not_found(id))?;
            if let Some(title) = title {
                assessment.title.clone_from(title);
            }
            if let Some(kind) = kind {
                assessment.kind = normalize_assessment_type(kind)?;
            }
            if max_marks.is_some() {
                assessment.max_marks = *max_marks;
            }
            if weight.is_some() {
                assessment.weight = *weight;
            }
            if let Some(date) = date {
                assessment.date.clone_from(date);
            }
            warn_delimiters(&repo, &assessment);

            if !repo.update_assessment(&assessment)? {
                return Err(not_found(id));
            }
            print_assessment("Updated", &assessment, json)
        }

        AssessmentCommands::Delete { id } => {
            if !repo.delete_assessment(id)? {
                return Err(not_found(id));
            }
            if json {
                return print_json(&DeleteOutput {
                    assessment_id: id,
                    deleted: true,
                });
            }
            println!("{} assessment {}", "Deleted".red(), id.bold());
            Ok(())
        }
    }
}

fn list(assessments: &[Assessment], json: bool) -> Result<()> {
    if json {
        return print_json(&AssessmentListOutput {
            assessments: assessments.to_vec(),
            count: assessments.len(),
        });
    }

    if assessments.is_empty() {
        println!("No assessments found.");
        return Ok(());
    }

    println!("Assessments ({} found):", assessments.len());
    println!();
    for a in assessments {
        println!(
            "{} [{}] {} {} max: {} weight: {}% {}",
            a.assessment_id.bold(),
            a.module_id.cyan(),
            a.kind.dimmed(),
            a.title,
            show(a.max_marks),
            show(a.weight),
            a.date
        );
    }
    Ok(())
}

fn print_assessment(verb: &str, assessment: &Assessment, json: bool) -> Result<()> {
    if crate::is_silent() {
        println!("{}", assessment.assessment_id);
        return Ok(());
    }
    if json {
        return print_json(assessment);
    }
    println!(
        "{verb} assessment {} ({}): {}",
        assessment.assessment_id.bold(),
        assessment.module_id.cyan(),
        assessment.title
    );
    Ok(())
}
