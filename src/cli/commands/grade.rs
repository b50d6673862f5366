//! Grade command implementations.

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::cli::commands::{open_repository, print_json, show};
use crate::cli::GradeCommands;
use crate::error::{Error, Result};
use crate::grading::letter_for;
use crate::model::Grade;
use crate::storage::{keys_match, UpsertOutcome};
use crate::validate::contains_delimiter;

#[derive(Serialize)]
struct GradeListOutput {
    grades: Vec<Grade>,
    count: usize,
}

#[derive(Serialize)]
struct RecordOutput {
    grade: Grade,
    outcome: UpsertOutcome,
}

/// Execute grade commands.
///
/// # Errors
///
/// Returns `Error::AssessmentNotFound` when recording against an unknown
/// assessment, or a storage error.
pub fn execute(
    command: &GradeCommands,
    data_dir: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let repo = open_repository(data_dir)?;

    match command {
        GradeCommands::List {
            student,
            assessment,
        } => {
            let grades: Vec<Grade> = repo
                .list_grades()?
                .into_iter()
                .filter(|g| student.as_deref().is_none_or(|s| keys_match(&g.student_id, s)))
                .filter(|g| {
                    assessment
                        .as_deref()
                        .is_none_or(|a| keys_match(&g.assessment_id, a))
                })
                .collect();

            if json {
                return print_json(&GradeListOutput {
                    count: grades.len(),
                    grades,
                });
            }
            if grades.is_empty() {
                println!("No grades found.");
                return Ok(());
            }
            println!("Grades ({} found):", grades.len());
            println!();
            for g in &grades {
                println!(
                    "{} {} {} marks: {} grade: {} by {} on {}",
                    g.grade_id.dimmed(),
                    g.assessment_id.cyan(),
                    g.student_id.bold(),
                    show(g.marks),
                    if g.grade.is_empty() { "-" } else { g.grade.as_str() },
                    show(Some(&g.lecturer_id).filter(|l| !l.is_empty())),
                    g.date_entered
                );
            }
            Ok(())
        }

        GradeCommands::Record {
            assessment,
            student,
            marks,
            grade,
            lecturer,
        } => {
            if repo.find_assessment(assessment)?.is_none() {
                return Err(Error::AssessmentNotFound {
                    id: assessment.clone(),
                });
            }

            let letter = match (grade, marks) {
                (Some(grade), _) => grade.clone(),
                (None, Some(marks)) => letter_for(&repo, assessment, *marks)?,
                (None, None) => String::new(),
            };
            let incoming = Grade {
                assessment_id: assessment.clone(),
                student_id: student.clone(),
                marks: *marks,
                grade: letter,
                lecturer_id: lecturer
                    .as_deref()
                    .or(actor)
                    .unwrap_or_default()
                    .to_string(),
                ..Grade::default()
            };
            let delimiter = repo.config().delimiter;
            contains_delimiter("student_id", &incoming.student_id, delimiter);
            contains_delimiter("grade", &incoming.grade, delimiter);

            let (grade, outcome) = repo.save_or_update_grade(incoming)?;

            if crate::is_silent() {
                println!("{}", grade.grade_id);
                return Ok(());
            }
            if json {
                return print_json(&RecordOutput { grade, outcome });
            }

            let verb = match outcome {
                UpsertOutcome::Inserted => "Recorded".green(),
                UpsertOutcome::Updated { .. } => "Updated".yellow(),
            };
            println!(
                "{verb} {} for {} on {}: marks {} grade {}",
                grade.grade_id.dimmed(),
                grade.student_id.bold(),
                grade.assessment_id.cyan(),
                show(grade.marks),
                if grade.grade.is_empty() { "-" } else { grade.grade.as_str() }
            );
            if let UpsertOutcome::Updated { collapsed } = outcome {
                if collapsed > 0 {
                    println!("  removed {collapsed} duplicate row(s)");
                }
            }
            Ok(())
        }
    }
}
