//! Feedback command implementations.

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::cli::commands::{open_repository, print_json};
use crate::cli::FeedbackCommands;
use crate::error::{Error, Result};
use crate::model::Feedback;
use crate::storage::UpsertOutcome;
use crate::validate::contains_delimiter;

#[derive(Serialize)]
struct FeedbackListOutput {
    feedback: Vec<Feedback>,
    count: usize,
}

#[derive(Serialize)]
struct GiveOutput {
    feedback: Feedback,
    outcome: UpsertOutcome,
}

/// Execute feedback commands.
///
/// # Errors
///
/// Returns `Error::AssessmentNotFound` for an unknown assessment, or a
/// storage error.
pub fn execute(
    command: &FeedbackCommands,
    data_dir: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let repo = open_repository(data_dir)?;

    match command {
        FeedbackCommands::List { student } => {
            let feedback = match student {
                Some(id) => repo.feedback_for_student(id)?,
                None => repo.list_feedback()?,
            };
            if json {
                return print_json(&FeedbackListOutput {
                    count: feedback.len(),
                    feedback,
                });
            }
            if feedback.is_empty() {
                println!("No feedback found.");
                return Ok(());
            }
            for f in &feedback {
                println!(
                    "{} {} {} ({})",
                    f.assessment_id.cyan(),
                    f.student_id.bold(),
                    f.date.dimmed(),
                    f.lecturer_id
                );
                println!("  {}", f.text);
            }
            Ok(())
        }

        FeedbackCommands::Give {
            assessment,
            student,
            text,
            lecturer,
        } => {
            if repo.find_assessment(assessment)?.is_none() {
                return Err(Error::AssessmentNotFound {
                    id: assessment.clone(),
                });
            }
            let incoming = Feedback {
                assessment_id: assessment.clone(),
                student_id: student.clone(),
                lecturer_id: lecturer
                    .as_deref()
                    .or(actor)
                    .unwrap_or_default()
                    .to_string(),
                text: text.clone().unwrap_or_default(),
                ..Feedback::default()
            };
            contains_delimiter("text", &incoming.text, repo.config().delimiter);

            let (feedback, outcome) = repo.save_or_update_feedback(incoming)?;

            if crate::is_silent() {
                println!("{}", feedback.feedback_id);
                return Ok(());
            }
            if json {
                return print_json(&GiveOutput { feedback, outcome });
            }
            let verb = match outcome {
                UpsertOutcome::Inserted => "Saved",
                UpsertOutcome::Updated { .. } => "Updated",
            };
            println!(
                "{} feedback {} for {} on {}",
                verb.green(),
                feedback.feedback_id.dimmed(),
                feedback.student_id.bold(),
                feedback.assessment_id.cyan()
            );
            Ok(())
        }
    }
}
