//! Band table commands.

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::cli::commands::{open_repository, print_json, show};
use crate::cli::BandCommands;
use crate::error::{Error, Result};
use crate::grading::BandTable;
use crate::model::GradeBand;

#[derive(Serialize)]
struct BandListOutput<'a> {
    source: String,
    bands: &'a [GradeBand],
}

#[derive(Serialize)]
struct ResolveOutput {
    marks: f64,
    total: f64,
    percent: Option<f64>,
    /// Empty when no band covers the percentage.
    grade: String,
}

/// Execute band commands.
///
/// # Errors
///
/// Returns `Error::AssessmentNotFound` when resolving against an unknown
/// assessment, or a storage error.
pub fn execute(command: &BandCommands, data_dir: Option<&PathBuf>, json: bool) -> Result<()> {
    let repo = open_repository(data_dir)?;
    let table = BandTable::load(&repo)?;

    match command {
        BandCommands::List => {
            let source = repo.band_path().display().to_string();
            if json {
                return print_json(&BandListOutput {
                    source,
                    bands: table.bands(),
                });
            }
            if table.is_empty() {
                println!("No grade bands defined in {source}");
                return Ok(());
            }
            println!("Grade bands ({source}):");
            for band in table.bands() {
                println!(
                    "  {:<4} {:>5} - {}",
                    band.label.bold(),
                    band.min_percent,
                    band.max_percent
                );
            }
            Ok(())
        }

        BandCommands::Resolve {
            marks,
            total,
            assessment,
        } => {
            let total = match (total, assessment) {
                (Some(total), _) => *total,
                (None, Some(id)) => repo
                    .find_assessment(id)?
                    .ok_or_else(|| Error::AssessmentNotFound { id: id.clone() })?
                    .max_marks
                    .unwrap_or(0.0),
                (None, None) => {
                    return Err(Error::InvalidArgument(
                        "pass --total or --assessment".to_string(),
                    ));
                }
            };

            let output = ResolveOutput {
                marks: *marks,
                total,
                percent: BandTable::percent(*marks, total),
                grade: table.label_for(*marks, total),
            };
            if crate::is_silent() {
                println!("{}", output.grade);
                return Ok(());
            }
            if json {
                return print_json(&output);
            }
            let grade = if output.grade.is_empty() {
                "no grade".dimmed()
            } else {
                output.grade.as_str().green().bold()
            };
            println!(
                "{}/{} ({}%) -> {grade}",
                output.marks,
                output.total,
                show(output.percent.map(|p| format!("{p:.1}")))
            );
            Ok(())
        }
    }
}
