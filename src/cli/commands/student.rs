//! Student command implementations.

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::cli::commands::{open_repository, print_json, show};
use crate::cli::StudentCommands;
use crate::error::{Error, Result};
use crate::model::{Feedback, Grade, Student};
use crate::storage::{keys_match, Record};

#[derive(Serialize)]
struct StudentEntry {
    #[serde(flatten)]
    student: Student,
    /// Stored layout the row was read from.
    layout: &'static str,
}

#[derive(Serialize)]
struct StudentListOutput {
    students: Vec<StudentEntry>,
    count: usize,
}

#[derive(Serialize)]
struct StudentShowOutput {
    student: Student,
    grades: Vec<Grade>,
    feedback: Vec<Feedback>,
}

/// Execute student commands.
///
/// # Errors
///
/// Returns `Error::StudentNotFound` if `show` matches no student, or a
/// storage error.
pub fn execute(command: &StudentCommands, data_dir: Option<&PathBuf>, json: bool) -> Result<()> {
    let repo = open_repository(data_dir)?;

    match command {
        StudentCommands::List { module } => {
            let layouts = Student::generations();
            let students: Vec<StudentEntry> = repo
                .list_students_tagged()?
                .into_iter()
                .filter(|d| {
                    module
                        .as_deref()
                        .is_none_or(|m| keys_match(&d.record.module_id, m))
                })
                .map(|d| StudentEntry {
                    layout: layouts[d.generation].name,
                    student: d.record,
                })
                .collect();

            if json {
                return print_json(&StudentListOutput {
                    count: students.len(),
                    students,
                });
            }
            if students.is_empty() {
                println!("No students found.");
                return Ok(());
            }
            println!("Students ({} found):", students.len());
            println!();
            for entry in &students {
                let s = &entry.student;
                println!(
                    "{} {} {} module: {} intake: {} {}",
                    s.student_id.bold(),
                    s.profile.username,
                    s.profile.name,
                    show(Some(&s.module_id).filter(|m| !m.is_empty())),
                    show(Some(&s.intake).filter(|i| !i.is_empty())),
                    entry.layout.dimmed()
                );
            }
            Ok(())
        }

        StudentCommands::Show { key } => {
            let student = repo
                .find_student(key)?
                .ok_or_else(|| Error::StudentNotFound { key: key.clone() })?;
            let grades = repo.grades_for_student(&student.student_id)?;
            let feedback = repo.feedback_for_student(&student.student_id)?;

            if json {
                return print_json(&StudentShowOutput {
                    student,
                    grades,
                    feedback,
                });
            }

            let p = &student.profile;
            println!("{} {}", student.student_id.bold(), p.name);
            if !p.username.is_empty() {
                println!("  username: {}", p.username);
            }
            if !p.email.is_empty() {
                println!("  email:    {}", p.email);
            }
            println!(
                "  intake:   {}",
                show(Some(&student.intake).filter(|i| !i.is_empty()))
            );
            println!(
                "  module:   {}",
                show(Some(&student.module_id).filter(|m| !m.is_empty()))
            );

            println!();
            println!("{}", "Grades".bold());
            if grades.is_empty() {
                println!("  none");
            }
            for g in &grades {
                println!(
                    "  {} marks: {} grade: {}",
                    g.assessment_id.cyan(),
                    show(g.marks),
                    if g.grade.is_empty() { "-" } else { g.grade.as_str() }
                );
            }

            println!();
            println!("{}", "Feedback".bold());
            if feedback.is_empty() {
                println!("  none");
            }
            for f in &feedback {
                println!("  {} {}", f.assessment_id.cyan(), f.text);
            }
            Ok(())
        }
    }
}
