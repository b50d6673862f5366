//! CLI definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Gradebook - flat-file academic records
#[derive(Parser, Debug)]
#[command(name = "gradebook", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory (default: ~/.gradebook/data, or $GRADEBOOK_DATA)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Acting user id for ownership checks
    #[arg(long, global = true, env = "GRADEBOOK_ACTOR")]
    pub actor: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output only the created id (for scripting)
    #[arg(long, global = true)]
    pub silent: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory and empty tables
    Init {
        /// Create missing files in an existing data directory
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Look up the account for a username and password
    Login {
        username: String,

        /// Password (prefer GRADEBOOK_PASSWORD over the command line)
        #[arg(long, env = "GRADEBOOK_PASSWORD", hide_env_values = true)]
        password: String,

        /// Require the account to have this role
        #[arg(long)]
        role: Option<String>,
    },

    /// Modules and lecturer assignment
    Module {
        #[command(subcommand)]
        command: ModuleCommands,
    },

    /// A leader's assignable lecturers
    Leader {
        #[command(subcommand)]
        command: LeaderCommands,
    },

    /// Assessments of a module
    Assessment {
        #[command(subcommand)]
        command: AssessmentCommands,
    },

    /// Student marks
    Grade {
        #[command(subcommand)]
        command: GradeCommands,
    },

    /// Written feedback
    Feedback {
        #[command(subcommand)]
        command: FeedbackCommands,
    },

    /// Grade bands
    Band {
        #[command(subcommand)]
        command: BandCommands,
    },

    /// Students
    Student {
        #[command(subcommand)]
        command: StudentCommands,
    },
}

// ============================================================================
// Module Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ModuleCommands {
    /// List modules
    List {
        /// Only modules owned by this leader id
        #[arg(long)]
        leader: Option<String>,

        /// Only modules owned by the acting leader
        #[arg(long, conflicts_with = "leader")]
        mine: bool,
    },

    /// Create a module owned by the acting leader
    Create {
        /// Module name
        name: String,

        /// Module code (unique)
        code: String,

        /// Credit hours
        #[arg(long)]
        credits: Option<u32>,
    },

    /// Edit module details
    Update {
        /// Module id
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        code: Option<String>,

        #[arg(long)]
        credits: Option<u32>,
    },

    /// Delete a module
    Delete {
        /// Module id
        id: String,
    },

    /// Assign a lecturer to a module
    Assign {
        /// Module id
        id: String,

        /// Lecturer user id
        lecturer: String,
    },

    /// Remove a module's lecturer
    Unassign {
        /// Module id
        id: String,
    },

    /// Rebuild every lecturer's assignment from the module table
    Reconcile,
}

// ============================================================================
// Leader Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum LeaderCommands {
    /// List the acting leader's lecturers
    List,

    /// Allow the acting leader to assign a lecturer
    Allow {
        /// Lecturer user id
        lecturer: String,
    },

    /// Remove a lecturer from the acting leader's list
    Disallow {
        /// Lecturer user id
        lecturer: String,
    },
}

// ============================================================================
// Assessment Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum AssessmentCommands {
    /// List assessments
    List {
        /// Only assessments of this module
        #[arg(long)]
        module: Option<String>,
    },

    /// Add an assessment to a module
    Add {
        /// Module id
        module: String,

        /// Title
        title: String,

        /// Type (exam, assignment, quiz, project, presentation)
        #[arg(short = 't', long = "type", default_value = "assignment")]
        kind: String,

        #[arg(long)]
        max_marks: Option<f64>,

        /// Weight in percent
        #[arg(long)]
        weight: Option<f64>,

        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// Explicit assessment id
        #[arg(long)]
        id: Option<String>,
    },

    /// Edit an assessment
    Update {
        /// Assessment id
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short = 't', long = "type")]
        kind: Option<String>,

        #[arg(long)]
        max_marks: Option<f64>,

        #[arg(long)]
        weight: Option<f64>,

        #[arg(long)]
        date: Option<String>,
    },

    /// Delete an assessment
    Delete {
        /// Assessment id
        id: String,
    },
}

// ============================================================================
// Grade / Feedback Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum GradeCommands {
    /// List grades
    List {
        #[arg(long)]
        student: Option<String>,

        #[arg(long)]
        assessment: Option<String>,
    },

    /// Record or update a student's mark
    Record {
        /// Assessment id
        assessment: String,

        /// Student id
        student: String,

        /// Marks awarded (omit to keep the stored marks)
        #[arg(long)]
        marks: Option<f64>,

        /// Letter grade (default: resolved from the band table)
        #[arg(long)]
        grade: Option<String>,

        /// Lecturer id (default: --actor)
        #[arg(long)]
        lecturer: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum FeedbackCommands {
    /// List feedback
    List {
        #[arg(long)]
        student: Option<String>,
    },

    /// Give or update feedback
    Give {
        /// Assessment id
        assessment: String,

        /// Student id
        student: String,

        /// Feedback text (omit to keep the stored text)
        text: Option<String>,

        /// Lecturer id (default: --actor)
        #[arg(long)]
        lecturer: Option<String>,
    },
}

// ============================================================================
// Band / Student Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum BandCommands {
    /// List the band table
    List,

    /// Resolve marks to a letter
    Resolve {
        /// Marks awarded
        marks: f64,

        /// Total marks
        #[arg(long, required_unless_present = "assessment")]
        total: Option<f64>,

        /// Use this assessment's max marks as the total
        #[arg(long, conflicts_with = "total")]
        assessment: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum StudentCommands {
    /// List students
    List {
        /// Only students whose module is this id
        #[arg(long)]
        module: Option<String>,
    },

    /// Show one student with grades and feedback
    Show {
        /// Username or student id
        key: String,
    },
}
