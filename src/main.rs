//! Gradebook CLI entry point.

use clap::Parser;
use gradebook::cli::commands;
use gradebook::cli::{Cli, Commands};
use gradebook::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.silent {
        gradebook::SILENT.store(true, std::sync::atomic::Ordering::Relaxed);
    }
    if cli.no_color {
        colored::control::set_override(false);
    }

    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let data_dir = cli.data_dir.as_ref();
    let actor = cli.actor.as_deref();

    match &cli.command {
        Commands::Init { force } => commands::init::execute(data_dir, *force, json),
        Commands::Version => commands::version::execute(json),
        Commands::Completions { shell } => commands::completions::execute(*shell),

        Commands::Login {
            username,
            password,
            role,
        } => commands::login::execute(data_dir, username, password, role.as_deref(), json),

        // Modules and assignment
        Commands::Module { command } => commands::module::execute(command, data_dir, actor, json),
        Commands::Leader { command } => commands::leader::execute(command, data_dir, actor, json),

        // Assessments and results
        Commands::Assessment { command } => {
            commands::assessment::execute(command, data_dir, json)
        }
        Commands::Grade { command } => commands::grade::execute(command, data_dir, actor, json),
        Commands::Feedback { command } => {
            commands::feedback::execute(command, data_dir, actor, json)
        }

        Commands::Band { command } => commands::band::execute(command, data_dir, json),
        Commands::Student { command } => commands::student::execute(command, data_dir, json),
    }
}
