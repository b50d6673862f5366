//! Version command: crate version plus the table layouts this build reads.

use crate::error::Result;
use crate::storage::layouts;
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct VersionOutput {
    version: &'static str,
    build: &'static str,
    tables: Vec<TableLayouts>,
}

#[derive(Serialize)]
struct TableLayouts {
    table: String,
    /// Canonical layout first; the rest are read-only legacy layouts.
    layouts: Vec<&'static str>,
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let build = if cfg!(debug_assertions) {
        "dev"
    } else {
        "release"
    };

    if json {
        let output = VersionOutput {
            version,
            build,
            tables: layouts()
                .into_iter()
                .map(|(table, layouts)| TableLayouts {
                    table: table.to_string(),
                    layouts,
                })
                .collect(),
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("gradebook version {version} ({build})");
    for (table, names) in layouts() {
        let table = table.to_string();
        let (canonical, legacy) = names.split_first().map_or(("", &[][..]), |(c, l)| (*c, l));
        if legacy.is_empty() {
            println!("  {table:<17} {canonical}");
        } else {
            println!(
                "  {table:<17} {canonical} {}",
                format!("(reads {})", legacy.join(", ")).dimmed()
            );
        }
    }
    Ok(())
}
