//! Command implementations.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::open_store_config;
use crate::error::Result;
use crate::storage::Repository;

pub mod assessment;
pub mod band;
pub mod completions;
pub mod feedback;
pub mod grade;
pub mod init;
pub mod leader;
pub mod login;
pub mod module;
pub mod student;
pub mod version;

/// Open the repository for the resolved data directory.
///
/// # Errors
///
/// Returns `Error::NotInitialized` if the data directory does not exist.
pub fn open_repository(data_dir: Option<&PathBuf>) -> Result<Repository> {
    let config = open_store_config(data_dir.map(PathBuf::as_path))?;
    Ok(Repository::new(config))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Optional value for plain output, `-` when unset.
pub(crate) fn show<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
