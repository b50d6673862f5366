//! Whole-file line primitives.
//!
//! The line store knows nothing about entity shape. Every mutating call reads
//! the whole file, transforms it in memory and rewrites it; there is no lock
//! here (see [`Repository`](super::Repository) for writer serialisation).
//!
//! Two rewrite modes exist:
//! - `write_all`: truncate and write in place. A reader racing this call can
//!   observe a partially written file.
//! - `write_all_atomic`: write to a sibling temp file, fsync, then rename.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::storage::keys_match;

/// Line-oriented file access with a fixed field delimiter.
#[derive(Debug, Clone, Copy)]
pub struct LineStore {
    delimiter: char,
    atomic: bool,
}

impl LineStore {
    /// Create a line store. `atomic` selects the rewrite mode used by
    /// [`rewrite`](Self::rewrite), `update_by_id` and `delete_by_id`.
    #[must_use]
    pub const fn new(delimiter: char, atomic: bool) -> Self {
        Self { delimiter, atomic }
    }

    #[must_use]
    pub const fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Read every line of `path` in order.
    ///
    /// A missing file is an empty table, not an error. Trailing `\r` is
    /// stripped so files edited on Windows decode the same. A line that is
    /// not valid UTF-8 is skipped and the rest of the file still loads.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn read_all(&self, path: &Path) -> Result<Vec<String>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let bytes = fs::read(path)?;
        let mut raw: Vec<&[u8]> = bytes.split(|&b| b == b'\n').collect();
        if raw.last().is_some_and(|last| last.is_empty()) {
            raw.pop();
        }

        let mut lines = Vec::with_capacity(raw.len());
        let mut skipped = 0;
        for (index, line) in raw.into_iter().enumerate() {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            match std::str::from_utf8(line) {
                Ok(text) => lines.push(text.to_string()),
                Err(e) => {
                    skipped += 1;
                    debug!(
                        path = %path.display(),
                        line = index + 1,
                        error = %e,
                        "Skipping non-UTF-8 line"
                    );
                }
            }
        }

        if skipped > 0 {
            debug!(path = %path.display(), skipped, "Skipped unreadable lines");
        }
        Ok(lines)
    }

    /// Append one line, creating the file and its parent directory if needed.
    ///
    /// If the file does not end in a newline one is written first, so the
    /// new record never joins the last stored line.
    ///
    /// # Errors
    ///
    /// Returns `Error::Write` if the file cannot be opened or written.
    pub fn append(&self, path: &Path, line: &str) -> Result<()> {
        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut file = OpenOptions::new()
                .create(true)
                .read(true)
                .append(true)
                .open(path)?;
            if ends_without_newline(&mut file)? {
                writeln!(file)?;
            }
            writeln!(file, "{line}")?;
            file.sync_all()
        };

        write().map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Appended line");
        Ok(())
    }

    /// Truncate `path` and write `lines` in order.
    ///
    /// Not atomic: a crash or a concurrent reader can see a partial file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Write` if any file operation fails.
    pub fn write_all(&self, path: &Path, lines: &[String]) -> Result<()> {
        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut writer = BufWriter::new(File::create(path)?);
            for line in lines {
                writeln!(writer, "{line}")?;
            }
            writer.flush()
        };

        write().map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Rewrite `path` atomically.
    ///
    /// Writes a sibling `<name>.tmp`, syncs it, then renames it over the
    /// target. If any step fails the original file is untouched.
    ///
    /// # Errors
    ///
    /// Returns `Error::Write` if any file operation fails.
    pub fn write_all_atomic(&self, path: &Path, lines: &[String]) -> Result<()> {
        let temp_path = temp_path(path);

        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }

            {
                let mut writer = BufWriter::new(File::create(&temp_path)?);
                for line in lines {
                    writeln!(writer, "{line}")?;
                }
                writer.flush()?;
                writer.get_ref().sync_all()?;
            }

            fs::rename(&temp_path, path)
        };

        write().map_err(|source| {
            let _ = fs::remove_file(&temp_path);
            Error::Write {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Rewrite using the configured mode.
    ///
    /// # Errors
    ///
    /// Returns `Error::Write` if the rewrite fails.
    pub fn rewrite(&self, path: &Path, lines: &[String]) -> Result<()> {
        if self.atomic {
            self.write_all_atomic(path, lines)
        } else {
            self.write_all(path, lines)
        }
    }

    /// Replace the first line whose leading field equals `key`
    /// (case-insensitive) with `new_line`.
    ///
    /// Returns `false` and leaves the file untouched when nothing matches;
    /// this never inserts.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or rewritten.
    pub fn update_by_id(&self, path: &Path, key: &str, new_line: &str) -> Result<bool> {
        let mut lines = self.read_all(path)?;

        let Some(pos) = lines
            .iter()
            .position(|line| keys_match(self.leading_field(line), key))
        else {
            debug!(path = %path.display(), key, "update_by_id: no matching row");
            return Ok(false);
        };

        lines[pos] = new_line.to_string();
        self.rewrite(path, &lines)?;
        Ok(true)
    }

    /// Remove every line whose leading field equals `key` (case-insensitive),
    /// keeping the remaining lines in order. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or rewritten.
    pub fn delete_by_id(&self, path: &Path, key: &str) -> Result<usize> {
        let lines = self.read_all(path)?;
        let before = lines.len();

        let kept: Vec<String> = lines
            .into_iter()
            .filter(|line| !keys_match(self.leading_field(line), key))
            .collect();

        let removed = before - kept.len();
        if removed > 0 {
            self.rewrite(path, &kept)?;
        }
        Ok(removed)
    }

    /// First field of a raw line.
    #[must_use]
    pub fn leading_field<'a>(&self, line: &'a str) -> &'a str {
        line.split(self.delimiter).next().unwrap_or("")
    }
}

fn ends_without_newline(file: &mut File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("table"));
    name.push(".tmp");
    path.with_file_name(name)
}
