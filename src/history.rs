//! Publish history: append-only JSONL storage.
//!
//! One JSON record per line, `{date, identifier, title, year, synopsis}`.
//! The file is read fully at startup to seed the recency window and is
//! never rewritten in place.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::Movie;
use crate::error::BotError;

/// A published work plus its publish timestamp. Appended exactly once per
/// successful publish, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: DateTime<Utc>,
    pub identifier: String,
    pub title: String,
    pub year: i32,
    pub synopsis: String,
}

impl HistoryEntry {
    pub fn new(movie: &Movie, date: DateTime<Utc>) -> Self {
        Self {
            date,
            identifier: movie.identifier.clone(),
            title: movie.title.clone(),
            year: movie.year,
            synopsis: movie.synopsis.clone(),
        }
    }
}

/// File-backed append-only history store.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry as a JSON line.
    pub fn append(&self, entry: &HistoryEntry) -> Result<(), BotError> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Loads the identifiers of the most recent `n` entries, oldest first.
    /// Returns an empty list when the file does not exist yet. Lines that
    /// fail to parse are skipped with a warning.
    pub fn load_recent(&self, n: usize) -> Result<Vec<String>, BotError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&self.path)?;
        let reader = io::BufReader::new(file);
        let mut ids = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(&line) {
                Ok(entry) => ids.push(entry.identifier),
                Err(e) => {
                    tracing::warn!(line = lineno + 1, error = %e, "skipping malformed history line");
                }
            }
        }

        let skip = ids.len().saturating_sub(n);
        Ok(ids.split_off(skip))
    }
}
