//! JSONL (JSON Lines) storage.
//!
//! Each line is a valid JSON object representing one entity. Lines that do
//! not parse are logged and skipped so one bad row never hides the rest.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::StorageError;
use crate::models::{MatchRecord, TournamentId};

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Write entities, replacing the entire file.
    pub fn write_all<'a, I>(&self, entities: I) -> Result<usize, StorageError>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        self.ensure_dir()?;

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        let mut count = 0;

        for entity in entities {
            let json = serde_json::to_string(entity)?;
            writeln!(writer, "{}", json)?;
            count += 1;
        }

        writer.flush()?;
        info!("Wrote {} entities to {:?}", count, self.path);

        Ok(count)
    }
}

/// Entities read from a file plus the line numbers that failed to parse.
#[derive(Debug)]
pub struct ReadOutcome<T> {
    pub entities: Vec<T>,
    pub bad_lines: Vec<usize>,
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read every parseable line, remembering the ones that were not.
    pub fn read_lenient(&self) -> Result<ReadOutcome<T>, StorageError> {
        if !self.exists() {
            return Err(StorageError::PathNotFound(self.path.clone()));
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut entities = Vec::new();
        let mut bad_lines = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line_num = idx + 1;
            let line = line?;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str(&line) {
                Ok(entity) => entities.push(entity),
                Err(e) => {
                    warn!(
                        "Failed to parse line {} in {:?}: {}",
                        line_num, self.path, e
                    );
                    bad_lines.push(line_num);
                }
            }
        }

        debug!("Read {} entities from {:?}", entities.len(), self.path);
        Ok(ReadOutcome {
            entities,
            bad_lines,
        })
    }

    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        Ok(self.read_lenient()?.entities)
    }

    /// Read entities matching a predicate.
    pub fn read_where<F>(&self, predicate: F) -> Result<Vec<T>, StorageError>
    where
        F: Fn(&T) -> bool,
    {
        let all = self.read_all()?;
        Ok(all.into_iter().filter(predicate).collect())
    }
}

/// Match records exported to a JSONL file.
pub struct MatchStore {
    reader: JsonlReader<MatchRecord>,
}

impl MatchStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            reader: JsonlReader::new(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        self.reader.path()
    }

    /// Every record in the export.
    pub fn load_all(&self) -> Result<ReadOutcome<MatchRecord>, StorageError> {
        self.reader.read_lenient()
    }

    /// Records of a single tournament.
    pub fn load_grouping(&self, grouping: &TournamentId) -> Result<Vec<MatchRecord>, StorageError> {
        self.reader
            .read_where(|m| m.grouping_key.as_ref() == Some(grouping))
    }
}
