//! Input records read from CSV
//!
//! The file needs a header row naming `id`, `content` and `reflection`;
//! other columns are ignored. A missing required column is fatal for the
//! batch, while a bad row only affects itself and is returned as an error
//! in its [`RecordRow`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const REQUIRED_COLUMNS: [&str; 3] = ["id", "content", "reflection"];

/// One card's worth of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Output file stem
    pub id: String,
    /// Headline quote
    pub content: String,
    /// Reflective sub-text rendered below the quote
    pub reflection: String,
}

impl Record {
    pub fn new(id: impl Into<String>, content: impl Into<String>, reflection: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            reflection: reflection.into(),
        }
    }

    /// Reject records with an empty id or blank text fields.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("id", &self.id),
            ("content", &self.content),
            ("reflection", &self.reflection),
        ] {
            if value.trim().is_empty() {
                return Err(Error::MalformedRecord(format!(
                    "record '{}' has an empty {} field",
                    self.id.trim(),
                    name
                )));
            }
        }
        Ok(())
    }
}

/// A data row and the outcome of decoding it.
#[derive(Debug)]
pub struct RecordRow {
    /// 1-based position among the data rows
    pub index: usize,
    pub record: Result<Record>,
}

pub fn read_records(path: &Path) -> Result<Vec<RecordRow>> {
    let file = File::open(path)
        .map_err(|e| Error::InputError(format!("cannot open {}: {}", path.display(), e)))?;
    read_records_from(file)
}

pub fn read_records_from<R: Read>(reader: R) -> Result<Vec<RecordRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| Error::InputError(format!("cannot read header row: {}", e)))?
        .clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(Error::InputError(format!(
            "missing required column(s): {}",
            missing.join(", ")
        )));
    }

    let rows = rdr
        .deserialize::<Record>()
        .enumerate()
        .map(|(i, row)| RecordRow {
            index: i + 1,
            record: row
                .map_err(|e| Error::MalformedRecord(format!("row {}: {}", i + 1, e)))
                .and_then(|record| record.validate().map(|_| record)),
        })
        .collect();
    Ok(rows)
}
