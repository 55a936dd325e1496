//! Append-only embedding table.
//!
//! Every completion leaves one row behind: the prompt, completion and
//! concatenation vectors plus the concatenated text. Rows are only ever
//! appended; nothing in this crate reads them back.


use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::embeddings::EmbeddingVector;

/// Header of the table, in column order
pub const COLUMNS: [&str; 4] = [
    "prompt_embedding",
    "text_embedding",
    "concat_text_embedding",
    "concat_text",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingRecord {
    pub prompt_embedding: EmbeddingVector,
    pub text_embedding: EmbeddingVector,
    pub concat_text_embedding: EmbeddingVector,
    pub concat_text: String,
}

impl EmbeddingRecord {
    /// Render the record as a single CSV line, without the line terminator
    #[inline]
    pub fn to_csv_line(&self) -> Result<String> {
        let fields = [
            serde_json::to_string(&self.prompt_embedding)
                .context("Failed to encode prompt embedding")?,
            serde_json::to_string(&self.text_embedding)
                .context("Failed to encode text embedding")?,
            serde_json::to_string(&self.concat_text_embedding)
                .context("Failed to encode concatenated embedding")?,
            escape_line_breaks(&self.concat_text),
        ];

        Ok(fields
            .iter()
            .map(|field| quote_field(field))
            .collect::<Vec<_>>()
            .join(","))
    }
}

/// Destination for embedding records
pub trait EmbeddingStore: Send + Sync {
    fn append(&self, record: &EmbeddingRecord) -> Result<()>;
}

impl<T: EmbeddingStore + ?Sized> EmbeddingStore for Arc<T> {
    #[inline]
    fn append(&self, record: &EmbeddingRecord) -> Result<()> {
        (**self).append(record)
    }
}

/// CSV file opened in append mode for every write
#[derive(Debug)]
pub struct CsvEmbeddingStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvEmbeddingStore {
    #[inline]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records currently in the table
    #[inline]
    pub fn len(&self) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let lines = BufReader::new(file)
            .lines()
            .collect::<std::io::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        Ok(lines.len().saturating_sub(1))
    }

    #[inline]
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl EmbeddingStore for CsvEmbeddingStore {
    fn append(&self, record: &EmbeddingRecord) -> Result<()> {
        let line = record.to_csv_line()?;

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("Embedding store lock poisoned"))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        let is_new = file
            .metadata()
            .with_context(|| format!("Failed to stat {}", self.path.display()))?
            .len()
            == 0;

        let mut buffer = String::new();
        if is_new {
            buffer.push_str(&COLUMNS.join(","));
            buffer.push('\n');
        }
        buffer.push_str(&line);
        buffer.push('\n');

        file.write_all(buffer.as_bytes())
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        file.flush()
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;

        debug!("Appended embedding record to {}", self.path.display());
        Ok(())
    }
}

fn quote_field(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

// One record per physical line: backslashes and line breaks are escaped.
fn escape_line_breaks(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}
