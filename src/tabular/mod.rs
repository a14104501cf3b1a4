//! Delimited dataset loading.
//!
//! The first record of a file holds the field names; every following record
//! becomes one [`Row`]. Values stay raw strings here, numeric coercion happens
//! at the point of use through [`Row::number`].
//!
//! Loading is lenient: a record shorter than the header only carries the
//! fields it has, extra trailing fields are ignored, and invalid UTF-8 is
//! replaced rather than rejected.

use csv::{ByteRecord, ReaderBuilder, Trim};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Errors raised while loading a dataset.
#[derive(Debug, thiserror::Error)]
pub enum TabularError {
    /// The dataset file is missing or unreadable.
    #[error("failed to read dataset {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The reader could not make sense of the dataset.
    #[error("dataset {} is malformed at line {line}: {reason}", .path.display())]
    Malformed {
        path: PathBuf,
        line: u64,
        reason: String,
    },
}

/// One record of a dataset, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: HashMap<String, String>,
}

impl Row {
    /// Raw value of a field.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Numeric value of a field, `0.0` when missing or not a finite number.
    pub fn number(&self, field: &str) -> f64 {
        self.get(field)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|n| n.is_finite())
            .unwrap_or(0.0)
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Read and parse a dataset file.
pub async fn load_rows(path: &Path) -> Result<Vec<Row>, TabularError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| TabularError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let rows = parse_rows(&bytes).map_err(|(line, reason)| TabularError::Malformed {
        path: path.to_path_buf(),
        line,
        reason,
    })?;

    debug!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Parse CSV bytes into rows. Errors carry the 1-based line number.
fn parse_rows(bytes: &[u8]) -> Result<Vec<Row>, (u64, String)> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(bytes);

    let headers: Vec<String> = rdr
        .byte_headers()
        .map_err(|e| describe(&e))?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();

    let mut rows = Vec::new();
    for result in rdr.byte_records() {
        let record = result.map_err(|e| describe(&e))?;
        rows.push(build_row(&headers, &record));
    }

    Ok(rows)
}

fn build_row(headers: &[String], record: &ByteRecord) -> Row {
    headers
        .iter()
        .zip(record.iter())
        .map(|(name, value)| (name.as_str(), String::from_utf8_lossy(value).into_owned()))
        .collect()
}

fn describe(err: &csv::Error) -> (u64, String) {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    (line, err.to_string())
}
