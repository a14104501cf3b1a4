//! Persisted template document.
//!
//! Reads take no lock, so a read racing a save can observe a partially
//! written file. Saves are serialized against each other; the last save wins.

use crate::models::Template;
use serde_json::Value;
use std::io;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Errors raised by the template store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The template file is missing or unreadable.
    #[error("failed to read template {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The template file is not a JSON object.
    #[error("template {} is malformed: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    /// The document could not be serialized or written.
    #[error("failed to write template {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// File-backed template store.
#[derive(Debug)]
pub struct TemplateStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TemplateStore {
    /// Create a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Read and parse the full persisted document.
    pub async fn load(&self) -> Result<Template, StoreError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| StoreError::Read {
                path: self.path.clone(),
                source,
            })?;

        let value: Value = serde_json::from_slice(&bytes).map_err(|e| StoreError::Malformed {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        debug!("Loaded template from {} ({} bytes)", self.path.display(), bytes.len());

        Template::from_value(value).ok_or_else(|| StoreError::Malformed {
            path: self.path.clone(),
            reason: "top-level value is not an object".to_string(),
        })
    }

    /// Overwrite the persisted document with `document`.
    ///
    /// No validation is performed; whatever the caller sends is stored.
    pub async fn save(&self, document: &Value) -> Result<(), StoreError> {
        let content = serde_json::to_vec_pretty(document).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;

        let _guard = self.write_lock.lock().await;
        tokio::fs::write(&self.path, &content)
            .await
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;

        info!("Saved template to {} ({} bytes)", self.path.display(), content.len());
        Ok(())
    }
}
