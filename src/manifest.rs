//! Manifest Store - append-only generation provenance
//!
//! One JSON array per report at `images/manifest.json`. Appending reads what
//! is there (or nothing), pushes, and rewrites the whole array. Existing
//! elements are carried over as raw JSON, so fields this crate does not
//! model survive every append.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::slots::SlotKind;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("{0} not found")]
    NotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} is not a manifest list")]
    NotAList(PathBuf),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Provenance for one generated image. Never edited once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestEntry {
    #[serde(rename = "type")]
    pub kind: SlotKind,
    #[serde(default)]
    pub slot: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub anchor_section: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub template_version: Option<String>,
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default)]
    pub metric_focus: Vec<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub image: String,
}

impl ManifestEntry {
    /// Name used in audit lines: slot, else section, else type.
    pub fn slot_name(&self) -> &str {
        [&self.slot, &self.section]
            .into_iter()
            .filter_map(|f| f.as_deref())
            .find(|s| !s.trim().is_empty())
            .unwrap_or(self.kind.as_str())
    }
}

pub fn manifest_path(report_dir: &Path) -> PathBuf {
    report_dir.join("images").join("manifest.json")
}

/// Raw elements of a manifest file; anything unreadable is an empty list.
fn read_raw(path: &Path) -> Vec<Value> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return vec![],
        Err(e) => {
            warn!(path = %path.display(), error = %e, "manifest unreadable; treating as empty");
            return vec![];
        }
    };
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            warn!(path = %path.display(), "manifest is not a JSON array; treating as empty");
            vec![]
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "manifest is not valid JSON; treating as empty");
            vec![]
        }
    }
}

/// Strict read used by audits: a missing file or a non-array is an error.
/// Elements come back as raw JSON so one odd entry cannot hide the rest.
pub fn read_manifest_file(path: &Path) -> Result<Vec<Value>, ManifestError> {
    if !path.exists() {
        return Err(ManifestError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match serde_json::from_str::<Value>(&content)? {
        Value::Array(items) => Ok(items),
        _ => Err(ManifestError::NotAList(path.to_path_buf())),
    }
}

/// Per-report manifest handle.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(report_dir: impl AsRef<Path>) -> Self {
        Self {
            path: manifest_path(report_dir.as_ref()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries in append order. Never fails; elements that are not entries
    /// are skipped.
    pub fn load(&self) -> Vec<ManifestEntry> {
        read_raw(&self.path)
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(path = %self.path.display(), index, error = %e, "skipping manifest element");
                    None
                }
            })
            .collect()
    }

    /// Append one entry; returns the manifest length afterwards.
    pub fn append(&self, entry: &ManifestEntry) -> Result<usize, ManifestError> {
        let mut items = read_raw(&self.path);
        items.push(serde_json::to_value(entry)?);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ManifestError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut body = serde_json::to_string_pretty(&items)?;
        body.push('\n');
        fs::write(&self.path, body).map_err(|source| ManifestError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), entries = items.len(), slot = entry.slot_name(), "manifest entry appended");
        Ok(items.len())
    }
}

pub fn append(report_dir: &Path, entry: &ManifestEntry) -> Result<usize, ManifestError> {
    ManifestStore::new(report_dir).append(entry)
}

pub fn load(report_dir: &Path) -> Vec<ManifestEntry> {
    ManifestStore::new(report_dir).load()
}
