//! Visual stats and the `visual_stats.json` sidecar

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const SIDECAR_FILE: &str = "visual_stats.json";

/// What one injection pass saw. Sets serialize as sorted lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisualStats {
    #[serde(default)]
    pub anchors_found: BTreeSet<String>,
    #[serde(default)]
    pub anchors_with_images: BTreeSet<String>,
    #[serde(default)]
    pub anchors_missing_images: BTreeSet<String>,
    #[serde(default)]
    pub images_without_anchor: BTreeSet<String>,
    #[serde(default)]
    pub gallery_size: usize,
}

/// Visual completeness of a report, recomputed from stats each time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completeness {
    New,
    Partial,
    Complete,
}

impl VisualStats {
    /// Subset, difference and disjointness relations between the sets.
    pub fn is_consistent(&self) -> bool {
        let missing: BTreeSet<String> = self
            .anchors_found
            .difference(&self.anchors_with_images)
            .cloned()
            .collect();
        self.anchors_with_images.is_subset(&self.anchors_found)
            && self.images_without_anchor.is_disjoint(&self.anchors_found)
            && missing == self.anchors_missing_images
    }

    pub fn missing_required<'a>(&self, required: &'a BTreeSet<String>) -> Vec<&'a str> {
        required
            .iter()
            .filter(|slug| !self.anchors_with_images.contains(*slug))
            .map(String::as_str)
            .collect()
    }

    /// `has_manifest` distinguishes a report that never generated images.
    /// Lint errors other than required coverage are the caller's to weigh.
    pub fn completeness(&self, has_manifest: bool, required: &BTreeSet<String>) -> Completeness {
        if !has_manifest {
            Completeness::New
        } else if self.missing_required(required).is_empty() {
            Completeness::Complete
        } else {
            Completeness::Partial
        }
    }
}

#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("{0} not found")]
    NotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse JSON ({0})")]
    Parse(#[from] serde_json::Error),
}

/// Stats as persisted, with the required set they were checked against.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisualStatsSidecar {
    #[serde(flatten)]
    pub stats: VisualStats,
    #[serde(default)]
    pub required_anchors: BTreeSet<String>,
}

/// A directory resolves to its `visual_stats.json`.
pub fn sidecar_path(target: &Path) -> PathBuf {
    if target.is_dir() {
        target.join(SIDECAR_FILE)
    } else {
        target.to_path_buf()
    }
}

pub fn write_sidecar(
    report_dir: &Path,
    stats: &VisualStats,
    required: &BTreeSet<String>,
) -> Result<PathBuf, SidecarError> {
    let path = report_dir.join(SIDECAR_FILE);
    let sidecar = VisualStatsSidecar {
        stats: stats.clone(),
        required_anchors: required.clone(),
    };
    let mut body = serde_json::to_string_pretty(&sidecar)?;
    body.push('\n');
    fs::write(&path, body).map_err(|source| SidecarError::Io {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), with_images = stats.anchors_with_images.len(), "visual stats written");
    Ok(path)
}

pub fn read_sidecar(target: &Path) -> Result<VisualStatsSidecar, SidecarError> {
    let path = sidecar_path(target);
    if !path.exists() {
        return Err(SidecarError::NotFound(path));
    }
    let content = fs::read_to_string(&path).map_err(|source| SidecarError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}
