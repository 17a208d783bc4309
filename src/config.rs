//! Visual QA configuration
//!
//! Defaults cover the standard report layout. A JSON file can override any
//! field; missing fields keep their defaults.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::templates::TEMPLATE_VERSION;

/// Known anchor slug → the report section it illustrates.
pub const ANCHOR_SECTIONS: &[(&str, &str)] = &[
    ("header", "header"),
    ("signal_map", "signals_and_thesis"),
    ("measurement_spine", "measurement_spine"),
    ("case_study_1", "mini_case_story"),
    ("case_study_2", "deep_analysis"),
    ("case_study_3", "deep_analysis"),
    ("future_outlook", "future_outlook"),
];

pub const REQUIRED_ANCHORS: &[&str] = &["signal_map"];

pub fn anchor_section_for(slug: &str) -> Option<&'static str> {
    ANCHOR_SECTIONS
        .iter()
        .find(|(k, _)| *k == slug)
        .map(|(_, v)| *v)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VisualConfig {
    pub required_anchors: BTreeSet<String>,
    pub known_anchors: BTreeMap<String, String>,
    pub template_version: String,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            required_anchors: REQUIRED_ANCHORS.iter().map(|s| s.to_string()).collect(),
            known_anchors: ANCHOR_SECTIONS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            template_version: TEMPLATE_VERSION.to_string(),
        }
    }
}

impl VisualConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn lint(&self) -> LintConfig {
        LintConfig {
            required_anchors: self.required_anchors.clone(),
            known_anchors: self.known_anchors.keys().cloned().collect(),
        }
    }

    pub fn audit(&self) -> AuditConfig {
        AuditConfig {
            current_version: self.template_version.clone(),
        }
    }
}

/// Inputs to the visual lint rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintConfig {
    pub required_anchors: BTreeSet<String>,
    pub known_anchors: BTreeSet<String>,
}

impl Default for LintConfig {
    fn default() -> Self {
        VisualConfig::default().lint()
    }
}

impl LintConfig {
    /// Same catalog, different required set. An empty set keeps the current one.
    pub fn with_required<I, S>(mut self, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let required: BTreeSet<String> = required.into_iter().map(Into::into).collect();
        if !required.is_empty() {
            self.required_anchors = required;
        }
        self
    }
}

/// The template version manifests are audited against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    pub current_version: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            current_version: TEMPLATE_VERSION.to_string(),
        }
    }
}

impl AuditConfig {
    pub fn new(current_version: impl Into<String>) -> Self {
        Self {
            current_version: current_version.into(),
        }
    }
}
