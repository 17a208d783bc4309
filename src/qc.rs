//! Path-level QC used by the `visual-lint` and `template-audit` binaries.
//!
//! Each target yields the lines to print plus whether any were ERRORs.
//! WARN lines never flip the error flag.

use std::path::{Path, PathBuf};

use crate::config::{AuditConfig, LintConfig};
use crate::manifest::{manifest_path, read_manifest_file, ManifestError};
use crate::stats::{read_sidecar, sidecar_path, SidecarError, SIDECAR_FILE};
use crate::validation::{audit_raw, has_errors, lint};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QcOutcome {
    pub lines: Vec<String>,
    pub has_errors: bool,
}

impl QcOutcome {
    fn error(path: &Path, message: impl std::fmt::Display) -> Self {
        Self {
            lines: vec![format!("{}: ERROR: {}", path.display(), message)],
            has_errors: true,
        }
    }
}

// Lines are already prefixed with the path, so these leave it out.
fn sidecar_problem(e: &SidecarError) -> String {
    match e {
        SidecarError::NotFound(_) => format!("{} not found", SIDECAR_FILE),
        SidecarError::Io { source, .. } => format!("could not read ({})", source),
        SidecarError::Parse(_) => e.to_string(),
    }
}

fn manifest_problem(e: &ManifestError) -> String {
    match e {
        ManifestError::NotFound(_) => "manifest.json not found".to_string(),
        ManifestError::Io { source, .. } => format!("could not read ({})", source),
        ManifestError::NotAList(_) => "manifest is not a JSON list".to_string(),
        ManifestError::Serialization(source) => format!("could not parse JSON ({})", source),
    }
}

/// Lint a report directory (or its `visual_stats.json`). A sidecar's own
/// non-empty `required_anchors` replaces the configured set.
pub fn lint_target(target: &Path, config: &LintConfig) -> QcOutcome {
    let path = sidecar_path(target);
    let sidecar = match read_sidecar(target) {
        Ok(s) => s,
        Err(e) => return QcOutcome::error(&path, sidecar_problem(&e)),
    };
    let config = config.clone().with_required(sidecar.required_anchors.iter().cloned());
    let issues = lint(&sidecar.stats, &config);
    if issues.is_empty() {
        return QcOutcome {
            lines: vec![format!("{}: Visual QA OK", target.display())],
            has_errors: false,
        };
    }
    QcOutcome {
        lines: issues
            .iter()
            .map(|issue| format!("{}: {}", path.display(), issue))
            .collect(),
        has_errors: has_errors(&issues),
    }
}

/// A directory resolves to `images/manifest.json`.
pub fn audit_path(target: &Path) -> PathBuf {
    if target.is_dir() {
        manifest_path(target)
    } else {
        target.to_path_buf()
    }
}

pub fn audit_target(target: &Path, config: &AuditConfig) -> QcOutcome {
    let path = audit_path(target);
    let items = match read_manifest_file(&path) {
        Ok(items) => items,
        Err(e) => return QcOutcome::error(&path, manifest_problem(&e)),
    };
    let issues = audit_raw(&items, config);
    QcOutcome {
        lines: issues
            .iter()
            .map(|issue| format!("{}: {}", path.display(), issue))
            .collect(),
        has_errors: has_errors(&issues),
    }
}

/// Run `check` over every target, collecting lines in order.
pub fn run_all<F>(targets: &[PathBuf], mut check: F) -> QcOutcome
where
    F: FnMut(&Path) -> QcOutcome,
{
    let mut total = QcOutcome::default();
    for target in targets {
        let outcome = check(target);
        total.has_errors |= outcome.has_errors;
        total.lines.extend(outcome.lines);
    }
    total
}
