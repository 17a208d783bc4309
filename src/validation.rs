//! Validation - visual lint rules and the template-version audit
//!
//! Rules produce tagged issues; they never fail and never enforce.
//! Whether an ERROR aborts anything is up to the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

use crate::config::{AuditConfig, LintConfig};
use crate::manifest::ManifestEntry;
use crate::stats::VisualStats;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warn,
    Info,
}

impl Severity {
    pub fn tag(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warn => "WARN",
            Severity::Info => "INFO",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
}

impl Issue {
    pub fn error(message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, message: message.into() }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self { severity: Severity::Warn, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self { severity: Severity::Info, message: message.into() }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// INFO lines print bare; others carry their tag.
impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Info => f.write_str(&self.message),
            other => write!(f, "{}: {}", other.tag(), self.message),
        }
    }
}

pub fn has_errors(issues: &[Issue]) -> bool {
    issues.iter().any(Issue::is_error)
}

fn sorted_list<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let sorted: BTreeSet<&str> = items.into_iter().map(String::as_str).collect();
    format!("{:?}", sorted.into_iter().collect::<Vec<_>>())
}

/// Lint rule trait - produces issues from stats
pub trait LintRule {
    fn name(&self) -> &'static str;
    fn check(&self, stats: &VisualStats, config: &LintConfig) -> Vec<Issue>;
}

// --- Concrete Rules ---

pub struct RequiredAnchorsRule;

impl LintRule for RequiredAnchorsRule {
    fn name(&self) -> &'static str { "required_anchors" }

    fn check(&self, stats: &VisualStats, config: &LintConfig) -> Vec<Issue> {
        let missing: Vec<&String> = config
            .required_anchors
            .difference(&stats.anchors_with_images)
            .collect();
        if missing.is_empty() {
            return vec![];
        }
        vec![Issue::error(format!(
            "Missing required visuals for {}",
            sorted_list(missing)
        ))]
    }
}

pub struct KnownAnchorsRule;

impl LintRule for KnownAnchorsRule {
    fn name(&self) -> &'static str { "known_anchors" }

    fn check(&self, stats: &VisualStats, config: &LintConfig) -> Vec<Issue> {
        let unknown: Vec<&String> = stats
            .anchors_found
            .difference(&config.known_anchors)
            .collect();
        if unknown.is_empty() {
            return vec![];
        }
        vec![Issue::error(format!(
            "Unknown anchor markers detected: {}",
            sorted_list(unknown)
        ))]
    }
}

pub struct GalleryFallbackRule;

impl LintRule for GalleryFallbackRule {
    fn name(&self) -> &'static str { "gallery_fallback" }

    fn check(&self, stats: &VisualStats, _config: &LintConfig) -> Vec<Issue> {
        if stats.gallery_size == 0 {
            return vec![];
        }
        vec![Issue::warn(format!(
            "{} visuals fell back to gallery recap",
            stats.gallery_size
        ))]
    }
}

/// Runs every rule; nothing short-circuits.
pub struct VisualLinter {
    rules: Vec<Box<dyn LintRule>>,
}

impl VisualLinter {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(RequiredAnchorsRule),
                Box::new(KnownAnchorsRule),
                Box::new(GalleryFallbackRule),
            ],
        }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn lint(&self, stats: &VisualStats, config: &LintConfig) -> Vec<Issue> {
        self.rules
            .iter()
            .flat_map(|rule| rule.check(stats, config))
            .collect()
    }
}

impl Default for VisualLinter {
    fn default() -> Self {
        Self::new()
    }
}

/// Lint with the default rule set.
pub fn lint(stats: &VisualStats, config: &LintConfig) -> Vec<Issue> {
    VisualLinter::new().lint(stats, config)
}

fn version_issue(index: usize, slot: &str, version: Option<&Value>, current: &str) -> Option<Issue> {
    let recorded = match version {
        Some(Value::String(v)) if v == current => return None,
        Some(Value::String(v)) => format!("{:?}", v),
        None | Some(Value::Null) => "None".to_string(),
        Some(other) => other.to_string(),
    };
    Some(Issue::error(format!(
        "[#{} slot={}] template_version {} != {:?}",
        index, slot, recorded, current
    )))
}

fn with_ok_line(mut issues: Vec<Issue>, current: &str) -> Vec<Issue> {
    if issues.is_empty() {
        issues.push(Issue::info(format!("Template versions OK ({})", current)));
    }
    issues
}

/// Check every entry's `template_version` against the configured current
/// version. A clean manifest yields one INFO line.
pub fn audit(entries: &[ManifestEntry], config: &AuditConfig) -> Vec<Issue> {
    let current = config.current_version.as_str();
    let issues = entries
        .iter()
        .enumerate()
        .filter_map(|(idx, entry)| {
            let version = entry.template_version.clone().map(Value::String);
            version_issue(idx, entry.slot_name(), version.as_ref(), current)
        })
        .collect();
    with_ok_line(issues, current)
}

/// Slot name of a raw element: `slot`, then `section`, then `type`.
fn raw_slot_name(fields: &Map<String, Value>) -> &str {
    ["slot", "section", "type"]
        .iter()
        .filter_map(|key| fields.get(*key).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
        .unwrap_or("unknown")
}

/// Same audit over raw manifest elements, each judged on its own. Elements
/// that are not objects get their own ERROR.
pub fn audit_raw(items: &[Value], config: &AuditConfig) -> Vec<Issue> {
    let current = config.current_version.as_str();
    let issues = items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| match item {
            Value::Object(fields) => {
                version_issue(idx, raw_slot_name(fields), fields.get("template_version"), current)
            }
            _ => Some(Issue::error(format!("[#{}] manifest entry is not an object", idx))),
        })
        .collect();
    with_ok_line(issues, current)
}
