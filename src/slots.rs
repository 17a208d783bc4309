//! Slots - image placements and their normalized keys

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalize a slot label into its key.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` into a
/// single `_`, and trims leading/trailing underscores. Applying it twice is
/// the same as applying it once.
pub fn slug(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch);
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Whether a slot is the report hero or an in-body section image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Hero,
    Section,
}

impl SlotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKind::Hero => "hero",
            SlotKind::Section => "section",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One image placement: the label as written plus its slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slot {
    pub label: String,
    pub key: String,
}

impl Slot {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let key = slug(&label);
        Self { label, key }
    }

    pub fn hero() -> Self {
        Self::new("hero")
    }

    pub fn kind(&self) -> SlotKind {
        if self.key == "hero" {
            SlotKind::Hero
        } else {
            SlotKind::Section
        }
    }

    /// 1-based case-study index for keys like `case_study_2`.
    pub fn case_study_index(&self) -> Option<usize> {
        self.key
            .strip_prefix("case_study_")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n > 0)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
