//! Image context - manifest entries joined with briefs
//!
//! Produces the payloads the injector places. Later manifest entries for a
//! slot supersede earlier ones; slot order follows first appearance.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::briefs::{resolve_metric_labels, Briefs, MetricLabeler};
use crate::config::anchor_section_for;
use crate::manifest::{self, ManifestEntry};
use crate::slots::{slug, Slot, SlotKind};

/// One image ready for placement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ImagePayload {
    #[serde(default)]
    pub slot: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metric_labels: Vec<String>,
    #[serde(default)]
    pub anchor_section: Option<String>,
}

impl ImagePayload {
    /// Slug of the slot (or label when no slot is set).
    pub fn key(&self) -> Option<String> {
        [&self.slot, &self.label]
            .into_iter()
            .filter_map(|f| f.as_deref())
            .map(slug)
            .find(|k| !k.is_empty())
    }

    /// Image reference, when there is a usable one.
    pub fn source(&self) -> Option<&str> {
        self.src.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageContext {
    pub hero: Option<ImagePayload>,
    pub sections: Vec<ImagePayload>,
}

impl ImageContext {
    /// Hero first, then sections in manifest order.
    pub fn payloads(&self) -> impl Iterator<Item = &ImagePayload> {
        self.hero.iter().chain(self.sections.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.hero.is_none() && self.sections.is_empty()
    }
}

/// "signal_map" → "Signal Map".
pub fn humanize(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn entry_slot(entry: &ManifestEntry) -> Option<Slot> {
    let raw = [&entry.slot, &entry.section]
        .into_iter()
        .filter_map(|f| f.as_deref())
        .find(|s| !slug(s).is_empty());
    match (raw, entry.kind) {
        (Some(raw), _) => Some(Slot::new(raw)),
        (None, SlotKind::Hero) => Some(Slot::hero()),
        (None, SlotKind::Section) => None,
    }
}

fn entry_label(entry: &ManifestEntry, slot: &Slot) -> String {
    entry
        .section
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| humanize(&slot.key))
}

pub fn build_image_context(
    entries: &[ManifestEntry],
    briefs: &Briefs,
    labeler: &dyn MetricLabeler,
) -> ImageContext {
    let mut hero: Option<ImagePayload> = None;
    let mut sections: Vec<ImagePayload> = vec![];
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let Some(slot) = entry_slot(entry) else {
            continue;
        };
        let brief = briefs.for_slot(&slot);
        let metric_ids = if entry.metric_focus.is_empty() {
            brief.map(|b| b.metric_focus().to_vec()).unwrap_or_default()
        } else {
            entry.metric_focus.clone()
        };
        let payload = ImagePayload {
            slot: Some(slot.key.clone()),
            label: Some(entry_label(entry, &slot)),
            src: Some(entry.image.clone()).filter(|s| !s.trim().is_empty()),
            alt: brief
                .and_then(|b| b.alt.clone())
                .or_else(|| entry.alt.clone()),
            description: brief.and_then(|b| b.description()).map(str::to_string),
            metric_labels: resolve_metric_labels(&metric_ids, labeler),
            anchor_section: entry
                .anchor_section
                .clone()
                .or_else(|| brief.and_then(|b| b.anchor_section.clone()))
                .or_else(|| anchor_section_for(&slot.key).map(str::to_string)),
        };

        if slot.kind() == SlotKind::Hero {
            hero = Some(payload);
            continue;
        }
        match index.get(&slot.key) {
            Some(&i) => sections[i] = payload,
            None => {
                index.insert(slot.key.clone(), sections.len());
                sections.push(payload);
            }
        }
    }

    ImageContext { hero, sections }
}

/// Manifest and briefs read from a report directory.
pub fn load_image_context(report_dir: &Path, labeler: &dyn MetricLabeler) -> ImageContext {
    let entries = manifest::load(report_dir);
    let briefs = Briefs::load(report_dir);
    build_image_context(&entries, &briefs, labeler)
}
