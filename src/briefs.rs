//! Creative briefs and metric labels
//!
//! Briefs arrive from upstream in `images/briefs.json`. They are read-only
//! here and every field is optional: a missing brief degrades to defaults.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::slots::Slot;

/// Metric focus is capped at three ids per brief.
pub const MAX_METRIC_FOCUS: usize = 3;

/// Creative attributes for one slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Brief {
    #[serde(default)]
    pub scene: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub structure: Option<String>,
    #[serde(default)]
    pub palette: Option<String>,
    #[serde(default)]
    pub core_tension: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub metric_focus: Vec<String>,
    #[serde(default)]
    pub anchor_section: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
}

impl Brief {
    /// Metric ids in brief order, first three only.
    pub fn metric_focus(&self) -> &[String] {
        let n = self.metric_focus.len().min(MAX_METRIC_FOCUS);
        &self.metric_focus[..n]
    }

    /// Caption text for an inline figure.
    pub fn description(&self) -> Option<&str> {
        [&self.core_tension, &self.structure, &self.scene]
            .into_iter()
            .filter_map(|f| f.as_deref())
            .map(str::trim)
            .find(|s| !s.is_empty())
    }

    /// Token fields handed to the prompt renderer. Empty values are kept out.
    pub fn tokens(&self) -> BTreeMap<String, String> {
        let fields = [
            ("scene", &self.scene),
            ("mood", &self.mood),
            ("structure", &self.structure),
            ("palette", &self.palette),
            ("tension", &self.core_tension),
        ];
        fields
            .into_iter()
            .filter_map(|(k, v)| {
                let v = v.as_deref()?.trim();
                (!v.is_empty()).then(|| (k.to_string(), v.to_string()))
            })
            .collect()
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => vec![s],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        _ => vec![],
    })
}

/// All briefs for one report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Briefs {
    slots: BTreeMap<String, Brief>,
    case_studies: Vec<Brief>,
}

impl Briefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `images/briefs.json` under a report directory. Anything missing
    /// or malformed yields empty briefs.
    pub fn load(report_dir: &Path) -> Self {
        let path = report_dir.join("images").join("briefs.json");
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "briefs file is not valid JSON; using defaults");
                Self::default()
            }
        }
    }

    /// Lenient parse: keys that do not hold brief-shaped objects are skipped.
    pub fn from_value(value: &Value) -> Self {
        let mut briefs = Self::default();
        let Value::Object(map) = value else {
            return briefs;
        };
        for (key, raw) in map {
            if key == "case_studies" {
                if let Value::Array(items) = raw {
                    briefs.case_studies = items
                        .iter()
                        .map(|item| serde_json::from_value::<Brief>(item.clone()).unwrap_or_default())
                        .collect();
                }
                continue;
            }
            if raw.is_object() {
                if let Ok(brief) = serde_json::from_value::<Brief>(raw.clone()) {
                    briefs.slots.insert(crate::slots::slug(key), brief);
                }
            }
        }
        briefs
    }

    pub fn insert(&mut self, slot: &str, brief: Brief) {
        self.slots.insert(crate::slots::slug(slot), brief);
    }

    pub fn push_case_study(&mut self, brief: Brief) {
        self.case_studies.push(brief);
    }

    /// Brief for a slot; `case_study_N` reads the N-th case study.
    pub fn for_slot(&self, slot: &Slot) -> Option<&Brief> {
        if let Some(brief) = self.slots.get(&slot.key) {
            return Some(brief);
        }
        slot.case_study_index()
            .and_then(|idx| self.case_studies.get(idx - 1))
    }
}

/// Human-readable labels for metric ids.
pub trait MetricLabeler {
    /// `None` when the id is unknown.
    fn label(&self, metric_id: &str) -> Option<String>;
}

/// Built-in metric label table.
#[derive(Debug, Clone, Default)]
pub struct StaticMetricLabels;

const METRIC_LABELS: &[(&str, &str)] = &[
    ("footfall_lift", "Foot-traffic uplift"),
    ("foot_traffic_uplift", "Foot traffic"),
    ("foot_traffic", "Foot traffic"),
    ("early_window_share", "Early-window share"),
    ("buyer_activity_share", "Early share of purchases"),
    ("event_cpa", "Event CPA"),
    ("qr_redemption", "QR redemption"),
    ("dwell_time", "Dwell time"),
    ("partner_value", "Partner value"),
    ("conversion_rate", "Conversion rate"),
    ("blended_margin", "Blended margin"),
    ("repeat_rate", "Repeat rate"),
    ("traffic_share", "Traffic share"),
    ("category_lift", "Category sales lift"),
];

impl MetricLabeler for StaticMetricLabels {
    fn label(&self, metric_id: &str) -> Option<String> {
        let key = metric_id.trim().to_lowercase();
        METRIC_LABELS
            .iter()
            .find(|(id, _)| *id == key)
            .map(|(_, label)| label.to_string())
    }
}

/// Resolve up to three metric ids to labels, dropping unresolved ids.
pub fn resolve_metric_labels(ids: &[String], labeler: &dyn MetricLabeler) -> Vec<String> {
    ids.iter()
        .take(MAX_METRIC_FOCUS)
        .filter_map(|id| labeler.label(id))
        .collect()
}
