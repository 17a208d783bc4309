//! Prompt Templates - Versioned Contracts
//!
//! A template is a fixed list of lines; each line enumerates phrasing
//! alternatives with `{field}` placeholders. Rendering picks one alternative
//! per line with a generator seeded from `sha256("template_id|seed")`, so a
//! given (template, context, seed) always produces the same prompt.
//!
//! Bump [`TEMPLATE_VERSION`] whenever a line, an alternative, a default or
//! the brand suffix changes. Manifests record it and `template-audit` gates
//! on it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::briefs::{resolve_metric_labels, Brief, MetricLabeler, MAX_METRIC_FOCUS};
use crate::hashing::phrasing_seed;
use crate::slots::{Slot, SlotKind};
use crate::style::StyleVariant;

pub const TEMPLATE_VERSION: &str = "2025-11-29.1";

/// Appended to every prompt, whatever the template.
pub const BRAND_SUFFIX: &str = "Clean editorial photography, soft daylight, cool slate/steel palette, \
no text or lettering, single subject, generous negative space, magazine cover aesthetic, \
shallow depth-of-field, subtle contrast; not a poster, not a collage, not an infographic, \
no charts, no UI, no labels.";

/// Default phrase for each token field when the brief leaves it empty.
pub const FIELD_DEFAULTS: &[(&str, &str)] = &[
    ("scene", "a single quiet subject in open space"),
    ("mood", "calm and considered"),
    ("structure", "a restrained geometric arrangement"),
    ("palette", "cool slate and steel"),
    ("tension", "a decision that has not been made yet"),
    ("section", "this section"),
    ("topic", "the report's subject"),
];

pub fn field_default(field: &str) -> Option<&'static str> {
    FIELD_DEFAULTS
        .iter()
        .find(|(k, _)| *k == field)
        .map(|(_, v)| *v)
}

pub type Line = &'static [&'static str];

#[derive(Debug)]
pub struct PromptTemplate {
    pub id: &'static str,
    pub kind: SlotKind,
    pub lines: &'static [Line],
}

const STYLE_LINE: Line = &[
    "{framing}, {lighting}, {style_palette} tones.",
    "Compose as {framing} with {lighting}; keep to {style_palette}.",
    "Camera: {framing}. Light: {lighting}. Color range: {style_palette}.",
];

const METRIC_LINE: Line = &[
    "Let the composition quietly evoke {metrics}, without numbers or words.",
    "Visual weight leans toward {metrics}, expressed through form alone.",
    "Subtle emphasis on {metrics}; nothing written, nothing charted.",
];

pub static TEMPLATES: &[PromptTemplate] = &[
    PromptTemplate {
        id: "hero_decision_window",
        kind: SlotKind::Hero,
        lines: &[
            &[
                "Editorial hero image for {topic}: {scene}, set in {environment}.",
                "A single elegant subject for {topic}, {scene}, photographed in {environment}.",
                "{scene} in {environment}, framed like a magazine cover about {topic}.",
            ],
            &[
                "The frame should hold {tension}.",
                "Let the image hint at {tension}.",
                "Underneath it all: {tension}.",
            ],
            STYLE_LINE,
            &[
                "Palette of {palette}, drawn with {geometry}.",
                "Colors stay within {palette}; lines follow {geometry}.",
            ],
            &[
                "Mood {mood}, with 20-30% empty space at the top for a header.",
                "It should feel {mood}; leave the upper quarter open for the title.",
            ],
            METRIC_LINE,
        ],
    },
    PromptTemplate {
        id: "signal_map_constellation",
        kind: SlotKind::Section,
        lines: &[
            &[
                "Abstract signal map for {section}: {structure}.",
                "A constellation-style map of {section}, arranged as {structure}.",
                "Minimal network illustration for {section}, laid out as {structure}.",
            ],
            &[
                "Nodes drawn as {geometry} over {environment}.",
                "{geometry} floating on {environment}.",
            ],
            STYLE_LINE,
            &[
                "A faint cue of {scene} sits in the negative space.",
                "Scene cue: {scene}.",
            ],
            &[
                "Brightest nodes correspond to {metrics}.",
                "Let {metrics} read as the strongest signals.",
            ],
        ],
    },
    PromptTemplate {
        id: "case_study_vignette",
        kind: SlotKind::Section,
        lines: &[
            &[
                "Quiet editorial vignette for {section}: {scene}.",
                "A small, specific moment from {section}, {scene}.",
            ],
            &[
                "Mood {mood}; the story turns on {tension}.",
                "It should feel {mood} while suggesting {tension}.",
            ],
            STYLE_LINE,
            &[
                "Keep colors to {palette} and shapes to {geometry}.",
                "Palette {palette}; structure {structure}.",
            ],
            METRIC_LINE,
        ],
    },
    PromptTemplate {
        id: "future_outlook_horizon",
        kind: SlotKind::Section,
        lines: &[
            &[
                "Forward-looking horizon motif for {section}: {scene}.",
                "An open horizon suggesting what comes next in {section}, with {scene}.",
            ],
            &[
                "{structure} receding toward the horizon.",
                "Depth built from {structure}.",
            ],
            STYLE_LINE,
            &["Mood {mood}.", "The feeling is {mood}, unhurried."],
            METRIC_LINE,
        ],
    },
    PromptTemplate {
        id: "measurement_spine_ladder",
        kind: SlotKind::Section,
        lines: &[
            &[
                "Minimal measurement spine for {section}: {structure}.",
                "A vertical ladder for {section}, {structure}, read bottom to top.",
            ],
            &[
                "Thin ink lines forming {geometry} on {environment}.",
                "Isometric line drawing, {geometry}, over {environment}.",
            ],
            STYLE_LINE,
            &[
                "Rungs marked only by form for {metrics}.",
                "Each rung stands for one of {metrics}, no labels.",
            ],
        ],
    },
    PromptTemplate {
        id: "section_editorial_motif",
        kind: SlotKind::Section,
        lines: &[
            &[
                "Abstract editorial motif for {section}: {scene}.",
                "Quiet illustration for {section} built around {scene}.",
            ],
            &[
                "{structure}, with {geometry}.",
                "Arranged as {structure}; lines follow {geometry}.",
            ],
            STYLE_LINE,
            &["Mood {mood}.", "Soft tones, {mood}."],
            METRIC_LINE,
        ],
    },
];

pub fn get_template(id: &str) -> Option<&'static PromptTemplate> {
    TEMPLATES.iter().find(|t| t.id == id)
}

pub fn template_ids() -> impl Iterator<Item = &'static str> {
    TEMPLATES.iter().map(|t| t.id)
}

/// Template used for a slot's prompt.
pub fn template_for_slot(slot: &Slot) -> &'static str {
    match slot.key.as_str() {
        "hero" => "hero_decision_window",
        "signal_map" => "signal_map_constellation",
        "future_outlook" => "future_outlook_horizon",
        "measurement_spine" => "measurement_spine_ladder",
        _ if slot.case_study_index().is_some() => "case_study_vignette",
        _ => "section_editorial_motif",
    }
}

/// Everything a template reads.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptContext {
    pub tokens: BTreeMap<String, String>,
    pub style: StyleVariant,
    pub metric_labels: Vec<String>,
}

impl PromptContext {
    pub fn new(style: StyleVariant) -> Self {
        Self {
            tokens: BTreeMap::new(),
            style,
            metric_labels: vec![],
        }
    }

    pub fn with_token(mut self, field: &str, value: impl Into<String>) -> Self {
        self.tokens.insert(field.to_string(), value.into());
        self
    }

    pub fn with_metric_labels(mut self, labels: Vec<String>) -> Self {
        self.metric_labels = labels;
        self
    }

    /// Context for a slot: brief tokens, the slot label as `section`, the
    /// report topic, and resolved metric labels.
    pub fn for_slot(
        slot: &Slot,
        brief: Option<&Brief>,
        topic: Option<&str>,
        style: StyleVariant,
        labeler: &dyn MetricLabeler,
    ) -> Self {
        let mut ctx = Self::new(style);
        if let Some(brief) = brief {
            ctx.tokens = brief.tokens();
            ctx.metric_labels = resolve_metric_labels(brief.metric_focus(), labeler);
        }
        if slot.kind() == SlotKind::Section {
            ctx.tokens.insert("section".into(), slot.label.clone());
        }
        if let Some(topic) = topic.map(str::trim).filter(|t| !t.is_empty()) {
            ctx.tokens.insert("topic".into(), topic.to_string());
        }
        ctx
    }

    /// Token value, or the field's default phrase when missing or blank.
    pub fn token(&self, field: &str) -> &str {
        match self.tokens.get(field).map(|v| v.trim()) {
            Some(v) if !v.is_empty() => v,
            _ => field_default(field).unwrap_or(""),
        }
    }

    fn labels(&self) -> &[String] {
        let n = self.metric_labels.len().min(MAX_METRIC_FOCUS);
        &self.metric_labels[..n]
    }

    fn lookup(&self, key: &str) -> Option<String> {
        let value = match key {
            "framing" => self.style.framing.clone(),
            "lighting" => self.style.lighting.clone(),
            "style_palette" => self.style.palette.clone(),
            "geometry" => self.style.geometry.clone(),
            "environment" => self.style.environment.clone(),
            "metrics" => self.labels().join(", "),
            field if field_default(field).is_some() => self.token(field).to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Snapshot persisted as a manifest entry's `context`.
    pub fn snapshot(&self, metric_focus: &[String]) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("tokens".into(), json!(self.tokens));
        map.insert("style".into(), json!(self.style));
        map.insert(
            "metric_focus".into(),
            json!(metric_focus.iter().take(MAX_METRIC_FOCUS).collect::<Vec<_>>()),
        );
        map.insert("metric_labels".into(), json!(self.labels()));
        map
    }
}

/// Deterministic generator for phrasing choices. Never seeded from entropy.
struct PhrasingRng(StdRng);

impl PhrasingRng {
    fn for_template(template_id: &str, seed: &str) -> Self {
        Self(StdRng::seed_from_u64(phrasing_seed(template_id, seed)))
    }

    fn pick(&mut self, options: usize) -> usize {
        if options <= 1 {
            0
        } else {
            self.0.gen_range(0..options)
        }
    }
}

/// Render a prompt. Unknown template ids fall back to joining the non-empty
/// token values.
pub fn render(template_id: &str, context: &PromptContext, seed: &str) -> String {
    let Some(template) = get_template(template_id) else {
        return render_fallback(context);
    };
    let mut rng = PhrasingRng::for_template(template_id, seed);
    let mut sentences = Vec::with_capacity(template.lines.len() + 1);
    for line in template.lines {
        // Draw for every line so later choices don't shift when a line is skipped.
        let choice = line[rng.pick(line.len())];
        if choice.contains("{metrics}") && context.labels().is_empty() {
            continue;
        }
        sentences.push(capitalize_first(&fill(choice, context)));
    }
    sentences.push(BRAND_SUFFIX.to_string());
    sentences.join(" ")
}

fn render_fallback(context: &PromptContext) -> String {
    let mut parts: Vec<String> = context
        .tokens
        .values()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| {
            let v = v.trim_end_matches('.');
            format!("{}.", v)
        })
        .collect();
    parts.push(BRAND_SUFFIX.to_string());
    parts.join(" ")
}

fn fill(line: &str, context: &PromptContext) -> String {
    let mut out = String::with_capacity(line.len() + 64);
    let mut rest = line;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match context.lookup(key) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::briefs::StaticMetricLabels;
    use crate::style::{HERO_STYLES, SECTION_STYLES};

    fn section_ctx() -> PromptContext {
        PromptContext::new(SECTION_STYLES.baseline())
            .with_token("section", "Signal Map")
            .with_token("structure", "concentric rings of retail signals")
    }

    #[test]
    fn render_is_deterministic() {
        let ctx = section_ctx();
        let a = render("signal_map_constellation", &ctx, "report-42");
        let b = render("signal_map_constellation", &ctx, "report-42");
        assert_eq!(a, b);
    }

    #[test]
    fn render_ends_with_brand_suffix() {
        for id in template_ids() {
            let prompt = render(id, &section_ctx(), "s");
            assert!(prompt.ends_with(BRAND_SUFFIX), "{id}");
            assert!(!prompt.contains('{'), "unfilled placeholder in {id}: {prompt}");
        }
    }

    #[test]
    fn seeds_reach_different_phrasings() {
        let ctx = section_ctx();
        let first = render("hero_decision_window", &ctx, "seed-0");
        let varied = (1..40)
            .map(|i| render("hero_decision_window", &ctx, &format!("seed-{i}")))
            .any(|p| p != first);
        assert!(varied);
    }

    #[test]
    fn empty_tokens_use_defaults() {
        let ctx = PromptContext::new(HERO_STYLES.baseline()).with_token("scene", "   ");
        assert_eq!(ctx.token("scene"), "a single quiet subject in open space");
        let prompt = render("hero_decision_window", &ctx, "x");
        assert!(prompt.contains("a single quiet subject in open space"));
    }

    #[test]
    fn metric_line_skipped_without_labels() {
        let ctx = section_ctx();
        for i in 0..20 {
            let prompt = render("case_study_vignette", &ctx, &format!("{i}"));
            assert!(!prompt.contains("evoke"));
            assert!(!prompt.contains("Visual weight"));
        }
    }

    #[test]
    fn at_most_three_metric_labels() {
        let ctx = section_ctx().with_metric_labels(
            ["Alpha", "Beta", "Gamma", "Delta"].iter().map(|s| s.to_string()).collect(),
        );
        let prompt = render("signal_map_constellation", &ctx, "m");
        assert!(prompt.contains("Alpha, Beta, Gamma"));
        assert!(!prompt.contains("Delta"));
    }

    #[test]
    fn unknown_template_falls_back() {
        let ctx = PromptContext::new(HERO_STYLES.baseline())
            .with_token("scene", "a lone kiosk")
            .with_token("mood", "")
            .with_token("palette", "muted teal.");
        let prompt = render("no_such_template", &ctx, "x");
        // Key order: mood (blank, skipped), palette, scene.
        assert_eq!(prompt, format!("muted teal. a lone kiosk. {}", BRAND_SUFFIX));
    }

    #[test]
    fn slot_template_selection() {
        assert_eq!(template_for_slot(&Slot::hero()), "hero_decision_window");
        assert_eq!(template_for_slot(&Slot::new("Signal Map")), "signal_map_constellation");
        assert_eq!(template_for_slot(&Slot::new("Case Study 2")), "case_study_vignette");
        assert_eq!(template_for_slot(&Slot::new("Market Backdrop")), "section_editorial_motif");
        for slot in ["hero", "signal_map", "case_study_1", "future_outlook", "measurement_spine", "x"] {
            assert!(get_template(template_for_slot(&Slot::new(slot))).is_some());
        }
    }

    #[test]
    fn context_for_slot_resolves_metrics_and_section() {
        let brief = Brief {
            scene: Some("Shoppers at a pop-up".into()),
            metric_focus: vec!["footfall_lift".into(), "unknown".into()],
            ..Default::default()
        };
        let ctx = PromptContext::for_slot(
            &Slot::new("Case Study 1"),
            Some(&brief),
            Some("Retail pop-ups"),
            SECTION_STYLES.baseline(),
            &StaticMetricLabels,
        );
        assert_eq!(ctx.metric_labels, vec!["Foot-traffic uplift"]);
        assert_eq!(ctx.token("section"), "Case Study 1");
        assert_eq!(ctx.token("topic"), "Retail pop-ups");
        let snap = ctx.snapshot(&brief.metric_focus);
        assert_eq!(snap["metric_focus"], json!(["footfall_lift", "unknown"]));
        assert_eq!(snap["metric_labels"], json!(["Foot-traffic uplift"]));
    }
}
