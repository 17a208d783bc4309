//! Anchor Injector - inline figures at anchor markers
//!
//! `inject` is a pure function of (text, slot map): no I/O, no hidden state,
//! same output for the same input.

use std::collections::{BTreeMap, BTreeSet};

use crate::context::{humanize, ImageContext, ImagePayload};
use crate::markers::{scan_markers, strip_markers};
use crate::stats::VisualStats;

/// Slot images keyed by slug. Payloads without a source are never admitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotImageMap {
    images: BTreeMap<String, ImagePayload>,
}

impl SlotImageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// First payload wins when two normalize to the same slug.
    pub fn from_payloads<'a>(payloads: impl IntoIterator<Item = &'a ImagePayload>) -> Self {
        let mut map = Self::new();
        for payload in payloads {
            map.insert(payload.clone());
        }
        map
    }

    /// Section images only; the hero is placed above the article by the caller.
    pub fn from_context(context: &ImageContext) -> Self {
        Self::from_payloads(&context.sections)
    }

    /// Returns false when the payload was discarded (no source, no usable
    /// slug, or slug already taken).
    pub fn insert(&mut self, payload: ImagePayload) -> bool {
        if payload.source().is_none() {
            return false;
        }
        let Some(key) = payload.key() else {
            return false;
        };
        if self.images.contains_key(&key) {
            return false;
        }
        self.images.insert(key, payload);
        true
    }

    pub fn get(&self, slug: &str) -> Option<&ImagePayload> {
        self.images.get(slug)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.images.keys()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Replace anchor markers with inline figures and report what happened.
pub fn inject(article_text: &str, images: &SlotImageMap) -> (String, VisualStats) {
    let markers = scan_markers(article_text);
    let all_keys: BTreeSet<String> = images.keys().cloned().collect();

    if markers.is_empty() {
        let stats = VisualStats {
            gallery_size: all_keys.len(),
            images_without_anchor: all_keys,
            ..Default::default()
        };
        return (strip_markers(article_text), stats);
    }

    let mut found = BTreeSet::new();
    let mut with_images = BTreeSet::new();
    let mut out = String::with_capacity(article_text.len() + markers.len() * 256);
    let mut cursor = 0;
    for marker in &markers {
        out.push_str(&strip_markers(&article_text[cursor..marker.start]));
        found.insert(marker.slug.clone());
        if let Some(payload) = images.get(&marker.slug) {
            out.push_str(&render_figure(&marker.slug, payload, "inline-visual"));
            with_images.insert(marker.slug.clone());
        }
        cursor = marker.end;
    }
    out.push_str(&strip_markers(&article_text[cursor..]));

    let anchors_missing_images = found.difference(&with_images).cloned().collect();
    let images_without_anchor: BTreeSet<String> = all_keys.difference(&found).cloned().collect();
    let gallery_size = all_keys.difference(&with_images).count();
    let stats = VisualStats {
        anchors_found: found,
        anchors_with_images: with_images,
        anchors_missing_images,
        images_without_anchor,
        gallery_size,
    };
    (out, stats)
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// `<figure>` for one payload; every text field is escaped.
pub fn render_figure(slug: &str, payload: &ImagePayload, class: &str) -> String {
    let src = payload.source().unwrap_or_default();
    let label = non_empty(&payload.label)
        .map(str::to_string)
        .unwrap_or_else(|| humanize(slug));
    let alt = non_empty(&payload.alt).unwrap_or(&label);

    let mut caption = format!("<strong>{}</strong>", escape_html(&label));
    if let Some(description) = non_empty(&payload.description) {
        caption.push_str(&format!(
            "<span class=\"visual-description\">{}</span>",
            escape_html(description)
        ));
    }
    let chips: Vec<String> = payload
        .metric_labels
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .map(|m| format!("<span class=\"metric-chip\">{}</span>", escape_html(m)))
        .collect();
    if !chips.is_empty() {
        caption.push_str(&format!(
            "<span class=\"visual-focus\">Focus: {}</span>",
            chips.join(" ")
        ));
    }

    format!(
        "<figure class=\"{}\" data-slot=\"{}\">\n  <img src=\"{}\" alt=\"{}\" loading=\"lazy\">\n  <figcaption>{}</figcaption>\n</figure>",
        escape_html(class),
        escape_html(slug),
        escape_html(src),
        escape_html(alt),
        caption
    )
}

/// Section images still eligible for the end-of-document recap: anything
/// not already placed inline.
pub fn gallery_candidates<'a>(sections: &'a [ImagePayload], stats: &VisualStats) -> Vec<&'a ImagePayload> {
    sections
        .iter()
        .filter(|p| p.source().is_some())
        .filter(|p| match p.key() {
            Some(key) => !stats.anchors_with_images.contains(&key),
            None => false,
        })
        .collect()
}

/// "Visual Notes" recap. Empty string when there is nothing to show.
pub fn render_gallery(candidates: &[&ImagePayload]) -> String {
    let figures: Vec<String> = candidates
        .iter()
        .filter_map(|p| p.key().map(|key| render_figure(&key, p, "gallery-visual")))
        .collect();
    if figures.is_empty() {
        return String::new();
    }
    format!(
        "<section class=\"visual-gallery\">\n<h2>Visual Notes</h2>\n{}\n</section>",
        figures.join("\n")
    )
}
