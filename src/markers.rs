//! Anchor markers - `<!-- image:<slug> -->` tokens in article text
//!
//! Scanning is a pure tokenizer over the text; substitution happens in a
//! single pass in `inject`.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<!--\s*image:([a-z0-9_-]+)\s*-->").expect("marker pattern"));

// Anything that starts like a marker, including malformed ones.
static STRAY_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<!--\s*image:[^>]*?-->").expect("stray marker pattern"));

// An opener that never closes runs to the end of its line.
static UNCLOSED_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<!--\s*image:[^\n]*").expect("unclosed marker pattern"));

/// One marker in document order. `start..end` is the byte span of the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerOccurrence {
    pub slug: String,
    pub start: usize,
    pub end: usize,
}

pub fn scan_markers(text: &str) -> Vec<MarkerOccurrence> {
    MARKER_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let slug = caps.get(1)?.as_str().to_lowercase();
            Some(MarkerOccurrence {
                slug,
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// Remove every marker token, well-formed or not, including unclosed openers.
///
/// Only apply this to article text. Spliced output can pair an unclosed
/// opener with a later `-->` and hide everything in between.
pub fn strip_markers(text: &str) -> String {
    let closed = STRAY_MARKER_RE.replace_all(text, "");
    UNCLOSED_MARKER_RE.replace_all(&closed, "").into_owned()
}

pub fn marker(slug: &str) -> String {
    format!("<!-- image:{} -->", slug)
}

pub fn has_marker(text: &str, slug: &str) -> bool {
    scan_markers(text).iter().any(|m| m.slug == slug)
}

/// Insert `<!-- image:<anchor> -->` right after the first line matching
/// `heading_pattern` (multi-line, case-insensitive). No-op when the anchor
/// is already present or the heading is missing.
pub fn ensure_anchor_after_heading(markdown: &str, anchor: &str, heading_pattern: &str) -> String {
    if has_marker(markdown, anchor) {
        return markdown.to_string();
    }
    let heading = match Regex::new(&format!("(?im){}", heading_pattern)) {
        Ok(re) => re,
        Err(e) => {
            debug!(anchor, pattern = heading_pattern, error = %e, "invalid heading pattern");
            return markdown.to_string();
        }
    };
    let Some(found) = heading.find(markdown) else {
        debug!(anchor, pattern = heading_pattern, "heading missing; anchor not inserted");
        return markdown.to_string();
    };
    // Insert after the full heading line, not mid-line.
    let line_end = markdown[found.end()..]
        .find('\n')
        .map(|i| found.end() + i)
        .unwrap_or(markdown.len());
    let mut out = String::with_capacity(markdown.len() + anchor.len() + 24);
    out.push_str(&markdown[..line_end]);
    out.push_str("\n\n");
    out.push_str(&marker(anchor));
    out.push_str(&markdown[line_end..]);
    out
}

/// Standard anchors: signal map, future outlook, and one per case title
/// (`case_study_1`, `case_study_2`, ...) under its `###` heading.
pub fn insert_default_anchors(markdown: &str, case_titles: &[String]) -> String {
    if markdown.is_empty() {
        return String::new();
    }
    let mut updated = ensure_anchor_after_heading(markdown, "signal_map", r"^##\s+Signal Map\b");
    updated = ensure_anchor_after_heading(&updated, "future_outlook", r"^##\s+Future Outlook\b");
    for (idx, title) in case_titles.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).enumerate() {
        let anchor = format!("case_study_{}", idx + 1);
        let pattern = format!(r"^###\s+{}", regex::escape(title));
        updated = ensure_anchor_after_heading(&updated, &anchor, &pattern);
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_in_document_order_case_insensitive() {
        let text = "a <!-- image:Signal_Map --> b <!--IMAGE:case_study_1--> c";
        let found = scan_markers(text);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].slug, "signal_map");
        assert_eq!(found[1].slug, "case_study_1");
        assert_eq!(&text[found[0].start..found[0].end], "<!-- image:Signal_Map -->");
    }

    #[test]
    fn strip_removes_malformed_tokens() {
        let text = "x <!-- image:Signal Map --> y <!-- image: --> z <!-- note -->";
        assert!(scan_markers(text).is_empty());
        assert_eq!(strip_markers(text), "x  y  z <!-- note -->");
    }

    #[test]
    fn strip_removes_unclosed_opener_to_line_end() {
        let text = "Intro <!-- image:Signal Map draft\nNext line";
        assert_eq!(strip_markers(text), "Intro \nNext line");
    }

    #[test]
    fn anchor_inserted_after_heading_line() {
        let md = "# Report\n\n## Signal Map\nBody text.";
        let out = ensure_anchor_after_heading(md, "signal_map", r"^##\s+Signal Map\b");
        assert_eq!(out, "# Report\n\n## Signal Map\n\n<!-- image:signal_map -->\nBody text.");
        assert_eq!(ensure_anchor_after_heading(&out, "signal_map", r"^##\s+Signal Map\b"), out);
    }

    #[test]
    fn default_anchors_cover_cases() {
        let md = "## Signal Map\n\n### Flagship sessions (pilot)\ntext\n## Future Outlook\n";
        let out = insert_default_anchors(md, &["Flagship sessions (pilot)".to_string()]);
        assert!(has_marker(&out, "signal_map"));
        assert!(has_marker(&out, "future_outlook"));
        assert!(has_marker(&out, "case_study_1"));
    }

    #[test]
    fn missing_heading_is_noop() {
        let md = "# Just a title";
        assert_eq!(insert_default_anchors(md, &[]), md);
    }
}
