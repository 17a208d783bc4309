//! Contract Invariant Tests
//!
//! Properties the report visual path must hold regardless of input.

use proptest::prelude::*;
use std::collections::BTreeSet;

use figureforge_core::{
    audit, inject, lint, render, slug,
    config::{AuditConfig, LintConfig},
    context::ImagePayload,
    manifest::{ManifestEntry, ManifestStore},
    markers::{marker, strip_markers},
    style::SECTION_STYLES,
    templates::{template_ids, PromptContext, TEMPLATE_VERSION},
    validation::has_errors,
    SlotImageMap, SlotKind, VisualStats,
};

const UNIVERSE: &[&str] = &[
    "signal_map",
    "future_outlook",
    "case_study_1",
    "measurement_spine",
    "mystery_slot",
    "typo_map",
];

fn payload(slot: &str) -> ImagePayload {
    ImagePayload {
        slot: Some(slot.to_string()),
        label: Some(slot.replace('_', " ")),
        src: Some(format!("images/{slot}.png")),
        alt: Some(format!("{slot} alt")),
        description: Some("Concentric layout".to_string()),
        metric_labels: vec!["Event CPA".to_string()],
        anchor_section: None,
    }
}

fn entry(slot: &str, version: &str) -> ManifestEntry {
    ManifestEntry {
        kind: SlotKind::Section,
        slot: Some(slot.to_string()),
        section: Some(slot.replace('_', " ")),
        anchor_section: None,
        template: Some("section_editorial_motif".to_string()),
        template_version: Some(version.to_string()),
        context: Default::default(),
        metric_focus: vec!["event_cpa".to_string()],
        alt: None,
        image: format!("images/{slot}.png"),
    }
}

fn subset() -> impl Strategy<Value = BTreeSet<String>> {
    proptest::sample::subsequence(UNIVERSE, 0..=UNIVERSE.len())
        .prop_map(|v| v.into_iter().map(str::to_string).collect())
}

proptest! {
    #[test]
    fn slug_is_idempotent(raw in "\\PC{0,40}") {
        let once = slug(&raw);
        prop_assert_eq!(slug(&once), once);
    }

    #[test]
    fn render_is_deterministic(seed in "[a-zA-Z0-9 -]{0,24}", idx in 0usize..6, section in "[A-Za-z ]{1,20}") {
        let ids: Vec<&str> = template_ids().collect();
        let id = ids[idx % ids.len()];
        let ctx = PromptContext::new(SECTION_STYLES.baseline())
            .with_token("section", section)
            .with_metric_labels(vec!["Event CPA".to_string()]);
        prop_assert_eq!(render(id, &ctx, &seed), render(id, &ctx, &seed));
    }

    #[test]
    fn inject_stats_hold_their_relations(markers in subset(), images in subset()) {
        let text: String = markers
            .iter()
            .map(|m| format!("Paragraph about {m}.\n{}\n", marker(m)))
            .collect();
        let payloads: Vec<ImagePayload> = images.iter().map(|s| payload(s)).collect();
        let map = SlotImageMap::from_payloads(&payloads);
        let (out, stats) = inject(&text, &map);

        prop_assert!(stats.is_consistent());
        prop_assert!(!out.contains("image:"));
        prop_assert_eq!(&stats.anchors_found, &markers);
        let expected_with: BTreeSet<String> = markers.intersection(&images).cloned().collect();
        prop_assert_eq!(&stats.anchors_with_images, &expected_with);
        prop_assert_eq!(stats.gallery_size, images.difference(&expected_with).count());
        prop_assert_eq!(out.matches("<figure").count(), expected_with.len());
    }

    #[test]
    fn inject_is_repeatable(markers in subset(), images in subset(), filler in "[a-zA-Z .\n]{0,40}") {
        let text: String = markers
            .iter()
            .map(|m| format!("{filler}{}\n<!-- image:{m} draft\n", marker(m)))
            .collect();
        let payloads: Vec<ImagePayload> = images.iter().map(|s| payload(s)).collect();
        let map = SlotImageMap::from_payloads(&payloads);
        let first = inject(&text, &map);
        let second = inject(&text, &map);
        prop_assert_eq!(&first, &second);
        prop_assert!(!first.0.contains("<!--"));
    }

    #[test]
    fn lint_errors_iff_coverage_or_catalog_broken(found in subset(), images in subset()) {
        let with_images: BTreeSet<String> = found.intersection(&images).cloned().collect();
        let stats = VisualStats {
            anchors_missing_images: found.difference(&with_images).cloned().collect(),
            anchors_with_images: with_images,
            anchors_found: found,
            ..Default::default()
        };
        let config = LintConfig::default();
        let clean = config.required_anchors.is_subset(&stats.anchors_with_images)
            && stats.anchors_found.is_subset(&config.known_anchors);
        prop_assert_eq!(!has_errors(&lint(&stats, &config)), clean);
    }

    #[test]
    fn text_without_markers_passes_through(text in "[a-zA-Z0-9 .,#\n]{0,200}", images in subset()) {
        let payloads: Vec<ImagePayload> = images.iter().map(|s| payload(s)).collect();
        let (out, stats) = inject(&text, &SlotImageMap::from_payloads(&payloads));
        prop_assert_eq!(out, strip_markers(&text));
        prop_assert!(stats.anchors_found.is_empty());
        prop_assert_eq!(stats.images_without_anchor, images);
    }
}

#[test]
fn scenario_signal_map_placed_lints_clean() {
    let map = SlotImageMap::from_payloads(&[payload("signal_map")]);
    let (out, stats) = inject("## Signal Map\n<!-- image:signal_map -->\nBody", &map);

    assert!(out.contains("data-slot=\"signal_map\""));
    assert_eq!(stats.anchors_with_images, BTreeSet::from(["signal_map".to_string()]));
    assert!(lint(&stats, &LintConfig::default()).is_empty());
}

#[test]
fn scenario_missing_signal_map_is_one_error() {
    let map = SlotImageMap::from_payloads(&[payload("future_outlook")]);
    let (_, stats) = inject("<!-- image:future_outlook -->", &map);
    let issues = lint(&stats, &LintConfig::default());

    assert_eq!(issues.len(), 1);
    assert!(issues[0].is_error());
    assert_eq!(issues[0].message, "Missing required visuals for [\"signal_map\"]");
}

#[test]
fn scenario_stale_template_version_is_one_error() {
    let config = AuditConfig::new("2025-11-29.1");
    let issues = audit(&[entry("signal_map", "old")], &config);
    assert_eq!(issues.len(), 1);
    assert_eq!(
        issues[0].to_string(),
        "ERROR: [#0 slot=signal_map] template_version \"old\" != \"2025-11-29.1\""
    );

    let issues = audit(
        &[entry("signal_map", "old"), entry("future_outlook", "2025-11-29.1")],
        &config,
    );
    assert_eq!(issues.len(), 1);
    assert!(issues[0].message.starts_with("[#0 slot=signal_map]"));
}

#[test]
fn appended_entries_read_back_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = ManifestStore::new(dir.path());
    let written: Vec<ManifestEntry> = ["hero", "signal_map", "case_study_1", "case_study_2"]
        .iter()
        .map(|s| entry(s, TEMPLATE_VERSION))
        .collect();
    for (i, e) in written.iter().enumerate() {
        assert_eq!(store.append(e).unwrap(), i + 1);
    }
    assert_eq!(store.load(), written);
}

#[test]
fn current_manifest_audits_clean() {
    let entries = vec![entry("signal_map", TEMPLATE_VERSION)];
    assert!(!has_errors(&audit(&entries, &AuditConfig::default())));
}
