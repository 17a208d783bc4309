//! Generation Pipeline - brief to manifest entry
//!
//! For each slot: pick a style (volatile), render the prompt (deterministic),
//! hand it to the synthesizer, write the image, then append provenance.
//! Every image on disk written here has a manifest entry.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::briefs::{Briefs, MetricLabeler, StaticMetricLabels};
use crate::config::anchor_section_for;
use crate::hashing::sha256_hex;
use crate::manifest::{ManifestEntry, ManifestError, ManifestStore};
use crate::slots::{slug, Slot, SlotKind};
use crate::style::StylePicker;
use crate::templates::{render, template_for_slot, PromptContext, TEMPLATE_VERSION};

pub const GPT_IMAGE_SIZES: &[&str] = &["1024x1024", "1536x1024", "1024x1536"];
pub const DALLE_SIZES: &[&str] = &["1024x1024", "1792x1024", "1024x1792"];

/// Error reported by a synthesizer implementation.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SynthesisError(pub String);

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Image synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Image payload could not be decoded: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Synthesis returned no image data")]
    EmptyImage,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub model: String,
    pub prompt: String,
    pub size: String,
}

/// Raw image bytes, or the base64 text some services return instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutput {
    Bytes(Vec<u8>),
    Base64(String),
}

impl SynthesisOutput {
    pub fn into_bytes(self) -> Result<Vec<u8>, PipelineError> {
        let bytes = match self {
            SynthesisOutput::Bytes(b) => b,
            SynthesisOutput::Base64(s) => {
                base64::engine::general_purpose::STANDARD.decode(s.trim())?
            }
        };
        if bytes.is_empty() {
            return Err(PipelineError::EmptyImage);
        }
        Ok(bytes)
    }
}

/// The external image service.
pub trait ImageSynthesizer {
    fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisOutput, SynthesisError>;
}

/// Sizes outside what a model accepts fall back to its landscape size.
pub fn normalize_size(model: &str, size: &str) -> String {
    if model == "gpt-image-1" && !GPT_IMAGE_SIZES.contains(&size) {
        warn!(model, size, "size not valid for model; using 1536x1024");
        return "1536x1024".to_string();
    }
    if model.starts_with("dall-e") && !DALLE_SIZES.contains(&size) {
        warn!(model, size, "size not valid for model; using 1792x1024");
        return "1792x1024".to_string();
    }
    size.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineSettings {
    pub model: String,
    pub size: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            model: "gpt-image-1".to_string(),
            size: "1536x1024".to_string(),
        }
    }
}

/// What one successful generation produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub prompt: String,
    pub prompt_hash: String,
    pub entry: ManifestEntry,
}

#[derive(Debug, Default)]
pub struct GenerationSummary {
    pub records: Vec<GenerationRecord>,
    pub failures: Vec<(String, PipelineError)>,
}

pub struct VisualPipeline<S: ImageSynthesizer> {
    synthesizer: S,
    labeler: Box<dyn MetricLabeler>,
    settings: PipelineSettings,
}

impl<S: ImageSynthesizer> VisualPipeline<S> {
    pub fn new(synthesizer: S) -> Self {
        Self {
            synthesizer,
            labeler: Box::new(StaticMetricLabels),
            settings: PipelineSettings::default(),
        }
    }

    pub fn with_labeler(mut self, labeler: Box<dyn MetricLabeler>) -> Self {
        self.labeler = labeler;
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Generate one slot image and record it in the report's manifest.
    pub fn generate_slot(
        &self,
        report_dir: &Path,
        slot: &Slot,
        briefs: &Briefs,
        topic: Option<&str>,
        seed: &str,
    ) -> Result<GenerationRecord, PipelineError> {
        let brief = briefs.for_slot(slot);
        let style = StylePicker::volatile(seed).pick(slot.kind());
        let context = PromptContext::for_slot(slot, brief, topic, style, self.labeler.as_ref());
        let template_id = template_for_slot(slot);
        let prompt = render(template_id, &context, seed);

        let request = SynthesisRequest {
            model: self.settings.model.clone(),
            prompt: prompt.clone(),
            size: normalize_size(&self.settings.model, &self.settings.size),
        };
        info!(slot = %slot, template = template_id, model = %request.model, size = %request.size, "requesting image");
        let bytes = self.synthesizer.synthesize(&request)?.into_bytes()?;

        let images_dir = report_dir.join("images");
        fs::create_dir_all(&images_dir).map_err(|source| PipelineError::Io {
            path: images_dir.clone(),
            source,
        })?;
        let filename = image_filename(slot, seed);
        let file_path = images_dir.join(&filename);
        fs::write(&file_path, &bytes).map_err(|source| PipelineError::Io {
            path: file_path.clone(),
            source,
        })?;

        let metric_focus = brief.map(|b| b.metric_focus().to_vec()).unwrap_or_default();
        let entry = ManifestEntry {
            kind: slot.kind(),
            slot: Some(slot.key.clone()),
            section: match slot.kind() {
                SlotKind::Hero => None,
                SlotKind::Section => Some(slot.label.clone()),
            },
            anchor_section: brief
                .and_then(|b| b.anchor_section.clone())
                .or_else(|| anchor_section_for(&slot.key).map(str::to_string))
                .or_else(|| (slot.kind() == SlotKind::Hero).then(|| "header".to_string())),
            template: Some(template_id.to_string()),
            template_version: Some(TEMPLATE_VERSION.to_string()),
            context: context.snapshot(&metric_focus),
            metric_focus,
            alt: brief.and_then(|b| b.alt.clone()),
            image: format!("images/{}", filename),
        };
        if let Err(e) = ManifestStore::new(report_dir).append(&entry) {
            // No image without provenance.
            if let Err(rm) = fs::remove_file(&file_path) {
                warn!(path = %file_path.display(), error = %rm, "could not remove unrecorded image");
            }
            return Err(e.into());
        }

        let record = GenerationRecord {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            prompt_hash: sha256_hex(prompt.as_bytes()),
            prompt,
            entry,
        };
        info!(slot = %slot, image = %record.entry.image, bytes = bytes.len(), id = %record.id, "image recorded");
        Ok(record)
    }

    /// Generate slots in order. A failed slot is logged and skipped; the
    /// report carries on without it.
    pub fn generate_all(
        &self,
        report_dir: &Path,
        slots: &[Slot],
        briefs: &Briefs,
        topic: Option<&str>,
        seed: &str,
    ) -> GenerationSummary {
        let mut summary = GenerationSummary::default();
        for slot in slots {
            match self.generate_slot(report_dir, slot, briefs, topic, seed) {
                Ok(record) => summary.records.push(record),
                Err(e) => {
                    warn!(slot = %slot, error = %e, "image generation failed; continuing without it");
                    summary.failures.push((slot.key.clone(), e));
                }
            }
        }
        summary
    }
}

/// `<slot>_<seed slug, 30 chars max>.png`
pub fn image_filename(slot: &Slot, seed: &str) -> String {
    let seed_slug: String = slug(seed).chars().take(30).collect();
    let seed_slug = seed_slug.trim_end_matches('_');
    if seed_slug.is_empty() {
        format!("{}.png", slot.key)
    } else {
        format!("{}_{}.png", slot.key, seed_slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::briefs::Brief;
    use crate::manifest;
    use std::cell::RefCell;
    use tempfile::tempdir;

    struct FakeSynth {
        output: SynthesisOutput,
        seen: RefCell<Vec<SynthesisRequest>>,
    }

    impl ImageSynthesizer for FakeSynth {
        fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisOutput, SynthesisError> {
            self.seen.borrow_mut().push(request.clone());
            Ok(self.output.clone())
        }
    }

    struct FailingSynth;

    impl ImageSynthesizer for FailingSynth {
        fn synthesize(&self, _request: &SynthesisRequest) -> Result<SynthesisOutput, SynthesisError> {
            Err(SynthesisError("request timed out".into()))
        }
    }

    fn briefs() -> Briefs {
        let mut b = Briefs::new();
        b.insert(
            "signal_map",
            Brief {
                structure: Some("Concentric layout".into()),
                metric_focus: vec!["footfall_lift".into()],
                alt: Some("Signal alt".into()),
                ..Default::default()
            },
        );
        b
    }

    #[test]
    fn generation_writes_image_and_manifest() {
        let dir = tempdir().unwrap();
        let synth = FakeSynth {
            output: SynthesisOutput::Base64("iVBORw0KGgo=".into()),
            seen: RefCell::new(vec![]),
        };
        let pipeline = VisualPipeline::new(synth);
        let record = pipeline
            .generate_slot(dir.path(), &Slot::new("Signal Map"), &briefs(), Some("Retail pop-ups"), "Retail Pop-ups 2025")
            .unwrap();

        assert_eq!(record.entry.image, "images/signal_map_retail_pop_ups_2025.png");
        assert!(dir.path().join(&record.entry.image).exists());
        assert_eq!(record.entry.template.as_deref(), Some("signal_map_constellation"));
        assert_eq!(record.entry.template_version.as_deref(), Some(TEMPLATE_VERSION));
        assert_eq!(record.entry.anchor_section.as_deref(), Some("signals_and_thesis"));
        assert_eq!(record.entry.metric_focus, vec!["footfall_lift"]);
        assert!(record.prompt.contains("Concentric layout"));
        assert_eq!(record.prompt_hash, sha256_hex(record.prompt.as_bytes()));

        let entries = manifest::load(dir.path());
        assert_eq!(entries, vec![record.entry.clone()]);
        let seen = pipeline.synthesizer.seen.borrow();
        assert_eq!(seen[0].model, "gpt-image-1");
        assert_eq!(seen[0].size, "1536x1024");
    }

    #[test]
    fn image_removed_when_manifest_write_fails() {
        let dir = tempdir().unwrap();
        // A directory where the manifest file should be makes the append fail.
        fs::create_dir_all(manifest::manifest_path(dir.path())).unwrap();
        let synth = FakeSynth {
            output: SynthesisOutput::Bytes(vec![1, 2, 3]),
            seen: RefCell::new(vec![]),
        };
        let pipeline = VisualPipeline::new(synth);
        let result = pipeline.generate_slot(dir.path(), &Slot::hero(), &Briefs::new(), None, "seed");

        assert!(matches!(result, Err(PipelineError::Manifest(_))));
        assert!(!dir.path().join("images").join("hero_seed.png").exists());
    }

    #[test]
    fn failed_slots_are_skipped() {
        let dir = tempdir().unwrap();
        let pipeline = VisualPipeline::new(FailingSynth);
        let summary = pipeline.generate_all(dir.path(), &[Slot::hero()], &Briefs::new(), None, "seed");
        assert!(summary.records.is_empty());
        assert_eq!(summary.failures.len(), 1);
        assert!(manifest::load(dir.path()).is_empty());
    }

    #[test]
    fn empty_or_bad_payloads_are_errors() {
        assert!(matches!(SynthesisOutput::Bytes(vec![]).into_bytes(), Err(PipelineError::EmptyImage)));
        assert!(matches!(
            SynthesisOutput::Base64("***".into()).into_bytes(),
            Err(PipelineError::Decode(_))
        ));
    }

    #[test]
    fn sizes_normalize_per_model() {
        assert_eq!(normalize_size("gpt-image-1", "1792x1024"), "1536x1024");
        assert_eq!(normalize_size("gpt-image-1", "1024x1536"), "1024x1536");
        assert_eq!(normalize_size("dall-e-3", "1536x1024"), "1792x1024");
        assert_eq!(normalize_size("other", "640x480"), "640x480");
    }

    #[test]
    fn filenames_from_seed() {
        assert_eq!(image_filename(&Slot::hero(), "!!!"), "hero.png");
        let long = image_filename(&Slot::hero(), "a very long report query that keeps on going");
        assert!(long.len() <= "hero_".len() + 30 + ".png".len());
        assert!(!long.contains("_.png"));
    }
}
