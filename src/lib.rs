//! FigureForge Core - report visuals
//!
//! # Guarantees
//! 1. Same template, context and seed render the same prompt
//! 2. Every generated image has a manifest entry; entries are never rewritten
//! 3. Injection is a pure function of article text and slot images
//! 4. No anchor marker survives into rendered output
//! 5. Lint and audit report; callers decide what an ERROR blocks

pub mod hashing;
pub mod slots;
pub mod briefs;
pub mod style;
pub mod templates;
pub mod manifest;
pub mod config;
pub mod context;
pub mod markers;
pub mod stats;
pub mod inject;
pub mod validation;
pub mod qc;
pub mod pipeline;

pub use slots::{slug, Slot, SlotKind};
pub use briefs::{Brief, Briefs, MetricLabeler, StaticMetricLabels};
pub use templates::{render, PromptContext, TEMPLATE_VERSION};
pub use manifest::{ManifestEntry, ManifestError, ManifestStore};
pub use config::{AuditConfig, LintConfig, VisualConfig};
pub use context::{build_image_context, ImageContext, ImagePayload};
pub use stats::{Completeness, VisualStats};
pub use inject::{inject, SlotImageMap};
pub use validation::{audit, audit_raw, lint, Issue, Severity};
pub use pipeline::{ImageSynthesizer, PipelineError, VisualPipeline};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
