//! Style variants - per-kind catalogs and the volatile picker
//!
//! Style selection is intentionally NOT reproducible: regenerating a report
//! should be free to land on a different framing or light. Phrasing
//! reproducibility lives in `templates` and uses its own generator.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::hashing::style_seed_component;
use crate::slots::SlotKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StyleVariant {
    pub framing: String,
    pub lighting: String,
    pub palette: String,
    pub geometry: String,
    pub environment: String,
}

/// Enumerated options for each style axis.
#[derive(Debug)]
pub struct StyleCatalog {
    pub framing: &'static [&'static str],
    pub lighting: &'static [&'static str],
    pub palette: &'static [&'static str],
    pub geometry: &'static [&'static str],
    pub environment: &'static [&'static str],
}

impl StyleCatalog {
    pub fn contains(&self, variant: &StyleVariant) -> bool {
        self.framing.contains(&variant.framing.as_str())
            && self.lighting.contains(&variant.lighting.as_str())
            && self.palette.contains(&variant.palette.as_str())
            && self.geometry.contains(&variant.geometry.as_str())
            && self.environment.contains(&variant.environment.as_str())
    }

    /// First option on every axis.
    pub fn baseline(&self) -> StyleVariant {
        let first = |axis: &[&str]| axis.first().copied().unwrap_or_default().to_string();
        StyleVariant {
            framing: first(self.framing),
            lighting: first(self.lighting),
            palette: first(self.palette),
            geometry: first(self.geometry),
            environment: first(self.environment),
        }
    }
}

pub static HERO_STYLES: StyleCatalog = StyleCatalog {
    framing: &[
        "eye-level three-quarter view",
        "slight low-angle view",
        "high overhead view",
        "rule-of-thirds composition with the subject left of frame",
        "asymmetric composition with the subject right of frame",
    ],
    lighting: &[
        "soft side light from a tall window",
        "gentle back light with a pale halo",
        "even overcast daylight",
        "directional morning light",
    ],
    palette: &[
        "cool slate and steel",
        "muted graphite with a single teal accent",
        "pale stone and fog grey",
        "blue-grey with warm brass highlights",
    ],
    geometry: &[
        "clean architectural lines",
        "long leading diagonals",
        "stacked horizontal planes",
        "a single strong vertical",
    ],
    environment: &[
        "a quiet corporate atrium",
        "an empty research lab",
        "a glass-walled meeting room",
        "a calm data center aisle",
        "a sunlit manufacturing floor",
    ],
};

pub static SECTION_STYLES: StyleCatalog = StyleCatalog {
    framing: &[
        "flat orthographic view",
        "isometric view",
        "exploded view",
        "centered radial view",
    ],
    lighting: &[
        "soft ambient gradient",
        "paper-white flat light",
        "low-contrast dusk tone",
    ],
    palette: &[
        "cool slate and steel",
        "ink blue on off-white",
        "graphite with one coral accent",
        "sea-glass greens and greys",
    ],
    geometry: &[
        "hub-and-spoke network",
        "concentric rings",
        "loose organic clusters",
        "layered grid",
        "thin flowing lines",
    ],
    environment: &[
        "an open white field",
        "a faint blueprint grid",
        "soft paper texture",
    ],
};

pub fn catalog_for(kind: SlotKind) -> &'static StyleCatalog {
    match kind {
        SlotKind::Hero => &HERO_STYLES,
        SlotKind::Section => &SECTION_STYLES,
    }
}

/// Volatile style generator: OS entropy mixed with the report seed hash.
pub struct StylePicker {
    rng: StdRng,
}

impl StylePicker {
    pub fn volatile(seed: &str) -> Self {
        let entropy: u64 = rand::random();
        Self {
            rng: StdRng::seed_from_u64(entropy ^ style_seed_component(seed)),
        }
    }

    pub fn pick(&mut self, kind: SlotKind) -> StyleVariant {
        let catalog = catalog_for(kind);
        StyleVariant {
            framing: self.choose(catalog.framing),
            lighting: self.choose(catalog.lighting),
            palette: self.choose(catalog.palette),
            geometry: self.choose(catalog.geometry),
            environment: self.choose(catalog.environment),
        }
    }

    fn choose(&mut self, axis: &[&str]) -> String {
        axis.choose(&mut self.rng).copied().unwrap_or_default().to_string()
    }
}
