//! AI restyle presets.
//!
//! The catalog is built once at startup and shared immutably afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::Error;

const DEFAULT_NEGATIVE: &str =
    "blurry, low quality, distorted face, extra limbs, watermark, text, deformed";

/// One restyle preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSpec {
    pub key: String,
    pub name: String,
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: String,
    pub model: String,
}

/// What the caller asked for: a specific style or any of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleChoice {
    Named(String),
    Random,
}

impl FromStr for StyleChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::Validation("style is required".into()));
        }
        if s.eq_ignore_ascii_case("random") {
            Ok(Self::Random)
        } else {
            Ok(Self::Named(s.to_ascii_lowercase()))
        }
    }
}

/// Immutable mapping from style key to preset.
#[derive(Debug, Clone, Default)]
pub struct StyleCatalog {
    styles: BTreeMap<String, StyleSpec>,
}

static BUILTIN: LazyLock<StyleCatalog> = LazyLock::new(|| {
    let model = "stabilityai/stable-diffusion-xl-refiner-1.0";
    let entries = [
        (
            "anime",
            "Anime",
            "anime style portrait, studio ghibli inspired, vibrant colors, clean line art",
        ),
        (
            "comic",
            "Comic Book",
            "comic book illustration, bold ink outlines, halftone shading, dynamic colors",
        ),
        (
            "watercolor",
            "Watercolor",
            "soft watercolor painting, delicate brush strokes, pastel palette, paper texture",
        ),
        (
            "cyberpunk",
            "Cyberpunk",
            "cyberpunk portrait, neon lights, rainy night city, cinematic lighting",
        ),
        (
            "oil",
            "Oil Painting",
            "classical oil painting portrait, renaissance lighting, rich textured canvas",
        ),
        (
            "pixar",
            "3D Cartoon",
            "3d animated movie character, soft global illumination, expressive features",
        ),
    ];
    StyleCatalog::from_specs(entries.into_iter().map(|(key, name, prompt)| StyleSpec {
        key: key.into(),
        name: name.into(),
        prompt: prompt.into(),
        negative_prompt: DEFAULT_NEGATIVE.into(),
        model: model.into(),
    }))
});

impl StyleCatalog {
    /// Build a catalog from presets; later entries replace earlier ones.
    pub fn from_specs(specs: impl IntoIterator<Item = StyleSpec>) -> Self {
        let styles = specs
            .into_iter()
            .map(|s| (s.key.to_ascii_lowercase(), s))
            .collect();
        Self { styles }
    }

    /// The presets shipped with the binary.
    pub fn builtin() -> &'static StyleCatalog {
        &BUILTIN
    }

    /// Builtin presets extended (or overridden) by configured ones.
    pub fn with_overrides(overrides: &[StyleSpec]) -> Self {
        Self::from_specs(
            Self::builtin()
                .styles
                .values()
                .cloned()
                .chain(overrides.iter().cloned()),
        )
    }

    pub fn get(&self, key: &str) -> Option<&StyleSpec> {
        self.styles.get(&key.to_ascii_lowercase())
    }

    /// Presets ordered by key.
    pub fn all(&self) -> Vec<&StyleSpec> {
        self.styles.values().collect()
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}
