//! Named cone shape presets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::SideControls;
use crate::geom::BezierShape;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PresetError {
    #[error("unknown shape preset `{name}`{}", suggestion.as_ref().map(|s| format!(", did you mean `{s}`?")).unwrap_or_default())]
    Unknown { name: String, suggestion: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapePreset {
    pub name: String,
    pub base_cone_shape: BezierShape,
    pub nose_cone_shape: BezierShape,
    pub base_cone_segments: u32,
    pub nose_cone_segments: u32,
    pub nose_height_ratio: f64,
}

impl Default for ShapePreset {
    fn default() -> Self {
        Self {
            name: "Conic".into(),
            base_cone_shape: BezierShape::new(0.3, 0.3, 0.7, 0.7),
            nose_cone_shape: BezierShape::new(0.1, 0.0, 0.7, 0.7),
            base_cone_segments: 7,
            nose_cone_segments: 11,
            nose_height_ratio: 2.0,
        }
    }
}

impl ShapePreset {
    /// Overwrite the cone controls of `controls` with this preset.
    pub fn apply(&self, controls: &mut SideControls) {
        controls.cone.base_cone_shape = self.base_cone_shape;
        controls.cone.nose_cone_shape = self.nose_cone_shape;
        controls.cone.base_cone_segments = self.base_cone_segments;
        controls.cone.nose_cone_segments = self.nose_cone_segments;
        controls.cone.nose_height_ratio = self.nose_height_ratio;
    }
}

/// Lookup table built once and shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapePresetTable {
    presets: BTreeMap<String, ShapePreset>,
}

impl Default for ShapePresetTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ShapePresetTable {
    #[must_use]
    pub fn builtin() -> Self {
        let ogive = ShapePreset {
            name: "Ogive".into(),
            base_cone_shape: BezierShape::new(0.3, 0.3, 0.7, 0.7),
            nose_cone_shape: BezierShape::new(0.5, 0.0, 1.0, 0.5),
            base_cone_segments: 7,
            nose_cone_segments: 11,
            nose_height_ratio: 2.0,
        };
        Self::from_presets([ShapePreset::default(), ogive])
    }

    /// Later entries replace earlier ones with the same name.
    #[must_use]
    pub fn from_presets(presets: impl IntoIterator<Item = ShapePreset>) -> Self {
        Self {
            presets: presets.into_iter().map(|p| (p.name.clone(), p)).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.presets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Result<&ShapePreset, PresetError> {
        self.presets.get(name).ok_or_else(|| PresetError::Unknown {
            name: name.to_owned(),
            suggestion: self.closest(name),
        })
    }

    fn closest(&self, name: &str) -> Option<String> {
        let wanted = name.to_lowercase();
        self.presets
            .keys()
            .map(|k| (levenshtein::levenshtein(&wanted, &k.to_lowercase()), k))
            .filter(|(d, k)| *d <= k.len() / 2 + 1)
            .min_by_key(|(d, _)| *d)
            .map(|(_, k)| k.clone())
    }
}
