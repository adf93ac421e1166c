//! Loader for the fairing settings document: shape presets and the scanner's
//! collider tag denylist.
//!
//! ```xml
//! <ProceduralFairingsSettings defaultPreset="Conic">
//!   <FairingSideShapePreset name="Conic" baseConeShape="0.3, 0.3, 0.7, 0.7"
//!       noseConeShape="0.1, 0, 0.7, 0.7" baseConeSegments="7"
//!       noseConeSegments="11" noseHeightRatio="2" />
//!   <Scanner>
//!     <IgnoreColliderTag pattern="Ladder*" />
//!   </Scanner>
//! </ProceduralFairingsSettings>
//! ```

use quick_xml::de::from_str;
use serde::Deserialize;
use thiserror::Error;

use crate::fairing::{ColliderFilter, PresetError, ShapePreset, ShapePresetTable};
use crate::geom::BezierShape;

pub type SettingsResult<T> = Result<T, SettingsError>;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings XML: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("`{field}` of preset `{preset}` is not four numbers: `{value}`")]
    InvalidVector { preset: String, field: &'static str, value: String },
    #[error(transparent)]
    UnknownPreset(#[from] PresetError),
}

/// Everything the settings document configures.
#[derive(Debug, Clone)]
pub struct FairingSettings {
    pub presets: ShapePresetTable,
    pub filter: ColliderFilter,
    /// Preset new sides start from.
    pub default_preset: String,
}

impl Default for FairingSettings {
    fn default() -> Self {
        Self {
            presets: ShapePresetTable::builtin(),
            filter: ColliderFilter::default(),
            default_preset: ShapePreset::default().name,
        }
    }
}

/// Parse a settings document. Without any preset element the built-in table
/// is used; without a `<Scanner>` element the default denylist applies.
pub fn parse_settings(input: &str) -> SettingsResult<FairingSettings> {
    let document: SettingsDocument = from_str(strip_xml_preamble(input))?;

    let presets = if document.presets.is_empty() {
        ShapePresetTable::builtin()
    } else {
        let mut seen = Vec::with_capacity(document.presets.len());
        for raw in document.presets {
            let preset = raw.into_preset()?;
            if seen.iter().any(|p: &ShapePreset| p.name == preset.name) {
                log::warn!("duplicate shape preset `{}` ignored", preset.name);
                continue;
            }
            seen.push(preset);
        }
        ShapePresetTable::from_presets(seen)
    };

    let filter = match document.scanner {
        Some(scanner) => {
            let patterns: Vec<&str> = scanner.ignore.iter().map(|t| t.pattern.trim()).collect();
            ColliderFilter::new(&patterns)
        }
        None => ColliderFilter::default(),
    };

    let default_preset = match document.default_preset {
        Some(name) => presets.get(&name)?.name.clone(),
        None => presets
            .names()
            .next()
            .map_or_else(|| ShapePreset::default().name, str::to_owned),
    };

    log::debug!(
        "settings: {} presets, {} ignored collider tags, default `{default_preset}`",
        presets.len(),
        filter.patterns().len()
    );

    Ok(FairingSettings { presets, filter, default_preset })
}

fn strip_xml_preamble(input: &str) -> &str {
    let trimmed = input.trim_start_matches(|c: char| c == '\u{feff}' || c.is_whitespace());
    if let Some(rest) = trimmed.strip_prefix("<?xml") {
        if let Some(idx) = rest.find("?>") {
            return rest[idx + 2..].trim_start();
        }
    }
    trimmed
}

/// `"0.3, 0.3, 0.7, 0.7"` (commas and/or whitespace) into a shape.
fn parse_vector(preset: &str, field: &'static str, value: &str) -> SettingsResult<BezierShape> {
    let invalid = || SettingsError::InvalidVector {
        preset: preset.to_owned(),
        field,
        value: value.to_owned(),
    };
    let numbers = value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;
    let [a, b, c, d] = numbers[..] else {
        return Err(invalid());
    };
    Ok(BezierShape::new(a, b, c, d))
}

#[derive(Debug, Deserialize)]
struct SettingsDocument {
    #[serde(default, rename = "@defaultPreset")]
    default_preset: Option<String>,
    #[serde(default, rename = "FairingSideShapePreset")]
    presets: Vec<PresetXml>,
    #[serde(default, rename = "Scanner")]
    scanner: Option<ScannerXml>,
}

#[derive(Debug, Deserialize)]
struct PresetXml {
    #[serde(rename = "@name")]
    name: String,
    #[serde(default, rename = "@baseConeShape")]
    base_cone_shape: Option<String>,
    #[serde(default, rename = "@noseConeShape")]
    nose_cone_shape: Option<String>,
    #[serde(default, rename = "@baseConeSegments")]
    base_cone_segments: Option<u32>,
    #[serde(default, rename = "@noseConeSegments")]
    nose_cone_segments: Option<u32>,
    #[serde(default, rename = "@noseHeightRatio")]
    nose_height_ratio: Option<f64>,
}

impl PresetXml {
    /// Missing attributes keep the stock preset values.
    fn into_preset(self) -> SettingsResult<ShapePreset> {
        let stock = ShapePreset::default();
        let base_cone_shape = match self.base_cone_shape.as_deref() {
            Some(v) => parse_vector(&self.name, "baseConeShape", v)?,
            None => stock.base_cone_shape,
        };
        let nose_cone_shape = match self.nose_cone_shape.as_deref() {
            Some(v) => parse_vector(&self.name, "noseConeShape", v)?,
            None => stock.nose_cone_shape,
        };
        Ok(ShapePreset {
            base_cone_shape,
            nose_cone_shape,
            base_cone_segments: self.base_cone_segments.unwrap_or(stock.base_cone_segments),
            nose_cone_segments: self.nose_cone_segments.unwrap_or(stock.nose_cone_segments),
            nose_height_ratio: self.nose_height_ratio.unwrap_or(stock.nose_height_ratio),
            name: self.name,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ScannerXml {
    #[serde(default, rename = "IgnoreColliderTag")]
    ignore: Vec<TagXml>,
}

#[derive(Debug, Deserialize)]
struct TagXml {
    #[serde(rename = "@pattern")]
    pattern: String,
}
