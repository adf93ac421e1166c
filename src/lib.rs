#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod fairing;
pub mod geom;
pub mod parse;

use std::fmt;

use fairing::{
    BaseConfig, BaseMode, CollisionVolumes, ConeShapeParams, FairingBase, FairingEnvelope, FairingError, FairingSide,
    PartArena, PartId, RebuildReport, SideControls, SideNodeLayout, SolveWarning,
};
use geom::{Point3, Vec2};
use parse::{FairingSettings, SettingsError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasm_bindgen::JsError;
use wasm_bindgen::prelude::*;

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            init_logger();
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {}

#[cfg(all(feature = "parallel", target_arch = "wasm32"))]
#[wasm_bindgen]
pub async fn initialize_parallel(worker_count: Option<u32>) -> Result<(), JsError> {
    let threads = worker_count
        .map(|count| count.max(1) as usize)
        .or_else(|| std::thread::available_parallelism().map(std::num::NonZero::get).ok())
        .unwrap_or(1);

    wasm_bindgen_rayon::init_thread_pool(threads)
        .await
        .map_err(|err| JsError::new(&format!("could not start the rayon thread pool: {err}")))
}

#[macro_export]
macro_rules! debug_log {
    ($($t:tt)*) => {{
        #[cfg(feature = "debug_logs")]
        {
            #[cfg(target_arch = "wasm32")]
            {
                ::web_sys::console::log_1(&::wasm_bindgen::JsValue::from_str(&format!($($t)*)));
            }
            #[cfg(not(target_arch = "wasm32"))]
            {
                println!("{}", format!($($t)*));
            }
        }
    }};
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no payload snapshot loaded")]
    NoPayload,
    #[error("fairing has not been rebuilt since the last edit")]
    NotEvaluated,
    #[error("unknown parameter `{name}`{}", .suggestion.map(|s| format!(", did you mean `{s}`?")).unwrap_or_default())]
    UnknownParam { name: String, suggestion: Option<&'static str> },
    #[error("parameter `{name}` must be a finite number, got {value}")]
    InvalidValue { name: String, value: f64 },
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Fairing(#[from] FairingError),
}

// ───── parameters ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Param {
    Mode,
    BaseSize,
    TopSize,
    Height,
    ExtraHeight,
    ExtraRadius,
    AutoShape,
    MaxSize,
    CylStart,
    CylEnd,
    CircleSegments,
    SideThickness,
    BaseConeSegments,
    NoseConeSegments,
    NoseHeightRatio,
    MinBaseConeAngle,
    Density,
    ColliderShaveAngle,
    ShapeLock,
    BaseAutoShape,
    NoseAutoShape,
}

impl Param {
    const ALL: &'static [(&'static str, Param)] = &[
        ("mode", Param::Mode),
        ("base_size", Param::BaseSize),
        ("top_size", Param::TopSize),
        ("height", Param::Height),
        ("extra_height", Param::ExtraHeight),
        ("extra_radius", Param::ExtraRadius),
        ("auto_shape", Param::AutoShape),
        ("max_size", Param::MaxSize),
        ("cyl_start", Param::CylStart),
        ("cyl_end", Param::CylEnd),
        ("circle_segments", Param::CircleSegments),
        ("side_thickness", Param::SideThickness),
        ("base_cone_segments", Param::BaseConeSegments),
        ("nose_cone_segments", Param::NoseConeSegments),
        ("nose_height_ratio", Param::NoseHeightRatio),
        ("min_base_cone_angle", Param::MinBaseConeAngle),
        ("density", Param::Density),
        ("collider_shave_angle", Param::ColliderShaveAngle),
        ("shape_lock", Param::ShapeLock),
        ("base_auto_shape", Param::BaseAutoShape),
        ("nose_auto_shape", Param::NoseAutoShape),
    ];

    fn parse(name: &str) -> Result<Self, EngineError> {
        let wanted = normalize_name(name);
        if let Some((_, param)) = Self::ALL.iter().find(|(key, _)| *key == wanted) {
            return Ok(*param);
        }
        let suggestion = Self::ALL
            .iter()
            .map(|(key, _)| (levenshtein::levenshtein(&wanted, key), *key))
            .filter(|(d, key)| *d <= key.len() / 3 + 1)
            .min_by_key(|(d, _)| *d)
            .map(|(_, key)| key);
        Err(EngineError::UnknownParam { name: name.to_owned(), suggestion })
    }

    fn is_side(self) -> bool {
        matches!(
            self,
            Param::BaseConeSegments
                | Param::NoseConeSegments
                | Param::NoseHeightRatio
                | Param::MinBaseConeAngle
                | Param::Density
                | Param::ColliderShaveAngle
                | Param::ShapeLock
                | Param::BaseAutoShape
                | Param::NoseAutoShape
        )
    }

    /// `(base, nose)` auto-shape flags set by this parameter, if it is one.
    fn auto_shape_flags(self, value: f64) -> Option<(Option<bool>, Option<bool>)> {
        let on = value != 0.0;
        match self {
            Param::BaseAutoShape => Some((Some(on), None)),
            Param::NoseAutoShape => Some((None, Some(on))),
            _ => None,
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn apply_base(self, config: &mut BaseConfig, value: f64) {
        match self {
            Param::Mode => config.mode = if value >= 0.5 { BaseMode::Adapter } else { BaseMode::Payload },
            Param::BaseSize => config.base_size = value.max(0.0),
            Param::TopSize => config.top_size = value.max(0.0),
            Param::Height => config.height = value,
            Param::ExtraHeight => config.extra_height = value,
            Param::ExtraRadius => config.extra_radius = value,
            Param::AutoShape => config.auto_shape = value != 0.0,
            Param::MaxSize => config.manual.max_size = value,
            Param::CylStart => config.manual.cyl_start = value,
            Param::CylEnd => config.manual.cyl_end = value,
            Param::CircleSegments => config.circle_segments = value.round().clamp(2.0, 256.0) as u32,
            Param::SideThickness => config.side_thickness = value,
            _ => {}
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn apply_side(self, controls: &mut SideControls, value: f64, prefab: &ConeShapeParams) {
        match self {
            Param::BaseConeSegments => controls.cone.base_cone_segments = value.round().clamp(1.0, 64.0) as u32,
            Param::NoseConeSegments => controls.cone.nose_cone_segments = value.round().clamp(1.0, 64.0) as u32,
            Param::NoseHeightRatio => controls.cone.nose_height_ratio = value,
            Param::MinBaseConeAngle => controls.cone.min_base_cone_angle = value,
            Param::Density => controls.density = value.max(0.0),
            Param::ColliderShaveAngle => controls.collider_shave_angle = value,
            Param::ShapeLock => controls.shape_lock = value != 0.0,
            Param::BaseAutoShape => {
                controls.base_auto_shape = value != 0.0;
                controls.apply_auto_shape(prefab);
            }
            Param::NoseAutoShape => {
                controls.nose_auto_shape = value != 0.0;
                controls.apply_auto_shape(prefab);
            }
            _ => return,
        }
        controls.cone = controls.cone.sanitized();
    }
}

// ───── exports ─────────────────────────────────────────────────────────────

/// Payload snapshot as sent by the host.
#[derive(Debug, Clone, Deserialize)]
pub struct PayloadInput {
    pub base: PartId,
    pub arena: PartArena,
}

#[derive(Debug, Serialize)]
pub struct SideExport<'a> {
    pub slot: usize,
    pub node: String,
    pub mesh_yaw: f64,
    pub positions: &'a [f64],
    pub normals: &'a [f64],
    pub tangents: &'a [f64],
    pub uvs: &'a [f64],
    pub indices: &'a [u32],
    pub colliders: &'a CollisionVolumes,
    pub area: f64,
    pub volume: f64,
    pub mass: f64,
    pub center_of_mass: Point3,
}

#[derive(Debug, Serialize)]
pub struct EnvelopeExport {
    pub envelope: FairingEnvelope,
    pub warnings: Vec<SolveWarning>,
    pub profile_outline: Vec<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fairing_outline: Option<Vec<Vec2>>,
    pub passes: usize,
}

/// Public entry point for consumers.
#[wasm_bindgen]
pub struct FairingEngine {
    settings: FairingSettings,
    config: BaseConfig,
    side_template: SideControls,
    side_count: usize,
    arena: PartArena,
    base: Option<FairingBase>,
    last_report: Option<RebuildReport>,
}

impl Default for FairingEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl FairingEngine {
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> FairingEngine {
        let settings = FairingSettings::default();
        let side_template = side_template(&settings);
        FairingEngine {
            settings,
            config: BaseConfig::default(),
            side_template,
            side_count: 2,
            arena: PartArena::new(),
            base: None,
            last_report: None,
        }
    }

    /// Load shape presets and the collider denylist from an XML document.
    #[wasm_bindgen]
    pub fn load_settings(&mut self, xml: &str) -> Result<(), JsValue> {
        self.load_settings_str(xml).map_err(to_js_error)
    }

    /// Replace the payload snapshot (`{ base, arena }`).
    #[wasm_bindgen]
    pub fn set_payload(&mut self, payload: JsValue) -> Result<(), JsValue> {
        let input: PayloadInput = serde_wasm_bindgen::from_value(payload).map_err(to_js_error)?;
        self.set_payload_snapshot(input.base, input.arena);
        Ok(())
    }

    #[wasm_bindgen]
    pub fn set_param(&mut self, name: &str, value: f64) -> Result<(), JsValue> {
        self.set_param_value(name, value).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn set_side_count(&mut self, count: usize) -> Result<(), JsValue> {
        self.set_side_node_count(count).map_err(to_js_error)
    }

    /// Fill every empty side slot with a fresh side.
    #[wasm_bindgen]
    pub fn attach_sides(&mut self) -> Result<usize, JsValue> {
        self.attach_all_sides().map_err(to_js_error)
    }

    /// Apply a named shape preset to every attached side.
    #[wasm_bindgen]
    pub fn set_preset(&mut self, name: &str) -> Result<(), JsValue> {
        self.apply_preset_all(name).map_err(to_js_error)
    }

    /// Run the pending rebuild. Returns `true` when a pass ran.
    #[wasm_bindgen]
    pub fn tick(&mut self) -> Result<bool, JsValue> {
        self.tick_native().map(|report| report.is_some()).map_err(to_js_error)
    }

    #[wasm_bindgen]
    pub fn get_geometry(&self) -> Result<JsValue, JsValue> {
        let sides = self.geometry_export().map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&sides).map_err(|err| JsError::new(&err.to_string()).into())
    }

    #[wasm_bindgen]
    pub fn get_envelope(&self) -> Result<JsValue, JsValue> {
        let export = self.envelope_export().map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&export).map_err(|err| JsError::new(&err.to_string()).into())
    }
}

impl FairingEngine {
    #[must_use]
    pub fn settings(&self) -> &FairingSettings {
        &self.settings
    }

    #[must_use]
    pub fn base(&self) -> Option<&FairingBase> {
        self.base.as_ref()
    }

    #[must_use]
    pub fn last_report(&self) -> Option<&RebuildReport> {
        self.last_report.as_ref()
    }

    pub fn load_settings_str(&mut self, xml: &str) -> Result<(), EngineError> {
        let settings = parse::parse_settings(xml)?;
        self.side_template = side_template(&settings);
        self.base = self.base.take().map(|base| base.with_filter(settings.filter.clone()));
        self.settings = settings;
        Ok(())
    }

    /// Swap in a new snapshot. The same base part keeps its sides and only
    /// rescans; a different one starts over.
    pub fn set_payload_snapshot(&mut self, base: PartId, arena: PartArena) {
        self.arena = arena;
        if let Some(existing) = self.base.as_mut().filter(|b| b.part() == base) {
            existing.payload_changed();
            return;
        }
        debug_log!("new fairing base on part {}", base.0);
        let mut fairing = FairingBase::new(base, self.config.clone()).with_filter(self.settings.filter.clone());
        if let Err(err) = fairing.set_side_node_count(self.side_count) {
            log::warn!("keeping default side count: {err}");
        }
        self.base = Some(fairing);
    }

    pub fn set_param_value(&mut self, name: &str, value: f64) -> Result<(), EngineError> {
        if !value.is_finite() {
            return Err(EngineError::InvalidValue { name: name.to_owned(), value });
        }
        let param = Param::parse(name)?;
        if param.is_side() {
            let prefab = side_template(&self.settings).cone;
            param.apply_side(&mut self.side_template, value, &prefab);
            if let Some(base) = self.base.as_mut() {
                let slots: Vec<usize> = base.sides().map(|(slot, _)| slot).collect();
                for slot in slots {
                    match param.auto_shape_flags(value) {
                        Some((base_flag, nose_flag)) => base.set_auto_shape(slot, base_flag, nose_flag, &prefab)?,
                        None => base.edit_side(slot, |side| param.apply_side(&mut side.controls, value, &prefab))?,
                    }
                }
            }
        } else {
            param.apply_base(&mut self.config, value);
            if let Some(base) = self.base.as_mut() {
                base.edit_config(|config| param.apply_base(config, value));
                self.config = base.config().clone();
            }
        }
        Ok(())
    }

    pub fn set_side_node_count(&mut self, count: usize) -> Result<(), EngineError> {
        match self.base.as_mut() {
            Some(base) => base.set_side_node_count(count)?,
            None => SideNodeLayout::default()
                .set_num_nodes(count, false)
                .map_err(FairingError::from)?,
        }
        self.side_count = count;
        Ok(())
    }

    /// Returns the number of sides attached.
    pub fn attach_all_sides(&mut self) -> Result<usize, EngineError> {
        let base = self.base.as_mut().ok_or(EngineError::NoPayload)?;
        let empty: Vec<usize> = (0..base.nodes().num_nodes()).filter(|&i| base.side(i).is_none()).collect();
        for &slot in &empty {
            base.attach_side(slot, FairingSide::new(self.side_template))?;
        }
        Ok(empty.len())
    }

    pub fn apply_preset_all(&mut self, name: &str) -> Result<(), EngineError> {
        let preset = self.settings.presets.get(name).map_err(FairingError::from)?;
        preset.apply(&mut self.side_template);
        if let Some(base) = self.base.as_mut() {
            let slots: Vec<usize> = base.sides().map(|(slot, _)| slot).collect();
            for slot in slots {
                base.apply_preset(slot, &self.settings.presets, name)?;
            }
        }
        Ok(())
    }

    pub fn tick_native(&mut self) -> Result<Option<&RebuildReport>, EngineError> {
        let base = self.base.as_mut().ok_or(EngineError::NoPayload)?;
        let Some(report) = base.tick(&self.arena)? else {
            return Ok(None);
        };
        debug_log!(
            "rebuild: {} sides, {} contour points, {} edits merged",
            report.sides_rebuilt,
            report.contour_len,
            report.merged_requests
        );
        self.config = base.config().clone();
        Ok(Some(&*self.last_report.insert(report)))
    }

    pub fn geometry_export(&self) -> Result<Vec<SideExport<'_>>, EngineError> {
        let base = self.evaluated_base()?;
        let sides = base
            .sides()
            .filter_map(|(slot, side)| side.geometry().map(|geo| (slot, geo)))
            .map(|(slot, geo)| SideExport {
                slot,
                node: SideNodeLayout::node_id(slot),
                mesh_yaw: geo.mesh_yaw,
                positions: geo.mesh.positions_flat(),
                normals: geo.mesh.normals_flat(),
                tangents: geo.mesh.tangents_flat(),
                uvs: geo.mesh.uvs_flat(),
                indices: &geo.mesh.indices,
                colliders: &geo.colliders,
                area: geo.area,
                volume: geo.volume,
                mass: geo.mass,
                center_of_mass: geo.center_of_mass_in_base(),
            })
            .collect();
        Ok(sides)
    }

    pub fn envelope_export(&self) -> Result<EnvelopeExport, EngineError> {
        let base = self.evaluated_base()?;
        let outcome = base.solve_outcome().ok_or(EngineError::NotEvaluated)?;
        Ok(EnvelopeExport {
            envelope: outcome.envelope,
            warnings: outcome.warnings.clone(),
            profile_outline: base.profile_outline(),
            fairing_outline: base.fairing_outline(),
            passes: base.rebuild_passes(),
        })
    }

    fn evaluated_base(&self) -> Result<&FairingBase, EngineError> {
        let base = self.base.as_ref().ok_or(EngineError::NoPayload)?;
        if base.is_dirty() {
            return Err(EngineError::NotEvaluated);
        }
        Ok(base)
    }
}

/// Stock side controls with the settings' default preset applied.
fn side_template(settings: &FairingSettings) -> SideControls {
    let mut controls = SideControls::default();
    match settings.presets.get(&settings.default_preset) {
        Ok(preset) => preset.apply(&mut controls),
        Err(err) => log::warn!("default preset unavailable: {err}"),
    }
    controls
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(['-', ' '], "_")
}

fn to_js_error<E: fmt::Display>(error: E) -> JsValue {
    js_error(&error.to_string())
}

fn js_error(message: &str) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        JsError::new(message).into()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
        JsValue::NULL
    }
}
