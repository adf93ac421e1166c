//! Base and side configuration with the stock part defaults.

use serde::{Deserialize, Serialize};

use crate::geom::BezierShape;

/// Largest manual cylinder height or diameter accepted from configuration.
pub const MAX_CYLINDER_DIMENSION: f64 = 50.0;

/// How the base's top is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseMode {
    /// Payload base: nose cone unless a nested base is found above.
    #[default]
    Payload,
    /// Adapter: always inline, tapering to `top_size` at `height + extra_height`.
    Adapter,
}

/// Manual override of the solved envelope. `max_size` is a diameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManualShape {
    pub max_size: f64,
    pub cyl_start: f64,
    pub cyl_end: f64,
}

impl Default for ManualShape {
    fn default() -> Self {
        Self { max_size: 0.625, cyl_start: 0.0, cyl_end: 1.0 }
    }
}

impl ManualShape {
    /// Keep the cylinder span ordered and inside the configurable range.
    #[must_use]
    pub fn clamped(self) -> Self {
        let cyl_end = self.cyl_end.clamp(0.0, MAX_CYLINDER_DIMENSION);
        let cyl_start = self
            .cyl_start
            .clamp(0.0, cyl_end.min(MAX_CYLINDER_DIMENSION - 0.1));
        Self {
            max_size: self.max_size.clamp(0.0, MAX_CYLINDER_DIMENSION),
            cyl_start,
            cyl_end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseConfig {
    pub mode: BaseMode,
    pub base_size: f64,
    pub top_size: f64,
    pub height: f64,
    pub extra_height: f64,
    /// Added to every scanned radius; also the radius of an empty profile.
    pub extra_radius: f64,
    pub auto_shape: bool,
    pub manual: ManualShape,
    pub circle_segments: u32,
    /// Wall thickness as a fraction of the stack size.
    pub side_thickness: f64,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            mode: BaseMode::Payload,
            base_size: 1.25,
            top_size: 1.25,
            height: 1.0,
            extra_height: 0.0,
            extra_radius: 0.0,
            auto_shape: true,
            manual: ManualShape::default(),
            circle_segments: 24,
            side_thickness: 0.05,
        }
    }
}

/// Smallest relative wall thickness a base accepts.
pub const MIN_SIDE_THICKNESS: f64 = 0.01;

impl BaseConfig {
    /// Absolute wall thickness.
    #[must_use]
    pub fn wall_thickness(&self) -> f64 {
        match self.mode {
            BaseMode::Adapter => (self.side_thickness * self.base_size.max(self.top_size))
                .min(0.25 * self.base_size.min(self.top_size)),
            BaseMode::Payload => self.base_size * self.side_thickness.min(0.25),
        }
    }

    /// Inner radius of the wall where it meets the base.
    #[must_use]
    pub fn base_radius(&self) -> f64 {
        self.base_size / 2.0 - self.wall_thickness()
    }

    /// Inner radius at the top of an inline fairing ending on a stack of `size`.
    #[must_use]
    pub fn top_radius_for(&self, size: f64) -> f64 {
        size / 2.0 - self.wall_thickness()
    }

    /// Clamp user-editable values into their accepted ranges.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.extra_radius = self.extra_radius.clamp(-1.0, 2.0);
        self.side_thickness = self.side_thickness.clamp(MIN_SIDE_THICKNESS, 0.5);
        self.circle_segments = self.circle_segments.max(2);
        self.manual = self.manual.clamped();
        self
    }
}

/// Cone shaping shared by all sides of one base.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConeShapeParams {
    pub base_cone_shape: BezierShape,
    pub nose_cone_shape: BezierShape,
    pub base_cone_segments: u32,
    pub nose_cone_segments: u32,
    /// Nose tip height as a multiple of the max radius.
    pub nose_height_ratio: f64,
    /// Lower bound on the base cone half-angle, in degrees.
    pub min_base_cone_angle: f64,
}

impl Default for ConeShapeParams {
    fn default() -> Self {
        Self {
            base_cone_shape: BezierShape::new(0.5, 0.0, 1.0, 0.5),
            nose_cone_shape: BezierShape::new(0.5, 0.0, 1.0, 0.5),
            base_cone_segments: 5,
            nose_cone_segments: 7,
            nose_height_ratio: 2.0,
            min_base_cone_angle: 20.0,
        }
    }
}

impl ConeShapeParams {
    /// Controls used when no side is attached to read them from.
    #[must_use]
    pub fn sideless() -> Self {
        Self {
            base_cone_shape: BezierShape::new(0.0, 0.0, 0.0, 0.0),
            nose_cone_shape: BezierShape::new(0.0, 0.0, 0.0, 0.0),
            base_cone_segments: 1,
            nose_cone_segments: 1,
            nose_height_ratio: 1.0,
            min_base_cone_angle: 20.0,
        }
    }

    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            base_cone_shape: self.base_cone_shape.clamped(),
            nose_cone_shape: self.nose_cone_shape.clamped(),
            base_cone_segments: self.base_cone_segments.clamp(1, 64),
            nose_cone_segments: self.nose_cone_segments.clamp(1, 64),
            nose_height_ratio: if self.nose_height_ratio.is_finite() {
                self.nose_height_ratio.clamp(0.1, 5.0)
            } else {
                1.0
            },
            min_base_cone_angle: self.min_base_cone_angle.clamp(0.0, 89.0),
        }
    }
}

/// Texture atlas layout in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureMapping {
    pub mapping_scale: [f64; 2],
    /// U range of the side strips and rings.
    pub strip_mapping: [f64; 2],
    /// Outer U range, then inner U range.
    pub hor_mapping: [f64; 4],
    /// Base cone V range, then nose cone V range.
    pub vert_mapping: [f64; 4],
}

impl Default for TextureMapping {
    fn default() -> Self {
        Self {
            mapping_scale: [1024.0, 1024.0],
            strip_mapping: [992.0, 1024.0],
            hor_mapping: [0.0, 480.0, 512.0, 992.0],
            vert_mapping: [0.0, 160.0, 704.0, 1024.0],
        }
    }
}

impl TextureMapping {
    #[must_use]
    pub fn base_v(&self) -> (f64, f64) {
        let sy = self.mapping_scale[1];
        (self.vert_mapping[0] / sy, self.vert_mapping[1] / sy)
    }

    #[must_use]
    pub fn nose_v(&self) -> (f64, f64) {
        let sy = self.mapping_scale[1];
        (self.vert_mapping[2] / sy, self.vert_mapping[3] / sy)
    }
}

/// Per-side editable controls. The first attached side's controls drive the
/// shape of the whole fairing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideControls {
    pub cone: ConeShapeParams,
    pub collider_shave_angle: f64,
    pub density: f64,
    pub mapping: TextureMapping,
    pub shape_lock: bool,
    pub base_auto_shape: bool,
    pub nose_auto_shape: bool,
}

impl Default for SideControls {
    fn default() -> Self {
        Self {
            cone: ConeShapeParams::default(),
            collider_shave_angle: 5.0,
            density: 0.2,
            mapping: TextureMapping::default(),
            shape_lock: false,
            base_auto_shape: true,
            nose_auto_shape: true,
        }
    }
}

impl SideControls {
    /// Controls a base falls back to when no side is attached.
    #[must_use]
    pub fn sideless() -> Self {
        Self {
            cone: ConeShapeParams::sideless(),
            density: 0.0,
            ..Self::default()
        }
    }

    /// Reset auto-shaped cones to the part defaults in `prefab`.
    pub fn apply_auto_shape(&mut self, prefab: &ConeShapeParams) {
        if self.base_auto_shape {
            self.cone.base_cone_shape = prefab.base_cone_shape;
            self.cone.base_cone_segments = prefab.base_cone_segments;
        }
        if self.nose_auto_shape {
            self.cone.nose_cone_shape = prefab.nose_cone_shape;
            self.cone.nose_cone_segments = prefab.nose_cone_segments;
            self.cone.nose_height_ratio = prefab.nose_height_ratio;
        }
    }
}
