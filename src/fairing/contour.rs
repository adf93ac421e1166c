//! Half-profile polyline of the fairing wall.

use serde::Serialize;

use super::config::{ConeShapeParams, TextureMapping};
use super::solver::FairingEnvelope;
use crate::geom::{BezierSlope, Tolerance, Vec2};

/// One contour sample: `radius` from the axis, `height` above the base, and
/// the texture V coordinate of its row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContourPoint {
    pub radius: f64,
    pub height: f64,
    pub v: f64,
}

impl ContourPoint {
    #[must_use]
    pub const fn new(radius: f64, height: f64, v: f64) -> Self {
        Self { radius, height, v }
    }

    #[must_use]
    pub const fn planar(self) -> Vec2 {
        Vec2::new(self.radius, self.height)
    }
}

/// Contour from base to tip (or to the inline top), in increasing height.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contour {
    points: Vec<ContourPoint>,
    inline: bool,
}

impl Contour {
    #[must_use]
    pub fn points(&self) -> &[ContourPoint] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Inline contours end on an open top ring instead of a tip.
    #[must_use]
    pub const fn is_inline(&self) -> bool {
        self.inline
    }

    /// `(radius, height)` polyline for editor display.
    #[must_use]
    pub fn outline(&self) -> Vec<Vec2> {
        self.points.iter().map(|p| p.planar()).collect()
    }
}

/// `true` when the cylinder starts on the base ring, so no base cone is emitted.
#[must_use]
pub fn base_cone_degenerate(envelope: &FairingEnvelope) -> bool {
    Tolerance::DEFAULT.approx_zero_f64(envelope.cylinder_start)
}

/// `true` when an inline cylinder runs all the way to the top.
#[must_use]
pub fn top_cone_degenerate(envelope: &FairingEnvelope) -> bool {
    envelope
        .inline
        .is_some_and(|top| Tolerance::DEFAULT.approx_eq_f64(envelope.cylinder_end, top.height))
}

pub struct FairingContourBuilder<'a> {
    cone: &'a ConeShapeParams,
    mapping: &'a TextureMapping,
}

impl<'a> FairingContourBuilder<'a> {
    #[must_use]
    pub fn new(cone: &'a ConeShapeParams, mapping: &'a TextureMapping) -> Self {
        Self { cone, mapping }
    }

    /// Number of points [`build`](Self::build) will emit for `envelope`.
    #[must_use]
    pub fn point_count(&self, envelope: &FairingEnvelope) -> usize {
        let base = self.cone.base_cone_segments.max(1) as usize;
        let nose = self.cone.nose_cone_segments.max(1) as usize;
        if envelope.is_inline() {
            let lower = if base_cone_degenerate(envelope) { 0 } else { base + 1 };
            let upper = if top_cone_degenerate(envelope) { 0 } else { base + 1 };
            2 + lower + upper
        } else {
            let lower = if base_cone_degenerate(envelope) { 0 } else { base };
            1 + lower + 1 + nose
        }
    }

    #[must_use]
    pub fn build(&self, envelope: &FairingEnvelope) -> Contour {
        let mut points = Vec::with_capacity(self.point_count(envelope));
        let (base_v0, base_v1) = self.mapping.base_v();
        let (nose_v0, nose_v1) = self.mapping.nose_v();
        let base_segs = self.cone.base_cone_segments.max(1);
        let base_slope = BezierSlope::new(self.cone.base_cone_shape);

        if base_cone_degenerate(envelope) {
            // Inline walls start straight on the cylinder instead.
            if !envelope.is_inline() {
                points.push(ContourPoint::new(envelope.base_radius, 0.0, base_v1));
            }
        } else {
            let cone = envelope.max_radius - envelope.base_radius;
            for i in 0..=base_segs {
                let t = f64::from(i) / f64::from(base_segs);
                let p = base_slope.interp(t);
                points.push(ContourPoint::new(
                    p.x * cone + envelope.base_radius,
                    p.y * envelope.cylinder_start,
                    lerp(base_v0, base_v1, t),
                ));
            }
        }

        match envelope.inline {
            Some(top) => {
                points.push(ContourPoint::new(envelope.max_radius, envelope.cylinder_start, base_v1));
                points.push(ContourPoint::new(envelope.max_radius, envelope.cylinder_end, nose_v0));
                if !top_cone_degenerate(envelope) {
                    let cone = envelope.max_radius - top.radius;
                    for i in 0..=base_segs {
                        let t = f64::from(i) / f64::from(base_segs);
                        let p = base_slope.interp(1.0 - t);
                        points.push(ContourPoint::new(
                            p.x * cone + top.radius,
                            lerp(top.height, envelope.cylinder_end, p.y),
                            lerp(base_v1, base_v0, t),
                        ));
                    }
                }
                Contour { points, inline: true }
            }
            None => {
                let nose_segs = self.cone.nose_cone_segments.max(1);
                let nose_slope = BezierSlope::new(self.cone.nose_cone_shape);
                let tip = envelope.max_radius * self.cone.nose_height_ratio;
                for i in 0..=nose_segs {
                    let t = f64::from(i) / f64::from(nose_segs);
                    let p = nose_slope.interp(1.0 - t);
                    points.push(ContourPoint::new(
                        p.x * envelope.max_radius,
                        (1.0 - p.y) * tip + envelope.cylinder_end,
                        lerp(nose_v0, nose_v1, t),
                    ));
                }
                Contour { points, inline: false }
            }
        }
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fairing::solver::InlineTop;

    fn envelope(cylinder_start: f64) -> FairingEnvelope {
        FairingEnvelope {
            base_radius: 0.5,
            max_radius: 0.8,
            cylinder_start,
            cylinder_end: 1.5,
            inline: None,
        }
    }

    #[test]
    fn free_contour_runs_from_base_ring_to_tip() {
        let cone = ConeShapeParams::default();
        let mapping = TextureMapping::default();
        let contour = FairingContourBuilder::new(&cone, &mapping).build(&envelope(0.4));
        let first = contour.points()[0];
        let last = contour.points()[contour.len() - 1];
        assert_eq!((first.radius, first.height), (0.5, 0.0));
        assert!(last.radius.abs() < 1e-12);
        assert!((last.height - (1.5 + 0.8 * cone.nose_height_ratio)).abs() < 1e-12);
        assert!(!contour.is_inline());
    }

    #[test]
    fn inline_contour_ends_on_top_ring() {
        let cone = ConeShapeParams::default();
        let mapping = TextureMapping::default();
        let env = FairingEnvelope {
            inline: Some(InlineTop { radius: 0.3, height: 2.0 }),
            ..envelope(0.4)
        };
        let builder = FairingContourBuilder::new(&cone, &mapping);
        let contour = builder.build(&env);
        assert_eq!(contour.len(), builder.point_count(&env));
        assert_eq!(contour.len(), 2 + 6 + 6);
        let last = contour.points()[contour.len() - 1];
        assert!((last.radius - 0.3).abs() < 1e-12);
        assert!((last.height - 2.0).abs() < 1e-12);
    }

    #[test]
    fn inline_contour_without_cones_is_a_straight_wall() {
        let cone = ConeShapeParams::default();
        let mapping = TextureMapping::default();
        let env = FairingEnvelope {
            base_radius: 0.5,
            max_radius: 0.5,
            cylinder_start: 0.0,
            cylinder_end: 2.0,
            inline: Some(InlineTop { radius: 0.5, height: 2.0 }),
        };
        let contour = FairingContourBuilder::new(&cone, &mapping).build(&env);
        assert_eq!(contour.len(), 2);
        assert_eq!(contour.points()[0].planar(), Vec2::new(0.5, 0.0));
    }

    #[test]
    fn heights_never_decrease() {
        let cone = ConeShapeParams::default();
        let mapping = TextureMapping::default();
        let contour = FairingContourBuilder::new(&cone, &mapping).build(&envelope(0.4));
        for pair in contour.points().windows(2) {
            assert!(pair[1].height >= pair[0].height - 1e-12);
        }
    }
}
