//! Unit-square cubic Bezier used to bend cone profiles.
//!
//! The curve always starts at `(0, 0)` and ends at `(1, 1)`; only the two inner
//! control points are free. Cone builders read `x` as the radial blend factor
//! and `y` as the height blend factor.

use serde::{Deserialize, Serialize};

use super::core::Vec2;

/// Packed inner control points `(p1.x, p1.y, p2.x, p2.y)`, as stored in part
/// configuration and shape presets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BezierShape(pub [f64; 4]);

impl BezierShape {
    #[must_use]
    pub const fn new(p1x: f64, p1y: f64, p2x: f64, p2y: f64) -> Self {
        Self([p1x, p1y, p2x, p2y])
    }

    /// Clamp every control value into the unit square.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self(self.0.map(|v| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BezierSlope {
    p1: Vec2,
    p2: Vec2,
}

impl BezierSlope {
    #[must_use]
    pub const fn new(shape: BezierShape) -> Self {
        let [x0, y0, x1, y1] = shape.0;
        Self {
            p1: Vec2::new(x0, y0),
            p2: Vec2::new(x1, y1),
        }
    }

    /// De Casteljau evaluation at `t`.
    #[must_use]
    pub fn interp(&self, t: f64) -> Vec2 {
        let a = Vec2::ZERO.lerp(self.p1, t);
        let b = self.p1.lerp(self.p2, t);
        let c = self.p2.lerp(Vec2::new(1.0, 1.0), t);

        let d = a.lerp(b, t);
        let e = b.lerp(c, t);

        d.lerp(e, t)
    }
}

impl From<BezierShape> for BezierSlope {
    fn from(shape: BezierShape) -> Self {
        Self::new(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_fixed() {
        let slope = BezierSlope::new(BezierShape::new(0.3, 0.9, 0.1, 0.2));
        assert_eq!(slope.interp(0.0), Vec2::new(0.0, 0.0));
        assert_eq!(slope.interp(1.0), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn diagonal_controls_give_a_straight_line() {
        let slope = BezierSlope::new(BezierShape::new(1.0 / 3.0, 1.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0));
        for i in 0..=10 {
            let t = f64::from(i) / 10.0;
            let p = slope.interp(t);
            assert!((p.x - t).abs() < 1e-12);
            assert!((p.y - t).abs() < 1e-12);
        }
    }

    #[test]
    fn matches_bernstein_form() {
        let shape = BezierShape::new(0.5, 0.0, 1.0, 0.5);
        let slope = BezierSlope::new(shape);
        let t: f64 = 0.37;
        let u = 1.0 - t;
        let x = 3.0 * u * u * t * 0.5 + 3.0 * u * t * t * 1.0 + t * t * t;
        let y = 3.0 * u * t * t * 0.5 + t * t * t;
        let p = slope.interp(t);
        assert!((p.x - x).abs() < 1e-12);
        assert!((p.y - y).abs() < 1e-12);
    }

    #[test]
    fn clamped_shape_stays_in_unit_square() {
        let shape = BezierShape::new(-0.5, 1.5, f64::NAN, 0.25).clamped();
        assert_eq!(shape, BezierShape::new(0.0, 1.0, 0.0, 0.25));
    }
}
