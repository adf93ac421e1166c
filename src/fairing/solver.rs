//! Envelope fitting.
//!
//! Given a payload profile, the solver finds the widest radius the fairing
//! has to reach and the span over which the wall can stay cylindrical: the base
//! cone is pushed as high as the minimum cone angle and the payload allow, and
//! the nose (or inline top cone) is pulled as low as the payload allows.

use std::fmt;

use serde::Serialize;

use super::config::ManualShape;
use super::profile::RadialProfile;
use crate::geom::Tolerance;

/// Top end of an inline fairing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InlineTop {
    pub radius: f64,
    pub height: f64,
}

/// Solved fairing cross-section extremes, in the base frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FairingEnvelope {
    pub base_radius: f64,
    pub max_radius: f64,
    pub cylinder_start: f64,
    pub cylinder_end: f64,
    pub inline: Option<InlineTop>,
}

impl FairingEnvelope {
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.inline.is_some()
    }

    #[must_use]
    pub fn top_radius(&self) -> f64 {
        self.inline.map_or(0.0, |t| t.radius)
    }

    /// Height of the nose tip, or of the inline top.
    #[must_use]
    pub fn top_height(&self, nose_height_ratio: f64) -> f64 {
        match self.inline {
            Some(top) => top.height,
            None => self.cylinder_end + self.max_radius * nose_height_ratio,
        }
    }
}

/// Recoverable oddities noticed while solving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum SolveWarning {
    /// The cylinder start was above its end and was pulled down to it.
    CylinderClamped { start: f64, end: f64 },
    /// The inline top sits at or below the profile origin.
    TopBelowOrigin { top: f64, origin: f64 },
}

impl fmt::Display for SolveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CylinderClamped { start, end } => {
                write!(f, "cylinder start {start:.3} above end {end:.3}; clamped to end")
            }
            Self::TopBelowOrigin { top, origin } => {
                write!(f, "inline top {top:.3} is not above profile origin {origin:.3}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveOutcome {
    /// The envelope handed to contour generation.
    pub envelope: FairingEnvelope,
    /// The automatic solution, written back as the manual override when
    /// auto-shaping is on.
    pub auto: ManualShape,
    pub warnings: Vec<SolveWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FairingShapeSolver {
    /// Degrees.
    pub min_base_cone_angle: f64,
    pub nose_height_ratio: f64,
}

impl Default for FairingShapeSolver {
    fn default() -> Self {
        Self { min_base_cone_angle: 20.0, nose_height_ratio: 2.0 }
    }
}

impl FairingShapeSolver {
    #[must_use]
    pub fn new(min_base_cone_angle: f64, nose_height_ratio: f64) -> Self {
        Self { min_base_cone_angle, nose_height_ratio }
    }

    /// Fit the envelope. With `manual` set, its values replace the fitted
    /// ones; either way the start is finally clamped to the end.
    #[must_use]
    pub fn solve(
        &self,
        profile: &RadialProfile,
        base_radius: f64,
        inline: Option<InlineTop>,
        manual: Option<ManualShape>,
    ) -> SolveOutcome {
        let mut warnings = Vec::new();
        let step = profile.step();
        let origin = profile.origin();
        let samples = profile.samples();

        let (prof_top, fitted_max) = match inline {
            Some(top) => {
                if top.height <= origin {
                    warnings.push(SolveWarning::TopBelowOrigin { top: top.height, origin });
                }
                let prof_top = slab_count_below(top.height, origin, step).min(samples.len());
                (prof_top, profile.max_below(prof_top).max(top.radius))
            }
            None => (samples.len(), profile.max()),
        };

        let (max_radius, cylinder_start) = self.fit_base_cone(profile, base_radius, fitted_max);
        let cylinder_end = match inline {
            Some(top) => fit_top_cone(profile, max_radius, top, prof_top),
            None => self.fit_nose_cone(profile, max_radius),
        };

        let auto = ManualShape {
            max_size: max_radius * 2.0,
            cyl_start: cylinder_start,
            cyl_end: cylinder_end,
        };
        let (max_radius, start, end) = match manual {
            Some(m) => (m.max_size * 0.5, m.cyl_start, m.cyl_end),
            None => (max_radius, cylinder_start, cylinder_end),
        };

        let cylinder_start = if start > end {
            warnings.push(SolveWarning::CylinderClamped { start, end });
            log::warn!("fairing solve: cylinder start {start:.3} above end {end:.3}, clamped");
            end
        } else {
            start
        };

        log::debug!(
            "fairing solve: base={base_radius:.3} max={max_radius:.3} cyl={cylinder_start:.3}..{end:.3} inline={}",
            inline.is_some()
        );

        SolveOutcome {
            envelope: FairingEnvelope {
                base_radius,
                max_radius,
                cylinder_start,
                cylinder_end: end,
                inline,
            },
            auto,
            warnings,
        }
    }

    /// Returns `(max_radius, cylinder_start)`.
    fn fit_base_cone(&self, profile: &RadialProfile, base_radius: f64, max_radius: f64) -> (f64, f64) {
        if max_radius <= base_radius {
            return (base_radius, 0.0);
        }

        let samples = profile.samples();
        let step = profile.step();
        let origin = profile.origin();
        let min_tan = self.min_base_cone_angle.to_radians().tan();

        let mut cylinder_start = origin;
        for i in 1..samples.len() {
            let y = profile.slab_bottom(i);
            if y <= Tolerance::ZERO_LENGTH.eps {
                continue;
            }
            let k = (max_radius - base_radius) / y;
            if k < min_tan {
                break;
            }
            if !encloses(&samples[..i], base_radius + k * origin, k * step) {
                break;
            }
            cylinder_start = y;
        }
        (max_radius, cylinder_start)
    }

    fn fit_nose_cone(&self, profile: &RadialProfile, max_radius: f64) -> f64 {
        let samples = profile.samples();
        let taper = profile.step() / self.nose_height_ratio.max(Tolerance::DEFAULT.eps);

        let mut cylinder_end = profile.top();
        for i in (0..samples.len()).rev() {
            if !encloses(&samples[i..], max_radius - taper, -taper) {
                break;
            }
            cylinder_end = profile.slab_bottom(i);
        }
        cylinder_end
    }
}

fn fit_top_cone(profile: &RadialProfile, max_radius: f64, top: InlineTop, prof_top: usize) -> f64 {
    let samples = profile.samples();
    let step = profile.step();

    let mut r0 = top.radius;
    if prof_top > 0 && prof_top < samples.len() {
        r0 = r0.max(samples[prof_top - 1]);
        if prof_top >= 2 {
            r0 = r0.max(samples[prof_top - 2]);
        }
    }
    if max_radius <= r0 {
        return top.height;
    }

    let mut cylinder_end = profile.top();
    if cylinder_end > top.height {
        cylinder_end = top.height - step;
    }
    for i in (0..prof_top).rev() {
        let y = profile.slab_bottom(i);
        let drop = y - top.height;
        if drop.abs() <= Tolerance::ZERO_LENGTH.eps {
            continue;
        }
        let k = (max_radius - r0) / drop;
        let mut r = max_radius + k * step;
        let mut ok = true;
        for &sample in &samples[i..prof_top] {
            r = r.max(r0);
            if sample > r {
                ok = false;
                break;
            }
            r += k * step;
        }
        if !ok {
            break;
        }
        cylinder_end = y;
    }
    cylinder_end
}

/// Does a straight taper starting at `r` and changing by `dr` per slab stay
/// at or outside every sample?
fn encloses(samples: &[f64], mut r: f64, dr: f64) -> bool {
    for &sample in samples {
        if sample > r {
            return false;
        }
        r += dr;
    }
    true
}

/// Number of slabs starting below `height`.
fn slab_count_below(height: f64, origin: f64, step: f64) -> usize {
    let n = ((height - origin) / step - Tolerance::SLAB.eps).ceil();
    if n.is_finite() && n > 0.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n = n as usize;
        n
    } else {
        0
    }
}
