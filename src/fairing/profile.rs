//! Radial payload profile and the scanner that builds it.
//!
//! The profile is a step function: slab `i` covers heights
//! `(origin + i·step, origin + (i+1)·step]` (slab 0 also owns `origin`) and
//! stores the largest distance from the fairing axis of any payload boundary
//! geometry inside that band.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;
use wildmatch::WildMatch;

use super::snapshot::{PartArena, PartId};
use crate::geom::{Point3, Tolerance, Transform, Vec2};

/// Height of one profile slab.
pub const VERTICAL_STEP: f64 = 0.1;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ScanError {
    #[error("part {0:?} is not in the snapshot")]
    UnknownPart(PartId),
    #[error("fairing base transform of part {0:?} is not invertible")]
    SingularTransform(PartId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadialProfile {
    samples: Vec<f64>,
    origin: f64,
    step: f64,
}

impl RadialProfile {
    #[must_use]
    pub fn new(origin: f64, step: f64) -> Self {
        Self { samples: Vec::new(), origin, step }
    }

    #[must_use]
    pub fn from_samples(samples: Vec<f64>, origin: f64, step: f64) -> Self {
        Self { samples, origin, step }
    }

    #[must_use]
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub const fn origin(&self) -> f64 {
        self.origin
    }

    #[must_use]
    pub const fn step(&self) -> f64 {
        self.step
    }

    /// Height of the bottom of slab `i`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn slab_bottom(&self, i: usize) -> f64 {
        i as f64 * self.step + self.origin
    }

    /// Height of the top of the last slab.
    #[must_use]
    pub fn top(&self) -> f64 {
        self.slab_bottom(self.samples.len())
    }

    /// Slab owning `height`, or `None` below the origin.
    #[must_use]
    pub fn slab_of(&self, height: f64) -> Option<usize> {
        let h = height - self.origin;
        if h < -Tolerance::SLAB.eps || !h.is_finite() {
            return None;
        }
        let upper = (h / self.step - Tolerance::SLAB.eps).ceil();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = upper.max(1.0) as usize - 1;
        Some(index)
    }

    /// Largest sample, or zero for an empty profile.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.samples.iter().copied().fold(0.0, f64::max)
    }

    /// Largest sample among the first `count` slabs.
    #[must_use]
    pub fn max_below(&self, count: usize) -> f64 {
        self.samples.iter().take(count).copied().fold(0.0, f64::max)
    }

    fn record(&mut self, slab: usize, radius: f64) {
        if slab >= self.samples.len() {
            self.samples.resize(slab + 1, 0.0);
        }
        let r = radius.max(0.0);
        if r > self.samples[slab] {
            self.samples[slab] = r;
        }
    }

    /// Fold a single point (already in the base frame) into the profile.
    pub fn fold_point(&mut self, p: Point3, extra_radius: f64) {
        if let Some(slab) = self.slab_of(p.y) {
            self.record(slab, p.radial() + extra_radius);
        }
    }

    /// Fold a straight boundary edge. The edge is clipped to each slab it
    /// crosses; distance from the axis is convex along a line, so the clipped
    /// endpoints bound the whole piece.
    pub fn fold_segment(&mut self, a: Point3, b: Point3, extra_radius: f64) {
        let (lo, hi) = if a.y <= b.y { (a, b) } else { (b, a) };
        if hi.y < self.origin {
            return;
        }
        let dy = hi.y - lo.y;
        if dy <= Tolerance::ZERO_LENGTH.eps {
            self.fold_point(lo, extra_radius);
            self.fold_point(hi, extra_radius);
            return;
        }

        let start = lo.y.max(self.origin);
        let (Some(first), Some(last)) = (self.slab_of(start), self.slab_of(hi.y)) else {
            return;
        };
        for slab in first..=last {
            let y0 = self.slab_bottom(slab).max(start);
            let y1 = self.slab_bottom(slab + 1).min(hi.y);
            if y1 < y0 {
                continue;
            }
            let p0 = lo.lerp(hi, (y0 - lo.y) / dy);
            let p1 = lo.lerp(hi, (y1 - lo.y) / dy);
            self.record(slab, p0.radial().max(p1.radial()) + extra_radius);
        }
    }

    /// Guarantee at least one sample.
    pub fn ensure_floor(&mut self, extra_radius: f64) {
        if self.samples.is_empty() {
            self.samples.push(extra_radius.max(0.0));
        }
    }

    /// Step outline in the (radius, height) half-plane, closed back to the axis
    /// at the top, for editor display.
    #[must_use]
    pub fn outline(&self) -> Vec<Vec2> {
        let mut line = Vec::with_capacity(self.samples.len() * 2 + 2);
        let mut prev = 0.0;
        for (i, &r) in self.samples.iter().enumerate() {
            let y = self.slab_bottom(i);
            line.push(Vec2::new(prev, y));
            line.push(Vec2::new(r, y));
            prev = r;
        }
        let top = self.top();
        line.push(Vec2::new(prev, top));
        line.push(Vec2::new(0.0, top));
        line
    }
}

/// Colliders whose tag matches one of these patterns are not payload.
#[derive(Debug, Clone)]
pub struct ColliderFilter {
    patterns: Vec<WildMatch>,
    sources: Vec<String>,
}

pub const DEFAULT_IGNORED_TAGS: [&str; 4] = ["Ladder*", "Airlock*", "*Trigger*", "Icon_Hidden"];

impl ColliderFilter {
    #[must_use]
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            patterns: patterns.iter().map(|p| WildMatch::new(p.as_ref())).collect(),
            sources: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
        }
    }

    #[must_use]
    pub fn accepts(&self, tag: &str) -> bool {
        !self.patterns.iter().any(|p| p.matches(tag))
    }

    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.sources
    }
}

impl Default for ColliderFilter {
    fn default() -> Self {
        Self::new(&DEFAULT_IGNORED_TAGS)
    }
}

/// Boundary of one payload collider in the base frame. Discarded once folded.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadCollisionSample {
    pub part: PartId,
    pub points: Vec<Point3>,
    pub edges: Vec<[usize; 2]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayloadScan {
    pub profile: RadialProfile,
    /// Payload parts in discovery order.
    pub payload: Vec<PartId>,
    /// Parts carrying a nested fairing base, in discovery order.
    pub targets: Vec<PartId>,
    pub world_to_local: Transform,
    pub samples_folded: usize,
}

impl PayloadScan {
    /// Height of a target part's origin in the base frame.
    #[must_use]
    pub fn target_height(&self, arena: &PartArena, target: PartId) -> Option<f64> {
        let part = arena.get(target)?;
        let origin = Point3::ORIGIN + part.transform.translation();
        Some(self.world_to_local.apply_point(origin).y)
    }
}

pub struct PayloadProfileScanner<'a> {
    base: PartId,
    extra_radius: f64,
    filter: &'a ColliderFilter,
}

impl<'a> PayloadProfileScanner<'a> {
    #[must_use]
    pub fn new(base: PartId, extra_radius: f64, filter: &'a ColliderFilter) -> Self {
        Self { base, extra_radius, filter }
    }

    pub fn scan(&self, arena: &PartArena) -> Result<PayloadScan, ScanError> {
        let base = arena.get(self.base).ok_or(ScanError::UnknownPart(self.base))?;
        let world_to_local = base
            .transform
            .inverse()
            .ok_or(ScanError::SingularTransform(self.base))?;

        let origin = base.node("top").map_or(0.0, |n| n.position.y);
        let mut walk = PayloadWalk::new(self.base);

        if let Some(part) = base.node("top").and_then(|n| n.attached) {
            walk.visit(arena, part)?;
        }
        for node in base.nodes_with_prefix("interstage") {
            if let Some(part) = node.attached {
                walk.visit(arena, part)?;
            }
        }
        while let Some(id) = walk.queue.pop_front() {
            let part = arena.get(id).ok_or(ScanError::UnknownPart(id))?;
            if let Some(parent) = part.parent {
                walk.visit(arena, parent)?;
            }
            for &child in &part.children {
                walk.visit(arena, child)?;
            }
        }

        let mut profile = RadialProfile::new(origin, VERTICAL_STEP);
        let mut samples_folded = 0usize;
        for &id in &walk.payload {
            for sample in self.collect_samples(arena, id, world_to_local)? {
                for p in &sample.points {
                    profile.fold_point(*p, self.extra_radius);
                }
                for &[a, b] in &sample.edges {
                    profile.fold_segment(sample.points[a], sample.points[b], self.extra_radius);
                }
                samples_folded += 1;
            }
        }
        profile.ensure_floor(self.extra_radius);

        log::debug!(
            "payload scan: {} parts, {} targets, {} colliders, {} slabs",
            walk.payload.len(),
            walk.targets.len(),
            samples_folded,
            profile.len()
        );

        Ok(PayloadScan {
            profile,
            payload: walk.payload,
            targets: walk.targets,
            world_to_local,
            samples_folded,
        })
    }

    fn collect_samples(
        &self,
        arena: &PartArena,
        id: PartId,
        world_to_local: Transform,
    ) -> Result<Vec<PayloadCollisionSample>, ScanError> {
        let part = arena.get(id).ok_or(ScanError::UnknownPart(id))?;
        let to_base = world_to_local * part.transform;

        let samples = part
            .colliders
            .iter()
            .filter(|c| c.enabled && self.filter.accepts(&c.tag))
            .map(|c| {
                let (points, edges) = c.shape.boundary();
                let points = points.into_iter().map(|p| to_base.apply_point(p)).collect();
                PayloadCollisionSample { part: id, points, edges }
            })
            .collect();
        Ok(samples)
    }
}

struct PayloadWalk {
    seen: HashSet<PartId>,
    queue: VecDeque<PartId>,
    payload: Vec<PartId>,
    targets: Vec<PartId>,
}

impl PayloadWalk {
    fn new(base: PartId) -> Self {
        Self {
            seen: HashSet::from([base]),
            queue: VecDeque::new(),
            payload: Vec::new(),
            targets: Vec::new(),
        }
    }

    fn visit(&mut self, arena: &PartArena, id: PartId) -> Result<(), ScanError> {
        if !self.seen.insert(id) {
            return Ok(());
        }
        let part = arena.get(id).ok_or(ScanError::UnknownPart(id))?;
        if part.fairing_base.is_some() {
            self.targets.push(id);
        } else {
            self.payload.push(id);
            self.queue.push_back(id);
        }
        Ok(())
    }
}
