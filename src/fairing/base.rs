//! Fairing base: owns the payload profile and the solved envelope, and drives
//! every attached side through one deferred rebuild per tick.

use serde::Serialize;
use thiserror::Error;

use super::config::{BaseConfig, BaseMode, ConeShapeParams, SideControls};
use super::contour::{Contour, FairingContourBuilder};
use super::nodes::{NodeLayoutError, SideNodeLayout};
use super::presets::{PresetError, ShapePresetTable};
use super::profile::{ColliderFilter, PayloadProfileScanner, PayloadScan, ScanError};
use super::schedule::{Invalidation, RebuildScheduler};
use super::shell::WedgeLayout;
use super::side::{FairingSide, ShapeConsumer, SideGeometry, SideShape};
use super::snapshot::{PartArena, PartId};
use super::solver::{FairingEnvelope, FairingShapeSolver, InlineTop, SolveOutcome, SolveWarning};
use crate::geom::{PipelineMetrics, TimingBucket, TimingReport, Vec2};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FairingError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    NodeLayout(#[from] NodeLayoutError),
    #[error(transparent)]
    Preset(#[from] PresetError),
    #[error("side slot {slot} out of range for {count} nodes")]
    SlotOutOfRange { slot: usize, count: usize },
    #[error("side slot {0} is empty")]
    EmptySlot(usize),
}

/// Summary of one completed rebuild pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebuildReport {
    pub envelope: FairingEnvelope,
    pub contour_len: usize,
    /// Whether the payload was rescanned in this pass.
    pub rescanned: bool,
    /// Edits coalesced into this pass.
    pub merged_requests: usize,
    pub sides_rebuilt: usize,
    pub warnings: Vec<SolveWarning>,
    #[serde(skip)]
    pub timing: Option<TimingReport>,
}

#[derive(Debug)]
pub struct FairingBase<S: ShapeConsumer = FairingSide> {
    part: PartId,
    config: BaseConfig,
    nodes: SideNodeLayout,
    slots: Vec<Option<S>>,
    filter: ColliderFilter,
    scheduler: RebuildScheduler,
    scan: Option<PayloadScan>,
    solved: Option<SolveOutcome>,
    contour: Option<Contour>,
    metrics: PipelineMetrics,
    passes: usize,
}

impl<S: ShapeConsumer> FairingBase<S> {
    /// A base for arena part `part`. The first tick scans the payload.
    #[must_use]
    pub fn new(part: PartId, config: BaseConfig) -> Self {
        let nodes = SideNodeLayout::default();
        let mut scheduler = RebuildScheduler::new();
        scheduler.request(Invalidation::Payload);
        Self {
            part,
            config: config.sanitized(),
            slots: std::iter::repeat_with(|| None).take(nodes.num_nodes()).collect(),
            nodes,
            filter: ColliderFilter::default(),
            scheduler,
            scan: None,
            solved: None,
            contour: None,
            metrics: PipelineMetrics::default(),
            passes: 0,
        }
    }

    /// Replace the node layout. Existing sides are dropped.
    #[must_use]
    pub fn with_node_layout(mut self, nodes: SideNodeLayout) -> Self {
        self.slots = std::iter::repeat_with(|| None).take(nodes.num_nodes()).collect();
        self.nodes = nodes;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: ColliderFilter) -> Self {
        self.filter = filter;
        self.scheduler.request(Invalidation::Payload);
        self
    }

    #[must_use]
    pub const fn part(&self) -> PartId {
        self.part
    }

    #[must_use]
    pub fn config(&self) -> &BaseConfig {
        &self.config
    }

    #[must_use]
    pub fn nodes(&self) -> &SideNodeLayout {
        &self.nodes
    }

    // ───── signals ─────────────────────────────────────────────────────────

    /// The payload attached above the base changed.
    pub fn payload_changed(&mut self) {
        self.scheduler.request(Invalidation::Payload);
    }

    /// A shape parameter changed; the cached profile stays valid.
    pub fn shape_changed(&mut self) {
        self.scheduler.request(Invalidation::Shape);
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Edit the base configuration. Values are clamped into range afterwards.
    pub fn edit_config(&mut self, f: impl FnOnce(&mut BaseConfig)) {
        let before = self.config.extra_radius;
        f(&mut self.config);
        self.config = self.config.clone().sanitized();
        if self.config.extra_radius.to_bits() == before.to_bits() {
            self.shape_changed();
        } else {
            self.payload_changed();
        }
    }

    // ───── sides ───────────────────────────────────────────────────────────

    fn check_slot(&self, slot: usize) -> Result<(), FairingError> {
        if slot < self.slots.len() {
            Ok(())
        } else {
            Err(FairingError::SlotOutOfRange { slot, count: self.slots.len() })
        }
    }

    /// Attach `side` to node `slot`, returning whatever was there before.
    pub fn attach_side(&mut self, slot: usize, side: S) -> Result<Option<S>, FairingError> {
        self.check_slot(slot)?;
        self.shape_changed();
        Ok(self.slots[slot].replace(side))
    }

    pub fn detach_side(&mut self, slot: usize) -> Option<S> {
        let side = self.slots.get_mut(slot)?.take();
        if side.is_some() {
            self.shape_changed();
        }
        side
    }

    #[must_use]
    pub fn side(&self, slot: usize) -> Option<&S> {
        self.slots.get(slot)?.as_ref()
    }

    /// Occupied slots in node order.
    pub fn sides(&self) -> impl Iterator<Item = (usize, &S)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
    }

    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Edit the side in `slot` and mark the shape dirty. Nothing is rebuilt
    /// until the next tick.
    pub fn edit_side<R>(&mut self, slot: usize, f: impl FnOnce(&mut S) -> R) -> Result<R, FairingError> {
        self.check_slot(slot)?;
        let side = self.slots[slot].as_mut().ok_or(FairingError::EmptySlot(slot))?;
        let out = f(side);
        self.shape_changed();
        Ok(out)
    }

    /// Apply a named preset to the side in `slot`.
    pub fn apply_preset(&mut self, slot: usize, presets: &ShapePresetTable, name: &str) -> Result<(), FairingError> {
        let preset = presets.get(name)?;
        self.edit_side(slot, |side| preset.apply(side.controls_mut()))
    }

    /// Set the auto-shape flags of the side in `slot`, then reset every cone
    /// whose flag is on to `prefab`.
    pub fn set_auto_shape(
        &mut self,
        slot: usize,
        base: Option<bool>,
        nose: Option<bool>,
        prefab: &ConeShapeParams,
    ) -> Result<(), FairingError> {
        self.edit_side(slot, |side| {
            let controls = side.controls_mut();
            if let Some(on) = base {
                controls.base_auto_shape = on;
            }
            if let Some(on) = nose {
                controls.nose_auto_shape = on;
            }
            controls.apply_auto_shape(prefab);
        })
    }

    /// Change the number of side nodes. Rejected while any side is attached.
    pub fn set_side_node_count(&mut self, n: usize) -> Result<(), FairingError> {
        let any_attached = self.attached_count() > 0;
        self.nodes.set_num_nodes(n, any_attached)?;
        self.slots.resize_with(self.nodes.num_nodes(), || None);
        self.shape_changed();
        Ok(())
    }

    // ───── rebuild ─────────────────────────────────────────────────────────

    /// Run the pending rebuild, if any: scan, solve, contour, then push the
    /// shape to every unlocked side. At most one pass runs per call.
    pub fn tick(&mut self, arena: &PartArena) -> Result<Option<RebuildReport>, FairingError> {
        let Some(request) = self.scheduler.take() else {
            return Ok(None);
        };
        self.metrics.begin();

        let rescanned = request.what == Invalidation::Payload || self.scan.is_none();
        if rescanned {
            let scanner = PayloadProfileScanner::new(self.part, self.config.extra_radius, &self.filter);
            match self.metrics.time(TimingBucket::Scan, || scanner.scan(arena)) {
                Ok(scan) => self.scan = Some(scan),
                Err(err) => {
                    self.scheduler.restore(request);
                    return Err(err.into());
                }
            }
        }
        let Some(scan) = self.scan.as_ref() else {
            return Ok(None);
        };

        let lead = self.lead_controls();
        let thickness = self.config.wall_thickness();
        let inline = self.inline_top(scan, arena);
        let solver = FairingShapeSolver::new(lead.cone.min_base_cone_angle, lead.cone.nose_height_ratio);
        let manual = (!self.config.auto_shape).then_some(self.config.manual);
        let outcome = self.metrics.time(TimingBucket::Solve, || {
            solver.solve(&scan.profile, self.config.base_radius(), inline, manual)
        });
        if self.config.auto_shape {
            self.config.manual = outcome.auto;
        }

        let envelope = outcome.envelope;
        let contour = self.metrics.time(TimingBucket::Contour, || {
            FairingContourBuilder::new(&lead.cone, &lead.mapping).build(&envelope)
        });

        let layout = WedgeLayout::new(self.config.circle_segments, u32::try_from(self.nodes.num_nodes()).unwrap_or(u32::MAX));
        let nodes = &self.nodes;
        let slots = &mut self.slots;
        let sides_rebuilt = self.metrics.time(TimingBucket::Mesh, || {
            let mut rebuilt = 0;
            for (i, side) in slots.iter_mut().enumerate() {
                let Some(side) = side.as_mut().filter(|s| !s.is_shape_locked()) else {
                    continue;
                };
                let shape = SideShape {
                    envelope,
                    layout,
                    thickness,
                    cone: lead.cone,
                    density: lead.density,
                    mesh_yaw: nodes.mesh_yaw(i),
                };
                if side.apply_shape(&shape) {
                    rebuilt += 1;
                }
            }
            rebuilt
        });

        self.passes += 1;
        log::debug!(
            "fairing rebuild #{}: {} edits merged, rescanned={rescanned}, {} contour points, {sides_rebuilt} sides",
            self.passes,
            request.merged,
            contour.len()
        );

        let report = RebuildReport {
            envelope,
            contour_len: contour.len(),
            rescanned,
            merged_requests: request.merged,
            sides_rebuilt,
            warnings: outcome.warnings.clone(),
            timing: self.metrics.end(),
        };
        self.contour = Some(contour);
        self.solved = Some(outcome);
        Ok(Some(report))
    }

    /// Completed rebuild passes.
    #[must_use]
    pub fn rebuild_passes(&self) -> usize {
        self.passes
    }

    fn lead_controls(&self) -> SideControls {
        self.sides()
            .next()
            .map_or_else(SideControls::sideless, |(_, side)| side.controls())
    }

    fn inline_top(&self, scan: &PayloadScan, arena: &PartArena) -> Option<InlineTop> {
        let origin = scan.profile.origin();
        match self.config.mode {
            BaseMode::Adapter => Some(InlineTop {
                radius: self.config.top_radius_for(self.config.top_size),
                height: origin.max(self.config.height + self.config.extra_height),
            }),
            BaseMode::Payload => {
                let target = *scan.targets.first()?;
                let nested = arena.get(target)?.fairing_base?;
                Some(InlineTop {
                    radius: self.config.top_radius_for(nested.base_size),
                    height: origin.max(scan.target_height(arena, target)?),
                })
            }
        }
    }

    // ───── outputs ─────────────────────────────────────────────────────────

    #[must_use]
    pub fn scan(&self) -> Option<&PayloadScan> {
        self.scan.as_ref()
    }

    #[must_use]
    pub fn envelope(&self) -> Option<&FairingEnvelope> {
        self.solved.as_ref().map(|s| &s.envelope)
    }

    #[must_use]
    pub fn solve_outcome(&self) -> Option<&SolveOutcome> {
        self.solved.as_ref()
    }

    #[must_use]
    pub fn contour(&self) -> Option<&Contour> {
        self.contour.as_ref()
    }

    /// Step outline of the scanned profile in the base frame.
    #[must_use]
    pub fn profile_outline(&self) -> Vec<Vec2> {
        self.scan.as_ref().map(|s| s.profile.outline()).unwrap_or_default()
    }

    /// Preview outline of the solved fairing, shown only while no side is
    /// attached to render it.
    #[must_use]
    pub fn fairing_outline(&self) -> Option<Vec<Vec2>> {
        if self.attached_count() > 0 {
            return None;
        }
        self.contour.as_ref().map(Contour::outline)
    }
}

impl FairingBase<FairingSide> {
    #[must_use]
    pub fn side_geometry(&self, slot: usize) -> Option<&SideGeometry> {
        self.side(slot)?.geometry()
    }

    /// Summed mass of all built sides.
    #[must_use]
    pub fn total_side_mass(&self) -> f64 {
        self.sides().filter_map(|(_, s)| s.geometry()).map(|g| g.mass).sum()
    }
}
