//! Payload-driven fairing pipeline: scan, solve, contour, mesh.

mod base;
mod colliders;
mod config;
mod contour;
mod nodes;
mod presets;
mod profile;
mod schedule;
mod shell;
mod side;
mod snapshot;
mod solver;

pub use base::{FairingBase, FairingError, RebuildReport};
pub use colliders::{BoxCollider, CollisionVolumes, SphereCollider, build_colliders};
pub use config::{
    BaseConfig, BaseMode, ConeShapeParams, MAX_CYLINDER_DIMENSION, MIN_SIDE_THICKNESS, ManualShape,
    SideControls, TextureMapping,
};
pub use contour::{Contour, ContourPoint, FairingContourBuilder, base_cone_degenerate, top_cone_degenerate};
pub use nodes::{NodeLayoutError, RADIUS_STEP, SideNodeLayout};
pub use presets::{PresetError, ShapePreset, ShapePresetTable};
pub use profile::{
    ColliderFilter, DEFAULT_IGNORED_TAGS, PayloadCollisionSample, PayloadProfileScanner, PayloadScan,
    RadialProfile, ScanError, VERTICAL_STEP,
};
pub use schedule::{DrainedRequest, Invalidation, RebuildScheduler};
pub use shell::{ShellCounts, ShellInput, ShellOutput, WedgeLayout, build_shell};
pub use side::{FairingSide, ShapeConsumer, SideError, SideGeometry, SideModel, SideShape};
pub use snapshot::{
    AttachNodeRecord, ColliderRecord, ColliderShape, NestedBaseRecord, PartArena, PartId, PartRecord,
};
pub use solver::{FairingEnvelope, FairingShapeSolver, InlineTop, SolveOutcome, SolveWarning};

#[cfg(test)]
mod tests;
