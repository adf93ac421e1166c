mod bezier;
mod core;
mod diagnostics;
mod mesh;
mod metrics;

pub use bezier::{BezierShape, BezierSlope};
pub use core::{BBox, BOX_EDGES, Point3, Tolerance, Transform, Vec2, Vec3};
pub use diagnostics::MeshDiagnostics;
pub use mesh::{FairingMesh, MeshError};
pub use metrics::{PipelineMetrics, TimingBucket, TimingReport};
