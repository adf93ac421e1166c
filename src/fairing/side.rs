//! One side wedge of a fairing.
//!
//! A side never solves anything itself. The base pushes a [`SideShape`] down,
//! and the side rebuilds its own contour, mesh and colliders from it using its
//! own texture mapping.

use serde::Serialize;
use thiserror::Error;

use super::colliders::{CollisionVolumes, build_colliders};
use super::config::{ConeShapeParams, SideControls};
use super::contour::{Contour, FairingContourBuilder};
use super::shell::{ShellCounts, ShellInput, WedgeLayout, build_shell};
use super::solver::FairingEnvelope;
use crate::geom::{FairingMesh, Point3, Transform, Vec3};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SideError {
    #[error("side part has no `{0}` model transform")]
    MissingModel(String),
    #[error("model `{0}` has no mesh to rebuild")]
    MissingMesh(String),
}

/// Solved parameters a base hands to each unlocked side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideShape {
    pub envelope: FairingEnvelope,
    pub layout: WedgeLayout,
    pub thickness: f64,
    /// Cone controls of the lead side.
    pub cone: ConeShapeParams,
    pub density: f64,
    /// Degrees about the fairing axis turning the wedge towards its node.
    pub mesh_yaw: f64,
}

/// Anything that renders the solved shape.
pub trait ShapeConsumer {
    fn controls(&self) -> SideControls;

    fn controls_mut(&mut self) -> &mut SideControls;

    fn is_shape_locked(&self) -> bool {
        self.controls().shape_lock
    }

    /// Take a new solved shape. Returns `true` when geometry was rebuilt.
    fn apply_shape(&mut self, shape: &SideShape) -> bool;
}

/// Render anchor inside a side part. `has_mesh` is false for parts whose model
/// carries no mesh object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideModel {
    pub name: String,
    pub has_mesh: bool,
}

impl Default for SideModel {
    fn default() -> Self {
        Self { name: "model".into(), has_mesh: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideGeometry {
    pub contour: Contour,
    pub mesh: FairingMesh,
    pub colliders: CollisionVolumes,
    pub counts: ShellCounts,
    pub area: f64,
    pub volume: f64,
    pub mass: f64,
    /// Mesh frame.
    pub center_of_mass: Vec3,
    pub mesh_yaw: f64,
}

impl SideGeometry {
    /// Mesh frame to base frame.
    #[must_use]
    pub fn placement(&self) -> Transform {
        Transform::rotate_y(self.mesh_yaw.to_radians())
    }

    /// Centre of mass in the base frame.
    #[must_use]
    pub fn center_of_mass_in_base(&self) -> Point3 {
        self.placement().apply_point(Point3::ORIGIN + self.center_of_mass)
    }
}

#[derive(Debug, Clone)]
pub struct FairingSide {
    pub controls: SideControls,
    model: Option<SideModel>,
    shape: Option<SideShape>,
    geometry: Option<SideGeometry>,
    rebuilds: usize,
}

/// A default side carries a model, so it builds geometry like one from
/// [`FairingSide::new`].
impl Default for FairingSide {
    fn default() -> Self {
        Self {
            controls: SideControls::default(),
            model: Some(SideModel::default()),
            shape: None,
            geometry: None,
            rebuilds: 0,
        }
    }
}

impl FairingSide {
    #[must_use]
    pub fn new(controls: SideControls) -> Self {
        Self { controls, ..Self::default() }
    }

    #[must_use]
    pub fn with_model(mut self, model: Option<SideModel>) -> Self {
        self.model = model;
        self
    }

    #[must_use]
    pub fn shape(&self) -> Option<&SideShape> {
        self.shape.as_ref()
    }

    #[must_use]
    pub fn geometry(&self) -> Option<&SideGeometry> {
        self.geometry.as_ref()
    }

    /// Completed rebuilds since creation.
    #[must_use]
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    /// Rebuild contour, mesh and colliders from the last pushed shape.
    ///
    /// Without a pushed shape there is nothing to build and `Ok(None)` is
    /// returned. On error the previous geometry is kept.
    pub fn rebuild_mesh(&mut self) -> Result<Option<&SideGeometry>, SideError> {
        let model = self.model.as_ref().ok_or_else(|| SideError::MissingModel("model".into()))?;
        if !model.has_mesh {
            return Err(SideError::MissingMesh(model.name.clone()));
        }
        let Some(shape) = self.shape.as_ref() else {
            return Ok(None);
        };

        let contour = FairingContourBuilder::new(&self.controls.cone, &self.controls.mapping).build(&shape.envelope);
        let input = ShellInput {
            contour: &contour,
            envelope: &shape.envelope,
            layout: shape.layout,
            thickness: shape.thickness,
            mapping: &self.controls.mapping,
        };
        let ratio = self.controls.cone.nose_height_ratio;
        let shave = self.controls.collider_shave_angle;

        #[cfg(feature = "parallel")]
        let (shell, colliders) = rayon::join(|| build_shell(&input), || build_colliders(&input, ratio, shave));
        #[cfg(not(feature = "parallel"))]
        let (shell, colliders) = (build_shell(&input), build_colliders(&input, ratio, shave));

        log::debug!(
            "side rebuild: {} contour points, {} vertices, {} triangles, {} colliders",
            contour.len(),
            shell.mesh.vertex_count(),
            shell.mesh.triangle_count(),
            colliders.len()
        );

        let density = self.controls.density;
        self.rebuilds += 1;
        Ok(Some(self.geometry.insert(SideGeometry {
            contour,
            mesh: shell.mesh,
            colliders,
            counts: shell.counts,
            area: shell.area,
            volume: shell.volume,
            mass: shell.volume * density,
            center_of_mass: shell.center_offset,
            mesh_yaw: shape.mesh_yaw,
        })))
    }
}

impl ShapeConsumer for FairingSide {
    fn controls(&self) -> SideControls {
        self.controls
    }

    fn controls_mut(&mut self) -> &mut SideControls {
        &mut self.controls
    }

    fn apply_shape(&mut self, shape: &SideShape) -> bool {
        self.controls.cone = shape.cone;
        self.controls.density = shape.density;
        self.shape = Some(shape.clone());
        match self.rebuild_mesh() {
            Ok(built) => built.is_some(),
            Err(err) => {
                log::error!("fairing side rebuild aborted: {err}");
                false
            }
        }
    }
}
