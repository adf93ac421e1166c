//! Collision volumes for one side wedge: a row of thin boxes per contour
//! segment plus a sphere capping the nose or plugging the inline wall.

use serde::Serialize;

use super::shell::ShellInput;
use crate::geom::{Point3, Vec2, Vec3};

/// Box thickness as a fraction of the wall thickness.
const BOX_DEPTH: f64 = 0.1;
/// Segments shorter than this get no box.
const MIN_BOX_LENGTH: f64 = 0.001;

/// Oriented box. `axes` is `[right, up, forward]`; `size` is measured along them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxCollider {
    pub name: String,
    pub center: Point3,
    pub axes: [Vec3; 3],
    pub size: Vec3,
}

impl BoxCollider {
    #[must_use]
    pub fn corners(&self) -> [Point3; 8] {
        let [r, u, f] = self.axes;
        let h = self.size * 0.5;
        let mut out = [self.center; 8];
        for (bits, corner) in out.iter_mut().enumerate() {
            let sx = if bits & 1 == 0 { -h.x } else { h.x };
            let sy = if bits & 2 == 0 { -h.y } else { h.y };
            let sz = if bits & 4 == 0 { -h.z } else { h.z };
            *corner = self.center + r * sx + u * sy + f * sz;
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SphereCollider {
    pub name: String,
    pub center: Point3,
    pub radius: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollisionVolumes {
    pub boxes: Vec<BoxCollider>,
    pub spheres: Vec<SphereCollider>,
}

impl CollisionVolumes {
    #[must_use]
    pub fn len(&self) -> usize {
        self.boxes.len() + self.spheres.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty() && self.spheres.is_empty()
    }
}

/// Build collision volumes in the mesh frame. `shave_angle` (degrees) is
/// trimmed off the wedge so neighbouring sides do not overlap.
#[must_use]
pub fn build_colliders(input: &ShellInput<'_>, nose_height_ratio: f64, shave_angle: f64) -> CollisionVolumes {
    let contour = input.contour.points();
    let env = input.envelope;
    let th = input.thickness;
    let mut volumes = CollisionVolumes::default();
    if contour.len() < 2 {
        return volumes;
    }

    let nose = if input.contour.is_inline() {
        let r = th * 0.5;
        SphereCollider {
            name: "nose_collider".into(),
            center: Point3::new(env.max_radius + r, (env.cylinder_start + env.cylinder_end) * 0.5, 0.0),
            radius: r,
        }
    } else {
        let r = env.max_radius * 0.2;
        SphereCollider {
            name: "nose_collider".into(),
            center: Point3::new(r, env.cylinder_end + env.max_radius * nose_height_ratio - r * 1.2, 0.0),
            radius: r,
        }
    };
    volumes.spheres.push(nose);

    let columns = input.layout.num_segs + 1;
    let angle_per_part = (input.layout.wedge_angle() - shave_angle).max(1.0);
    let angle_per_column = angle_per_part / f64::from(columns);
    let start_angle = -angle_per_part / 2.0 + angle_per_column / 2.0;
    let parts = f64::from(input.layout.num_side_parts);

    let planar: Vec<Vec2> = contour.iter().map(|p| p.planar()).collect();
    let normals = collider_normals(&planar, env.cylinder_start);

    for i in 0..planar.len() - 1 {
        let p = planar[i] + normals[i] * th;
        let p_next = planar[i + 1] + normals[i + 1] * th;
        let along = p_next - p;
        let length = along.length();
        if length <= MIN_BOX_LENGTH {
            continue;
        }
        let n = along.perp().normalized_or_zero();
        let cp = (p + p_next) * 0.5 - n * (BOX_DEPTH * th);
        let width = cp.x * std::f64::consts::PI * 2.0 / (parts * f64::from(columns));
        let size = Vec3::new(width, length, BOX_DEPTH * th);

        for j in 0..columns {
            let (sin, cos) = (start_angle + f64::from(j) * angle_per_column).to_radians().sin_cos();
            let project = |v: Vec2| Vec3::new(cos * v.x, v.y, sin * v.x);
            let forward = Vec3::new(n.x * cos, n.y, n.x * sin);
            let up = (project(cp) - project(p)).normalized().unwrap_or(Vec3::Y);
            volumes.boxes.push(BoxCollider {
                name: format!("collider_{i}_{j}"),
                center: Point3::ORIGIN + project(cp),
                axes: look_axes(forward, up),
                size,
            });
        }
    }
    volumes
}

/// Per-point outward normals. The base keeps a vertical wall when a cylinder
/// starts above it, and the last point always faces straight out.
fn collider_normals(points: &[Vec2], cylinder_start: f64) -> Vec<Vec2> {
    let last = points.len() - 1;
    (0..points.len())
        .map(|i| {
            let tangent = if i == 0 {
                if cylinder_start > 1e-6 { Vec2::UP } else { points[1] - points[0] }
            } else if i == last {
                Vec2::UP
            } else {
                points[i + 1] - points[i - 1]
            };
            tangent.perp().normalized_or_zero()
        })
        .collect()
}

/// Orthonormal `[right, up, forward]` frame looking along `forward`.
fn look_axes(forward: Vec3, up: Vec3) -> [Vec3; 3] {
    let f = forward.normalized().unwrap_or(Vec3::Z);
    let r = up
        .cross(f)
        .normalized()
        .or_else(|| Vec3::Y.cross(f).normalized())
        .unwrap_or(Vec3::X);
    [r, f.cross(r), f]
}
