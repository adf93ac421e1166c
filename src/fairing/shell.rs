//! Double-skinned wedge mesh revolved from a contour.
//!
//! Vertex buffer layout, with `M` main vertices per skin, `S = 2·len` vertices
//! per side strip and `R = 2·(num_segs + 1)` vertices per ring:
//!
//! | range                 | contents                                         |
//! |-----------------------|--------------------------------------------------|
//! | `0..M`                | outer skin, row-major, tip last (free-standing)  |
//! | `M..2M`               | inner skin, same order                           |
//! | `2M..2M+S`            | strip on the first wedge edge, outer/inner pairs |
//! | `2M+S..2M+2S`         | strip on the last wedge edge                     |
//! | `2M+2S..2M+2S+R`      | bottom ring, outer/inner pairs                   |
//! | `2M+2S+R..2M+2S+2R`   | top ring (inline only)                           |
//!
//! The mesh frame has the fairing axis on +Y with the wedge centred on +X.

use std::f64::consts::PI;

use serde::Serialize;

use super::config::TextureMapping;
use super::contour::{Contour, ContourPoint};
use super::solver::FairingEnvelope;
use crate::geom::{FairingMesh, Tolerance, Vec2, Vec3};

/// Angular subdivision of the fairing into side wedges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WedgeLayout {
    pub num_segs: u32,
    pub num_side_parts: u32,
}

impl WedgeLayout {
    /// Split `circle_segments` evenly across `num_side_parts`, never below two
    /// columns per wedge.
    #[must_use]
    pub fn new(circle_segments: u32, num_side_parts: u32) -> Self {
        let num_side_parts = num_side_parts.max(1);
        Self {
            num_segs: (circle_segments / num_side_parts).max(2),
            num_side_parts,
        }
    }

    /// Wedge span in degrees.
    #[must_use]
    pub fn wedge_angle(&self) -> f64 {
        360.0 / f64::from(self.num_side_parts)
    }

    /// Horizontal column directions across the wedge, `num_segs + 1` of them.
    #[must_use]
    pub fn directions(&self) -> Vec<Vec3> {
        let segs = f64::from(self.num_segs);
        let parts = f64::from(self.num_side_parts);
        (0..=self.num_segs)
            .map(|i| {
                let a = PI * 2.0 * (f64::from(i) - segs * 0.5) / (parts * segs);
                Vec3::new(a.cos(), 0.0, a.sin())
            })
            .collect()
    }
}

/// Buffer sizes for one wedge. Callers size buffers from these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShellCounts {
    pub main_vertices: usize,
    pub main_faces: usize,
    pub side_vertices: usize,
    pub side_faces: usize,
    pub ring_vertices: usize,
    pub ring_faces: usize,
    pub inline: bool,
}

impl ShellCounts {
    #[must_use]
    pub fn new(contour_len: usize, num_segs: usize, inline: bool) -> Self {
        let len = contour_len;
        let (main_vertices, main_faces) = if inline {
            ((num_segs + 1) * len, num_segs * (len - 1) * 2)
        } else {
            ((num_segs + 1) * (len - 1) + 1, num_segs * ((len - 2) * 2 + 1))
        };
        Self {
            main_vertices,
            main_faces,
            side_vertices: len * 2,
            side_faces: (len - 1) * 2,
            ring_vertices: (num_segs + 1) * 2,
            ring_faces: num_segs * 2,
            inline,
        }
    }

    fn rings(&self) -> usize {
        if self.inline { 2 } else { 1 }
    }

    #[must_use]
    pub fn total_vertices(&self) -> usize {
        self.main_vertices * 2 + self.side_vertices * 2 + self.ring_vertices * self.rings()
    }

    #[must_use]
    pub fn total_faces(&self) -> usize {
        self.main_faces * 2 + self.side_faces * 2 + self.ring_faces * self.rings()
    }
}

pub struct ShellInput<'a> {
    pub contour: &'a Contour,
    pub envelope: &'a FairingEnvelope,
    pub layout: WedgeLayout,
    pub thickness: f64,
    pub mapping: &'a TextureMapping,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShellOutput {
    pub mesh: FairingMesh,
    pub counts: ShellCounts,
    /// Wall surface area of the wedge.
    pub area: f64,
    /// `area × thickness`.
    pub volume: f64,
    /// Estimated centre of mass in the mesh frame.
    pub center_offset: Vec3,
}

/// Horizontal texture mapping per column, derived once per rebuild.
struct ColumnMapping {
    seg_o: f64,
    seg_i: f64,
    ofs_o: f64,
    ofs_i: f64,
    center_o: f64,
    center_i: f64,
    strip_u0: f64,
    strip_u1: f64,
    nose_v0: f64,
    nose_v_scale: f64,
}

impl ColumnMapping {
    fn new(mapping: &TextureMapping, layout: WedgeLayout) -> Self {
        let [sx, _] = mapping.mapping_scale;
        let [h0, h1, h2, h3] = mapping.hor_mapping;
        let segs = f64::from(layout.num_segs);
        let parts = f64::from(layout.num_side_parts);

        let mut seg_o = (h1 - h0) / (sx * segs);
        let mut seg_i = (h3 - h2) / (sx * segs);
        let mut ofs_o = h0 / sx;
        let mut ofs_i = h2 / sx;
        if layout.num_side_parts > 2 {
            ofs_o += seg_o * segs * (0.5 - 1.0 / parts);
            seg_o *= 2.0 / parts;
            ofs_i += seg_i * segs * (0.5 - 1.0 / parts);
            seg_i *= 2.0 / parts;
        }

        let (nose_v0, nose_v1) = mapping.nose_v();
        Self {
            seg_o,
            seg_i,
            ofs_o,
            ofs_i,
            center_o: (h0 + h1) / (sx * 2.0),
            center_i: (h2 + h3) / (sx * 2.0),
            strip_u0: mapping.strip_mapping[0] / sx,
            strip_u1: mapping.strip_mapping[1] / sx,
            nose_v0,
            nose_v_scale: 1.0 / (nose_v1 - nose_v0),
        }
    }

    /// `(outer u, inner u)` for column `j` on a row with texture coordinate `v`.
    /// Across the nose band both converge on their range centres.
    fn column_u(&self, j: u32, num_segs: u32, v: f64) -> (f64, f64) {
        let mut uo = f64::from(j) * self.seg_o + self.ofs_o;
        let mut ui = f64::from(num_segs - j) * self.seg_i + self.ofs_i;
        let band = (v - self.nose_v0) * self.nose_v_scale;
        if band > 0.0 && band < 1.0 {
            let us = 1.0 - band;
            uo = (uo - self.center_o) * us + self.center_o;
            ui = (ui - self.center_i) * us + self.center_i;
        }
        (uo, ui)
    }
}

/// Contour normals used to offset the outer skin; first and last rows get
/// one-sided differences.
fn skin_normals(points: &[Vec2]) -> Vec<Vec2> {
    let last = points.len() - 1;
    (0..points.len())
        .map(|i| {
            let chord = if i == 0 {
                points[1] - points[0]
            } else if i == last {
                points[i] - points[i - 1]
            } else {
                points[i + 1] - points[i - 1]
            };
            chord.perp().normalized_or_zero()
        })
        .collect()
}

fn put(buf: &mut [[f64; 3]], i: usize, v: Vec3) {
    buf[i] = v.to_array();
}

fn tangent(v: Vec3) -> [f64; 4] {
    [v.x, v.y, v.z, 1.0]
}

fn pair_tangent(outer: [f64; 3], inner: [f64; 3]) -> [f64; 4] {
    let d = Vec3::new(inner[0] - outer[0], inner[1] - outer[1], inner[2] - outer[2]);
    tangent(d.normalized().unwrap_or(Vec3::ZERO))
}

/// Consecutive contour rows closer than [`Tolerance::WELD`] collapse into the
/// first of them. A contour that would fall below two rows is kept as is.
fn welded_rows(points: &[ContourPoint]) -> Vec<ContourPoint> {
    let mut rows: Vec<ContourPoint> = Vec::with_capacity(points.len());
    for &p in points {
        match rows.last() {
            Some(last) if (p.planar() - last.planar()).length() <= Tolerance::WELD.eps => {}
            _ => rows.push(p),
        }
    }
    if rows.len() < 2 { points.to_vec() } else { rows }
}

/// Build one wedge. Requires a contour of at least two points. Coincident
/// consecutive rows are welded first, so `counts` follows the welded length.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn build_shell(input: &ShellInput<'_>) -> ShellOutput {
    let contour = welded_rows(input.contour.points());
    let len = contour.len();
    let inline = input.contour.is_inline();
    let layout = input.layout;
    let segs = layout.num_segs as usize;
    let th = input.thickness;
    let [_, sy] = input.mapping.mapping_scale;

    let counts = ShellCounts::new(len, segs, inline);
    let m = counts.main_vertices;
    let side = counts.side_vertices;
    let mut mesh = FairingMesh::with_capacity(counts.total_vertices(), counts.total_faces());

    let dirs = layout.directions();
    let planar: Vec<Vec2> = contour.iter().map(|p| p.planar()).collect();
    let cols = ColumnMapping::new(input.mapping, layout);

    let top = contour[len - 1];
    let area: f64 = planar
        .windows(2)
        .map(|w| (w[0].x + w[1].x) * (w[1].y - w[0].y) * PI / f64::from(layout.num_side_parts))
        .sum();
    let half_wedge = (layout.wedge_angle() / 2.0).to_radians().cos();
    let center_offset = Vec3::new(input.envelope.max_radius * (1.0 + half_wedge) / 2.0, top.height * 0.5, 0.0);

    // Nose tip.
    if !inline {
        let tip_u = |seg: f64, ofs: f64| seg * 0.5 * f64::from(layout.num_segs) + ofs;
        put(&mut mesh.positions, m - 1, Vec3::new(0.0, top.height + th, 0.0));
        put(&mut mesh.positions, 2 * m - 1, Vec3::new(0.0, top.height, 0.0));
        mesh.uvs[m - 1] = [tip_u(cols.seg_o, cols.ofs_o), top.v];
        mesh.uvs[2 * m - 1] = [tip_u(cols.seg_i, cols.ofs_i), top.v];
        put(&mut mesh.normals, m - 1, Vec3::Y);
        put(&mut mesh.normals, 2 * m - 1, -Vec3::Y);
        mesh.tangents[m - 1] = tangent(Vec3::ZERO);
        mesh.tangents[2 * m - 1] = tangent(Vec3::ZERO);
    }

    // Main skins.
    let normals = skin_normals(&planar);
    let rows = if inline { len } else { len - 1 };
    let mut vi = 0usize;
    for i in 0..rows {
        let p = contour[i];
        let n = normals[i];
        let radial_offset = i == 0 || i == len - 1;
        for (j, &d) in dirs.iter().enumerate() {
            let dp = d * p.radius + Vec3::Y * p.height;
            let dn = d * n.x + Vec3::Y * n.y;
            let outer = if radial_offset { dp + d * th } else { dp + dn * th };

            put(&mut mesh.positions, vi, outer);
            put(&mut mesh.positions, vi + m, dp);

            #[allow(clippy::cast_possible_truncation)]
            let (uo, ui) = cols.column_u(j as u32, layout.num_segs, p.v);
            mesh.uvs[vi] = [uo, p.v];
            mesh.uvs[vi + m] = [ui, p.v];

            put(&mut mesh.normals, vi, dn);
            put(&mut mesh.normals, vi + m, -dn);
            mesh.tangents[vi] = tangent(Vec3::new(-d.z, 0.0, d.x));
            mesh.tangents[vi + m] = tangent(Vec3::new(d.z, 0.0, -d.x));
            vi += 1;
        }
    }

    // Side strips along both wedge edges.
    let strip_span = (input.mapping.strip_mapping[1] - input.mapping.strip_mapping[0]).abs();
    let strip_scale = if th * sy > Tolerance::ZERO_LENGTH.eps { strip_span / (th * sy) } else { 0.0 };
    let segment_len = |i: usize| (planar[i + 1] - planar[i]).length() * strip_scale;

    let mut vi = 2 * m;
    let mut o = 0.0;
    let d = dirs[0];
    for i in 0..len {
        let si = i * (segs + 1);
        copy_pair(&mut mesh, vi, si, si + m, [cols.strip_u0, cols.strip_u1], o, Vec3::new(d.z, 0.0, -d.x));
        if i + 1 < len {
            o += segment_len(i);
        }
        vi += 2;
    }

    let mut vi = 2 * m + side + side - 2;
    let d = dirs[segs];
    for i in (0..len).rev() {
        let si = if i == len - 1 && !inline { m - 1 } else { i * (segs + 1) + segs };
        copy_pair(&mut mesh, vi, si, si + m, [cols.strip_u0, cols.strip_u1], o, Vec3::new(-d.z, 0.0, d.x));
        if i > 0 {
            o += segment_len(i - 1);
        }
        vi = vi.saturating_sub(2);
    }

    // Rings.
    let parts = f64::from(layout.num_side_parts);
    let ring_seg = input.envelope.base_radius * PI * 2.0 / (f64::from(layout.num_segs) * parts);
    let mut vi = 2 * m + 2 * side;
    let mut o = 0.0;
    for j in (0..=segs).rev() {
        copy_pair(&mut mesh, vi, j, j + m, [cols.strip_u0, cols.strip_u1], o, -Vec3::Y);
        vi += 2;
        o += ring_seg * strip_scale;
    }
    if inline {
        let top_ring_seg = input.envelope.top_radius() * PI * 2.0 / (f64::from(layout.num_segs) * parts);
        let si = (len - 1) * (segs + 1);
        let mut o = 0.0;
        for j in 0..=segs {
            copy_pair(&mut mesh, vi, si + j, si + j + m, [cols.strip_u0, cols.strip_u1], o, Vec3::Y);
            vi += 2;
            o += top_ring_seg * strip_scale;
        }
    }

    write_triangles(&mut mesh.indices, &counts, len, segs);

    ShellOutput {
        mesh,
        counts,
        area,
        volume: area * th,
        center_offset,
    }
}

/// Copy an outer/inner vertex pair from the skins into a strip or ring slot.
fn copy_pair(mesh: &mut FairingMesh, vi: usize, outer: usize, inner: usize, u: [f64; 2], o: f64, normal: Vec3) {
    let (po, pi) = (mesh.positions[outer], mesh.positions[inner]);
    mesh.positions[vi] = po;
    mesh.positions[vi + 1] = pi;
    mesh.uvs[vi] = [u[0], o];
    mesh.uvs[vi + 1] = [u[1], o];
    put(&mut mesh.normals, vi, normal);
    put(&mut mesh.normals, vi + 1, normal);
    let t = pair_tangent(po, pi);
    mesh.tangents[vi] = t;
    mesh.tangents[vi + 1] = t;
}

#[allow(clippy::cast_possible_truncation)]
fn write_triangles(tri: &mut [u32], counts: &ShellCounts, len: usize, segs: usize) {
    let m = counts.main_vertices;
    let side = counts.side_vertices;
    let row = segs + 1;
    let mut emit = |at: &mut usize, a: usize, b: usize, c: usize| {
        tri[*at] = a as u32;
        tri[*at + 1] = b as u32;
        tri[*at + 2] = c as u32;
        *at += 3;
    };

    // Main quads, outer then inner with reversed winding.
    let mut outer = 0usize;
    let mut inner = counts.main_faces * 3;
    let quad_rows = if counts.inline { len - 1 } else { len - 2 };
    let mut vi = 0usize;
    for _ in 0..quad_rows {
        for _ in 0..segs {
            emit(&mut outer, vi, vi + row + 1, vi + 1);
            emit(&mut outer, vi, vi + row, vi + row + 1);
            emit(&mut inner, m + vi, m + vi + 1, m + vi + row + 1);
            emit(&mut inner, m + vi, m + vi + row + 1, m + vi + row);
            vi += 1;
        }
        vi += 1;
    }
    if !counts.inline {
        for _ in 0..segs {
            emit(&mut outer, vi, m - 1, vi + 1);
            emit(&mut inner, m + vi, m + vi + 1, 2 * m - 1);
            vi += 1;
        }
    }

    // Side strips.
    let mut first = counts.main_faces * 2 * 3;
    let mut second = first + counts.side_faces * 3;
    let mut vi = 2 * m;
    for _ in 0..len - 1 {
        emit(&mut first, vi, vi + 1, vi + 3);
        emit(&mut first, vi, vi + 3, vi + 2);
        emit(&mut second, side + vi, side + vi + 3, side + vi + 1);
        emit(&mut second, side + vi, side + vi + 2, side + vi + 3);
        vi += 2;
    }

    // Rings.
    let mut at = (counts.main_faces + counts.side_faces) * 2 * 3;
    let mut vi = 2 * m + 2 * side;
    for _ in 0..segs {
        emit(&mut at, vi, vi + 1, vi + 3);
        emit(&mut at, vi, vi + 3, vi + 2);
        vi += 2;
    }
    if counts.inline {
        vi += 2;
        for _ in 0..segs {
            emit(&mut at, vi, vi + 1, vi + 3);
            emit(&mut at, vi, vi + 3, vi + 2);
            vi += 2;
        }
    }
}
