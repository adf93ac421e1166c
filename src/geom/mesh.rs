use std::collections::HashMap;

use serde::Serialize;

use super::diagnostics::MeshDiagnostics;
use super::{Point3, Tolerance};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("mesh indices are not a triangle list (len % 3 != 0)")]
    NotTriangleList,
    #[error("mesh has invalid vertex coordinates (NaN/Inf)")]
    InvalidVertices,
    #[error("mesh index {index} is out of bounds for {vertex_count} vertices")]
    IndexOutOfBounds { index: u32, vertex_count: usize },
    #[error("mesh attribute buffers do not match vertex count")]
    AttributeLength,
}

/// Render buffers for one fairing wedge.
///
/// Every attribute buffer is parallel to `positions`. Tangents carry the
/// bitangent sign in `w`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FairingMesh {
    pub positions: Vec<[f64; 3]>,
    pub normals: Vec<[f64; 3]>,
    pub tangents: Vec<[f64; 4]>,
    pub uvs: Vec<[f64; 2]>,
    pub indices: Vec<u32>,
}

impl FairingMesh {
    /// Zero-filled buffers sized for `vertex_count` vertices and `triangle_count` triangles.
    #[must_use]
    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            positions: vec![[0.0; 3]; vertex_count],
            normals: vec![[0.0; 3]; vertex_count],
            tangents: vec![[0.0; 4]; vertex_count],
            uvs: vec![[0.0; 2]; vertex_count],
            indices: vec![0; triangle_count * 3],
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn validate(&self) -> Result<(), MeshError> {
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::NotTriangleList);
        }
        if self.positions.iter().flatten().any(|c| !c.is_finite()) {
            return Err(MeshError::InvalidVertices);
        }
        let n = self.positions.len();
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= n) {
            return Err(MeshError::IndexOutOfBounds { index, vertex_count: n });
        }
        if self.normals.len() != n || self.tangents.len() != n || self.uvs.len() != n {
            return Err(MeshError::AttributeLength);
        }
        Ok(())
    }

    /// Packed `[x0, y0, z0, x1, ...]` view for wasm/JS adapters.
    #[must_use]
    pub fn positions_flat(&self) -> &[f64] {
        self.positions.as_flattened()
    }

    #[must_use]
    pub fn normals_flat(&self) -> &[f64] {
        self.normals.as_flattened()
    }

    #[must_use]
    pub fn tangents_flat(&self) -> &[f64] {
        self.tangents.as_flattened()
    }

    #[must_use]
    pub fn uvs_flat(&self) -> &[f64] {
        self.uvs.as_flattened()
    }

    /// Number of vertices no triangle refers to.
    #[must_use]
    pub fn unreferenced_vertex_count(&self) -> usize {
        let mut used = vec![false; self.positions.len()];
        for &i in &self.indices {
            if let Some(slot) = used.get_mut(i as usize) {
                *slot = true;
            }
        }
        used.iter().filter(|u| !**u).count()
    }

    /// Topology and quality report. Seam duplicates (vertices split only for
    /// UV or normal discontinuities) are welded by position before edges are
    /// counted, so a closed shell reports zero open edges.
    #[must_use]
    pub fn diagnostics(&self, tol: Tolerance) -> MeshDiagnostics {
        let (welded, unique) = weld_positions(&self.positions, tol);
        let (open, non_manifold, degenerate) = count_edge_topology(&welded, &self.indices);

        let mut diag = MeshDiagnostics {
            vertex_count: self.vertex_count(),
            triangle_count: self.triangle_count(),
            welded_vertex_count: self.vertex_count() - unique,
            open_edge_count: open,
            non_manifold_edge_count: non_manifold,
            degenerate_triangle_count: degenerate,
            unreferenced_vertex_count: self.unreferenced_vertex_count(),
            warnings: Vec::new(),
        };
        if diag.unreferenced_vertex_count > 0 {
            diag.add_warning(format!("{} vertices are not referenced", diag.unreferenced_vertex_count));
        }
        diag
    }

    /// Positions transformed by `f`, used to place a wedge in its part frame.
    #[must_use]
    pub fn transformed_positions(&self, f: impl Fn(Point3) -> Point3) -> Vec<[f64; 3]> {
        self.positions.iter().map(|&p| f(Point3::from(p)).to_array()).collect()
    }
}

/// Maps every vertex to a representative index shared by all vertices in the
/// same tolerance cell. Returns the remap and the number of distinct cells.
fn weld_positions(positions: &[[f64; 3]], tol: Tolerance) -> (Vec<u32>, usize) {
    let inv = 1.0 / tol.eps.max(f64::MIN_POSITIVE);
    let quantize = |v: f64| -> i64 {
        #[allow(clippy::cast_possible_truncation)]
        let q = (v * inv).round() as i64;
        q
    };

    let mut cells: HashMap<(i64, i64, i64), u32> = HashMap::new();
    let mut remap = Vec::with_capacity(positions.len());
    for (i, p) in positions.iter().enumerate() {
        let key = (quantize(p[0]), quantize(p[1]), quantize(p[2]));
        #[allow(clippy::cast_possible_truncation)]
        let rep = *cells.entry(key).or_insert(i as u32);
        remap.push(rep);
    }
    (remap, cells.len())
}

fn count_edge_topology(remap: &[u32], indices: &[u32]) -> (usize, usize, usize) {
    let mut edge_counts: HashMap<(u32, u32), u32> = HashMap::new();
    let mut degenerate = 0usize;

    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| remap.get(i as usize).copied().unwrap_or(i));
        if a == b || b == c || a == c {
            degenerate += 1;
            continue;
        }
        for (ea, eb) in [(a, b), (b, c), (c, a)] {
            let key = if ea <= eb { (ea, eb) } else { (eb, ea) };
            *edge_counts.entry(key).or_insert(0) += 1;
        }
    }

    let open = edge_counts.values().filter(|&&c| c == 1).count();
    let non_manifold = edge_counts.values().filter(|&&c| c > 2).count();
    (open, non_manifold, degenerate)
}
