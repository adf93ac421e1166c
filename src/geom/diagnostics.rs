//! Topology diagnostics for generated fairing meshes.
//!
//! Fairing wedges duplicate vertices along UV seams (side strips, ring caps,
//! the nose tip), so counts here are taken after welding by position. A
//! correctly stitched wedge is a closed shell: zero open edges, zero
//! non-manifold edges, and every vertex referenced by some triangle.
//!
//! ```ignore
//! let diag = mesh.diagnostics(Tolerance::WELD);
//! if !diag.is_closed() {
//!     log::warn!("fairing wedge has {} open edges", diag.open_edge_count);
//! }
//! ```

use std::fmt;

use serde::Serialize;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct MeshDiagnostics {
    pub vertex_count: usize,
    pub triangle_count: usize,

    /// Vertices sharing a position with an earlier vertex (seam duplicates).
    pub welded_vertex_count: usize,

    /// Edges with exactly one adjacent triangle after welding.
    pub open_edge_count: usize,

    /// Edges with more than two adjacent triangles after welding.
    pub non_manifold_edge_count: usize,

    /// Triangles that collapse to a line or point after welding.
    pub degenerate_triangle_count: usize,

    pub unreferenced_vertex_count: usize,

    pub warnings: Vec<String>,
}

impl MeshDiagnostics {
    /// No holes and no fans of three or more faces on one edge.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.open_edge_count == 0 && self.non_manifold_edge_count == 0
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.is_closed()
            && self.degenerate_triangle_count == 0
            && self.unreferenced_vertex_count == 0
            && self.warnings.is_empty()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

impl fmt::Display for MeshDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vertices={} triangles={} welded={} open_edges={} non_manifold={} degenerate={} unreferenced={}",
            self.vertex_count,
            self.triangle_count,
            self.welded_vertex_count,
            self.open_edge_count,
            self.non_manifold_edge_count,
            self.degenerate_triangle_count,
            self.unreferenced_vertex_count,
        )?;
        for warning in &self.warnings {
            write!(f, "\n  warning: {warning}")?;
        }
        Ok(())
    }
}
