//! Placement of the side attachment nodes around the base.

use serde::Serialize;
use thiserror::Error;

use crate::geom::Point3;

/// Side node radius increment; node sizes are counted in these.
pub const RADIUS_STEP: f64 = 0.625;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NodeLayoutError {
    #[error("Please detach any fairing parts before changing the number of nodes!")]
    PartsAttached,
    #[error("node count {requested} outside 1..={max}")]
    OutOfRange { requested: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideNodeLayout {
    num_nodes: usize,
    max_nodes: usize,
    pub radius: f64,
    pub height: f64,
}

impl Default for SideNodeLayout {
    fn default() -> Self {
        Self { num_nodes: 2, max_nodes: 8, radius: 1.25, height: 0.0 }
    }
}

impl SideNodeLayout {
    #[must_use]
    pub fn new(num_nodes: usize, max_nodes: usize, radius: f64, height: f64) -> Self {
        let max_nodes = max_nodes.max(1);
        Self { num_nodes: num_nodes.clamp(1, max_nodes), max_nodes, radius, height }
    }

    #[must_use]
    pub const fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    #[must_use]
    pub const fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Change the node count. Rejected, keeping the old count, while any side
    /// is attached or when `n` is out of range.
    pub fn set_num_nodes(&mut self, n: usize, any_attached: bool) -> Result<(), NodeLayoutError> {
        if n == self.num_nodes {
            return Ok(());
        }
        if any_attached {
            log::warn!("{}", NodeLayoutError::PartsAttached);
            return Err(NodeLayoutError::PartsAttached);
        }
        if n == 0 || n > self.max_nodes {
            return Err(NodeLayoutError::OutOfRange { requested: n, max: self.max_nodes });
        }
        self.num_nodes = n;
        Ok(())
    }

    /// Attach node id for slot `i` (zero based).
    #[must_use]
    pub fn node_id(i: usize) -> String {
        format!("connect{:02}", i + 1)
    }

    #[must_use]
    pub fn position(&self, i: usize) -> Point3 {
        #[allow(clippy::cast_precision_loss)]
        let a = std::f64::consts::TAU * i as f64 / self.num_nodes as f64;
        Point3::new(a.cos() * self.radius, self.height, a.sin() * self.radius)
    }

    #[must_use]
    pub fn positions(&self) -> Vec<Point3> {
        (0..self.num_nodes).map(|i| self.position(i)).collect()
    }

    /// Stack size of each side node, in radius steps.
    #[must_use]
    pub fn node_size(&self) -> i64 {
        #[allow(clippy::cast_precision_loss)]
        let chord = (std::f64::consts::PI / self.num_nodes as f64).sin() * self.radius;
        #[allow(clippy::cast_possible_truncation)]
        let size = (chord / RADIUS_STEP).round() as i64;
        size
    }

    /// Yaw in degrees turning a side's mesh +X axis towards node `i`.
    #[must_use]
    pub fn mesh_yaw(&self, i: usize) -> f64 {
        let p = self.position(i);
        (-p.z).atan2(p.x).to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_sit_on_a_circle() {
        let layout = SideNodeLayout::new(4, 8, 2.0, 0.5);
        let p = layout.positions();
        assert_eq!(p.len(), 4);
        assert!((p[1].x).abs() < 1e-12 && (p[1].z - 2.0).abs() < 1e-12);
        assert!(p.iter().all(|n| n.y == 0.5));
    }

    #[test]
    fn node_size_counts_radius_steps() {
        assert_eq!(SideNodeLayout::new(2, 8, 1.25, 0.0).node_size(), 2);
        assert_eq!(SideNodeLayout::new(6, 8, 1.25, 0.0).node_size(), 1);
    }

    #[test]
    fn count_change_rejected_while_attached() {
        let mut layout = SideNodeLayout::default();
        let err = layout.set_num_nodes(3, true).unwrap_err();
        assert_eq!(err.to_string(), "Please detach any fairing parts before changing the number of nodes!");
        assert_eq!(layout.num_nodes(), 2);
        assert!(matches!(layout.set_num_nodes(9, false), Err(NodeLayoutError::OutOfRange { .. })));
        layout.set_num_nodes(3, false).unwrap();
        assert_eq!(layout.num_nodes(), 3);
    }

    #[test]
    fn yaw_points_mesh_at_node() {
        let layout = SideNodeLayout::new(4, 8, 1.0, 0.0);
        assert!(layout.mesh_yaw(0).abs() < 1e-12);
        assert!((layout.mesh_yaw(1) + 90.0).abs() < 1e-9);
        assert_eq!(SideNodeLayout::node_id(0), "connect01");
    }
}
