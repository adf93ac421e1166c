//! Read-only snapshot of the vessel part tree.
//!
//! The host copies its live attachment graph into a [`PartArena`] before a
//! rebuild; parent/child links are plain indices so the scanner never sees the
//! graph change under it.

use serde::{Deserialize, Serialize};

use crate::geom::{BBox, BOX_EDGES, Point3, Transform, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartId(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColliderShape {
    Box { center: Point3, size: Vec3 },
    Sphere { center: Point3, radius: f64 },
    Mesh { vertices: Vec<Point3>, triangles: Vec<[u32; 3]> },
}

impl ColliderShape {
    /// Boundary points and the edges joining them, in part-local space.
    /// Spheres are represented by their bounding box.
    #[must_use]
    pub fn boundary(&self) -> (Vec<Point3>, Vec<[usize; 2]>) {
        match self {
            Self::Box { center, size } => {
                let corners = BBox::from_center_size(*center, *size).corners();
                (corners.to_vec(), BOX_EDGES.to_vec())
            }
            Self::Sphere { center, radius } => {
                let d = radius.abs() * 2.0;
                let corners = BBox::from_center_size(*center, Vec3::new(d, d, d)).corners();
                (corners.to_vec(), BOX_EDGES.to_vec())
            }
            Self::Mesh { vertices, triangles } => {
                let n = vertices.len();
                let mut edges = Vec::with_capacity(triangles.len() * 3);
                for tri in triangles {
                    let [a, b, c] = tri.map(|i| i as usize);
                    if a < n && b < n && c < n {
                        edges.extend([[a, b], [b, c], [c, a]]);
                    }
                }
                (vertices.clone(), edges)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColliderRecord {
    #[serde(default = "untagged")]
    pub tag: String,
    #[serde(default = "enabled")]
    pub enabled: bool,
    pub shape: ColliderShape,
}

fn untagged() -> String {
    "Untagged".to_string()
}

const fn enabled() -> bool {
    true
}

impl ColliderRecord {
    #[must_use]
    pub fn new(shape: ColliderShape) -> Self {
        Self { tag: untagged(), enabled: true, shape }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }
}

/// Attachment slot on a part, positioned in part-local space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachNodeRecord {
    pub id: String,
    pub position: Point3,
    #[serde(default)]
    pub attached: Option<PartId>,
}

/// Marker for a part that carries its own fairing base.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NestedBaseRecord {
    pub base_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartRecord {
    pub name: String,
    #[serde(default)]
    pub parent: Option<PartId>,
    #[serde(default)]
    pub children: Vec<PartId>,
    /// Part-local to world.
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub colliders: Vec<ColliderRecord>,
    #[serde(default)]
    pub nodes: Vec<AttachNodeRecord>,
    #[serde(default)]
    pub fairing_base: Option<NestedBaseRecord>,
}

impl PartRecord {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            transform: Transform::identity(),
            colliders: Vec::new(),
            nodes: Vec::new(),
            fairing_base: None,
        }
    }

    #[must_use]
    pub fn at(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn with_collider(mut self, collider: ColliderRecord) -> Self {
        self.colliders.push(collider);
        self
    }

    #[must_use]
    pub fn with_node(mut self, id: impl Into<String>, position: Point3) -> Self {
        self.nodes.push(AttachNodeRecord { id: id.into(), position, attached: None });
        self
    }

    #[must_use]
    pub fn with_fairing_base(mut self, base_size: f64) -> Self {
        self.fairing_base = Some(NestedBaseRecord { base_size });
        self
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&AttachNodeRecord> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Nodes whose id starts with `prefix` (`interstage01`, `interstage02`, ...).
    pub fn nodes_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a AttachNodeRecord> + 'a {
        self.nodes.iter().filter(move |n| n.id.starts_with(prefix))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartArena {
    parts: Vec<PartRecord>,
}

impl PartArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: PartRecord) -> PartId {
        self.parts.push(record);
        PartId(self.parts.len() - 1)
    }

    #[must_use]
    pub fn get(&self, id: PartId) -> Option<&PartRecord> {
        self.parts.get(id.0)
    }

    pub fn get_mut(&mut self, id: PartId) -> Option<&mut PartRecord> {
        self.parts.get_mut(id.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PartId, &PartRecord)> {
        self.parts.iter().enumerate().map(|(i, p)| (PartId(i), p))
    }

    /// Record a parent/child link on both records. Unknown ids are ignored.
    pub fn link(&mut self, parent: PartId, child: PartId) {
        if self.get(parent).is_none() || self.get(child).is_none() || parent == child {
            return;
        }
        if let Some(p) = self.get_mut(parent) {
            if !p.children.contains(&child) {
                p.children.push(child);
            }
        }
        if let Some(c) = self.get_mut(child) {
            c.parent = Some(parent);
        }
    }

    /// Attach `child` to the node `node_id` of `parent` and link the tree.
    /// Returns `false` when the parent has no such node.
    pub fn attach(&mut self, parent: PartId, node_id: &str, child: PartId) -> bool {
        let Some(node) = self
            .get_mut(parent)
            .and_then(|p| p.nodes.iter_mut().find(|n| n.id == node_id))
        else {
            return false;
        };
        node.attached = Some(child);
        self.link(parent, child);
        true
    }
}
