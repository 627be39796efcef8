//! Scene node registry
//!
//! The simulation adds and removes visual nodes and updates their
//! transforms; drawing them is the host's business.

use std::collections::BTreeMap;

use super::animation::Pose;
use crate::assets::ModelInstance;
use crate::physics::Transform;

/// Stable scene node id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

/// What a node draws
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Model(ModelInstance),
    Wall,
    Floor,
    Ramp,
    Sphere,
    Crate,
    Beam,
    Ring,
    Effect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub kind: NodeKind,
    pub transform: Transform,
    pub visible: bool,
    /// Animation blend for model nodes
    pub pose: Option<Pose>,
}

#[derive(Debug, Default)]
pub struct Scene {
    nodes: BTreeMap<NodeId, SceneNode>,
    next_id: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: NodeKind, transform: Transform) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(
            id,
            SceneNode {
                kind,
                transform,
                visible: true,
                pose: None,
            },
        );
        id
    }

    /// Detach a node; false if it was already gone
    pub fn remove(&mut self, id: NodeId) -> bool {
        self.nodes.remove(&id).is_some()
    }

    pub fn set_transform(&mut self, id: NodeId, transform: Transform) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.transform = transform;
        }
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.visible = visible;
        }
    }

    pub fn set_pose(&mut self, id: NodeId, pose: Option<Pose>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.pose = pose;
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }
}
