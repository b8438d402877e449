//! In-memory scene graph
//!
//! Records node state without any rendering. Used by the runtime harness
//! and by tests to observe what the view layer writes.

use crate::prefab::{PrefabId, ViewPrefab};
use crate::scene::{MapData, NodeId, SceneGraph};
use glam::{Quat, Vec3};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessNode {
    pub name: String,
    pub prefab: Option<PrefabId>,
    pub active: bool,
    pub parent: Option<NodeId>,
    pub position: Vec3,
    pub rotation: Quat,
    pub local_position: Vec3,
    pub local_rotation: Quat,
    pub local_scale: Vec3,
}

impl HeadlessNode {
    fn new(name: &str, prefab: Option<PrefabId>) -> Self {
        Self {
            name: name.to_string(),
            prefab,
            active: true,
            parent: None,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            local_position: Vec3::ZERO,
            local_rotation: Quat::IDENTITY,
            local_scale: Vec3::ONE,
        }
    }
}

#[derive(Default)]
pub struct HeadlessScene {
    nodes: HashMap<NodeId, HeadlessNode>,
    next_id: u64,
    instantiated: usize,
    destroyed: usize,
    map_data: Option<MapData>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node that does not come from a prefab (scene-baked objects).
    pub fn spawn_node(&mut self, name: &str) -> NodeId {
        self.insert(HeadlessNode::new(name, None))
    }

    fn insert(&mut self, node: HeadlessNode) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(id, node);
        id
    }

    /// Make map data discoverable through [`SceneGraph::find_map_data`].
    pub fn set_map_data(&mut self, data: MapData) {
        self.map_data = Some(data);
    }

    pub fn node(&self, id: NodeId) -> Option<&HeadlessNode> {
        self.nodes.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn active_count(&self) -> usize {
        self.nodes.values().filter(|n| n.active).count()
    }

    /// Number of prefab instantiations performed so far.
    pub fn instantiated(&self) -> usize {
        self.instantiated
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed
    }

    fn with_node(&mut self, id: NodeId, f: impl FnOnce(&mut HeadlessNode)) {
        if let Some(node) = self.nodes.get_mut(&id) {
            f(node);
        }
    }
}

impl SceneGraph for HeadlessScene {
    fn instantiate(&mut self, prefab: &ViewPrefab) -> NodeId {
        self.instantiated += 1;
        self.insert(HeadlessNode::new(prefab.name(), Some(prefab.id())))
    }

    fn destroy(&mut self, node: NodeId) {
        if self.nodes.remove(&node).is_some() {
            self.destroyed += 1;
        }
    }

    fn is_alive(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn set_active(&mut self, node: NodeId, active: bool) {
        self.with_node(node, |n| n.active = active);
    }

    fn is_active(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.active)
    }

    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) {
        self.with_node(node, |n| n.parent = parent);
    }

    fn set_name(&mut self, node: NodeId, name: &str) {
        self.with_node(node, |n| n.name = name.to_string());
    }

    fn set_position(&mut self, node: NodeId, position: Vec3) {
        self.with_node(node, |n| n.position = position);
    }

    fn set_rotation(&mut self, node: NodeId, rotation: Quat) {
        self.with_node(node, |n| n.rotation = rotation);
    }

    fn set_local_position(&mut self, node: NodeId, position: Vec3) {
        self.with_node(node, |n| n.local_position = position);
    }

    fn set_local_rotation(&mut self, node: NodeId, rotation: Quat) {
        self.with_node(node, |n| n.local_rotation = rotation);
    }

    fn set_local_scale(&mut self, node: NodeId, scale: Vec3) {
        self.with_node(node, |n| n.local_scale = scale);
    }

    fn find_map_data(&mut self) -> Option<MapData> {
        self.map_data.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroyed_nodes_are_forgotten() {
        let mut scene = HeadlessScene::new();
        let node = scene.spawn_node("baked");
        assert!(scene.is_alive(node));
        scene.destroy(node);
        scene.destroy(node);
        assert!(!scene.is_alive(node));
        assert_eq!(scene.destroyed(), 1);
    }

    #[test]
    fn writes_to_missing_nodes_are_ignored() {
        let mut scene = HeadlessScene::new();
        scene.set_position(NodeId(99), Vec3::ONE);
        assert_eq!(scene.node_count(), 0);
        assert!(!scene.is_active(NodeId(99)));
    }
}
