//! Scene graph collaborator
//!
//! The view layer drives the host's scene through this trait. Nodes are
//! opaque handles; the host decides what they are (game objects, render
//! proxies, or plain records in the headless scene).

use crate::prefab::ViewPrefab;
use crate::view::EntityView;
use glam::{Quat, Vec3};
use vista_core::AssetGuid;

/// Handle to a node in the host scene graph.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

pub trait SceneGraph {
    /// Create an active node for `prefab`.
    fn instantiate(&mut self, prefab: &ViewPrefab) -> NodeId;
    fn destroy(&mut self, node: NodeId);
    fn is_alive(&self, node: NodeId) -> bool;

    fn set_active(&mut self, node: NodeId, active: bool);
    fn is_active(&self, node: NodeId) -> bool;
    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>);
    fn set_name(&mut self, node: NodeId, name: &str);

    fn set_position(&mut self, node: NodeId, position: Vec3);
    fn set_rotation(&mut self, node: NodeId, rotation: Quat);
    fn set_local_position(&mut self, node: NodeId, position: Vec3);
    fn set_local_rotation(&mut self, node: NodeId, rotation: Quat);
    fn set_local_scale(&mut self, node: NodeId, scale: Vec3);

    /// Hand over the views baked into the loaded map, if the scene has any.
    fn find_map_data(&mut self) -> Option<MapData> {
        None
    }
}

/// One baked map entity slot.
pub enum MapEntitySlot {
    /// Nothing was baked at this index.
    Empty,
    /// Baked view waiting for an entity.
    Unbound(EntityView),
    /// View currently owned by the updater's active registry.
    Bound(vista_core::EntityRef),
}

impl MapEntitySlot {
    pub fn is_empty(&self) -> bool {
        matches!(self, MapEntitySlot::Empty)
    }
}

/// Views pre-placed in a scene for the entities of one map.
pub struct MapData {
    map: AssetGuid,
    slots: Vec<MapEntitySlot>,
}

impl MapData {
    pub fn new(map: AssetGuid) -> Self {
        Self {
            map,
            slots: Vec::new(),
        }
    }

    /// Append a baked view; its index is the slot number the simulation refers to.
    pub fn with_entity(mut self, view: Option<EntityView>) -> Self {
        self.slots.push(match view {
            Some(view) => MapEntitySlot::Unbound(view),
            None => MapEntitySlot::Empty,
        });
        self
    }

    pub fn map(&self) -> AssetGuid {
        self.map
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> Option<&MapEntitySlot> {
        self.slots.get(index)
    }

    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = &mut MapEntitySlot> {
        self.slots.iter_mut()
    }

    /// Take the unbound view at `index`, marking the slot bound to `entity`.
    pub(crate) fn bind(&mut self, index: usize, entity: vista_core::EntityRef) -> Option<EntityView> {
        let slot = self.slots.get_mut(index)?;
        match std::mem::replace(slot, MapEntitySlot::Bound(entity)) {
            MapEntitySlot::Unbound(view) => Some(view),
            other => {
                *slot = other;
                None
            }
        }
    }

    /// Put a view back into its slot once it is no longer bound.
    pub(crate) fn release(&mut self, index: usize, view: Option<EntityView>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = match view {
                Some(view) => MapEntitySlot::Unbound(view),
                None => MapEntitySlot::Empty,
            };
        }
    }
}
