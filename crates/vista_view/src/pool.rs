//! View pool
//!
//! Borrow/return cache of scene instances keyed by prefab identity, with a
//! deferred destroy queue counted down by frame delta time.
//!
//! Every tracked instance is either on its prefab's available stack or in the
//! borrowed map, never both.

use crate::error::PoolError;
use crate::prefab::PrefabId;
use crate::scene::{NodeId, SceneGraph};
use glam::{Quat, Vec3};
use std::collections::HashMap;

/// Anything the pool hands out must expose the scene node it wraps.
pub trait PooledInstance {
    fn node(&self) -> NodeId;
}

/// Source of pooled instances.
pub trait PoolPrefab {
    type Instance: PooledInstance;

    fn id(&self) -> PrefabId;
    fn name(&self) -> &str;
    fn instantiate(&self, scene: &mut dyn SceneGraph) -> Self::Instance;
}

struct DelayedDestroy<T> {
    instance: Option<T>,
    delay: f32,
}

impl<T> DelayedDestroy<T> {
    fn reset(&mut self) {
        self.instance = None;
        self.delay = 0.0;
    }
}

pub struct ViewPool<T> {
    reset_scale: bool,
    cached: HashMap<PrefabId, Vec<T>>,
    borrowed: HashMap<NodeId, PrefabId>,
    deferred: Vec<DelayedDestroy<T>>,
    recycled: Vec<DelayedDestroy<T>>,
    all: Vec<NodeId>,
}

impl<T: PooledInstance> Default for ViewPool<T> {
    fn default() -> Self {
        Self::new(false)
    }
}

impl<T: PooledInstance> ViewPool<T> {
    pub fn new(reset_scale: bool) -> Self {
        Self {
            reset_scale,
            cached: HashMap::with_capacity(128),
            borrowed: HashMap::with_capacity(1024),
            deferred: Vec::with_capacity(128),
            recycled: Vec::with_capacity(128),
            all: Vec::with_capacity(1024),
        }
    }

    /// Borrow an instance of `prefab`.
    ///
    /// Returns `None` only when the stack is empty and `create_if_empty` is
    /// false; the pool is left untouched in that case.
    pub fn create<P>(
        &mut self,
        scene: &mut dyn SceneGraph,
        prefab: &P,
        parent: Option<NodeId>,
        activate: bool,
        create_if_empty: bool,
    ) -> Option<T>
    where
        P: PoolPrefab<Instance = T> + ?Sized,
    {
        let id = prefab.id();
        let empty = self.cached.get(&id).map_or(true, Vec::is_empty);
        if empty {
            if !create_if_empty {
                tracing::warn!(prefab = prefab.name(), "prefab not available in pool cache");
                return None;
            }
            self.create_instance(scene, prefab);
        }

        let instance = self.cached.get_mut(&id)?.pop()?;
        let node = instance.node();
        self.borrowed.insert(node, id);

        if parent.is_some() {
            scene.set_parent(node, parent);
        }
        scene.set_local_position(node, Vec3::ZERO);
        scene.set_local_rotation(node, Quat::IDENTITY);
        if self.reset_scale {
            scene.set_local_scale(node, Vec3::ONE);
        }
        if activate {
            scene.set_active(node, true);
        }

        Some(instance)
    }

    /// Return a borrowed instance to its prefab's stack.
    pub fn destroy(
        &mut self,
        scene: &mut dyn SceneGraph,
        instance: T,
        deactivate: bool,
    ) -> Result<(), PoolError> {
        let node = instance.node();
        let prefab = self
            .borrowed
            .remove(&node)
            .ok_or(PoolError::NotBorrowed { node })?;

        if deactivate {
            scene.set_active(node, false);
        }
        scene.set_parent(node, None);

        self.cached.entry(prefab).or_default().push(instance);
        Ok(())
    }

    /// Return `instance` once `delay` seconds of update time have elapsed.
    pub fn destroy_after(&mut self, instance: T, delay: f32) {
        let mut record = self.recycled.pop().unwrap_or(DelayedDestroy {
            instance: None,
            delay: 0.0,
        });
        record.instance = Some(instance);
        record.delay = delay;
        self.deferred.push(record);
    }

    /// Count down deferred destroys by `delta_time`.
    pub fn update(&mut self, scene: &mut dyn SceneGraph, delta_time: f32) {
        for idx in (0..self.deferred.len()).rev() {
            let record = &mut self.deferred[idx];
            record.delay -= delta_time;
            if record.delay > 0.0 {
                continue;
            }

            let mut record = self.deferred.remove(idx);
            if let Some(instance) = record.instance.take() {
                if let Err(err) = self.destroy(scene, instance, true) {
                    tracing::error!(%err, "deferred pool destroy failed");
                }
            }
            record.reset();
            self.recycled.push(record);
        }
    }

    /// Pre-warm the stack for `prefab` to at least `desired` instances.
    pub fn prepare<P>(&mut self, scene: &mut dyn SceneGraph, prefab: &P, desired: usize)
    where
        P: PoolPrefab<Instance = T> + ?Sized,
    {
        while self.available_count(prefab.id()) < desired {
            self.create_instance(scene, prefab);
        }
    }

    /// Destroy every instance the pool ever created and forget all state.
    pub fn teardown(&mut self, scene: &mut dyn SceneGraph) {
        self.deferred.clear();
        self.borrowed.clear();
        self.cached.clear();

        for node in self.all.drain(..) {
            if scene.is_alive(node) {
                scene.destroy(node);
            }
        }
    }

    fn create_instance<P>(&mut self, scene: &mut dyn SceneGraph, prefab: &P)
    where
        P: PoolPrefab<Instance = T> + ?Sized,
    {
        let instance = prefab.instantiate(scene);
        let node = instance.node();
        scene.set_name(node, prefab.name());
        scene.set_active(node, false);

        self.all.push(node);
        self.cached.entry(prefab.id()).or_default().push(instance);
    }

    /// Instances sitting on any available stack.
    pub fn pooled_count(&self) -> usize {
        self.cached.values().map(Vec::len).sum()
    }

    pub fn borrowed_count(&self) -> usize {
        self.borrowed.len()
    }

    /// Every instance the pool has created and not torn down.
    pub fn total_count(&self) -> usize {
        self.all.len()
    }

    pub fn available_count(&self, prefab: PrefabId) -> usize {
        self.cached.get(&prefab).map_or(0, Vec::len)
    }

    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    pub fn is_borrowed(&self, node: NodeId) -> bool {
        self.borrowed.contains_key(&node)
    }
}
