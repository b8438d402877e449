//! View creation, binding and destruction.

use super::EntityViewUpdater;
use crate::prefab::ViewPrefab;
use crate::scene::{MapEntitySlot, SceneGraph};
use crate::view::{BindBehaviour, EntityView, ViewFlags, ViewUpdateContext};
use glam::{Quat, Vec3};
use std::rc::Rc;
use vista_core::math::{planar_rotation_to_world, planar_to_world};
use vista_core::{AssetGuid, EntityRef, Frame, Game, MapEntityLink, ViewAsset, ViewLink};

/// Pose an entity has in `frame`, if it carries a transform.
fn initial_transform(frame: &dyn Frame, entity: EntityRef) -> Option<(Vec3, Quat)> {
    if let Some(transform) = frame.transform_2d(entity) {
        return Some((
            planar_to_world(transform.position),
            planar_rotation_to_world(transform.rotation),
        ));
    }
    frame
        .transform_3d(entity)
        .map(|transform| (transform.position, transform.rotation))
}

/// What to do with a map slot before binding it.
enum SlotCheck {
    Bind,
    Rebind(EntityRef),
    Skip,
}

impl EntityViewUpdater {
    pub(super) fn sync_views(
        &mut self,
        game: &dyn Game,
        scene: &mut dyn SceneGraph,
        frame: &dyn Frame,
        bind: BindBehaviour,
    ) {
        let mut links = std::mem::take(&mut self.view_scratch);
        links.clear();
        frame.collect_views(&mut links);
        for &(entity, link) in &links {
            self.create_view_if_needed(game, scene, frame, entity, link, bind);
        }
        self.view_scratch = links;

        let Some(map) = self.map_data.as_ref().map(|data| data.map()) else {
            return;
        };
        if frame.map().is_based_on(map) {
            self.bind_map_entities(game, scene, frame, bind);
        }
    }

    fn create_view_if_needed(
        &mut self,
        game: &dyn Game,
        scene: &mut dyn SceneGraph,
        frame: &dyn Frame,
        entity: EntityRef,
        link: ViewLink,
        bind: BindBehaviour,
    ) {
        let asset = frame.find_view_asset(link.current);

        let Some(current) = self.active_views.get(&entity) else {
            if let Some(asset) = asset {
                if self.create_view(game, scene, frame, entity, &asset, bind) {
                    self.active_entities.insert(entity);
                }
            }
            return;
        };

        if current.bind_behaviour() != bind {
            return;
        }
        let current_guid = current.asset_guid();

        match asset {
            // the view link was revoked
            None => self.destroy_entity_view(game, scene, entity),
            Some(asset) if current_guid == asset.guid => {
                self.active_entities.insert(entity);
            }
            Some(asset) => {
                self.destroy_entity_view(game, scene, entity);
                if self.create_view(game, scene, frame, entity, &asset, bind) {
                    self.active_entities.insert(entity);
                }
            }
        }
    }

    /// Registry lookup with one retry through the prefab loader.
    fn resolve_prefab(&mut self, asset: &ViewAsset) -> Option<Rc<ViewPrefab>> {
        if let Some(prefab) = self.prefabs.get(asset.guid) {
            return Some(prefab);
        }

        if let Some(loader) = self.prefab_loader.as_mut() {
            loader.load_missing_prefab(asset, &mut self.prefabs);
        }

        let prefab = self.prefabs.get(asset.guid);
        if prefab.is_none() {
            tracing::debug!(asset = %asset.guid, name = %asset.name, "view prefab not loaded");
        }
        prefab
    }

    fn create_view(
        &mut self,
        game: &dyn Game,
        scene: &mut dyn SceneGraph,
        frame: &dyn Frame,
        entity: EntityRef,
        asset: &ViewAsset,
        bind: BindBehaviour,
    ) -> bool {
        let Some(prefab) = self.resolve_prefab(asset) else {
            return false;
        };
        if prefab.template().bind_behaviour != bind {
            return false;
        }

        let view = match self.pool.as_mut() {
            Some(pool) => match pool.create(scene, prefab.as_ref(), None, true, true) {
                Some(view) => view,
                None => return false,
            },
            None => prefab.instantiate_view(scene),
        };

        let node = view.node();
        if let Some((position, rotation)) = initial_transform(frame, entity) {
            scene.set_position(node, position);
            scene.set_rotation(node, rotation);
        }
        if let Some(parent) = self.view_parent {
            scene.set_parent(node, Some(parent));
        }

        let mut view = view;
        view.set_asset_guid(asset.guid);
        self.stats.views_created += 1;
        self.on_view_instantiated(game, scene, frame, entity, view);
        true
    }

    fn on_view_instantiated(
        &mut self,
        game: &dyn Game,
        scene: &mut dyn SceneGraph,
        frame: &dyn Frame,
        entity: EntityRef,
        mut view: EntityView,
    ) {
        if !view.has_flag(ViewFlags::DISABLE_ENTITY_REF_NAMING) {
            scene.set_name(view.node(), &entity.to_string());
        }
        view.set_entity(entity);

        let mut cx = ViewUpdateContext {
            game,
            scene,
            snapshot: &self.snapshot,
            delta_time: 0.0,
        };
        view.activate(&mut cx, frame, &self.contexts);
        view.notify_instantiated(game);

        tracing::trace!(%entity, asset = %view.asset_guid(), "entity view instantiated");
        self.active_views.insert(entity, view);
    }

    fn bind_map_entities(
        &mut self,
        game: &dyn Game,
        scene: &mut dyn SceneGraph,
        frame: &dyn Frame,
        bind: BindBehaviour,
    ) {
        let mut links = std::mem::take(&mut self.map_scratch);
        links.clear();
        frame.collect_map_entity_links(&mut links);
        for &(entity, link) in &links {
            self.bind_map_entity_if_needed(game, scene, frame, entity, link, bind);
        }
        self.map_scratch = links;
    }

    fn bind_map_entity_if_needed(
        &mut self,
        game: &dyn Game,
        scene: &mut dyn SceneGraph,
        frame: &dyn Frame,
        entity: EntityRef,
        link: MapEntityLink,
        bind: BindBehaviour,
    ) {
        if let Some(current) = self.active_views.get(&entity) {
            // views with an asset belong to view sync even for map entities
            if !current.asset_guid().is_valid() && current.bind_behaviour() == bind {
                self.active_entities.insert(entity);
            }
            return;
        }

        if self.bind_map_entity(game, scene, frame, entity, link, bind) {
            self.active_entities.insert(entity);
        }
    }

    fn bind_map_entity(
        &mut self,
        game: &dyn Game,
        scene: &mut dyn SceneGraph,
        frame: &dyn Frame,
        entity: EntityRef,
        link: MapEntityLink,
        bind: BindBehaviour,
    ) -> bool {
        let Some(map_data) = self.map_data.as_ref() else {
            return false;
        };

        let check = match map_data.slot(link.index) {
            None => {
                tracing::error!(
                    map = %map_data.map(),
                    index = link.index,
                    slots = map_data.len(),
                    %entity,
                    "map data has no entity slot with this index; make sure baked data is up to date"
                );
                return false;
            }
            Some(MapEntitySlot::Empty) => SlotCheck::Skip,
            Some(MapEntitySlot::Unbound(view)) if view.bind_behaviour() == bind => SlotCheck::Bind,
            Some(MapEntitySlot::Unbound(_)) => SlotCheck::Skip,
            // the map restarted and the slot is still held by an old entity
            Some(MapEntitySlot::Bound(other)) => match self.active_views.get(other) {
                Some(view) if view.bind_behaviour() == bind => SlotCheck::Rebind(*other),
                _ => SlotCheck::Skip,
            },
        };

        match check {
            SlotCheck::Skip => return false,
            SlotCheck::Rebind(other) => self.destroy_entity_view(game, scene, other),
            SlotCheck::Bind => {}
        }

        let Some(mut view) = self.map_data.as_mut().and_then(|data| data.bind(link.index, entity)) else {
            return false;
        };

        let node = view.node();
        view.set_map_slot(Some(link.index));
        if let Some((position, rotation)) = initial_transform(frame, entity) {
            scene.set_position(node, position);
            scene.set_rotation(node, rotation);
        }
        if !scene.is_active(node) {
            scene.set_active(node, true);
        }

        view.set_asset_guid(AssetGuid::NONE);
        self.stats.map_entities_bound += 1;
        self.on_view_instantiated(game, scene, frame, entity, view);
        true
    }

    /// Remove the view bound to `entity`, if any.
    pub(super) fn destroy_entity_view(&mut self, game: &dyn Game, scene: &mut dyn SceneGraph, entity: EntityRef) {
        if let Some(view) = self.active_views.remove(&entity) {
            self.dispose_view(game, scene, view);
        }
    }

    pub(super) fn dispose_view(&mut self, game: &dyn Game, scene: &mut dyn SceneGraph, mut view: EntityView) {
        view.notify_destroyed(game);
        self.stats.views_destroyed += 1;

        if view.manual_disposal() {
            match view.map_slot() {
                Some(slot) => self.return_map_view(slot, Some(view)),
                None => self.released.push(view),
            }
            return;
        }

        if !scene.is_alive(view.node()) {
            tracing::warn!(entity = %view.entity(), "entity view was already destroyed");
            if let Some(slot) = view.map_slot() {
                self.return_map_view(slot, None);
            }
            return;
        }

        view.deactivate();
        if view.asset_guid().is_valid() {
            self.destroy_view_instance(scene, view);
        } else {
            self.disable_map_view(scene, view);
        }
    }

    fn destroy_view_instance(&mut self, scene: &mut dyn SceneGraph, view: EntityView) {
        let node = view.node();
        match self.pool.as_mut() {
            Some(pool) if pool.is_borrowed(node) => {
                if let Err(err) = pool.destroy(scene, view, true) {
                    tracing::error!(%err, "failed to return entity view to the pool");
                }
            }
            _ => scene.destroy(node),
        }
    }

    fn disable_map_view(&mut self, scene: &mut dyn SceneGraph, mut view: EntityView) {
        let node = view.node();
        scene.set_active(node, false);
        view.set_entity(EntityRef::NONE);

        match view.map_slot() {
            Some(slot) => self.return_map_view(slot, Some(view)),
            None => scene.destroy(node),
        }
    }

    fn return_map_view(&mut self, slot: usize, view: Option<EntityView>) {
        if let Some(map_data) = self.map_data.as_mut() {
            map_data.release(slot, view);
        }
    }

    /// Deactivate baked views that no entity claimed after a map load.
    pub(super) fn disable_orphaned_map_views(&mut self, scene: &mut dyn SceneGraph) {
        let Some(map_data) = self.map_data.as_mut() else {
            return;
        };

        for slot in map_data.slots_mut() {
            let MapEntitySlot::Unbound(view) = slot else {
                continue;
            };
            let node = view.node();
            if !scene.is_alive(node) || !scene.is_active(node) || view.entity().is_valid() {
                continue;
            }
            view.deactivate();
            scene.set_active(node, false);
        }
    }
}
