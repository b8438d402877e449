//! Entity view updater
//!
//! Reconciles the simulation's entity set against live views once per
//! update: creates views for new entities, destroys stale ones, rebinds views
//! whose asset changed, then drives every view's update passes. Standalone
//! view components registered on the updater are activated and removed only
//! at safe points so the active list is never mutated while iterated.

mod sync;

use crate::component::{ComponentContext, ViewComponent, ViewComponentId, ViewComponentSlot, ViewContexts};
use crate::error::ViewError;
use crate::pool::ViewPool;
use crate::prefab::{PrefabLoader, PrefabRegistry};
use crate::scene::{MapData, NodeId, SceneGraph};
use crate::settings::{PoolSettings, UpdaterSettings, ViewSettings};
use crate::stats::UpdaterStats;
use crate::view::{BindBehaviour, EntityView, ViewUpdateContext};
use std::any::Any;
use std::collections::{HashMap, HashSet, VecDeque};
use vista_core::{EntityRef, Frame, Game, GameId, MapEntityLink, SnapshotInterpolationTimer, ViewLink};

pub struct EntityViewUpdater {
    settings: UpdaterSettings,
    pool_settings: PoolSettings,
    view_parent: Option<NodeId>,
    enabled: bool,
    observed_game: Option<GameId>,
    teleport: bool,

    map_data: Option<MapData>,
    active_entities: HashSet<EntityRef>,
    remove_entities: Vec<EntityRef>,
    active_views: HashMap<EntityRef, EntityView>,
    released: Vec<EntityView>,

    view_components: Vec<(ViewComponentId, ViewComponentSlot)>,
    to_add: VecDeque<(ViewComponentId, ViewComponentSlot)>,
    to_remove: VecDeque<ViewComponentId>,
    zombies: HashSet<ViewComponentId>,
    next_component_id: u64,

    contexts: ViewContexts,
    pool: Option<ViewPool<EntityView>>,
    prefabs: PrefabRegistry,
    prefab_loader: Option<Box<dyn PrefabLoader>>,
    snapshot: SnapshotInterpolationTimer,
    stats: UpdaterStats,

    view_scratch: Vec<(EntityRef, ViewLink)>,
    map_scratch: Vec<(EntityRef, MapEntityLink)>,
}

impl Default for EntityViewUpdater {
    fn default() -> Self {
        Self::new(ViewSettings::default())
    }
}

impl EntityViewUpdater {
    pub fn new(settings: ViewSettings) -> Self {
        let snapshot = SnapshotInterpolationTimer::new(settings.updater.snapshot_interpolation);
        Self {
            settings: settings.updater,
            pool_settings: settings.pool,
            view_parent: None,
            enabled: true,
            observed_game: None,
            teleport: false,
            map_data: None,
            active_entities: HashSet::with_capacity(1024),
            remove_entities: Vec::with_capacity(1024),
            active_views: HashMap::with_capacity(1024),
            released: Vec::new(),
            view_components: Vec::new(),
            to_add: VecDeque::new(),
            to_remove: VecDeque::new(),
            zombies: HashSet::new(),
            next_component_id: 0,
            contexts: ViewContexts::new(),
            pool: None,
            prefabs: PrefabRegistry::new(),
            prefab_loader: None,
            snapshot,
            stats: UpdaterStats::default(),
            view_scratch: Vec::new(),
            map_scratch: Vec::new(),
        }
    }

    // ---- configuration ----

    pub fn settings(&self) -> &UpdaterSettings {
        &self.settings
    }

    pub fn pool_settings(&self) -> &PoolSettings {
        &self.pool_settings
    }

    /// Install the view pool. Can only be done once.
    pub fn set_pool(&mut self, pool: ViewPool<EntityView>) -> Result<(), ViewError> {
        if self.pool.is_some() {
            return Err(ViewError::PoolAlreadySet);
        }
        self.pool = Some(pool);
        Ok(())
    }

    pub fn pool(&self) -> Option<&ViewPool<EntityView>> {
        self.pool.as_ref()
    }

    pub fn pool_mut(&mut self) -> Option<&mut ViewPool<EntityView>> {
        self.pool.as_mut()
    }

    /// Pre-warm the pool with the precache entries from the pool settings.
    pub fn prepare_pool(&mut self, scene: &mut dyn SceneGraph) {
        let Some(pool) = self.pool.as_mut() else {
            return;
        };
        for entry in &self.pool_settings.precache {
            match self.prefabs.get(entry.asset) {
                Some(prefab) => pool.prepare(scene, prefab.as_ref(), entry.count),
                None => tracing::warn!(asset = %entry.asset, "no prefab registered for precache entry"),
            }
        }
    }

    pub fn prefabs(&self) -> &PrefabRegistry {
        &self.prefabs
    }

    pub fn prefabs_mut(&mut self) -> &mut PrefabRegistry {
        &mut self.prefabs
    }

    pub fn set_prefab_loader(&mut self, loader: Box<dyn PrefabLoader>) {
        self.prefab_loader = Some(loader);
    }

    /// Register a context shared with every view component on initialization.
    pub fn register_context<T: Any>(&mut self, context: T) -> Result<(), ViewError> {
        self.contexts.insert(context)
    }

    pub fn contexts(&self) -> &ViewContexts {
        &self.contexts
    }

    /// Parent node for every view created from a prefab.
    pub fn set_view_parent(&mut self, parent: Option<NodeId>) {
        self.view_parent = parent;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Use explicit map data instead of asking the scene for it.
    pub fn set_map_data(&mut self, data: MapData) {
        self.map_data = Some(data);
    }

    pub fn map_data(&self) -> Option<&MapData> {
        self.map_data.as_ref()
    }

    pub fn snapshot_timer(&self) -> &SnapshotInterpolationTimer {
        &self.snapshot
    }

    pub fn stats(&self) -> &UpdaterStats {
        &self.stats
    }

    // ---- views ----

    pub fn get_view(&self, entity: EntityRef) -> Option<&EntityView> {
        self.active_views.get(&entity)
    }

    pub fn get_view_mut(&mut self, entity: EntityRef) -> Option<&mut EntityView> {
        self.active_views.get_mut(&entity)
    }

    pub fn active_view_count(&self) -> usize {
        self.active_views.len()
    }

    pub fn active_views(&self) -> impl Iterator<Item = (&EntityRef, &EntityView)> {
        self.active_views.iter()
    }

    /// Views with manual disposal that the updater let go of. The host owns
    /// them from here on.
    pub fn take_released_views(&mut self) -> Vec<EntityView> {
        std::mem::take(&mut self.released)
    }

    /// Skip interpolation and error correction on the next update.
    pub fn teleport_all_entities(&mut self) {
        self.teleport = true;
    }

    // ---- view components ----

    /// Register a standalone view component. Activation is deferred until
    /// the next update.
    pub fn add_view_component(&mut self, component: Box<dyn ViewComponent>) -> ViewComponentId {
        self.next_component_id += 1;
        let id = ViewComponentId(self.next_component_id);

        let mut slot = ViewComponentSlot::new(component);
        slot.initialize(&self.contexts);
        self.to_add.push_back((id, slot));
        id
    }

    /// Unregister a view component. Active components are deactivated now
    /// and dropped on the next late update; components still waiting for
    /// activation are activated and immediately deactivated instead.
    pub fn remove_view_component(&mut self, id: ViewComponentId) -> bool {
        if let Some((_, slot)) = self.view_components.iter_mut().find(|(c, _)| *c == id) {
            slot.deactivate();
            self.to_remove.push_back(id);
            return true;
        }

        if self.to_add.iter().any(|(c, _)| *c == id) {
            self.zombies.insert(id);
            return true;
        }

        false
    }

    pub fn view_component(&self, id: ViewComponentId) -> Option<&ViewComponentSlot> {
        self.view_components
            .iter()
            .find(|(c, _)| *c == id)
            .map(|(_, slot)| slot)
    }

    /// Components in the active list.
    pub fn view_component_count(&self) -> usize {
        self.view_components.len()
    }

    pub fn pending_view_component_count(&self) -> usize {
        self.to_add.len()
    }

    // ---- game lifecycle ----

    pub fn observed_game(&self) -> Option<GameId> {
        self.observed_game
    }

    fn is_observing(&self, game: &dyn Game) -> bool {
        self.observed_game == Some(game.id())
    }

    /// Attach to the first game that starts.
    pub fn on_game_init(&mut self, game: &dyn Game) {
        if self.observed_game.is_none() {
            self.set_current_game(game);
        }
    }

    /// Switch the observed game. Existing views and components are told
    /// about the change and kept alive.
    pub fn set_current_game(&mut self, game: &dyn Game) {
        let changed = self.observed_game.is_some();
        self.observed_game = Some(game.id());
        // frame numbers of the new game are unrelated to the old timeline
        self.snapshot.reset();

        if changed {
            for (_, slot) in &mut self.view_components {
                slot.game_changed(game);
            }
            for view in self.active_views.values_mut() {
                view.game_changed(game);
            }
        }
    }

    /// The session shut down: tear every view down immediately.
    pub fn on_game_destroyed(&mut self, game: &dyn Game, scene: &mut dyn SceneGraph) {
        if !self.is_observing(game) {
            return;
        }

        for (_, slot) in &mut self.view_components {
            slot.deactivate();
        }

        let views: Vec<EntityView> = self.active_views.drain().map(|(_, view)| view).collect();
        for view in views {
            self.dispose_view(game, scene, view);
        }

        self.observed_game = None;
    }

    /// A scene load is starting: stop observing without touching views.
    pub fn on_scene_load_begin(&mut self, game: &dyn Game) {
        if self.is_observing(game) {
            self.observed_game = None;
        }
    }

    /// Forward a finished simulation tick to views recording snapshots.
    pub fn on_simulate_finished(&mut self, game: &dyn Game, frame: &dyn Frame) {
        if !self.is_observing(game) {
            return;
        }
        for view in self.active_views.values_mut() {
            view.record_snapshot(frame);
        }
    }

    // ---- update passes ----

    /// Reconcile views with the observed game and update them.
    ///
    /// Deferred pool destroys count down even while the updater is disabled
    /// or not observing a game.
    pub fn update(&mut self, game: &dyn Game, scene: &mut dyn SceneGraph, delta_time: f32) {
        if let Some(pool) = self.pool.as_mut() {
            pool.update(scene, delta_time);
        }

        if !self.enabled || !self.is_observing(game) {
            return;
        }

        let _span = tracing::trace_span!("entity_view_updater.update").entered();

        let frames = game.frames();

        if let Some(verified) = frames.verified {
            self.activate_pending_components(game, scene, verified);

            self.snapshot
                .advance(verified.number(), game.session().tick_delta(), delta_time);

            let mut cx = ComponentContext::new(game, &mut *scene, None);
            for (_, slot) in &mut self.view_components {
                slot.update_view(&mut cx);
            }
        }

        if let Some(predicted) = frames.predicted {
            let mut check_orphaned_map_views = false;
            if self.map_data.is_none() && self.settings.auto_find_map_data {
                self.map_data = scene.find_map_data();
                if let Some(map) = &self.map_data {
                    tracing::debug!(map = %map.map(), slots = map.len(), "found map data");
                    check_orphaned_map_views = true;
                }
            }

            self.active_entities.clear();

            let session = game.session();
            let use_clock_aliasing_interpolation = !self.teleport;
            let use_error_correction = session.is_predicted && session.is_interpolatable && !self.teleport;

            if let Some(verified) = frames.verified {
                self.sync_views(game, scene, verified, BindBehaviour::Verified);
            }
            self.sync_views(game, scene, predicted, BindBehaviour::NonVerified);

            let mut remove = std::mem::take(&mut self.remove_entities);
            remove.clear();
            remove.extend(
                self.active_views
                    .keys()
                    .filter(|entity| !self.active_entities.contains(*entity))
                    .copied(),
            );
            for &entity in &remove {
                self.destroy_entity_view(game, scene, entity);
            }
            self.remove_entities = remove;

            if check_orphaned_map_views {
                self.disable_orphaned_map_views(scene);
            }

            let mut cx = ViewUpdateContext {
                game,
                scene: &mut *scene,
                snapshot: &self.snapshot,
                delta_time,
            };
            for view in self.active_views.values_mut() {
                view.update_view(&mut cx, use_clock_aliasing_interpolation, use_error_correction);
            }
        }

        self.teleport = false;
    }

    fn activate_pending_components(&mut self, game: &dyn Game, scene: &mut dyn SceneGraph, frame: &dyn Frame) {
        let mut cx = ComponentContext::new(game, scene, None);
        while let Some((id, mut slot)) = self.to_add.pop_front() {
            slot.activate(&mut cx, frame);

            if self.zombies.remove(&id) {
                slot.deactivate();
                continue;
            }

            self.view_components.push((id, slot));
        }
    }

    /// Late hooks for components and views, then flush component removals.
    pub fn late_update(&mut self, game: &dyn Game, scene: &mut dyn SceneGraph) {
        if !self.enabled {
            return;
        }

        if self.is_observing(game) {
            let mut cx = ComponentContext::new(game, &mut *scene, None);
            for (_, slot) in &mut self.view_components {
                slot.late_update_view(&mut cx);
            }

            for view in self.active_views.values_mut() {
                let mut cx = ComponentContext::new(game, &mut *scene, Some(view.view_entity()));
                view.late_update_view(&mut cx);
            }
        }

        while let Some(id) = self.to_remove.pop_front() {
            self.view_components.retain(|(c, _)| *c != id);
        }

        // a zombie still queued for activation has to survive until its
        // activation runs
        let pending = &self.to_add;
        self.zombies
            .retain(|id| pending.iter().any(|(c, _)| c == id));
    }

    /// Deactivate all components and destroy every live view node.
    pub fn shutdown(&mut self, scene: &mut dyn SceneGraph) {
        for (_, slot) in &mut self.view_components {
            slot.deactivate();
        }
        self.view_components.clear();
        self.to_add.clear();
        self.to_remove.clear();
        self.zombies.clear();

        for (_, view) in self.active_views.drain() {
            if scene.is_alive(view.node()) {
                scene.destroy(view.node());
            }
        }
        self.map_data = None;

        if let Some(pool) = self.pool.as_mut() {
            pool.teardown(scene);
        }
    }
}
