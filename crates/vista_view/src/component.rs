//! View components and view contexts
//!
//! A view component is a unit of presentation logic attached either to an
//! entity view or directly to the updater. Each one is wrapped in a
//! [`ViewComponentSlot`] that owns its lifecycle state:
//!
//! ```text
//! Uninitialized -> Initialized -> Active <-> Deactivated
//! ```
//!
//! Initialization happens once per component; activation and deactivation
//! pair up for every binding.

use crate::error::ViewError;
use crate::scene::{NodeId, SceneGraph};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;
use vista_core::{EntityRef, Frame, Game};

/// Entity and scene node a component is attached to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ViewEntity {
    pub entity: EntityRef,
    pub node: NodeId,
}

/// Everything a component may touch during a hook.
pub struct ComponentContext<'a> {
    pub game: &'a dyn Game,
    pub scene: &'a mut dyn SceneGraph,
    /// `None` for components registered directly on the updater.
    pub view: Option<ViewEntity>,
}

impl<'a> ComponentContext<'a> {
    pub fn new(game: &'a dyn Game, scene: &'a mut dyn SceneGraph, view: Option<ViewEntity>) -> Self {
        Self { game, scene, view }
    }

    /// Reborrow for a nested call.
    pub fn reborrow(&mut self) -> ComponentContext<'_> {
        ComponentContext {
            game: self.game,
            scene: &mut *self.scene,
            view: self.view,
        }
    }
}

pub trait ViewComponent {
    fn on_initialize(&mut self, _contexts: &ViewContexts) {}
    fn on_activate(&mut self, _cx: &mut ComponentContext<'_>, _frame: &dyn Frame) {}
    fn on_deactivate(&mut self) {}
    fn on_update_view(&mut self, _cx: &mut ComponentContext<'_>) {}
    fn on_late_update_view(&mut self, _cx: &mut ComponentContext<'_>) {}
    fn on_game_changed(&mut self, _game: &dyn Game) {}

    /// Disabled components stay active but skip update hooks.
    fn is_enabled(&self) -> bool {
        true
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ComponentState {
    Uninitialized,
    Initialized,
    Active,
    Deactivated,
}

pub struct ViewComponentSlot {
    state: ComponentState,
    component: Box<dyn ViewComponent>,
}

impl ViewComponentSlot {
    pub fn new(component: Box<dyn ViewComponent>) -> Self {
        Self {
            state: ComponentState::Uninitialized,
            component,
        }
    }

    pub fn state(&self) -> ComponentState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state != ComponentState::Uninitialized
    }

    pub fn is_active(&self) -> bool {
        self.state == ComponentState::Active
    }

    pub fn is_active_and_enabled(&self) -> bool {
        self.is_active() && self.component.is_enabled()
    }

    pub fn component(&self) -> &dyn ViewComponent {
        self.component.as_ref()
    }

    pub fn component_mut(&mut self) -> &mut dyn ViewComponent {
        self.component.as_mut()
    }

    pub fn initialize(&mut self, contexts: &ViewContexts) {
        if self.state == ComponentState::Uninitialized {
            self.component.on_initialize(contexts);
            self.state = ComponentState::Initialized;
        }
    }

    pub fn activate(&mut self, cx: &mut ComponentContext<'_>, frame: &dyn Frame) {
        self.state = ComponentState::Active;
        self.component.on_activate(cx, frame);
    }

    /// No-op unless the component is active.
    pub fn deactivate(&mut self) {
        if self.state == ComponentState::Active {
            self.state = ComponentState::Deactivated;
            self.component.on_deactivate();
        }
    }

    pub fn update_view(&mut self, cx: &mut ComponentContext<'_>) {
        if self.is_active_and_enabled() {
            self.component.on_update_view(cx);
        }
    }

    pub fn late_update_view(&mut self, cx: &mut ComponentContext<'_>) {
        if self.is_active_and_enabled() {
            self.component.on_late_update_view(cx);
        }
    }

    pub fn game_changed(&mut self, game: &dyn Game) {
        self.component.on_game_changed(game);
    }
}

/// Handle for a component registered on the updater.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewComponentId(pub u64);

/// Shared, type-keyed state handed to every component on initialization.
#[derive(Default)]
pub struct ViewContexts {
    contexts: HashMap<TypeId, Rc<dyn Any>>,
}

impl ViewContexts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a context. Only one context per concrete type is allowed.
    pub fn insert<T: Any>(&mut self, context: T) -> Result<(), ViewError> {
        let id = TypeId::of::<T>();
        if self.contexts.contains_key(&id) {
            let type_name = type_name::<T>();
            tracing::error!(
                type_name,
                "view context type already exists; multiple contexts of the same type are not supported"
            );
            return Err(ViewError::DuplicateContext { type_name });
        }
        self.contexts.insert(id, Rc::new(context));
        Ok(())
    }

    pub fn get<T: Any>(&self) -> Option<Rc<T>> {
        let context = self.contexts.get(&TypeId::of::<T>())?.clone();
        context.downcast::<T>().ok()
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.contexts.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
