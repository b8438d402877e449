//! View prefabs and the GUID-keyed prefab registry

use crate::component::ViewComponent;
use crate::pool::PoolPrefab;
use crate::scene::SceneGraph;
use crate::view::{DefaultBehaviour, EntityView, EntityViewBehaviour, ViewTemplate};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use vista_core::{AssetGuid, ViewAsset};

/// Identity of a prefab, used as the pool's stack key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrefabId(pub u32);

type BehaviourFactory = Rc<dyn Fn() -> Box<dyn EntityViewBehaviour>>;
type ComponentFactory = Rc<dyn Fn() -> Box<dyn ViewComponent>>;

/// Blueprint for an entity view: template configuration plus the factories
/// producing its behaviour and attached view components.
pub struct ViewPrefab {
    id: PrefabId,
    name: String,
    template: ViewTemplate,
    behaviour: BehaviourFactory,
    components: Vec<ComponentFactory>,
}

impl ViewPrefab {
    pub fn new(id: PrefabId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            template: ViewTemplate::default(),
            behaviour: Rc::new(|| Box::new(DefaultBehaviour) as Box<dyn EntityViewBehaviour>),
            components: Vec::new(),
        }
    }

    pub fn with_template(mut self, template: ViewTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_behaviour<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn EntityViewBehaviour> + 'static,
    {
        self.behaviour = Rc::new(factory);
        self
    }

    pub fn with_component<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn ViewComponent> + 'static,
    {
        self.components.push(Rc::new(factory));
        self
    }

    pub fn id(&self) -> PrefabId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &ViewTemplate {
        &self.template
    }

    /// Create the scene node and the entity view wrapping it.
    pub fn instantiate_view(&self, scene: &mut dyn SceneGraph) -> EntityView {
        let node = scene.instantiate(self);
        let mut view = EntityView::new(node, self.template.clone())
            .with_prefab(self.id)
            .with_behaviour((self.behaviour)());
        for factory in &self.components {
            view = view.with_component(factory());
        }
        view
    }
}

impl fmt::Debug for ViewPrefab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewPrefab")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("template", &self.template)
            .field("components", &self.components.len())
            .finish()
    }
}

impl PoolPrefab for ViewPrefab {
    type Instance = EntityView;

    fn id(&self) -> PrefabId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn instantiate(&self, scene: &mut dyn SceneGraph) -> EntityView {
        self.instantiate_view(scene)
    }
}

/// Maps view asset GUIDs to the prefab they name.
#[derive(Default)]
pub struct PrefabRegistry {
    prefabs: HashMap<AssetGuid, Rc<ViewPrefab>>,
}

impl PrefabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, asset: AssetGuid, prefab: Rc<ViewPrefab>) {
        self.prefabs.insert(asset, prefab);
    }

    pub fn unregister(&mut self, asset: AssetGuid) -> Option<Rc<ViewPrefab>> {
        self.prefabs.remove(&asset)
    }

    pub fn get(&self, asset: AssetGuid) -> Option<Rc<ViewPrefab>> {
        self.prefabs.get(&asset).cloned()
    }

    pub fn contains(&self, asset: AssetGuid) -> bool {
        self.prefabs.contains_key(&asset)
    }

    pub fn len(&self) -> usize {
        self.prefabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefabs.is_empty()
    }
}

/// Hook invoked when a view asset names a prefab the registry does not hold.
/// Implementations may register the prefab; the lookup is retried once.
pub trait PrefabLoader {
    fn load_missing_prefab(&mut self, asset: &ViewAsset, prefabs: &mut PrefabRegistry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessScene;

    #[test]
    fn instantiate_creates_active_named_node() {
        let mut scene = HeadlessScene::new();
        let prefab = ViewPrefab::new(PrefabId(3), "Crate");
        let view = prefab.instantiate_view(&mut scene);
        assert_eq!(view.prefab(), Some(PrefabId(3)));
        assert!(scene.is_alive(view.node()));
        assert_eq!(scene.node(view.node()).map(|n| n.prefab), Some(Some(PrefabId(3))));
    }

    #[test]
    fn registry_lookup_by_guid() {
        let mut registry = PrefabRegistry::new();
        let guid = AssetGuid::new(11);
        registry.register(guid, Rc::new(ViewPrefab::new(PrefabId(1), "A")));
        assert!(registry.contains(guid));
        assert_eq!(registry.get(guid).map(|p| p.id()), Some(PrefabId(1)));
        assert!(registry.get(AssetGuid::new(12)).is_none());
        assert!(registry.unregister(guid).is_some());
        assert!(registry.is_empty());
    }
}
