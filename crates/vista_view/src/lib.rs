//! Vista View Layer
//!
//! Mirrors a rollback-capable simulation into a continuously rendered scene:
//! - Entity view pooling with deferred destruction
//! - Per-entity transform smoothing, snapshot interpolation and
//!   prediction-error correction
//! - The updater that reconciles simulation entities against live views
//! - Standalone view components with deferred activation

pub mod component;
pub mod error;
pub mod headless;
pub mod pool;
pub mod prefab;
pub mod scene;
pub mod settings;
pub mod stats;
pub mod updater;
pub mod view;

pub use component::{
    ComponentContext, ComponentState, ViewComponent, ViewComponentId, ViewComponentSlot,
    ViewContexts, ViewEntity,
};
pub use error::{PoolError, ViewError};
pub use pool::{PoolPrefab, PooledInstance, ViewPool};
pub use prefab::{PrefabId, PrefabLoader, PrefabRegistry, ViewPrefab};
pub use scene::{MapData, MapEntitySlot, NodeId, SceneGraph};
pub use settings::{PoolSettings, PrecacheEntry, UpdaterSettings, ViewSettings};
pub use stats::UpdaterStats;
pub use updater::EntityViewUpdater;
pub use view::{
    BindBehaviour, DefaultBehaviour, EntityView, EntityViewBehaviour, ErrorCorrectionSettings,
    InterpolationMode, UpdatePositionParameter, ViewFlags, ViewTemplate,
    ViewUpdateContext,
};
