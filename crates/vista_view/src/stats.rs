//! Counters for view lifecycle events

/// Running totals kept by the updater.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdaterStats {
    /// Views instantiated from prefabs or the pool.
    pub views_created: u64,
    /// Views torn down (destroyed, returned to the pool, or released).
    pub views_destroyed: u64,
    /// Scene-baked views bound to an entity.
    pub map_entities_bound: u64,
}

impl UpdaterStats {
    pub fn live_views(&self) -> u64 {
        (self.views_created + self.map_entities_bound).saturating_sub(self.views_destroyed)
    }
}
