//! Entity reference with generational index
//!
//! Entity references are lightweight handles (8 bytes) that name a simulation
//! entity. The version counter invalidates stale references once the
//! simulation destroys and recycles the slot.

use std::fmt;

/// Simulation entity reference (version-indexed for safety)
///
/// Format: [32-bit index | 32-bit version]
/// - Index: Slot in the simulation's entity table
/// - Version: Incremented by the simulation on destruction, never zero for a live entity
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityRef {
    index: i32,
    version: i32,
}

impl EntityRef {
    /// The invalid reference.
    pub const NONE: EntityRef = EntityRef {
        index: 0,
        version: 0,
    };

    pub const fn new(index: i32, version: i32) -> Self {
        Self { index, version }
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn is_valid(&self) -> bool {
        self.version > 0
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Entity:{}:{}", self.index, self.version)
        } else {
            f.write_str("Entity:None")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_invalid() {
        assert!(!EntityRef::NONE.is_valid());
        assert!(EntityRef::new(0, 1).is_valid());
        assert_eq!(EntityRef::default(), EntityRef::NONE);
    }

    #[test]
    fn display_names_the_slot() {
        assert_eq!(EntityRef::new(4, 2).to_string(), "Entity:4:2");
        assert_eq!(EntityRef::NONE.to_string(), "Entity:None");
    }
}
