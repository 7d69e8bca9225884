//! Identifier types shared by the combat, agent, and wave modules.
//!
//! - [`EntityId`]: opaque handle for anything that can hold health or be targeted
//! - [`PrefabId`]: names the archetype a factory instantiates
//! - [`ProfileId`]: names a shared [`EnemyProfile`](crate::agent::EnemyProfile)
//!
//! # Ordering
//!
//! All identifiers are totally ordered so they can key a `BTreeMap` and be
//! iterated deterministically.
//!
//! # Example
//!
//! ```
//! use gauntlet_core::entity::{EntityId, PrefabId};
//!
//! let grunt = PrefabId::new("grunt");
//! let id = EntityId::new(7);
//!
//! assert_eq!(grunt.as_str(), "grunt");
//! assert_eq!(id.to_string(), "7");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Entity handles
// =============================================================================

/// Unique identifier for a simulated entity.
///
/// `EntityId` is a newtype wrapper around `u64`. The core never dereferences
/// it; it only compares, orders, and forwards it to collaborators.
///
/// # Example
///
/// ```
/// use gauntlet_core::entity::EntityId;
///
/// let a = EntityId::new(1);
/// let b = EntityId::new(2);
///
/// assert!(a < b);
/// assert_eq!(a.as_u64(), 1);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new `EntityId` from a raw `u64` value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` value of this identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

// =============================================================================
// Named references
// =============================================================================

/// Name of a spawnable archetype.
///
/// The wave engine treats prefabs as opaque; two roster entries with the same
/// `PrefabId` are merged into one spawn entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefabId(String);

impl PrefabId {
    /// Creates a new `PrefabId` from a string.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Returns the prefab name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrefabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PrefabId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PrefabId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Name of a shared enemy profile.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    /// Creates a new `ProfileId` from a string.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Returns the profile name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProfileId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ProfileId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
