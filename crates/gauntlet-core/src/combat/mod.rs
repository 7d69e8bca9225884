//! Health, damage mitigation, and health notifications.
//!
//! A [`HealthTracker`] owns the hit points of one entity. Incoming
//! [`DamageEvent`]s are folded through an ordered list of
//! [`DamageModifier`]s before they touch health, and every observable change
//! is fanned out to registered [`HealthObserver`]s.
//!
//! # Architecture
//!
//! - [`DamageEvent`]: the immutable per-hit value
//! - [`modifier`]: resistance, armor, and critical-hit stages
//! - [`observer`]: the notification contract and a recording observer
//! - [`health`]: the tracker itself
//!
//! # Example
//!
//! ```
//! use gauntlet_core::combat::{DamageEvent, DamageType, HealthTracker, ResistanceTable};
//! use gauntlet_core::entity::EntityId;
//!
//! let mut health = HealthTracker::new(EntityId::new(1), 100.0);
//! health.add_damage_modifier(Box::new(
//!     ResistanceTable::new().with(DamageType::Slash, 0.5),
//! ));
//!
//! let dealt = health.take_damage(&DamageEvent::new(30.0, DamageType::Slash));
//! assert!((dealt - 15.0).abs() < 0.0001);
//! assert!((health.current() - 85.0).abs() < 0.0001);
//! ```

pub mod health;
pub mod modifier;
pub mod observer;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entity::EntityId;

pub use health::{HealthFlags, HealthTracker, ModifierId};
pub use modifier::{
    ArmorModifier, CriticalHitModifier, DamageModifier, ResistanceProfile, ResistanceTable,
};
pub use observer::{HealthEvent, HealthEventLog, HealthObserver, ObserverList};

// =============================================================================
// Damage Type
// =============================================================================

/// Category of incoming damage, used to select mitigation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DamageType {
    /// Edged weapons.
    Slash,
    /// Impact weapons.
    Blunt,
    /// Arrows, spears, bolts.
    Pierce,
    /// Burning.
    Fire,
    /// Freezing.
    Ice,
    /// Electrical.
    Lightning,
    /// Toxins.
    Poison,
    /// Blasts. Armor counts half against these.
    Explosive,
    /// Arcane. Ignores armor entirely.
    Magic,
}

impl DamageType {
    /// Every damage type in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Slash,
        Self::Blunt,
        Self::Pierce,
        Self::Fire,
        Self::Ice,
        Self::Lightning,
        Self::Poison,
        Self::Explosive,
        Self::Magic,
    ];
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// Damage Event
// =============================================================================

/// A single hit, created by the attacker and consumed once by the target.
///
/// Modifiers never mutate an event; they return a new amount and the tracker
/// rebuilds the event with [`DamageEvent::with_amount`] between stages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Raw damage before mitigation.
    pub amount: f32,
    /// Damage category.
    pub damage_type: DamageType,
    /// Entity that caused the hit, if known.
    pub instigator: Option<EntityId>,
    /// World-space impact point.
    pub hit_point: Vec3,
    /// Unit direction the hit travelled in.
    pub hit_direction: Vec3,
}

impl DamageEvent {
    /// Creates an event with no instigator and zeroed hit data.
    #[must_use]
    pub const fn new(amount: f32, damage_type: DamageType) -> Self {
        Self {
            amount,
            damage_type,
            instigator: None,
            hit_point: Vec3::ZERO,
            hit_direction: Vec3::ZERO,
        }
    }

    /// Sets the entity responsible for the hit.
    #[must_use]
    pub fn with_instigator(mut self, instigator: EntityId) -> Self {
        self.instigator = Some(instigator);
        self
    }

    /// Sets impact point and direction. The direction is normalized, or zero
    /// if it has no length.
    #[must_use]
    pub fn with_hit(mut self, point: Vec3, direction: Vec3) -> Self {
        self.hit_point = point;
        self.hit_direction = direction.normalize_or_zero();
        self
    }

    /// Returns a copy carrying a different amount and identical context.
    #[must_use]
    pub const fn with_amount(self, amount: f32) -> Self {
        Self { amount, ..self }
    }
}
