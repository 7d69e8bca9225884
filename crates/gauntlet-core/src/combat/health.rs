//! Per-entity health with a damage pipeline and lifecycle notifications.
//!
//! # Invariants
//!
//! - `max > 0` at all times; a non-positive max is corrected to 1
//! - `0 <= current <= max`
//! - once dead, only [`HealthTracker::revive`] brings the tracker back
//! - `on_death` fires exactly once per life
//!
//! All inputs are clamped or ignored. Nothing here returns an error, so the
//! tracker is safe to drive from inside a tick.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{DamageEvent, DamageModifier, HealthObserver, ObserverList};
use crate::entity::EntityId;

bitflags! {
    /// Boolean state carried by a [`HealthTracker`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct HealthFlags: u8 {
        /// Damage is ignored entirely.
        const INVULNERABLE = 1;
        /// Death has latched.
        const DEAD = 1 << 1;
    }
}

/// Handle returned by [`HealthTracker::add_damage_modifier`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModifierId(u64);

impl ModifierId {
    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// Health for one entity.
///
/// # Example
///
/// ```
/// use gauntlet_core::combat::{DamageEvent, DamageType, HealthTracker};
/// use gauntlet_core::entity::EntityId;
///
/// let mut health = HealthTracker::new(EntityId::new(3), 50.0);
/// health.take_damage(&DamageEvent::new(20.0, DamageType::Blunt));
/// health.heal(100.0);
///
/// assert!((health.current() - 50.0).abs() < 0.0001);
/// assert!(health.is_alive());
/// ```
pub struct HealthTracker {
    owner: EntityId,
    max: f32,
    current: f32,
    flags: HealthFlags,
    modifiers: Vec<(ModifierId, Box<dyn DamageModifier>)>,
    next_modifier_id: u64,
    observers: ObserverList<dyn HealthObserver>,
}

impl fmt::Debug for HealthTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthTracker")
            .field("owner", &self.owner)
            .field("current", &self.current)
            .field("max", &self.max)
            .field("flags", &self.flags)
            .field("modifiers", &format!("[{} modifiers]", self.modifiers.len()))
            .field("observers", &self.observers)
            .finish()
    }
}

impl HealthTracker {
    /// Creates a tracker at full health.
    ///
    /// A `max` that is not strictly positive is corrected to 1.
    #[must_use]
    pub fn new(owner: EntityId, max: f32) -> Self {
        let max = if max > 0.0 {
            max
        } else {
            warn!(entity = %owner, max, "non-positive max health corrected to 1");
            1.0
        };
        Self {
            owner,
            max,
            current: max,
            flags: HealthFlags::empty(),
            modifiers: Vec::new(),
            next_modifier_id: 0,
            observers: ObserverList::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Entity this tracker belongs to.
    #[must_use]
    pub const fn owner(&self) -> EntityId {
        self.owner
    }

    /// Current health.
    #[must_use]
    pub const fn current(&self) -> f32 {
        self.current
    }

    /// Maximum health.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// `current / max`, in `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        self.current / self.max
    }

    /// Raw state flags.
    #[must_use]
    pub const fn flags(&self) -> HealthFlags {
        self.flags
    }

    /// True while death has not latched and health is above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.flags.contains(HealthFlags::DEAD) && self.current > 0.0
    }

    /// True once death has latched.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.flags.contains(HealthFlags::DEAD)
    }

    /// True while damage is being ignored.
    #[must_use]
    pub const fn is_invulnerable(&self) -> bool {
        self.flags.contains(HealthFlags::INVULNERABLE)
    }

    /// Number of installed damage modifiers.
    #[must_use]
    pub fn modifier_count(&self) -> usize {
        self.modifiers.len()
    }

    /// Number of live observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Applies a hit and returns the health actually removed.
    ///
    /// The event's amount is folded through every modifier in order. Each
    /// modifier sees the original type, instigator, and hit data with the
    /// running amount. A non-positive result changes nothing and notifies
    /// nobody. Otherwise observers hear `on_damage_taken` (carrying the
    /// actual delta), then `on_health_changed`, then `on_death` if this hit
    /// was lethal.
    pub fn take_damage(&mut self, event: &DamageEvent) -> f32 {
        if !self.is_alive() || self.is_invulnerable() {
            return 0.0;
        }

        let modified = self
            .modifiers
            .iter_mut()
            .fold(event.amount, |amount, (_, modifier)| {
                modifier.modify(&event.with_amount(amount))
            });
        // Also rejects NaN.
        if !(modified > 0.0) {
            return 0.0;
        }

        let previous = self.current;
        self.current = (self.current - modified).max(0.0);
        let actual = previous - self.current;
        let dealt = event.with_amount(actual);

        let (owner, current, max) = (self.owner, self.current, self.max);
        self.observers
            .notify(|o| o.on_damage_taken(owner, &dealt, current, max));
        self.observers
            .notify(|o| o.on_health_changed(owner, current, max, -actual));

        if self.current <= 0.0 && !self.is_dead() {
            self.flags.insert(HealthFlags::DEAD);
            debug!(entity = %owner, damage_type = %dealt.damage_type, "entity died");
            self.observers.notify(|o| o.on_death(owner, &dealt));
        }

        actual
    }

    /// Restores health up to max and returns the amount restored.
    ///
    /// Ignored when dead or when `amount` is not positive.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if !self.is_alive() || !(amount > 0.0) {
            return 0.0;
        }
        let previous = self.current;
        self.current = (self.current + amount).min(self.max);
        let delta = self.current - previous;

        let (owner, current, max) = (self.owner, self.current, self.max);
        self.observers
            .notify(|o| o.on_health_changed(owner, current, max, delta));
        delta
    }

    /// Changes max health, keeping the current health percentage.
    ///
    /// Values below 1 are raised to 1.
    pub fn set_max_health(&mut self, new_max: f32) {
        let fraction = self.fraction();
        self.max = new_max.max(1.0);
        self.current = self.max * fraction;

        let (owner, current, max) = (self.owner, self.current, self.max);
        self.observers
            .notify(|o| o.on_health_changed(owner, current, max, 0.0));
    }

    /// Brings a dead tracker back with `min(amount, max)` health.
    ///
    /// Returns false, changing nothing, when not dead or when `amount` is
    /// not positive.
    pub fn revive(&mut self, amount: f32) -> bool {
        if !self.is_dead() {
            return false;
        }
        if !(amount > 0.0) {
            debug!(entity = %self.owner, amount, "revive with non-positive amount ignored");
            return false;
        }
        self.flags.remove(HealthFlags::DEAD);
        self.current = amount.min(self.max);
        debug!(entity = %self.owner, current = self.current, "entity revived");

        let (owner, current, max) = (self.owner, self.current, self.max);
        self.observers
            .notify(|o| o.on_health_changed(owner, current, max, current));
        true
    }

    /// Toggles damage immunity.
    pub fn set_invulnerable(&mut self, invulnerable: bool) {
        self.flags.set(HealthFlags::INVULNERABLE, invulnerable);
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Registers an observer. Adding the same handle twice is a no-op.
    pub fn add_observer(&mut self, observer: Rc<RefCell<dyn HealthObserver>>) -> bool {
        self.observers.add(&observer)
    }

    /// Unregisters an observer.
    pub fn remove_observer(&mut self, observer: Rc<RefCell<dyn HealthObserver>>) -> bool {
        self.observers.remove(&observer)
    }

    /// Appends a stage to the damage pipeline.
    pub fn add_damage_modifier(&mut self, modifier: Box<dyn DamageModifier>) -> ModifierId {
        let id = ModifierId(self.next_modifier_id);
        self.next_modifier_id += 1;
        self.modifiers.push((id, modifier));
        id
    }

    /// Removes a stage. Returns false if the id is unknown.
    pub fn remove_damage_modifier(&mut self, id: ModifierId) -> bool {
        let before = self.modifiers.len();
        self.modifiers.retain(|(existing, _)| *existing != id);
        self.modifiers.len() != before
    }
}
