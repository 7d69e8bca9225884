//! Health notifications and the non-owning observer registry.
//!
//! Trackers never own their observers. An [`ObserverList`] keeps `Weak`
//! handles, drops entries whose owner has gone away, and notifies a snapshot
//! so that the list itself can be modified while a notification is running.
//!
//! The same registry type backs the wave lifecycle listeners in
//! [`crate::wave::state`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::DamageEvent;
use crate::entity::EntityId;

// =============================================================================
// Observer Contract
// =============================================================================

/// Receives health lifecycle notifications from a [`HealthTracker`].
///
/// Every method has an empty default so observers implement only what they
/// need. `entity` is the owner of the tracker that fired, which lets one
/// observer watch many trackers.
///
/// [`HealthTracker`]: super::HealthTracker
pub trait HealthObserver {
    /// Current or max health changed. `delta` is negative for damage,
    /// positive for healing and revive, zero for a max-health change.
    fn on_health_changed(&mut self, _entity: EntityId, _current: f32, _max: f32, _delta: f32) {}

    /// Damage landed. `event.amount` is the health actually removed.
    fn on_damage_taken(&mut self, _entity: EntityId, _event: &DamageEvent, _current: f32, _max: f32) {
    }

    /// The tracker reached zero. Fires once per life.
    fn on_death(&mut self, _entity: EntityId, _final_event: &DamageEvent) {}
}

// =============================================================================
// Observer Registry
// =============================================================================

/// Ordered set of non-owning observer handles.
///
/// - `add` and `remove` compare by pointer, so adding twice is a no-op
/// - iteration order is registration order
/// - handles whose `Rc` was dropped are pruned lazily
pub struct ObserverList<T: ?Sized> {
    entries: Vec<Weak<RefCell<T>>>,
}

impl<T: ?Sized> ObserverList<T> {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers an observer. Returns false if it was already present.
    pub fn add(&mut self, observer: &Rc<RefCell<T>>) -> bool {
        self.prune();
        let handle = Rc::downgrade(observer);
        if self.entries.iter().any(|existing| existing.ptr_eq(&handle)) {
            return false;
        }
        self.entries.push(handle);
        true
    }

    /// Unregisters an observer. Returns false if it was not present.
    pub fn remove(&mut self, observer: &Rc<RefCell<T>>) -> bool {
        let handle = Rc::downgrade(observer);
        let before = self.entries.len();
        self.entries.retain(|existing| !existing.ptr_eq(&handle));
        self.prune();
        self.entries.len() != before
    }

    /// Returns true if the observer is registered.
    #[must_use]
    pub fn contains(&self, observer: &Rc<RefCell<T>>) -> bool {
        let handle = Rc::downgrade(observer);
        self.entries.iter().any(|existing| existing.ptr_eq(&handle))
    }

    /// Number of observers that are still alive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.strong_count() > 0).count()
    }

    /// Returns true if no live observers remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Upgrades every live handle, in registration order.
    pub fn snapshot(&mut self) -> Vec<Rc<RefCell<T>>> {
        self.prune();
        self.entries.iter().filter_map(Weak::upgrade).collect()
    }

    /// Calls `f` for each live observer in registration order.
    ///
    /// Observers already borrowed further up the stack are skipped rather
    /// than re-entered.
    pub fn notify(&mut self, mut f: impl FnMut(&mut T)) {
        for observer in self.snapshot() {
            match observer.try_borrow_mut() {
                Ok(mut guard) => f(&mut guard),
                Err(_) => warn!("observer is already borrowed, skipping re-entrant notification"),
            }
        }
    }

    fn prune(&mut self) {
        self.entries.retain(|e| e.strong_count() > 0);
    }
}

impl<T: ?Sized> Default for ObserverList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for ObserverList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("observers", &format!("[{} live]", self.len()))
            .finish()
    }
}

// =============================================================================
// Recording Observer
// =============================================================================

/// A recorded health notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HealthEvent {
    /// See [`HealthObserver::on_health_changed`].
    Changed {
        /// Tracker owner.
        entity: EntityId,
        /// Health after the change.
        current: f32,
        /// Max health after the change.
        max: f32,
        /// Signed change.
        delta: f32,
    },
    /// See [`HealthObserver::on_damage_taken`].
    Damaged {
        /// Tracker owner.
        entity: EntityId,
        /// Event carrying the actual damage dealt.
        event: DamageEvent,
        /// Health after the hit.
        current: f32,
        /// Max health.
        max: f32,
    },
    /// See [`HealthObserver::on_death`].
    Died {
        /// Tracker owner.
        entity: EntityId,
        /// The killing blow.
        final_event: DamageEvent,
    },
}

impl HealthEvent {
    /// Returns the entity the event concerns.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        match self {
            Self::Changed { entity, .. } | Self::Damaged { entity, .. } | Self::Died { entity, .. } => {
                *entity
            }
        }
    }

    /// Returns true for death events.
    #[must_use]
    pub const fn is_death(&self) -> bool {
        matches!(self, Self::Died { .. })
    }
}

/// Observer that records everything it hears.
///
/// Used for telemetry and by tests. Drain it with
/// [`take_events`](Self::take_events) once per tick, or give it a retention
/// limit with [`bounded`](Self::bounded) when nobody is guaranteed to drain.
///
/// # Example
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use gauntlet_core::combat::{DamageEvent, DamageType, HealthEventLog, HealthTracker};
/// use gauntlet_core::entity::EntityId;
///
/// let log = Rc::new(RefCell::new(HealthEventLog::new()));
/// let mut health = HealthTracker::new(EntityId::new(1), 10.0);
/// health.add_observer(log.clone());
///
/// health.take_damage(&DamageEvent::new(25.0, DamageType::Fire));
///
/// let events = log.borrow_mut().take_events();
/// assert!(events.last().unwrap().is_death());
/// ```
#[derive(Debug, Default)]
pub struct HealthEventLog {
    events: VecDeque<HealthEvent>,
    limit: Option<usize>,
}

impl HealthEventLog {
    /// Creates an empty, unbounded log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log that keeps only the newest `limit` events.
    #[must_use]
    pub fn bounded(limit: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(limit),
            limit: Some(limit),
        }
    }

    /// Retention limit, if any.
    #[must_use]
    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Drains and returns all recorded events in arrival order.
    pub fn take_events(&mut self) -> Vec<HealthEvent> {
        self.events.drain(..).collect()
    }

    /// Recorded events without draining, oldest first.
    #[must_use]
    pub const fn events(&self) -> &VecDeque<HealthEvent> {
        &self.events
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of recorded deaths.
    #[must_use]
    pub fn death_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_death()).count()
    }

    /// Discards all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    fn record(&mut self, event: HealthEvent) {
        if let Some(limit) = self.limit {
            if limit == 0 {
                return;
            }
            while self.events.len() >= limit {
                self.events.pop_front();
            }
        }
        self.events.push_back(event);
    }
}

impl HealthObserver for HealthEventLog {
    fn on_health_changed(&mut self, entity: EntityId, current: f32, max: f32, delta: f32) {
        self.record(HealthEvent::Changed {
            entity,
            current,
            max,
            delta,
        });
    }

    fn on_damage_taken(&mut self, entity: EntityId, event: &DamageEvent, current: f32, max: f32) {
        self.record(HealthEvent::Damaged {
            entity,
            event: *event,
            current,
            max,
        });
    }

    fn on_death(&mut self, entity: EntityId, final_event: &DamageEvent) {
        self.record(HealthEvent::Died {
            entity,
            final_event: *final_event,
        });
    }
}
