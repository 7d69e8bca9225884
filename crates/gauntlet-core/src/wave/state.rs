//! Wave lifecycle tracking.
//!
//! [`WaveStateManager`] follows one wave at a time through
//! `Spawning → Active → Complete`. It learns about deaths by observing the
//! health trackers of the enemies it registered, and announces lifecycle
//! events to [`WaveListener`]s.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::composer::GeneratedWaveData;
use crate::combat::{DamageEvent, HealthObserver, ObserverList};
use crate::entity::EntityId;

/// Lifecycle phase of the current wave.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WaveState {
    /// Units are still being spawned.
    Spawning,
    /// Every unit is out; waiting for the last to die.
    Active,
    /// No wave in progress.
    #[default]
    Complete,
}

impl fmt::Display for WaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Receives wave lifecycle events, for UI and audio bindings.
pub trait WaveListener {
    /// A wave began.
    fn on_wave_started(&mut self, _wave: u32, _data: &GeneratedWaveData) {}
    /// The last enemy of a wave died.
    fn on_wave_completed(&mut self, _wave: u32) {}
    /// An enemy of the current wave was spawned.
    fn on_enemy_spawned(&mut self, _wave: u32, _entity: EntityId) {}
    /// An enemy of the current wave was killed.
    fn on_enemy_killed(&mut self, _wave: u32, _entity: EntityId) {}
}

/// Counts spawns and kills for the current wave.
///
/// Only enemies registered through
/// [`register_enemy_spawned`](Self::register_enemy_spawned) during the
/// current wave count toward completion; other deaths are ignored.
pub struct WaveStateManager {
    current_wave: u32,
    current_wave_data: Option<GeneratedWaveData>,
    state: WaveState,
    planned: u32,
    enemies_spawned: u32,
    enemies_remaining: u32,
    alive: BTreeSet<EntityId>,
    completed: Option<u32>,
    listeners: ObserverList<dyn WaveListener>,
}

impl fmt::Debug for WaveStateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaveStateManager")
            .field("current_wave", &self.current_wave)
            .field("state", &self.state)
            .field("planned", &self.planned)
            .field("enemies_spawned", &self.enemies_spawned)
            .field("enemies_remaining", &self.enemies_remaining)
            .field("alive", &self.alive.len())
            .field("listeners", &format!("[{} listeners]", self.listeners.len()))
            .finish()
    }
}

impl Default for WaveStateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WaveStateManager {
    /// Creates a manager before wave 1, in the `Complete` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current_wave: 0,
            current_wave_data: None,
            state: WaveState::Complete,
            planned: 0,
            enemies_spawned: 0,
            enemies_remaining: 0,
            alive: BTreeSet::new(),
            completed: None,
            listeners: ObserverList::new(),
        }
    }

    /// Number of the current (or last) wave; 0 before the first.
    #[must_use]
    pub const fn current_wave(&self) -> u32 {
        self.current_wave
    }

    /// Data of the current (or last) wave.
    #[must_use]
    pub const fn current_wave_data(&self) -> Option<&GeneratedWaveData> {
        self.current_wave_data.as_ref()
    }

    /// Lifecycle phase.
    #[must_use]
    pub const fn state(&self) -> WaveState {
        self.state
    }

    /// Units planned for the current wave.
    #[must_use]
    pub const fn planned(&self) -> u32 {
        self.planned
    }

    /// Units spawned so far this wave.
    #[must_use]
    pub const fn enemies_spawned(&self) -> u32 {
        self.enemies_spawned
    }

    /// Units that still have to die before the wave completes.
    #[must_use]
    pub const fn enemies_remaining(&self) -> u32 {
        self.enemies_remaining
    }

    /// Registered units currently alive.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.alive.len()
    }

    /// True if `entity` is a live unit of the current wave.
    #[must_use]
    pub fn is_tracking(&self, entity: EntityId) -> bool {
        self.alive.contains(&entity)
    }

    // -------------------------------------------------------------------------
    // Listeners
    // -------------------------------------------------------------------------

    /// Registers a lifecycle listener. Adding twice is a no-op.
    pub fn add_listener(&mut self, listener: &Rc<RefCell<dyn WaveListener>>) -> bool {
        self.listeners.add(listener)
    }

    /// Unregisters a lifecycle listener.
    pub fn remove_listener(&mut self, listener: &Rc<RefCell<dyn WaveListener>>) -> bool {
        self.listeners.remove(listener)
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Begins the next wave and enters `Spawning`.
    ///
    /// The wave counter advances by one regardless of `data.wave_number`.
    /// A wave with no units completes immediately.
    pub fn start_wave(&mut self, data: GeneratedWaveData) {
        self.current_wave += 1;
        if data.wave_number != self.current_wave {
            warn!(
                expected = self.current_wave,
                got = data.wave_number,
                "wave data number does not match wave counter"
            );
        }

        let wave = self.current_wave;
        self.planned = data.total_enemy_count();
        self.enemies_spawned = 0;
        self.enemies_remaining = self.planned;
        self.alive.clear();
        self.completed = None;
        self.state = WaveState::Spawning;

        info!(
            wave,
            enemies = self.planned,
            wave_type = %data.wave_type,
            difficulty = data.difficulty_multiplier,
            "wave started"
        );
        self.listeners.notify(|l| l.on_wave_started(wave, &data));
        self.current_wave_data = Some(data);

        if self.planned == 0 {
            self.complete_wave();
        }
    }

    /// Records a spawned unit. Enters `Active` once every planned unit is out.
    ///
    /// Returns false, changing nothing, outside `Spawning` or for an entity
    /// already registered.
    pub fn register_enemy_spawned(&mut self, entity: EntityId) -> bool {
        if self.state != WaveState::Spawning {
            warn!(%entity, state = %self.state, "spawn registered outside spawning phase");
            return false;
        }
        if !self.alive.insert(entity) {
            return false;
        }
        self.enemies_spawned += 1;

        let wave = self.current_wave;
        self.listeners.notify(|l| l.on_enemy_spawned(wave, entity));

        if self.enemies_spawned >= self.planned {
            debug!(wave, "all enemies spawned");
            self.state = WaveState::Active;
        }
        true
    }

    /// Records a death. Completes the wave when the last unit dies while
    /// `Active`.
    ///
    /// Returns false for entities not registered this wave or already dead.
    pub fn register_enemy_killed(&mut self, entity: EntityId) -> bool {
        if !self.alive.remove(&entity) {
            return false;
        }
        self.enemies_remaining = self.enemies_remaining.saturating_sub(1);

        let wave = self.current_wave;
        debug!(wave, %entity, remaining = self.enemies_remaining, "enemy killed");
        self.listeners.notify(|l| l.on_enemy_killed(wave, entity));

        if self.enemies_remaining == 0 && self.state == WaveState::Active {
            self.complete_wave();
        }
        true
    }

    /// Stops the wave from expecting further spawns.
    ///
    /// The units already out become the whole wave: it turns `Active`, or
    /// completes at once if none are alive.
    pub fn end_spawning(&mut self) {
        if self.state != WaveState::Spawning {
            return;
        }
        let alive = u32::try_from(self.alive.len()).unwrap_or(u32::MAX);
        self.planned = self.enemies_spawned;
        self.enemies_remaining = alive;
        self.state = WaveState::Active;
        if alive == 0 {
            self.complete_wave();
        }
    }

    /// Returns the number of a wave that completed since the last call.
    pub fn take_completed_wave(&mut self) -> Option<u32> {
        self.completed.take()
    }

    fn complete_wave(&mut self) {
        let wave = self.current_wave;
        self.state = WaveState::Complete;
        self.completed = Some(wave);
        info!(wave, "wave completed");
        self.listeners.notify(|l| l.on_wave_completed(wave));
    }
}

impl HealthObserver for WaveStateManager {
    fn on_death(&mut self, entity: EntityId, _final_event: &DamageEvent) {
        self.register_enemy_killed(entity);
    }
}
