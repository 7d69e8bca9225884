//! Drives waves from generation through spawning to completion.
//!
//! # Architecture
//!
//! ```text
//! trigger fires ─► generate wave n ─► shuffle roster into queue ─► Spawning
//!                                                                   │
//!      ┌────────────────────── tick ◄───────────────────────────────┘
//!      │  due, queue non-empty, alive < max?
//!      ▼
//!   factory.spawn ─► difficulty modifiers ─► observe health ─► register
//!                                                                   │
//!   deaths reach zero ─► Complete ─► trigger.enable ◄───────────────┘
//! ```
//!
//! The orchestrator owns no entities. An [`EnemyFactory`] creates them and
//! lends back the new entity's [`HealthTracker`] so the orchestrator can
//! scale it and attach the shared [`WaveStateManager`] as a death observer.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use glam::Vec3;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use super::composer::{wave_rng, GeneratedWaveData, SpawnEntry, StandardWaveGenerator, WaveGenerator};
use super::profile::WaveGenerationProfile;
use super::state::{WaveState, WaveStateManager};
use super::trigger::WaveTrigger;
use crate::combat::{HealthObserver, HealthTracker};
use crate::entity::{EntityId, PrefabId, ProfileId};

// =============================================================================
// Collaborator Contracts
// =============================================================================

/// A freshly spawned entity, with its health lent to the orchestrator.
#[derive(Debug)]
pub struct Spawned<'a> {
    /// Id of the new entity.
    pub id: EntityId,
    /// The new entity's health tracker.
    pub health: &'a mut HealthTracker,
}

/// Creates (or acquires from a pool) enemy entities.
pub trait EnemyFactory {
    /// Spawns one `prefab` configured by `profile` at `position`.
    ///
    /// `None` means the entity could not be produced right now; the
    /// orchestrator retries later.
    fn spawn(&mut self, prefab: &PrefabId, profile: &ProfileId, position: Vec3) -> Option<Spawned<'_>>;
}

/// Scales a spawned enemy by the wave's difficulty multiplier.
pub trait DifficultyModifier {
    /// Applies `multiplier` to a new enemy.
    fn apply(&self, health: &mut HealthTracker, multiplier: f32);
}

/// Multiplies max health, keeping the health percentage.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthDifficultyModifier;

impl DifficultyModifier for HealthDifficultyModifier {
    fn apply(&self, health: &mut HealthTracker, multiplier: f32) {
        if !(multiplier > 0.0) || !multiplier.is_finite() {
            warn!(entity = %health.owner(), multiplier, "ignoring unusable difficulty multiplier");
            return;
        }
        health.set_max_health(health.max() * multiplier);
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Runs successive waves.
///
/// Each wave's composition and spawn order come from
/// [`wave_rng`]`(seed, wave)`, so a run is reproducible from its seed and
/// [`preview_wave`](Self::preview_wave) matches what will spawn.
pub struct WaveOrchestrator<T: WaveTrigger> {
    profile: WaveGenerationProfile,
    generator: Box<dyn WaveGenerator>,
    state: Rc<RefCell<WaveStateManager>>,
    trigger: T,
    modifiers: Vec<Box<dyn DifficultyModifier>>,
    spawn_points: Vec<Vec3>,
    seed: u64,
    rng: ChaCha8Rng,
    current: Option<GeneratedWaveData>,
    queue: VecDeque<SpawnEntry>,
    next_spawn_time: f32,
}

impl<T: WaveTrigger> fmt::Debug for WaveOrchestrator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaveOrchestrator")
            .field("state", &self.state)
            .field("trigger_enabled", &self.trigger.is_enabled())
            .field("modifiers", &format!("[{} modifiers]", self.modifiers.len()))
            .field("spawn_points", &self.spawn_points.len())
            .field("seed", &self.seed)
            .field("queued", &self.queue.len())
            .field("next_spawn_time", &self.next_spawn_time)
            .finish_non_exhaustive()
    }
}

impl<T: WaveTrigger> WaveOrchestrator<T> {
    /// Creates an orchestrator with the standard generator and health
    /// scaling. No wave runs until [`begin`](Self::begin).
    #[must_use]
    pub fn new(profile: WaveGenerationProfile, trigger: T, seed: u64) -> Self {
        Self {
            profile,
            generator: Box::new(StandardWaveGenerator::new()),
            state: Rc::new(RefCell::new(WaveStateManager::new())),
            trigger,
            modifiers: vec![Box::new(HealthDifficultyModifier)],
            spawn_points: Vec::new(),
            seed,
            rng: wave_rng(seed, 0),
            current: None,
            queue: VecDeque::new(),
            next_spawn_time: 0.0,
        }
    }

    /// Replaces the wave generator.
    #[must_use]
    pub fn with_generator(mut self, generator: Box<dyn WaveGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Sets the positions enemies spawn at, picked uniformly per unit.
    #[must_use]
    pub fn with_spawn_points(mut self, points: Vec<Vec3>) -> Self {
        self.spawn_points = points;
        self
    }

    /// Appends a difficulty modifier applied to every spawned enemy.
    pub fn add_difficulty_modifier(&mut self, modifier: Box<dyn DifficultyModifier>) {
        self.modifiers.push(modifier);
    }

    /// Removes every difficulty modifier, including the default one.
    pub fn clear_difficulty_modifiers(&mut self) {
        self.modifiers.clear();
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Shared handle to the lifecycle tracker, for listeners and queries.
    #[must_use]
    pub fn state(&self) -> Rc<RefCell<WaveStateManager>> {
        Rc::clone(&self.state)
    }

    /// Current wave number; 0 before [`begin`](Self::begin).
    #[must_use]
    pub fn current_wave(&self) -> u32 {
        self.state.borrow().current_wave()
    }

    /// Lifecycle phase of the current wave.
    #[must_use]
    pub fn wave_state(&self) -> WaveState {
        self.state.borrow().state()
    }

    /// Data of the current wave.
    #[must_use]
    pub const fn current_wave_data(&self) -> Option<&GeneratedWaveData> {
        self.current.as_ref()
    }

    /// Units still waiting to spawn, in spawn order.
    #[must_use]
    pub const fn spawn_queue(&self) -> &VecDeque<SpawnEntry> {
        &self.queue
    }

    /// Earliest time the next unit may spawn.
    #[must_use]
    pub const fn next_spawn_time(&self) -> f32 {
        self.next_spawn_time
    }

    /// Generation rules.
    #[must_use]
    pub const fn profile(&self) -> &WaveGenerationProfile {
        &self.profile
    }

    /// Master seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Next-wave trigger.
    #[must_use]
    pub const fn trigger(&self) -> &T {
        &self.trigger
    }

    /// Next-wave trigger, for wiring external requests.
    pub fn trigger_mut(&mut self) -> &mut T {
        &mut self.trigger
    }

    /// What wave `wave_number` will contain in this run.
    #[must_use]
    pub fn preview_wave(&self, wave_number: u32) -> GeneratedWaveData {
        self.generator
            .preview_wave(wave_number, &self.profile, self.seed)
    }

    // -------------------------------------------------------------------------
    // Control
    // -------------------------------------------------------------------------

    /// Starts wave 1. Does nothing once a wave has been started.
    pub fn begin(&mut self, now: f32) -> bool {
        if self.current_wave() > 0 {
            return false;
        }
        self.start_next_wave(now);
        true
    }

    /// Generates and starts wave `current + 1`. Returns its number.
    pub fn start_next_wave(&mut self, now: f32) -> u32 {
        let wave_number = self.current_wave() + 1;
        let mut rng = wave_rng(self.seed, wave_number);
        let data = self
            .generator
            .generate_wave(wave_number, &self.profile, &mut rng);

        self.queue = Self::build_spawn_queue(&data, &mut rng);
        self.rng = rng;
        self.next_spawn_time = now;
        self.trigger.disable();

        info!(
            wave = wave_number,
            queued = self.queue.len(),
            interval = data.spawn_interval,
            "starting wave"
        );
        self.state.borrow_mut().start_wave(data.clone());
        self.current = Some(data);
        wave_number
    }

    /// Asks the trigger to start the next wave early.
    pub fn request_next_wave(&mut self) -> bool {
        self.trigger.request()
    }

    /// Drops the remaining spawn queue. The wave then ends when the units
    /// already spawned die. Returns how many units were dropped.
    pub fn cancel_wave(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        self.state.borrow_mut().end_spawning();
        if dropped > 0 {
            info!(wave = self.current_wave(), dropped, "wave spawning cancelled");
        }
        dropped
    }

    /// Advances the orchestrator to simulation time `now`.
    ///
    /// Handles a completed wave by arming the trigger, starts the next wave
    /// when the trigger fires, and spawns at most one unit. Returns the id of
    /// the unit spawned this tick.
    pub fn tick(&mut self, now: f32, factory: &mut dyn EnemyFactory) -> Option<EntityId> {
        let completed = self.state.borrow_mut().take_completed_wave();
        if let Some(wave) = completed {
            debug!(wave, "arming next-wave trigger");
            self.trigger.enable(now);
        }

        if self.trigger.poll(now) {
            self.start_next_wave(now);
        }

        if self.wave_state() != WaveState::Spawning {
            return None;
        }
        self.update_spawning(now, factory)
    }

    fn update_spawning(&mut self, now: f32, factory: &mut dyn EnemyFactory) -> Option<EntityId> {
        if now < self.next_spawn_time || self.queue.is_empty() {
            return None;
        }
        let (max_simultaneous, interval, multiplier) = match &self.current {
            Some(data) => (
                data.max_simultaneous as usize,
                data.spawn_interval,
                data.difficulty_multiplier,
            ),
            None => return None,
        };
        if self.state.borrow().alive_count() >= max_simultaneous {
            return None;
        }

        let unit = self.queue.pop_front()?;
        let position = self.pick_spawn_point();
        self.next_spawn_time = now + interval;

        let Some(spawned) = factory.spawn(&unit.prefab, &unit.profile, position) else {
            warn!(prefab = %unit.prefab, "factory could not spawn enemy, will retry");
            self.queue.push_front(unit);
            return None;
        };

        for modifier in &self.modifiers {
            modifier.apply(spawned.health, multiplier);
        }
        let observer: Rc<RefCell<dyn HealthObserver>> = self.state.clone();
        spawned.health.add_observer(observer);

        let id = spawned.id;
        debug!(entity = %id, prefab = %unit.prefab, ?position, "enemy spawned");
        self.state.borrow_mut().register_enemy_spawned(id);
        Some(id)
    }

    fn pick_spawn_point(&mut self) -> Vec3 {
        self.spawn_points
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(Vec3::ZERO)
    }

    /// Flattens the roster to one entry per unit and shuffles it.
    fn build_spawn_queue(data: &GeneratedWaveData, rng: &mut ChaCha8Rng) -> VecDeque<SpawnEntry> {
        let mut units: Vec<SpawnEntry> = data
            .enemies_to_spawn
            .iter()
            .flat_map(|entry| {
                std::iter::repeat_with(|| SpawnEntry {
                    count: 1,
                    ..entry.clone()
                })
                .take(entry.count as usize)
            })
            .collect();
        units.shuffle(rng);
        units.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{DamageEvent, DamageType};
    use crate::tests::{test_wave_profile, RecordingFactory};
    use crate::wave::{DelayedTrigger, ManualTrigger};

    fn orchestrator() -> WaveOrchestrator<DelayedTrigger> {
        WaveOrchestrator::new(test_wave_profile(), DelayedTrigger::new(2.0), 11)
    }

    /// Ticks from `from` to `to` in 0.1 s steps.
    fn run(
        orchestrator: &mut WaveOrchestrator<impl WaveTrigger>,
        factory: &mut RecordingFactory,
        from: f32,
        to: f32,
    ) -> Vec<EntityId> {
        let mut spawned = Vec::new();
        let mut now = from;
        while now <= to {
            spawned.extend(orchestrator.tick(now, factory));
            now += 0.1;
        }
        spawned
    }

    mod start_tests {
        use super::*;

        #[test]
        fn nothing_happens_before_begin() {
            let mut orch = orchestrator();
            let mut factory = RecordingFactory::default();
            assert!(run(&mut orch, &mut factory, 0.0, 5.0).is_empty());
            assert_eq!(orch.current_wave(), 0);
        }

        #[test]
        fn begin_starts_wave_one_once() {
            let mut orch = orchestrator();
            assert!(orch.begin(0.0));
            assert!(!orch.begin(0.0));

            assert_eq!(orch.current_wave(), 1);
            assert_eq!(orch.wave_state(), WaveState::Spawning);
            assert_eq!(orch.spawn_queue().len(), 3);
            assert!(orch.spawn_queue().iter().all(|u| u.count == 1));
        }

        #[test]
        fn generated_wave_matches_preview() {
            let mut orch = orchestrator();
            let preview = orch.preview_wave(1);
            orch.begin(0.0);
            assert_eq!(orch.current_wave_data(), Some(&preview));
        }
    }

    mod spawning_tests {
        use super::*;

        #[test]
        fn first_unit_spawns_immediately_then_paced() {
            let mut orch = orchestrator();
            let mut factory = RecordingFactory::default();
            orch.begin(0.0);

            assert!(orch.tick(0.0, &mut factory).is_some());
            assert!(orch.tick(0.5, &mut factory).is_none());
            assert!(orch.tick(1.0, &mut factory).is_some());
            assert_eq!(factory.spawn_count(), 2);
        }

        #[test]
        fn max_simultaneous_holds_back_spawns() {
            let mut orch = orchestrator();
            let mut factory = RecordingFactory::default();
            orch.begin(0.0);

            let spawned = run(&mut orch, &mut factory, 0.0, 5.0);
            assert_eq!(spawned.len(), 2);
            assert_eq!(orch.spawn_queue().len(), 1);

            factory.kill(spawned[0]);
            let more = run(&mut orch, &mut factory, 5.1, 6.0);
            assert_eq!(more.len(), 1);
            assert_eq!(orch.wave_state(), WaveState::Active);
        }

        #[test]
        fn difficulty_scales_health_preserving_percentage() {
            let mut orch = orchestrator();
            let mut factory = RecordingFactory::default();
            orch.begin(0.0);

            let id = orch.tick(0.0, &mut factory).unwrap();
            let health = factory.health(id).unwrap();
            // Wave 1: 1.0 * (1 + 0.1)
            assert!((health.max() - 110.0).abs() < 0.001);
            assert!((health.current() - 110.0).abs() < 0.001);
        }

        #[test]
        fn spawn_points_come_from_configured_set() {
            let points = vec![Vec3::new(10.0, 0.0, 0.0), Vec3::new(-10.0, 0.0, 0.0)];
            let mut orch = orchestrator().with_spawn_points(points.clone());
            let mut factory = RecordingFactory::default();
            orch.begin(0.0);
            run(&mut orch, &mut factory, 0.0, 3.0);

            assert!(factory
                .spawn_positions()
                .iter()
                .all(|p| points.contains(p)));
        }

        #[test]
        fn failed_spawn_requeued_at_front() {
            let mut orch = orchestrator();
            let mut factory = RecordingFactory::default();
            factory.fail_next(1);
            orch.begin(0.0);
            let head = orch.spawn_queue()[0].clone();

            assert!(orch.tick(0.0, &mut factory).is_none());
            assert_eq!(orch.spawn_queue().len(), 3);
            assert_eq!(orch.spawn_queue()[0], head);

            assert!(orch.tick(0.5, &mut factory).is_none());
            assert!(orch.tick(1.0, &mut factory).is_some());
        }

        #[test]
        fn cleared_modifiers_leave_health_alone() {
            let mut orch = orchestrator();
            orch.clear_difficulty_modifiers();
            let mut factory = RecordingFactory::default();
            orch.begin(0.0);

            let id = orch.tick(0.0, &mut factory).unwrap();
            assert!((factory.health(id).unwrap().max() - 100.0).abs() < 0.001);
        }
    }

    mod completion_tests {
        use super::*;

        fn clear_wave(
            orch: &mut WaveOrchestrator<impl WaveTrigger>,
            factory: &mut RecordingFactory,
            from: f32,
        ) -> f32 {
            let mut now = from;
            while orch.wave_state() != WaveState::Complete && now < from + 60.0 {
                orch.tick(now, factory);
                factory.kill_all();
                now += 0.1;
            }
            now
        }

        #[test]
        fn completion_arms_trigger_and_next_wave_follows() {
            let mut orch = orchestrator();
            let mut factory = RecordingFactory::default();
            orch.begin(0.0);

            let done = clear_wave(&mut orch, &mut factory, 0.0);
            assert_eq!(orch.wave_state(), WaveState::Complete);

            orch.tick(done, &mut factory);
            assert!(orch.trigger().is_enabled());
            assert_eq!(orch.current_wave(), 1);

            run(&mut orch, &mut factory, done + 0.1, done + 2.5);
            assert_eq!(orch.current_wave(), 2);
            assert!(!orch.trigger().is_enabled());
        }

        #[test]
        fn manual_trigger_waits_for_request() {
            let mut orch = WaveOrchestrator::new(test_wave_profile(), ManualTrigger::new(), 3);
            let mut factory = RecordingFactory::default();
            orch.begin(0.0);
            let done = clear_wave(&mut orch, &mut factory, 0.0);

            run(&mut orch, &mut factory, done, done + 30.0);
            assert_eq!(orch.current_wave(), 1);

            assert!(orch.request_next_wave());
            orch.tick(done + 31.0, &mut factory);
            assert_eq!(orch.current_wave(), 2);
        }

        #[test]
        fn deaths_from_other_sources_count() {
            let mut orch = orchestrator();
            let mut factory = RecordingFactory::default();
            orch.begin(0.0);
            let id = orch.tick(0.0, &mut factory).unwrap();

            factory
                .health_mut(id)
                .unwrap()
                .take_damage(&DamageEvent::new(1000.0, DamageType::Magic));
            assert_eq!(orch.state().borrow().alive_count(), 0);
        }

        #[test]
        fn cancel_drops_queue_and_finishes_with_spawned_units() {
            let mut orch = orchestrator();
            let mut factory = RecordingFactory::default();
            orch.begin(0.0);
            let id = orch.tick(0.0, &mut factory).unwrap();

            assert_eq!(orch.cancel_wave(), 2);
            assert_eq!(orch.wave_state(), WaveState::Active);
            assert!(orch.tick(5.0, &mut factory).is_none());

            factory.kill(id);
            assert_eq!(orch.wave_state(), WaveState::Complete);
        }

        #[test]
        fn empty_wave_arms_trigger_on_next_tick() {
            let mut profile = test_wave_profile();
            for t in &mut profile.available_enemy_types {
                t.min_wave_to_appear = 2;
            }
            let mut orch = WaveOrchestrator::new(profile, DelayedTrigger::new(0.0), 1);
            let mut factory = RecordingFactory::default();
            orch.begin(0.0);
            assert_eq!(orch.wave_state(), WaveState::Complete);

            orch.tick(0.1, &mut factory);
            assert_eq!(orch.current_wave(), 2);
            assert_eq!(orch.wave_state(), WaveState::Spawning);
        }
    }
}
