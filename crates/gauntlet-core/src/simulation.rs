//! Fixed-step driver for a wave-survival run.
//!
//! The `Simulation` wires the pieces together: the [`Arena`] of enemy
//! agents, the [`WaveOrchestrator`] that fills it, and the defended player
//! whose [`HealthTracker`] receives every attack aimed at it.
//!
//! # Step Order
//!
//! Each [`step`](Simulation::step) runs the same phases:
//!
//! 1. **WAVES**: the orchestrator arms or fires its trigger and spawns at
//!    most one enemy through the arena
//! 2. **AGENTS**: every agent ticks in ID order and queues attacks
//! 3. **RESOLUTION**: attacks aimed at the player are applied in order
//! 4. **CLEANUP**: dead agents leave the arena, time advances
//!
//! # Determinism
//!
//! All randomness derives from the config seed, agents are iterated in ID
//! order, and attacks resolve in issue order. The same config and the same
//! external calls produce the same [`SimulationSnapshot`] on every run.
//!
//! # Example
//!
//! ```
//! use gauntlet_core::agent::EnemyProfile;
//! use gauntlet_core::config::GauntletConfig;
//! use gauntlet_core::entity::ProfileId;
//! use gauntlet_core::simulation::Simulation;
//! use gauntlet_core::wave::{EnemyTier, EnemyTypeDefinition};
//!
//! let mut config = GauntletConfig::default();
//! config.enemy_profiles.insert(ProfileId::new("grunt"), EnemyProfile::default());
//! config.waves.available_enemy_types =
//!     vec![EnemyTypeDefinition::new("Grunt", "grunt", "grunt", EnemyTier::Basic)];
//!
//! let mut sim = Simulation::new(config).unwrap();
//! for _ in 0..10 {
//!     sim.step();
//! }
//!
//! assert_eq!(sim.tick(), 10);
//! assert_eq!(sim.current_wave(), 1);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::agent::{AgentState, TargetBoard};
use crate::arena::Arena;
use crate::combat::{DamageEvent, HealthEvent, HealthEventLog, HealthTracker};
use crate::config::{ConfigError, GauntletConfig, TriggerConfig};
use crate::entity::{EntityId, PrefabId};
use crate::wave::{
    DelayedTrigger, ManualTrigger, WaveListener, WaveOrchestrator, WaveState, WaveTrigger,
};

/// Entity id of the defended player. Agent ids start above it.
pub const PLAYER_ID: EntityId = EntityId::new(0);

/// Player health events kept between calls to
/// [`Simulation::take_player_events`].
pub const PLAYER_EVENT_LIMIT: usize = 256;

// =============================================================================
// Step Output
// =============================================================================

/// What happened during one [`Simulation::step`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    /// Tick that was executed.
    pub tick: u64,
    /// Enemy spawned this step, if any.
    pub spawned: Option<EntityId>,
    /// Attacks issued by agents this step.
    pub attacks: usize,
    /// Damage the player took this step.
    pub player_damage: f32,
    /// Agents removed after dying.
    pub released: Vec<EntityId>,
}

/// Serializable view of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// Agent id.
    pub id: EntityId,
    /// Prefab the agent was spawned from.
    pub prefab: Option<PrefabId>,
    /// Behavior state.
    pub state: AgentState,
    /// World position.
    pub position: Vec3,
    /// Current health.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
}

/// Serializable view of a whole run at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    /// Ticks executed so far.
    pub tick: u64,
    /// Current wave number.
    pub wave: u32,
    /// Lifecycle phase of the current wave.
    pub wave_state: WaveState,
    /// Player health.
    pub player_health: f32,
    /// Live agents in ID order.
    pub agents: Vec<AgentSnapshot>,
}

// =============================================================================
// Simulation
// =============================================================================

/// A complete run: player, arena, and wave orchestration.
pub struct Simulation {
    arena: Arena,
    board: Rc<RefCell<TargetBoard>>,
    waves: WaveOrchestrator<Box<dyn WaveTrigger>>,
    player: HealthTracker,
    player_position: Vec3,
    player_log: Rc<RefCell<HealthEventLog>>,
    started: bool,
    time: f32,
    tick: u64,
    time_step: f32,
    master_seed: u64,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("time", &self.time)
            .field("wave", &self.waves.current_wave())
            .field("wave_state", &self.waves.wave_state())
            .field("arena", &self.arena)
            .field("player", &self.player)
            .field("master_seed", &self.master_seed)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Builds a run from a validated config.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] reported by [`GauntletConfig::validate`].
    pub fn new(config: GauntletConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let board = Rc::new(RefCell::new(TargetBoard::new()));
        board
            .borrow_mut()
            .set_position(PLAYER_ID, config.player.position);

        let mut arena = Arena::with_kinematic(Rc::clone(&board), config.arena_capacity)
            .with_critical_hits(config.player.critical_hit_chance, config.seed);
        for (id, profile) in config.enemy_profiles {
            arena.insert_profile(id, profile);
        }

        let trigger: Box<dyn WaveTrigger> = match config.trigger {
            TriggerConfig::Delayed { delay } => Box::new(DelayedTrigger::new(delay)),
            TriggerConfig::Manual => Box::new(ManualTrigger::new()),
        };
        let waves = WaveOrchestrator::new(config.waves, trigger, config.seed)
            .with_spawn_points(config.spawn_points);

        let player_log = Rc::new(RefCell::new(HealthEventLog::bounded(PLAYER_EVENT_LIMIT)));
        let mut player = HealthTracker::new(PLAYER_ID, config.player.max_health);
        player.add_observer(player_log.clone());

        info!(seed = config.seed, time_step = config.time_step, "simulation created");
        Ok(Self {
            arena,
            board,
            waves,
            player,
            player_position: config.player.position,
            player_log,
            started: false,
            time: 0.0,
            tick: 0,
            time_step: config.time_step,
            master_seed: config.seed,
        })
    }

    /// Executes one fixed step. Does nothing once the player is dead.
    pub fn step(&mut self) -> StepSummary {
        let mut summary = StepSummary {
            tick: self.tick,
            ..StepSummary::default()
        };
        if self.is_over() {
            return summary;
        }

        // PHASE 1: WAVES
        if !self.started {
            self.waves.begin(self.time);
            self.started = true;
        }
        summary.spawned = self.waves.tick(self.time, &mut self.arena);

        // PHASE 2: AGENTS
        let requests = self.arena.tick_agents(self.time, self.time_step);
        summary.attacks = requests.len();

        // PHASE 3: RESOLUTION
        for request in &requests {
            if request.target != PLAYER_ID || self.player.is_dead() {
                continue;
            }
            summary.player_damage += self.player.take_damage(&request.to_damage_event());
        }
        if self.player.is_dead() {
            self.board.borrow_mut().remove(PLAYER_ID);
            info!(tick = self.tick, wave = self.current_wave(), "player defeated");
        }

        // PHASE 4: CLEANUP
        summary.released = self.arena.release_dead();
        if !summary.released.is_empty() {
            debug!(tick = self.tick, released = summary.released.len(), "dead agents released");
        }
        self.tick += 1;
        self.time = self.tick as f32 * self.time_step;
        summary
    }

    /// Runs up to `steps` steps, stopping early if the player dies.
    /// Returns the number of steps executed.
    pub fn run(&mut self, steps: u64) -> u64 {
        let mut executed = 0;
        while executed < steps && !self.is_over() {
            self.step();
            executed += 1;
        }
        executed
    }

    // -------------------------------------------------------------------------
    // External input
    // -------------------------------------------------------------------------

    /// Applies a player attack to an agent. Returns the damage dealt, or
    /// `None` if the agent does not exist.
    pub fn damage_agent(&mut self, id: EntityId, event: &DamageEvent) -> Option<f32> {
        let event = event.with_instigator(PLAYER_ID);
        self.arena.get_mut(id).map(|agent| agent.take_damage(&event))
    }

    /// Alerts agents within `radius` of a noise. Returns how many reacted.
    pub fn make_noise(&mut self, position: Vec3, radius: f32) -> usize {
        self.arena.alert_within(position, radius)
    }

    /// Heals the player. Returns the amount restored.
    pub fn heal_player(&mut self, amount: f32) -> f32 {
        self.player.heal(amount)
    }

    /// Asks the trigger to start the next wave early.
    pub fn request_next_wave(&mut self) -> bool {
        self.waves.request_next_wave()
    }

    /// Registers a wave lifecycle listener.
    pub fn add_wave_listener(&mut self, listener: &Rc<RefCell<dyn WaveListener>>) -> bool {
        self.waves.state().borrow_mut().add_listener(listener)
    }

    /// Drains health events recorded for the player. Only the newest
    /// [`PLAYER_EVENT_LIMIT`] events are kept between drains.
    pub fn take_player_events(&mut self) -> Vec<HealthEvent> {
        self.player_log.borrow_mut().take_events()
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Ticks executed so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulation time in seconds.
    #[must_use]
    pub const fn time(&self) -> f32 {
        self.time
    }

    /// Fixed step length in seconds.
    #[must_use]
    pub const fn time_step(&self) -> f32 {
        self.time_step
    }

    /// Master seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.master_seed
    }

    /// True once the player has died.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.player.is_dead()
    }

    /// Current wave number.
    #[must_use]
    pub fn current_wave(&self) -> u32 {
        self.waves.current_wave()
    }

    /// Lifecycle phase of the current wave.
    #[must_use]
    pub fn wave_state(&self) -> WaveState {
        self.waves.wave_state()
    }

    /// The player's health.
    #[must_use]
    pub const fn player(&self) -> &HealthTracker {
        &self.player
    }

    /// Fixed player position.
    #[must_use]
    pub const fn player_position(&self) -> Vec3 {
        self.player_position
    }

    /// The agents.
    #[must_use]
    pub const fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Mutable access to the agents.
    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    /// The wave orchestrator.
    #[must_use]
    pub const fn waves(&self) -> &WaveOrchestrator<Box<dyn WaveTrigger>> {
        &self.waves
    }

    /// Mutable access to the wave orchestrator.
    pub fn waves_mut(&mut self) -> &mut WaveOrchestrator<Box<dyn WaveTrigger>> {
        &mut self.waves
    }

    /// Shared target board the agents' sensors read.
    #[must_use]
    pub fn board(&self) -> Rc<RefCell<TargetBoard>> {
        Rc::clone(&self.board)
    }

    /// Captures the observable state of the run.
    #[must_use]
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            tick: self.tick,
            wave: self.current_wave(),
            wave_state: self.wave_state(),
            player_health: self.player.current(),
            agents: self
                .arena
                .agents_sorted()
                .map(|agent| AgentSnapshot {
                    id: agent.id(),
                    prefab: self.arena.prefab_of(agent.id()).cloned(),
                    state: agent.state(),
                    position: agent.position(),
                    health: agent.health().current(),
                    max_health: agent.health().max(),
                })
                .collect(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
