//! Test fixtures shared across the crate's unit tests.
//!
//! The scripted capabilities let agent tests decide exactly what an agent
//! sees and whether it has arrived, without any geometry. The recording
//! factory and listener capture what the wave machinery asked for.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use glam::Vec3;

use crate::agent::{Detection, EnemyAgent, EnemyProfile, Movement};
use crate::combat::{DamageEvent, DamageType, HealthTracker};
use crate::config::{GauntletConfig, TriggerConfig};
use crate::entity::{EntityId, PrefabId, ProfileId};
use crate::wave::{
    EnemyFactory, EnemyTier, EnemyTypeDefinition, GeneratedWaveData, SpawnEntry, Spawned,
    WaveGenerationProfile, WaveListener, WaveType,
};

// =============================================================================
// Scripted Agent Capabilities
// =============================================================================

/// A command the scripted mover received.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveCall {
    /// `move_towards(destination, speed)`.
    MoveTowards(Vec3, f32),
    /// `stop()`.
    Stop,
    /// `set_enabled(enabled)`.
    SetEnabled(bool),
}

#[derive(Debug)]
struct Script {
    targets: BTreeMap<EntityId, Vec3>,
    detected: Option<EntityId>,
    reached: bool,
    last_destination: Option<Vec3>,
    last_speed: f32,
    stop_count: usize,
    enabled: bool,
    calls: Vec<MoveCall>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            targets: BTreeMap::new(),
            detected: None,
            reached: true,
            last_destination: None,
            last_speed: 0.0,
            stop_count: 0,
            enabled: true,
            calls: Vec::new(),
        }
    }
}

/// Test-side controls for a [`scripted_agent`].
///
/// The agent stands still at the origin. What it detects, where targets
/// are, and whether it has arrived are all set by the test.
#[derive(Debug, Clone, Default)]
pub struct ScriptHandle {
    script: Rc<RefCell<Script>>,
}

impl ScriptHandle {
    /// Places (or moves) a target the agent can resolve.
    pub fn place_target(&self, id: EntityId, position: Vec3) {
        self.script.borrow_mut().targets.insert(id, position);
    }

    /// Removes a target so references to it stop resolving.
    pub fn remove_target(&self, id: EntityId) {
        self.script.borrow_mut().targets.remove(&id);
    }

    /// Sets what `find_closest_target` reports.
    pub fn set_detected(&self, detected: Option<EntityId>) {
        self.script.borrow_mut().detected = detected;
    }

    /// Sets what `has_reached_destination` reports.
    pub fn set_reached(&self, reached: bool) {
        self.script.borrow_mut().reached = reached;
    }

    /// Destination of the most recent `move_towards`. Not cleared by `stop`.
    pub fn last_destination(&self) -> Option<Vec3> {
        self.script.borrow().last_destination
    }

    /// Speed of the most recent `move_towards`.
    pub fn last_speed(&self) -> f32 {
        self.script.borrow().last_speed
    }

    /// Number of `stop` calls.
    pub fn stop_count(&self) -> usize {
        self.script.borrow().stop_count
    }

    /// Whether the mover is enabled.
    pub fn enabled(&self) -> bool {
        self.script.borrow().enabled
    }

    /// Mover commands in the order received, including ignored ones.
    pub fn calls(&self) -> Vec<MoveCall> {
        self.script.borrow().calls.clone()
    }

    /// Forgets recorded mover commands.
    pub fn clear_calls(&self) {
        self.script.borrow_mut().calls.clear();
    }
}

struct ScriptedMovement {
    script: Rc<RefCell<Script>>,
}

impl Movement for ScriptedMovement {
    fn position(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn move_towards(&mut self, destination: Vec3, speed: f32) {
        let mut script = self.script.borrow_mut();
        script.calls.push(MoveCall::MoveTowards(destination, speed));
        if script.enabled {
            script.last_destination = Some(destination);
            script.last_speed = speed;
        }
    }

    fn stop(&mut self) {
        let mut script = self.script.borrow_mut();
        script.stop_count += 1;
        script.calls.push(MoveCall::Stop);
    }

    fn face_target(&mut self, _target: Vec3, _rotation_speed: f32) {}

    fn has_reached_destination(&self) -> bool {
        self.script.borrow().reached
    }

    fn velocity(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn set_enabled(&mut self, enabled: bool) {
        let mut script = self.script.borrow_mut();
        script.enabled = enabled;
        script.calls.push(MoveCall::SetEnabled(enabled));
    }
}

struct ScriptedDetection {
    script: Rc<RefCell<Script>>,
}

impl Detection for ScriptedDetection {
    fn find_closest_target(&self) -> Option<EntityId> {
        self.script.borrow().detected
    }

    fn can_detect(&self, target: EntityId) -> bool {
        let script = self.script.borrow();
        script.detected == Some(target) && script.targets.contains_key(&target)
    }

    fn has_line_of_sight(&self, _position: Vec3) -> bool {
        true
    }

    fn target_position(&self, target: EntityId) -> Option<Vec3> {
        self.script.borrow().targets.get(&target).copied()
    }
}

/// Builds an agent at the origin driven by scripted capabilities.
pub fn scripted_agent(id: EntityId, profile: EnemyProfile) -> (EnemyAgent, ScriptHandle) {
    let handle = ScriptHandle::default();
    let agent = EnemyAgent::new(
        id,
        Arc::new(profile),
        Box::new(ScriptedMovement {
            script: Rc::clone(&handle.script),
        }),
        Box::new(ScriptedDetection {
            script: Rc::clone(&handle.script),
        }),
    );
    (agent, handle)
}

// =============================================================================
// Wave Fixtures
// =============================================================================

/// A normal wave of `total` grunts.
pub fn wave_data(wave_number: u32, total: u32) -> GeneratedWaveData {
    let enemies_to_spawn = if total == 0 {
        Vec::new()
    } else {
        vec![SpawnEntry {
            prefab: PrefabId::new("grunt"),
            profile: ProfileId::new("grunt"),
            count: total,
            tier: EnemyTier::Basic,
        }]
    };
    GeneratedWaveData {
        wave_number,
        enemies_to_spawn,
        max_simultaneous: 3,
        spawn_interval: 1.0,
        difficulty_multiplier: 1.0,
        wave_type: WaveType::Normal,
    }
}

/// Records every wave lifecycle notification.
#[derive(Debug, Default)]
pub struct WaveRecorder {
    /// `(wave, planned enemies)` per start.
    pub started: Vec<(u32, u32)>,
    /// `(wave, entity)` per spawn.
    pub spawned: Vec<(u32, EntityId)>,
    /// `(wave, entity)` per kill.
    pub killed: Vec<(u32, EntityId)>,
    /// Completed wave numbers.
    pub completed: Vec<u32>,
}

impl WaveListener for WaveRecorder {
    fn on_wave_started(&mut self, wave: u32, data: &GeneratedWaveData) {
        self.started.push((wave, data.total_enemy_count()));
    }

    fn on_wave_completed(&mut self, wave: u32) {
        self.completed.push(wave);
    }

    fn on_enemy_spawned(&mut self, wave: u32, entity: EntityId) {
        self.spawned.push((wave, entity));
    }

    fn on_enemy_killed(&mut self, wave: u32, entity: EntityId) {
        self.killed.push((wave, entity));
    }
}

/// Three grunts per wave, two at a time, one per second. Elite and boss
/// waves are pushed out of reach.
pub fn test_wave_profile() -> WaveGenerationProfile {
    WaveGenerationProfile {
        available_enemy_types: vec![EnemyTypeDefinition::new(
            "Grunt",
            "grunt",
            "grunt",
            EnemyTier::Basic,
        )],
        base_enemy_count: 3,
        max_enemy_count_per_wave: 3,
        max_simultaneous_enemies: 2,
        base_spawn_interval: 1.0,
        min_spawn_interval: 0.5,
        elite_wave_interval: 1000,
        boss_wave_interval: 1000,
        ..WaveGenerationProfile::default()
    }
}

/// A mixed roster with every tier, for composition and determinism tests.
pub fn mixed_wave_profile() -> WaveGenerationProfile {
    WaveGenerationProfile {
        available_enemy_types: vec![
            EnemyTypeDefinition::new("Grunt", "grunt", "grunt", EnemyTier::Basic),
            EnemyTypeDefinition::new("Archer", "archer", "archer", EnemyTier::Basic)
                .with_weight(0.5),
            EnemyTypeDefinition::new("Knight", "knight", "knight", EnemyTier::Advanced)
                .from_wave(3),
            EnemyTypeDefinition::new("Champion", "champion", "champion", EnemyTier::Elite)
                .from_wave(5),
            EnemyTypeDefinition::new("Warlord", "warlord", "warlord", EnemyTier::Boss)
                .from_wave(10),
        ],
        base_enemy_count: 3,
        max_enemy_count_per_wave: 20,
        max_simultaneous_enemies: 5,
        ..WaveGenerationProfile::default()
    }
}

/// A runnable config: grunts spawning in front of the player, a short
/// delay between waves.
pub fn test_config() -> GauntletConfig {
    let mut config = GauntletConfig {
        seed: 42,
        waves: test_wave_profile(),
        spawn_points: vec![Vec3::new(0.0, 0.0, -8.0), Vec3::new(0.0, 0.0, -9.0)],
        trigger: TriggerConfig::Delayed { delay: 2.0 },
        ..GauntletConfig::default()
    };
    config
        .enemy_profiles
        .insert(ProfileId::new("grunt"), EnemyProfile::default());
    config
}

// =============================================================================
// Recording Factory
// =============================================================================

/// Factory that hands out bare health trackers and records spawn calls.
#[derive(Debug, Default)]
pub struct RecordingFactory {
    next_id: u64,
    fail_remaining: usize,
    trackers: BTreeMap<EntityId, HealthTracker>,
    positions: Vec<Vec3>,
}

impl RecordingFactory {
    /// Max health of every spawned tracker.
    pub const MAX_HEALTH: f32 = 100.0;

    /// Makes the next `n` spawn calls fail.
    pub fn fail_next(&mut self, n: usize) {
        self.fail_remaining = n;
    }

    /// Successful spawns so far.
    pub fn spawn_count(&self) -> usize {
        self.trackers.len()
    }

    /// Positions of successful spawns, in order.
    pub fn spawn_positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Health of a spawned entity.
    pub fn health(&self, id: EntityId) -> Option<&HealthTracker> {
        self.trackers.get(&id)
    }

    /// Mutable health of a spawned entity.
    pub fn health_mut(&mut self, id: EntityId) -> Option<&mut HealthTracker> {
        self.trackers.get_mut(&id)
    }

    /// Deals lethal damage to one entity.
    pub fn kill(&mut self, id: EntityId) {
        if let Some(health) = self.trackers.get_mut(&id) {
            health.take_damage(&DamageEvent::new(1.0e9, DamageType::Magic));
        }
    }

    /// Deals lethal damage to every living entity.
    pub fn kill_all(&mut self) {
        for health in self.trackers.values_mut().filter(|h| h.is_alive()) {
            health.take_damage(&DamageEvent::new(1.0e9, DamageType::Magic));
        }
    }
}

impl EnemyFactory for RecordingFactory {
    fn spawn(&mut self, _prefab: &PrefabId, _profile: &ProfileId, position: Vec3) -> Option<Spawned<'_>> {
        if self.fail_remaining > 0 {
            self.fail_remaining -= 1;
            return None;
        }
        self.next_id += 1;
        let id = EntityId::new(self.next_id);
        self.positions.push(position);
        let health = self
            .trackers
            .entry(id)
            .or_insert_with(|| HealthTracker::new(id, Self::MAX_HEALTH));
        Some(Spawned { id, health })
    }
}
