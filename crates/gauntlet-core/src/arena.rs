//! Arena module holding the live enemy agents.
//!
//! The Arena is the container for all enemies in a run. It provides:
//! - Agent storage with deterministic iteration order (`BTreeMap`)
//! - Spatial indexing for proximity queries
//! - Agent lifecycle (spawn with a capacity limit, release on death)
//! - The [`EnemyFactory`] contract used by the wave orchestrator
//!
//! # Architecture
//!
//! Agents are ticked in ID order, and the attack requests they emit are
//! returned in that same order, so a run is reproducible from its seed.
//! Movement and detection for new agents come from an [`AgentBackend`]; the
//! default [`KinematicBackend`] gives every agent a [`KinematicMover`] and a
//! [`RadiusSensor`] looking at a shared [`TargetBoard`].
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use glam::Vec3;
//! use gauntlet_core::agent::{EnemyProfile, TargetBoard};
//! use gauntlet_core::arena::Arena;
//! use gauntlet_core::entity::{PrefabId, ProfileId};
//!
//! let board = Rc::new(RefCell::new(TargetBoard::new()));
//! let mut arena = Arena::with_kinematic(board, 8);
//! arena.insert_profile(ProfileId::new("grunt"), EnemyProfile::default());
//!
//! let id = arena
//!     .spawn_agent(&PrefabId::new("grunt"), &ProfileId::new("grunt"), Vec3::new(5.0, 0.0, 0.0))
//!     .unwrap();
//!
//! let nearby = arena.spatial().query_radius(Vec3::ZERO, 10.0);
//! assert_eq!(nearby, vec![id]);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::Arc;

use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agent::{
    AttackRequest, Detection, EnemyAgent, EnemyProfile, KinematicMover, Movement, Pose,
    RadiusSensor, TargetBoard,
};
use crate::entity::{EntityId, PrefabId, ProfileId};
use crate::wave::{EnemyFactory, Spawned};

// =============================================================================
// Spatial Index
// =============================================================================

/// Agent positions for proximity queries.
///
/// `HashMap` is fine here: lookups are by known ID, and radius queries sort
/// their results before returning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpatialIndex {
    positions: HashMap<EntityId, Vec3>,
}

impl SpatialIndex {
    /// Creates a new empty spatial index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            positions: HashMap::new(),
        }
    }

    /// Inserts or updates a position.
    pub fn insert(&mut self, id: EntityId, pos: Vec3) {
        self.positions.insert(id, pos);
    }

    /// Removes an entity from the index.
    pub fn remove(&mut self, id: EntityId) {
        self.positions.remove(&id);
    }

    /// Returns the indexed position of an entity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<Vec3> {
        self.positions.get(&id).copied()
    }

    /// Entities within `radius` of `center`, sorted by ID.
    #[must_use]
    pub fn query_radius(&self, center: Vec3, radius: f32) -> Vec<EntityId> {
        let radius_sq = radius * radius;
        let mut results: Vec<EntityId> = self
            .positions
            .iter()
            .filter(|(_, pos)| center.distance_squared(**pos) <= radius_sq)
            .map(|(id, _)| *id)
            .collect();

        // Sort for deterministic order
        results.sort();
        results
    }

    /// Returns the number of indexed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

// =============================================================================
// Agent Backends
// =============================================================================

/// Supplies movement and detection for newly spawned agents.
pub trait AgentBackend {
    /// Builds the capabilities for agent `id` starting at `position`.
    fn build(
        &mut self,
        id: EntityId,
        profile: &EnemyProfile,
        position: Vec3,
    ) -> (Box<dyn Movement>, Box<dyn Detection>);
}

/// Kinematic movers and radius sensors over a shared target board.
#[derive(Debug, Clone)]
pub struct KinematicBackend {
    board: Rc<RefCell<TargetBoard>>,
}

impl KinematicBackend {
    /// Creates a backend whose sensors look at `board`.
    #[must_use]
    pub fn new(board: Rc<RefCell<TargetBoard>>) -> Self {
        Self { board }
    }
}

impl AgentBackend for KinematicBackend {
    fn build(
        &mut self,
        _id: EntityId,
        profile: &EnemyProfile,
        position: Vec3,
    ) -> (Box<dyn Movement>, Box<dyn Detection>) {
        let pose = Rc::new(Cell::new(Pose::at(position)));
        let mover = KinematicMover::new(Rc::clone(&pose), profile.stopping_distance);
        let sensor = RadiusSensor::new(
            pose,
            Rc::clone(&self.board),
            profile.detection_range,
            profile.field_of_view_angle,
        );
        (Box::new(mover), Box::new(sensor))
    }
}

// =============================================================================
// Arena
// =============================================================================

/// Critical-hit setup applied to agents whose resistances accept crits.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CriticalHits {
    chance: f32,
    seed: u64,
}

/// Container of live enemy agents.
///
/// # Determinism
///
/// Storage is a `BTreeMap` and IDs are assigned monotonically, so iteration
/// order is the spawn order on every platform.
pub struct Arena {
    /// Next ID handed out. IDs below the first are reserved for non-agents.
    next_id: u64,
    capacity: usize,
    profiles: BTreeMap<ProfileId, Arc<EnemyProfile>>,
    agents: BTreeMap<EntityId, EnemyAgent>,
    prefabs: BTreeMap<EntityId, PrefabId>,
    spatial: SpatialIndex,
    backend: Box<dyn AgentBackend>,
    critical_hits: Option<CriticalHits>,
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("next_id", &self.next_id)
            .field("capacity", &self.capacity)
            .field("profiles", &self.profiles.keys().collect::<Vec<_>>())
            .field("agents", &format!("[{} agents]", self.agents.len()))
            .field("critical_hits", &self.critical_hits)
            .finish_non_exhaustive()
    }
}

impl Arena {
    /// First ID assigned to an agent.
    pub const FIRST_AGENT_ID: u64 = 1;

    /// Creates an empty arena holding at most `capacity` agents.
    #[must_use]
    pub fn new(capacity: usize, backend: Box<dyn AgentBackend>) -> Self {
        Self {
            next_id: Self::FIRST_AGENT_ID,
            capacity,
            profiles: BTreeMap::new(),
            agents: BTreeMap::new(),
            prefabs: BTreeMap::new(),
            spatial: SpatialIndex::new(),
            backend,
            critical_hits: None,
        }
    }

    /// Creates an arena using [`KinematicBackend`] over `board`.
    #[must_use]
    pub fn with_kinematic(board: Rc<RefCell<TargetBoard>>, capacity: usize) -> Self {
        Self::new(capacity, Box::new(KinematicBackend::new(board)))
    }

    /// Gives every agent that accepts critical hits a crit stage rolling at
    /// `chance`, seeded from `(seed, agent id)`.
    #[must_use]
    pub fn with_critical_hits(mut self, chance: f32, seed: u64) -> Self {
        self.critical_hits = (chance > 0.0).then_some(CriticalHits { chance, seed });
        self
    }

    /// Adds or replaces a profile in the catalog.
    pub fn insert_profile(&mut self, id: ProfileId, profile: EnemyProfile) {
        self.profiles.insert(id, Arc::new(profile));
    }

    /// Looks up a catalog profile.
    #[must_use]
    pub fn profile(&self, id: &ProfileId) -> Option<&EnemyProfile> {
        self.profiles.get(id).map(AsRef::as_ref)
    }

    /// Creates an agent, or returns `None` when the arena is full or the
    /// profile is unknown.
    pub fn spawn_agent(
        &mut self,
        prefab: &PrefabId,
        profile_id: &ProfileId,
        position: Vec3,
    ) -> Option<EntityId> {
        if self.agents.len() >= self.capacity {
            warn!(capacity = self.capacity, %prefab, "arena full, spawn refused");
            return None;
        }
        let Some(profile) = self.profiles.get(profile_id) else {
            warn!(profile = %profile_id, %prefab, "unknown enemy profile, spawn refused");
            return None;
        };
        let profile = Arc::clone(profile);

        let id = EntityId::new(self.next_id);
        self.next_id += 1;

        let (movement, detection) = self.backend.build(id, &profile, position);
        let mut agent = EnemyAgent::new(id, Arc::clone(&profile), movement, detection);
        if let (Some(crits), Some(resistances)) = (self.critical_hits, &profile.resistances) {
            let seed = Self::critical_seed(crits.seed, id);
            if let Some(stage) =
                resistances.critical_hit_modifier(crits.chance, ChaCha8Rng::seed_from_u64(seed))
            {
                agent.health_mut().add_damage_modifier(Box::new(stage));
            }
        }

        debug!(entity = %id, %prefab, profile = %profile_id, "agent spawned");
        self.spatial.insert(id, position);
        self.prefabs.insert(id, prefab.clone());
        self.agents.insert(id, agent);
        Some(id)
    }

    /// Removes an agent.
    pub fn despawn(&mut self, id: EntityId) -> Option<EnemyAgent> {
        self.spatial.remove(id);
        self.prefabs.remove(&id);
        self.agents.remove(&id)
    }

    /// Removes every dead agent and returns their IDs in order.
    pub fn release_dead(&mut self) -> Vec<EntityId> {
        let dead: Vec<EntityId> = self
            .agents
            .iter()
            .filter(|(_, agent)| agent.health().is_dead())
            .map(|(id, _)| *id)
            .collect();
        for id in &dead {
            self.despawn(*id);
        }
        dead
    }

    /// Returns an agent by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&EnemyAgent> {
        self.agents.get(&id)
    }

    /// Returns a mutable agent by ID.
    #[must_use]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EnemyAgent> {
        self.agents.get_mut(&id)
    }

    /// Prefab an agent was spawned from.
    #[must_use]
    pub fn prefab_of(&self, id: EntityId) -> Option<&PrefabId> {
        self.prefabs.get(&id)
    }

    /// Agent IDs in deterministic (sorted) order.
    pub fn agent_ids_sorted(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.agents.keys().copied()
    }

    /// Agents in deterministic (sorted by ID) order.
    pub fn agents_sorted(&self) -> impl Iterator<Item = &EnemyAgent> + '_ {
        self.agents.values()
    }

    /// Number of agents, dead or alive.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Number of agents still alive.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.agents.values().filter(|a| a.is_active()).count()
    }

    /// Returns true if the arena holds no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Maximum number of agents.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the spatial index.
    #[must_use]
    pub fn spatial(&self) -> &SpatialIndex {
        &self.spatial
    }

    /// Ticks every agent in ID order and collects their attack requests in
    /// the same order. The spatial index is refreshed afterwards.
    pub fn tick_agents(&mut self, now: f32, dt: f32) -> Vec<AttackRequest> {
        let mut requests = Vec::new();
        for (id, agent) in &mut self.agents {
            agent.tick(now, dt);
            requests.extend(agent.take_attack_requests());
            self.spatial.insert(*id, agent.position());
        }
        requests
    }

    /// Alerts every live agent within `radius` of `position`. Returns how
    /// many were alerted.
    pub fn alert_within(&mut self, position: Vec3, radius: f32) -> usize {
        let mut alerted = 0;
        for id in self.spatial.query_radius(position, radius) {
            if let Some(agent) = self.agents.get_mut(&id) {
                if agent.is_active() {
                    agent.alert(position);
                    alerted += 1;
                }
            }
        }
        alerted
    }

    fn critical_seed(seed: u64, id: EntityId) -> u64 {
        let mut hasher = DefaultHasher::new();
        seed.hash(&mut hasher);
        id.hash(&mut hasher);
        hasher.finish()
    }
}

impl EnemyFactory for Arena {
    fn spawn(&mut self, prefab: &PrefabId, profile: &ProfileId, position: Vec3) -> Option<Spawned<'_>> {
        let id = self.spawn_agent(prefab, profile, position)?;
        let agent = self.agents.get_mut(&id)?;
        Some(Spawned {
            id,
            health: agent.health_mut(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
