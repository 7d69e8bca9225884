//! Hostile agent behavior.
//!
//! An [`EnemyAgent`] is a per-entity state machine. Each tick it reads its
//! own health, asks [`Detection`] about targets, steers through
//! [`Movement`], and queues [`AttackRequest`]s for the caller to resolve.
//!
//! # States
//!
//! ```text
//!            detect                 in range
//!   Idle ───────────────► Chasing ───────────► Attacking
//!    ▲ │ wait               │ ▲  ◄───────────── │
//!    │ ▼                    │ │  out of range    │
//!  Patrolling       lost    │ │ healthy          │ lost
//!    │ detect ──────────►   ▼ │                  ▼
//!    └─────────────► Investigating      Retreating ◄── low health
//! ```
//!
//! `Stunned` is entered and left only through [`EnemyAgent::stun`] and
//! [`EnemyAgent::recover`]. `Dead` is entered when health latches death and
//! left only through [`EnemyAgent::revive`].
//!
//! Every transition runs the old state's exit hook, then the new state's
//! entry hook, then resets the state timer. Chase and attack distances
//! depend on the profile's [`AttackStyle`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use gauntlet_core::agent::{AgentState, EnemyAgent, EnemyProfile};
//! # use gauntlet_core::agent::{Detection, Movement};
//! # use gauntlet_core::entity::EntityId;
//! # use glam::Vec3;
//! # struct Still;
//! # impl Movement for Still {
//! #     fn position(&self) -> Vec3 { Vec3::ZERO }
//! #     fn move_towards(&mut self, _: Vec3, _: f32) {}
//! #     fn stop(&mut self) {}
//! #     fn face_target(&mut self, _: Vec3, _: f32) {}
//! #     fn has_reached_destination(&self) -> bool { true }
//! #     fn velocity(&self) -> Vec3 { Vec3::ZERO }
//! # }
//! # struct Blind;
//! # impl Detection for Blind {
//! #     fn find_closest_target(&self) -> Option<EntityId> { None }
//! #     fn can_detect(&self, _: EntityId) -> bool { false }
//! #     fn has_line_of_sight(&self, _: Vec3) -> bool { true }
//! #     fn target_position(&self, _: EntityId) -> Option<Vec3> { None }
//! # }
//!
//! let profile = Arc::new(EnemyProfile::default());
//! let mut agent = EnemyAgent::new(EntityId::new(1), profile, Box::new(Still), Box::new(Blind));
//!
//! // Nothing detected; after the patrol wait the agent starts patrolling.
//! for step in 0..30 {
//!     agent.tick(step as f32 * 0.1, 0.1);
//! }
//! assert_ne!(agent.state(), AgentState::Chasing);
//! ```

pub mod capability;
pub mod kinematic;
pub mod profile;
pub mod style;

use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combat::{DamageEvent, DamageType, HealthTracker};
use crate::entity::EntityId;

pub use capability::{Detection, Movement};
pub use kinematic::{KinematicMover, Occluder, Pose, RadiusSensor, TargetBoard};
pub use profile::EnemyProfile;
pub use style::{AttackStyle, Lunge, RangedBand};

/// Distance moved away from the target per retreat command.
pub const RETREAT_DISTANCE: f32 = 5.0;

/// Extra distance beyond attack range before an attacker resumes chasing.
pub const ATTACK_RANGE_HYSTERESIS: f32 = 0.5;

/// Investigators stop moving once this close to the last known position.
pub const INVESTIGATE_ARRIVAL_RADIUS: f32 = 1.0;

// =============================================================================
// State
// =============================================================================

/// Behavior state of an [`EnemyAgent`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AgentState {
    /// Waiting in place.
    #[default]
    Idle,
    /// Walking a patrol leg.
    Patrolling,
    /// Pursuing the target.
    Chasing,
    /// In range and striking.
    Attacking,
    /// Backing off while wounded.
    Retreating,
    /// Heading to the last known target position.
    Investigating,
    /// Frozen until recovered.
    Stunned,
    /// Terminal until revived.
    Dead,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// Attack Requests
// =============================================================================

/// A strike the agent wants resolved against its target.
///
/// The agent never touches another entity's health; the caller routes the
/// request to the target's [`HealthTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackRequest {
    /// Attacking agent.
    pub attacker: EntityId,
    /// Entity being struck.
    pub target: EntityId,
    /// Raw damage.
    pub damage: f32,
    /// Damage type.
    pub damage_type: DamageType,
    /// Where the strike originates.
    pub origin: Vec3,
    /// Target position at the moment of the strike.
    pub hit_point: Vec3,
}

impl AttackRequest {
    /// Builds the event the target's tracker should receive.
    #[must_use]
    pub fn to_damage_event(&self) -> DamageEvent {
        DamageEvent::new(self.damage, self.damage_type)
            .with_instigator(self.attacker)
            .with_hit(self.hit_point, self.hit_point - self.origin)
    }
}

// =============================================================================
// Agent
// =============================================================================

/// Autonomous hostile agent.
pub struct EnemyAgent {
    id: EntityId,
    profile: Arc<EnemyProfile>,
    health: HealthTracker,
    movement: Box<dyn Movement>,
    detection: Box<dyn Detection>,

    state: AgentState,
    state_timer: f32,
    target: Option<EntityId>,
    last_known_target_position: Option<Vec3>,
    last_attack_time: Option<f32>,
    last_lunge_time: Option<f32>,
    lunge_ends_at: Option<f32>,
    alerted: bool,
    enabled: bool,

    patrol_route: Vec<Vec3>,
    next_waypoint: usize,
    pending_attacks: Vec<AttackRequest>,
}

impl fmt::Debug for EnemyAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnemyAgent")
            .field("id", &self.id)
            .field("profile", &self.profile.name)
            .field("state", &self.state)
            .field("target", &self.target)
            .field("health", &self.health)
            .field("pending_attacks", &self.pending_attacks.len())
            .finish_non_exhaustive()
    }
}

impl EnemyAgent {
    /// Creates an idle agent at full health.
    ///
    /// The health tracker is sized from `profile.max_health` and receives the
    /// profile's resistance stages, if any.
    #[must_use]
    pub fn new(
        id: EntityId,
        profile: Arc<EnemyProfile>,
        movement: Box<dyn Movement>,
        detection: Box<dyn Detection>,
    ) -> Self {
        let mut health = HealthTracker::new(id, profile.max_health);
        if let Some(resistances) = &profile.resistances {
            resistances.apply_to(&mut health);
        }
        Self {
            id,
            profile,
            health,
            movement,
            detection,
            state: AgentState::Idle,
            state_timer: 0.0,
            target: None,
            last_known_target_position: None,
            last_attack_time: None,
            last_lunge_time: None,
            lunge_ends_at: None,
            alerted: false,
            enabled: true,
            patrol_route: Vec::new(),
            next_waypoint: 0,
            pending_attacks: Vec::new(),
        }
    }

    /// Sets waypoints visited in order, wrapping, on each patrol leg.
    #[must_use]
    pub fn with_patrol_route(mut self, route: Vec<Vec3>) -> Self {
        self.patrol_route = route;
        self.next_waypoint = 0;
        self
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Entity id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Current behavior state.
    #[must_use]
    pub const fn state(&self) -> AgentState {
        self.state
    }

    /// Seconds spent in the current state.
    #[must_use]
    pub const fn state_timer(&self) -> f32 {
        self.state_timer
    }

    /// Shared archetype tuning.
    #[must_use]
    pub fn profile(&self) -> &EnemyProfile {
        &self.profile
    }

    /// Health tracker.
    #[must_use]
    pub const fn health(&self) -> &HealthTracker {
        &self.health
    }

    /// Mutable health tracker, for observers and difficulty scaling.
    ///
    /// Damage applied here is noticed at the start of the next tick; prefer
    /// [`take_damage`](Self::take_damage) for immediate death handling.
    pub fn health_mut(&mut self) -> &mut HealthTracker {
        &mut self.health
    }

    /// Current target.
    #[must_use]
    pub const fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Last position the target was seen or reported at.
    #[must_use]
    pub const fn last_known_target_position(&self) -> Option<Vec3> {
        self.last_known_target_position
    }

    /// True after the agent has been alerted and before it gives up.
    #[must_use]
    pub const fn is_alerted(&self) -> bool {
        self.alerted
    }

    /// World position reported by movement.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.movement.position()
    }

    /// Velocity reported by movement.
    #[must_use]
    pub fn velocity(&self) -> Vec3 {
        self.movement.velocity()
    }

    /// True while alive and not disabled by death.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && self.health.is_alive()
    }

    /// True if an attack issued at `now` would land.
    #[must_use]
    pub fn can_attack(&self, now: f32) -> bool {
        if !self.is_active() {
            return false;
        }
        let Some(distance) = self.target_distance() else {
            return false;
        };
        let cooled_down = self
            .last_attack_time
            .map_or(true, |last| now - last >= self.profile.attack_cooldown);
        cooled_down
            && self
                .profile
                .attack_style
                .in_strike_zone(distance, self.profile.attack_range)
    }

    /// True while a lunge started before `now` is still running.
    #[must_use]
    pub fn is_lunging(&self, now: f32) -> bool {
        self.lunge_ends_at.is_some_and(|end| now < end)
    }

    /// True if the profile retreats and health is at or below its threshold.
    #[must_use]
    pub fn should_retreat(&self) -> bool {
        self.profile.retreat_when_low_health
            && self.health.fraction() <= self.profile.retreat_health_threshold
    }

    // -------------------------------------------------------------------------
    // External signals
    // -------------------------------------------------------------------------

    /// Assigns or clears the target directly.
    pub fn set_target(&mut self, target: Option<EntityId>) {
        self.target = target;
    }

    /// Applies damage and handles death immediately. Returns the damage dealt.
    pub fn take_damage(&mut self, event: &DamageEvent) -> f32 {
        let dealt = self.health.take_damage(event);
        self.sync_death();
        dealt
    }

    /// Reports a disturbance at `position`.
    ///
    /// Idle and patrolling agents go investigate; busy agents only remember
    /// the position.
    pub fn alert(&mut self, position: Vec3) {
        if !self.is_active() {
            return;
        }
        self.alerted = true;
        self.last_known_target_position = Some(position);
        if matches!(self.state, AgentState::Idle | AgentState::Patrolling) {
            self.change_state(AgentState::Investigating);
        }
    }

    /// Freezes a live agent.
    pub fn stun(&mut self) {
        if self.is_active() {
            self.change_state(AgentState::Stunned);
        }
    }

    /// Ends a stun: back to chasing if a target is still held, else idle.
    pub fn recover(&mut self) {
        if self.state != AgentState::Stunned {
            return;
        }
        let next = if self.target.is_some() {
            AgentState::Chasing
        } else {
            AgentState::Idle
        };
        self.change_state(next);
    }

    /// Revives a dead agent with `amount` health and returns it to idle.
    pub fn revive(&mut self, amount: f32) -> bool {
        if !self.health.revive(amount) {
            return false;
        }
        self.enabled = true;
        self.movement.set_enabled(true);
        self.change_state(AgentState::Idle);
        true
    }

    /// Drains queued attacks in issue order.
    pub fn take_attack_requests(&mut self) -> Vec<AttackRequest> {
        std::mem::take(&mut self.pending_attacks)
    }

    // -------------------------------------------------------------------------
    // Tick
    // -------------------------------------------------------------------------

    /// Advances behavior by one step at simulation time `now`.
    pub fn tick(&mut self, now: f32, dt: f32) {
        self.sync_death();
        if !self.is_active() {
            return;
        }

        match self.state {
            AgentState::Idle => self.update_idle(),
            AgentState::Patrolling => self.update_patrolling(),
            AgentState::Chasing => self.update_chasing(),
            AgentState::Attacking => self.update_attacking(now),
            AgentState::Retreating => self.update_retreating(),
            AgentState::Investigating => self.update_investigating(),
            AgentState::Stunned => self.movement.stop(),
            AgentState::Dead => {}
        }

        self.movement.integrate(dt);
        self.state_timer += dt;
    }

    /// Strikes the target if [`can_attack`](Self::can_attack) holds.
    pub fn attack(&mut self, now: f32) -> bool {
        if !self.can_attack(now) {
            return false;
        }
        let (Some(target), Some(hit_point)) = (self.target, self.target_position()) else {
            return false;
        };
        self.last_attack_time = Some(now);
        self.pending_attacks.push(AttackRequest {
            attacker: self.id,
            target,
            damage: self.profile.attack_damage,
            damage_type: self.profile.damage_type,
            origin: self.movement.position(),
            hit_point,
        });
        true
    }

    fn update_idle(&mut self) {
        if self.acquire_target() {
            return;
        }
        if self.profile.can_patrol && self.state_timer > self.profile.patrol_wait_time {
            self.change_state(AgentState::Patrolling);
        }
    }

    fn update_patrolling(&mut self) {
        if self.acquire_target() {
            return;
        }
        if self.movement.has_reached_destination() {
            self.change_state(AgentState::Idle);
        }
    }

    fn update_chasing(&mut self) {
        let Some(target_position) = self.target_position() else {
            self.on_target_lost();
            return;
        };
        let distance = self.movement.position().distance(target_position);
        if distance > self.profile.lose_target_range {
            self.on_target_lost();
            return;
        }
        if self.should_retreat() {
            self.change_state(AgentState::Retreating);
            return;
        }
        let style = self.profile.attack_style;
        if style.in_strike_zone(distance, self.profile.attack_range) {
            self.change_state(AgentState::Attacking);
            return;
        }

        match style {
            AttackStyle::Ranged(band) if distance < band.min_range => {
                let position = self.movement.position();
                let away = (position - target_position).normalize_or_zero();
                self.movement
                    .move_towards(position + away * band.backoff_distance, self.profile.move_speed);
            }
            _ => self
                .movement
                .move_towards(target_position, self.profile.chase_speed),
        }
        self.movement
            .face_target(target_position, self.profile.rotation_speed);
        self.last_known_target_position = Some(target_position);
    }

    fn update_attacking(&mut self, now: f32) {
        let Some(target_position) = self.target_position() else {
            self.on_target_lost();
            return;
        };
        self.movement
            .face_target(target_position, self.profile.rotation_speed);

        let style = self.profile.attack_style;
        let distance = self.movement.position().distance(target_position);
        if !style.holds_attack(distance, self.profile.attack_range) {
            self.change_state(AgentState::Chasing);
            return;
        }
        if self.should_retreat() {
            self.change_state(AgentState::Retreating);
            return;
        }
        self.attack(now);

        if let Some(&lunge) = style.lunge() {
            if self.can_lunge(now, distance, lunge) {
                self.perform_lunge(now, target_position, lunge);
            }
        }
    }

    fn can_lunge(&self, now: f32, distance: f32, lunge: Lunge) -> bool {
        let cooled_down = self
            .last_lunge_time
            .map_or(true, |last| now - last >= lunge.cooldown);
        !self.is_lunging(now) && cooled_down && lunge.reaches(distance, self.profile.attack_range)
    }

    fn perform_lunge(&mut self, now: f32, target_position: Vec3, lunge: Lunge) {
        debug!(agent = %self.id, distance = lunge.distance, "lunge");
        self.last_lunge_time = Some(now);
        self.lunge_ends_at = Some(now + lunge.duration);
        self.movement.move_towards(target_position, lunge.speed);
    }

    fn update_retreating(&mut self) {
        if let Some(target_position) = self.target_position() {
            let position = self.movement.position();
            let away = (position - target_position).normalize_or_zero();
            self.movement
                .move_towards(position + away * RETREAT_DISTANCE, self.profile.chase_speed);
        }
        if !self.should_retreat() {
            self.change_state(AgentState::Chasing);
        }
    }

    fn update_investigating(&mut self) {
        if let Some(last_known) = self.last_known_target_position {
            if self.movement.position().distance(last_known) > INVESTIGATE_ARRIVAL_RADIUS {
                self.movement
                    .move_towards(last_known, self.profile.move_speed);
            }
        }
        if self.acquire_target() {
            return;
        }
        if self.state_timer > self.profile.investigation_time {
            self.alerted = false;
            self.change_state(AgentState::Idle);
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn target_position(&self) -> Option<Vec3> {
        self.target
            .and_then(|target| self.detection.target_position(target))
    }

    fn target_distance(&self) -> Option<f32> {
        self.target_position()
            .map(|p| self.movement.position().distance(p))
    }

    /// Picks up the closest detectable target and starts chasing it.
    fn acquire_target(&mut self) -> bool {
        match self.detection.find_closest_target() {
            Some(found) => {
                self.target = Some(found);
                self.change_state(AgentState::Chasing);
                true
            }
            None => false,
        }
    }

    fn on_target_lost(&mut self) {
        if matches!(self.state, AgentState::Chasing | AgentState::Attacking) {
            debug!(agent = %self.id, target = ?self.target, "target lost");
            self.change_state(AgentState::Investigating);
        }
    }

    fn sync_death(&mut self) {
        if self.health.is_dead() && self.state != AgentState::Dead {
            self.change_state(AgentState::Dead);
            self.movement.stop();
            self.movement.set_enabled(false);
            self.enabled = false;
            self.pending_attacks.clear();
        }
    }

    fn change_state(&mut self, next: AgentState) {
        if self.state == next {
            return;
        }
        debug!(agent = %self.id, from = %self.state, to = %next, "agent state change");
        self.on_state_exit(self.state);
        self.state = next;
        self.state_timer = 0.0;
        self.on_state_enter(next);
    }

    fn on_state_exit(&mut self, state: AgentState) {
        match state {
            // A lunge never carries over into another state
            AgentState::Attacking => {
                if self.lunge_ends_at.take().is_some() {
                    self.movement.stop();
                }
            }
            AgentState::Retreating => self.movement.stop(),
            AgentState::Stunned => self.movement.set_enabled(true),
            _ => {}
        }
    }

    fn on_state_enter(&mut self, state: AgentState) {
        match state {
            AgentState::Idle | AgentState::Attacking => self.movement.stop(),
            AgentState::Stunned => {
                self.movement.stop();
                self.movement.set_enabled(false);
            }
            AgentState::Chasing => self.alerted = true,
            AgentState::Patrolling => self.begin_patrol_leg(),
            _ => {}
        }
    }

    fn begin_patrol_leg(&mut self) {
        if self.patrol_route.is_empty() {
            return;
        }
        let waypoint = self.patrol_route[self.next_waypoint % self.patrol_route.len()];
        self.next_waypoint = (self.next_waypoint + 1) % self.patrol_route.len();
        self.movement
            .move_towards(waypoint, self.profile.move_speed);
    }
}
