//! Shared per-archetype enemy configuration.

use serde::{Deserialize, Serialize};

use super::AttackStyle;
use crate::combat::{DamageType, ResistanceProfile};
use crate::config::ConfigError;
use crate::entity::ProfileId;

/// Immutable tuning for one enemy archetype.
///
/// Loaded from configuration and shared by every agent of the archetype
/// through an `Arc`. Missing fields take the defaults shown on
/// [`EnemyProfile::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyProfile {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,

    /// Health every agent of this archetype starts with.
    pub max_health: f32,
    /// Mitigation installed on each agent's tracker.
    pub resistances: Option<ResistanceProfile>,

    /// Speed while patrolling and investigating.
    pub move_speed: f32,
    /// Speed while chasing and retreating.
    pub chase_speed: f32,
    /// Turn rate, radians per second.
    pub rotation_speed: f32,
    /// Arrival radius handed to movement.
    pub stopping_distance: f32,

    /// Radius within which targets are noticed.
    pub detection_range: f32,
    /// Beyond this distance a chased target is lost.
    pub lose_target_range: f32,
    /// Full view cone, degrees.
    pub field_of_view_angle: f32,

    /// Distance at which attacks connect.
    pub attack_range: f32,
    /// Seconds between attacks.
    pub attack_cooldown: f32,
    /// Damage per attack.
    pub attack_damage: f32,
    /// Damage type of attacks.
    pub damage_type: DamageType,
    /// Melee or ranged engagement.
    pub attack_style: AttackStyle,

    /// Whether idle agents wander off to patrol.
    pub can_patrol: bool,
    /// Seconds idle before patrolling.
    pub patrol_wait_time: f32,
    /// Seconds spent investigating before giving up.
    pub investigation_time: f32,
    /// Whether low health triggers a retreat.
    pub retreat_when_low_health: bool,
    /// Health fraction at or below which the agent retreats, in `[0, 1]`.
    pub retreat_health_threshold: f32,
}

impl Default for EnemyProfile {
    fn default() -> Self {
        Self {
            name: String::from("Enemy"),
            description: String::new(),
            max_health: 100.0,
            resistances: None,
            move_speed: 3.0,
            chase_speed: 5.0,
            rotation_speed: 5.0,
            stopping_distance: 2.0,
            detection_range: 10.0,
            lose_target_range: 15.0,
            field_of_view_angle: 120.0,
            attack_range: 2.0,
            attack_cooldown: 1.5,
            attack_damage: 10.0,
            damage_type: DamageType::Slash,
            attack_style: AttackStyle::default(),
            can_patrol: true,
            patrol_wait_time: 2.0,
            investigation_time: 5.0,
            retreat_when_low_health: false,
            retreat_health_threshold: 0.2,
        }
    }
}

impl EnemyProfile {
    /// Checks the profile for values the simulation cannot run with.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidMaxHealth`] if `max_health <= 0`
    /// - [`ConfigError::InvalidProfileValue`] for negative speeds, ranges,
    ///   or timers, for a retreat threshold outside `[0, 1]`, and for
    ///   negative lunge tuning or an inverted ranged band
    pub fn validate(&self, id: &ProfileId) -> Result<(), ConfigError> {
        if !(self.max_health > 0.0) {
            return Err(ConfigError::InvalidMaxHealth {
                profile: id.clone(),
                value: self.max_health,
            });
        }

        let non_negative = [
            ("move_speed", self.move_speed),
            ("chase_speed", self.chase_speed),
            ("rotation_speed", self.rotation_speed),
            ("stopping_distance", self.stopping_distance),
            ("detection_range", self.detection_range),
            ("lose_target_range", self.lose_target_range),
            ("field_of_view_angle", self.field_of_view_angle),
            ("attack_range", self.attack_range),
            ("attack_cooldown", self.attack_cooldown),
            ("attack_damage", self.attack_damage),
            ("patrol_wait_time", self.patrol_wait_time),
            ("investigation_time", self.investigation_time),
        ];
        if let Some((field, value)) = non_negative.into_iter().find(|(_, v)| !(*v >= 0.0)) {
            return Err(ConfigError::InvalidProfileValue {
                profile: id.clone(),
                field,
                value,
            });
        }

        if !(0.0..=1.0).contains(&self.retreat_health_threshold) {
            return Err(ConfigError::InvalidProfileValue {
                profile: id.clone(),
                field: "retreat_health_threshold",
                value: self.retreat_health_threshold,
            });
        }

        if let Some((field, value)) = self.attack_style.invalid_field() {
            return Err(ConfigError::InvalidProfileValue {
                profile: id.clone(),
                field,
                value,
            });
        }

        if let Some(resistances) = &self.resistances {
            if let Some((_, value)) = resistances
                .resistances
                .iter()
                .find(|(_, m)| !(0.0..=ResistanceProfile::MAX_MULTIPLIER).contains(*m))
            {
                return Err(ConfigError::InvalidProfileValue {
                    profile: id.clone(),
                    field: "resistances",
                    value: *value,
                });
            }
        }

        Ok(())
    }
}
