//! How an archetype closes in and strikes.
//!
//! [`AttackStyle`] is a closed set of tagged variants. The agent's chase and
//! attack states dispatch on it instead of on a type hierarchy:
//!
//! - **Melee** closes to `attack_range` and may lunge at a target that
//!   drifts just out of reach.
//! - **Ranged** holds a `min_range..=max_range` band, backs off when the
//!   target gets too close, and only fires from inside the band.

use serde::{Deserialize, Serialize};

use super::ATTACK_RANGE_HYSTERESIS;

/// Attack behavior of an archetype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttackStyle {
    /// Strike at `attack_range`.
    Melee {
        /// Burst toward targets just outside `attack_range`.
        #[serde(default)]
        lunge: Option<Lunge>,
    },
    /// Strike from a distance band.
    Ranged(RangedBand),
}

impl Default for AttackStyle {
    fn default() -> Self {
        Self::Melee { lunge: None }
    }
}

impl AttackStyle {
    /// True if a target `distance` away can be struck.
    #[must_use]
    pub fn in_strike_zone(&self, distance: f32, attack_range: f32) -> bool {
        match self {
            Self::Melee { .. } => distance <= attack_range,
            Self::Ranged(band) => band.contains(distance),
        }
    }

    /// True if an attacker should stay in the attacking state against a
    /// target `distance` away.
    #[must_use]
    pub fn holds_attack(&self, distance: f32, attack_range: f32) -> bool {
        match self {
            Self::Melee { .. } => distance <= attack_range + ATTACK_RANGE_HYSTERESIS,
            Self::Ranged(band) => band.contains(distance),
        }
    }

    /// Lunge tuning, for melee styles that lunge.
    #[must_use]
    pub const fn lunge(&self) -> Option<&Lunge> {
        match self {
            Self::Melee { lunge } => lunge.as_ref(),
            Self::Ranged(_) => None,
        }
    }

    /// First field that is out of range, with its value.
    pub(crate) fn invalid_field(&self) -> Option<(&'static str, f32)> {
        match self {
            Self::Melee { lunge: None } => None,
            Self::Melee { lunge: Some(lunge) } => [
                ("lunge.distance", lunge.distance),
                ("lunge.cooldown", lunge.cooldown),
                ("lunge.speed", lunge.speed),
                ("lunge.duration", lunge.duration),
            ]
            .into_iter()
            .find(|(_, v)| !(*v >= 0.0)),
            Self::Ranged(band) => {
                if !(band.min_range >= 0.0) {
                    Some(("ranged.min_range", band.min_range))
                } else if !(band.max_range >= band.min_range) {
                    Some(("ranged.max_range", band.max_range))
                } else if !(band.backoff_distance >= 0.0) {
                    Some(("ranged.backoff_distance", band.backoff_distance))
                } else {
                    None
                }
            }
        }
    }
}

/// Melee burst toward a target just out of reach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lunge {
    /// Farthest target distance that triggers a lunge.
    pub distance: f32,
    /// Seconds between lunges.
    pub cooldown: f32,
    /// Movement speed during the lunge.
    pub speed: f32,
    /// Seconds a lunge lasts.
    pub duration: f32,
}

impl Default for Lunge {
    fn default() -> Self {
        Self {
            distance: 3.0,
            cooldown: 5.0,
            speed: 10.0,
            duration: 0.5,
        }
    }
}

impl Lunge {
    /// True if a target `distance` away is out of reach but lunge-able.
    #[must_use]
    pub fn reaches(&self, distance: f32, attack_range: f32) -> bool {
        distance > attack_range && distance <= self.distance
    }
}

/// Distance band a ranged attacker holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangedBand {
    /// Closer than this the attacker backs off.
    pub min_range: f32,
    /// Farther than this the attacker closes in.
    pub max_range: f32,
    /// Distance of each back-off step.
    pub backoff_distance: f32,
}

impl Default for RangedBand {
    fn default() -> Self {
        Self {
            min_range: 4.0,
            max_range: 15.0,
            backoff_distance: 2.0,
        }
    }
}

impl RangedBand {
    /// True if `distance` lies inside the band.
    #[must_use]
    pub fn contains(&self, distance: f32) -> bool {
        (self.min_range..=self.max_range).contains(&distance)
    }
}
