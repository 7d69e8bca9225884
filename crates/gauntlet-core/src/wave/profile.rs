//! Declarative wave generation tuning.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::curve::Curve;
use crate::config::ConfigError;
use crate::entity::{PrefabId, ProfileId};

/// Spawn-weighting class of an enemy type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum EnemyTier {
    /// Weighted by the basic weight curve.
    #[default]
    Basic,
    /// Weighted by the advanced weight curve.
    Advanced,
    /// Boosted on elite waves, penalized otherwise.
    Elite,
    /// Never drawn; placed only in the reserved boss slot.
    Boss,
}

impl fmt::Display for EnemyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One entry of the enemy pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTypeDefinition {
    /// Display name.
    pub type_name: String,
    /// What the factory instantiates.
    pub prefab: PrefabId,
    /// Behavior and health tuning for spawned agents.
    pub profile: ProfileId,
    /// Weight before tier and curve scaling.
    pub base_spawn_weight: f32,
    /// First wave this type may appear in.
    pub min_wave_to_appear: u32,
    /// Weighting class.
    pub tier: EnemyTier,
}

impl Default for EnemyTypeDefinition {
    fn default() -> Self {
        Self {
            type_name: String::new(),
            prefab: PrefabId::default(),
            profile: ProfileId::default(),
            base_spawn_weight: 1.0,
            min_wave_to_appear: 1,
            tier: EnemyTier::Basic,
        }
    }
}

impl EnemyTypeDefinition {
    /// Creates a definition with default weight that appears from wave 1.
    #[must_use]
    pub fn new(type_name: &str, prefab: &str, profile: &str, tier: EnemyTier) -> Self {
        Self {
            type_name: type_name.to_owned(),
            prefab: PrefabId::new(prefab),
            profile: ProfileId::new(profile),
            tier,
            ..Self::default()
        }
    }

    /// Sets the base spawn weight.
    #[must_use]
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.base_spawn_weight = weight;
        self
    }

    /// Sets the first wave this type may appear in.
    #[must_use]
    pub fn from_wave(mut self, wave: u32) -> Self {
        self.min_wave_to_appear = wave;
        self
    }

    /// True if the type may appear in `wave_number`.
    #[must_use]
    pub const fn available_in(&self, wave_number: u32) -> bool {
        self.min_wave_to_appear <= wave_number
    }
}

/// Rules the composition engine turns into a wave.
///
/// Curves are indexed by wave number, except the count growth curve which
/// takes `wave_number / 100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveGenerationProfile {
    /// Enemy pool.
    pub available_enemy_types: Vec<EnemyTypeDefinition>,

    /// Enemies in the first wave, and the lower bound for every wave.
    pub base_enemy_count: u32,
    /// Upper bound on enemies per wave.
    pub max_enemy_count_per_wave: u32,
    /// Live enemies allowed at once.
    pub max_simultaneous_enemies: u32,
    /// Count growth over `wave_number / 100`, scaled by 10.
    pub enemy_count_growth_curve: Curve,

    /// Weight multiplier for basic types.
    pub basic_enemy_weight_curve: Curve,
    /// Weight multiplier for advanced types.
    pub advanced_enemy_weight_curve: Curve,

    /// Seconds between spawns before speed scaling.
    pub base_spawn_interval: f32,
    /// Divides the base interval.
    pub spawn_speed_curve: Curve,
    /// Floor for the spawn interval.
    pub min_spawn_interval: f32,

    /// Difficulty of wave 0.
    pub base_difficulty_multiplier: f32,
    /// Linear difficulty growth per wave.
    pub difficulty_growth_rate: f32,
    /// Extra difficulty scaling per wave.
    pub difficulty_scaling_curve: Curve,

    /// Every n-th wave is elite.
    pub elite_wave_interval: u32,
    /// Additive difficulty on elite waves, doubled on boss waves.
    pub elite_wave_difficulty_bonus: f32,
    /// Every n-th wave is a boss wave.
    pub boss_wave_interval: u32,
}

impl Default for WaveGenerationProfile {
    fn default() -> Self {
        Self {
            available_enemy_types: Vec::new(),
            base_enemy_count: 1,
            max_enemy_count_per_wave: 15,
            max_simultaneous_enemies: 3,
            enemy_count_growth_curve: Curve::linear(0.0, 0.0, 1.0, 1.0),
            basic_enemy_weight_curve: Curve::constant(1.0),
            advanced_enemy_weight_curve: Curve::constant(1.0),
            base_spawn_interval: 3.0,
            spawn_speed_curve: Curve::constant(1.0),
            min_spawn_interval: 1.0,
            base_difficulty_multiplier: 1.0,
            difficulty_growth_rate: 0.1,
            difficulty_scaling_curve: Curve::constant(1.0),
            elite_wave_interval: 5,
            elite_wave_difficulty_bonus: 0.5,
            boss_wave_interval: 10,
        }
    }
}

impl WaveGenerationProfile {
    /// Types whose first wave is at or before `wave_number`, in pool order.
    pub fn available_types(&self, wave_number: u32) -> impl Iterator<Item = &EnemyTypeDefinition> {
        self.available_enemy_types
            .iter()
            .filter(move |t| t.available_in(wave_number))
    }

    /// Checks the profile for values no wave could be generated from.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::EmptyEnemyPool`] if the pool is empty or no type has
    ///   a positive base weight
    /// - [`ConfigError::ZeroInterval`] if the elite or boss interval is 0
    /// - [`ConfigError::EnemyCountRange`] if the base count exceeds the maximum
    /// - [`ConfigError::InvalidSpawnInterval`] for a non-positive minimum
    ///   interval or a base interval below it
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self
            .available_enemy_types
            .iter()
            .any(|t| t.base_spawn_weight > 0.0)
        {
            return Err(ConfigError::EmptyEnemyPool);
        }
        if self.elite_wave_interval == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "elite_wave_interval",
            });
        }
        if self.boss_wave_interval == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "boss_wave_interval",
            });
        }
        if self.base_enemy_count > self.max_enemy_count_per_wave {
            return Err(ConfigError::EnemyCountRange {
                base: self.base_enemy_count,
                max: self.max_enemy_count_per_wave,
            });
        }
        if !(self.min_spawn_interval > 0.0) || !(self.base_spawn_interval >= self.min_spawn_interval) {
            return Err(ConfigError::InvalidSpawnInterval {
                base: self.base_spawn_interval,
                min: self.min_spawn_interval,
            });
        }
        Ok(())
    }
}
