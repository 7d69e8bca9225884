//! Run configuration and validation.
//!
//! A [`GauntletConfig`] bundles everything a [`Simulation`] needs: the enemy
//! profile catalog, wave generation rules, spawn points, the next-wave
//! trigger, and the master seed. Configs are plain `serde` records; every
//! field has a default, so a config file only lists what it changes.
//!
//! Validation runs once at load time. The per-tick simulation never returns
//! errors and instead clamps or skips.
//!
//! [`Simulation`]: crate::simulation::Simulation
//!
//! # Example
//!
//! ```
//! use gauntlet_core::config::GauntletConfig;
//!
//! let json = r#"{
//!     "seed": 7,
//!     "enemy_profiles": { "grunt": { "max_health": 50.0 } },
//!     "waves": {
//!         "available_enemy_types": [
//!             { "type_name": "Grunt", "prefab": "grunt", "profile": "grunt" }
//!         ]
//!     }
//! }"#;
//!
//! let config = GauntletConfig::from_json_str(json).unwrap();
//! assert_eq!(config.seed, 7);
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::EnemyProfile;
use crate::entity::ProfileId;
use crate::wave::WaveGenerationProfile;

// =============================================================================
// Errors
// =============================================================================

/// Why a configuration was rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The config text is not valid JSON for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// An enemy profile, or the player (reported as profile `player`), has
    /// no usable health.
    #[error("profile {profile}: max_health must be positive, got {value}")]
    InvalidMaxHealth {
        /// Offending profile.
        profile: ProfileId,
        /// Configured value.
        value: f32,
    },

    /// An enemy profile field is out of range.
    #[error("profile {profile}: {field} out of range, got {value}")]
    InvalidProfileValue {
        /// Offending profile.
        profile: ProfileId,
        /// Field name.
        field: &'static str,
        /// Configured value.
        value: f32,
    },

    /// No enemy type could ever be drawn.
    #[error("enemy pool is empty or every spawn weight is zero")]
    EmptyEnemyPool,

    /// A special-wave interval is zero.
    #[error("{field} must be at least 1")]
    ZeroInterval {
        /// Field name.
        field: &'static str,
    },

    /// The base enemy count exceeds the per-wave maximum.
    #[error("base_enemy_count {base} exceeds max_enemy_count_per_wave {max}")]
    EnemyCountRange {
        /// Configured base count.
        base: u32,
        /// Configured maximum.
        max: u32,
    },

    /// Spawn pacing is unusable.
    #[error("spawn interval must satisfy 0 < min ({min}) <= base ({base})")]
    InvalidSpawnInterval {
        /// Configured base interval.
        base: f32,
        /// Configured minimum interval.
        min: f32,
    },

    /// An enemy type names a profile missing from the catalog.
    #[error("enemy type {type_name} references unknown profile {profile}")]
    UnknownProfile {
        /// Enemy type.
        type_name: String,
        /// Missing profile.
        profile: ProfileId,
    },

    /// The simulation step is not a positive duration.
    #[error("time_step must be positive, got {0}")]
    InvalidTimeStep(f32),
}

// =============================================================================
// Config
// =============================================================================

/// How the next wave is requested once a wave completes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerConfig {
    /// Start automatically after `delay` seconds.
    Delayed {
        /// Seconds between completion and the next wave.
        delay: f32,
    },
    /// Wait for an explicit request.
    Manual,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self::Delayed { delay: 3.0 }
    }
}

/// The defended entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Starting and maximum health.
    pub max_health: f32,
    /// Fixed world position.
    pub position: Vec3,
    /// Chance that the player's hits are critical against enemies that
    /// accept critical hits.
    pub critical_hit_chance: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            position: Vec3::ZERO,
            critical_hit_chance: 0.1,
        }
    }
}

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GauntletConfig {
    /// Master seed for every random stream in the run.
    pub seed: u64,
    /// Fixed simulation step, seconds.
    pub time_step: f32,
    /// Upper bound on live enemies the arena will hold.
    pub arena_capacity: usize,
    /// Enemy archetypes by id.
    pub enemy_profiles: BTreeMap<ProfileId, EnemyProfile>,
    /// Wave generation rules.
    pub waves: WaveGenerationProfile,
    /// Where enemies may appear. Empty means the origin.
    pub spawn_points: Vec<Vec3>,
    /// Next-wave trigger.
    pub trigger: TriggerConfig,
    /// The defended entity.
    pub player: PlayerConfig,
}

impl Default for GauntletConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            time_step: 0.05,
            arena_capacity: 64,
            enemy_profiles: BTreeMap::new(),
            waves: WaveGenerationProfile::default(),
            spawn_points: Vec::new(),
            trigger: TriggerConfig::default(),
            player: PlayerConfig::default(),
        }
    }
}

impl GauntletConfig {
    /// Parses and validates a JSON config.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed input, otherwise whatever
    /// [`validate`](Self::validate) reports.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a JSON config file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Serializes the config as pretty JSON.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reports the first problem that would stop a run.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] validation variant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.time_step > 0.0) || !self.time_step.is_finite() {
            return Err(ConfigError::InvalidTimeStep(self.time_step));
        }
        if !(self.player.max_health > 0.0) {
            return Err(ConfigError::InvalidMaxHealth {
                profile: ProfileId::new("player"),
                value: self.player.max_health,
            });
        }
        for (id, profile) in &self.enemy_profiles {
            profile.validate(id)?;
        }
        self.waves.validate()?;
        if let Some(missing) = self
            .waves
            .available_enemy_types
            .iter()
            .find(|t| !self.enemy_profiles.contains_key(&t.profile))
        {
            return Err(ConfigError::UnknownProfile {
                type_name: missing.type_name.clone(),
                profile: missing.profile.clone(),
            });
        }
        Ok(())
    }

    /// Looks up an enemy profile.
    #[must_use]
    pub fn profile(&self, id: &ProfileId) -> Option<&EnemyProfile> {
        self.enemy_profiles.get(id)
    }
}
