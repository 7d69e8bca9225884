//! Procedural wave composition.
//!
//! [`StandardWaveGenerator`] turns a wave number and a
//! [`WaveGenerationProfile`] into a [`GeneratedWaveData`]: the wave type, the
//! roster, spawn pacing, and the difficulty multiplier applied to spawned
//! enemies.
//!
//! # Determinism
//!
//! Generation draws only from the random source it is handed. [`wave_rng`]
//! derives a per-wave stream from a master seed, so [`preview_wave`] with the
//! same seed reproduces exactly what a [`WaveOrchestrator`] seeded the same
//! way will spawn for that wave.
//!
//! [`WaveOrchestrator`]: super::WaveOrchestrator
//!
//! # Example
//!
//! ```
//! use gauntlet_core::wave::{preview_wave, EnemyTier, EnemyTypeDefinition, WaveGenerationProfile, WaveType};
//!
//! let profile = WaveGenerationProfile {
//!     available_enemy_types: vec![
//!         EnemyTypeDefinition::new("Grunt", "grunt", "grunt", EnemyTier::Basic),
//!         EnemyTypeDefinition::new("Titan", "titan", "titan", EnemyTier::Boss),
//!     ],
//!     ..WaveGenerationProfile::default()
//! };
//!
//! let wave = preview_wave(10, &profile, 42);
//! assert_eq!(wave.wave_type, WaveType::Boss);
//! assert_eq!(wave.total_enemy_count(), 2);
//! assert_eq!(wave.enemies_to_spawn[0].tier, EnemyTier::Boss);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::RangeInclusive;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::profile::{EnemyTier, EnemyTypeDefinition, WaveGenerationProfile};
use crate::entity::{PrefabId, ProfileId};

// =============================================================================
// Generated Data
// =============================================================================

/// Special-wave classification.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WaveType {
    /// Regular wave.
    #[default]
    Normal,
    /// Elite types weighted up, bonus difficulty.
    Elite,
    /// One reserved boss, double bonus difficulty.
    Boss,
}

impl fmt::Display for WaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One roster line: `count` units of a prefab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnEntry {
    /// What the factory instantiates.
    pub prefab: PrefabId,
    /// Profile for spawned agents.
    pub profile: ProfileId,
    /// Units of this prefab in the wave.
    pub count: u32,
    /// Tier of the type that produced the entry.
    pub tier: EnemyTier,
}

impl SpawnEntry {
    fn single(definition: &EnemyTypeDefinition) -> Self {
        Self {
            prefab: definition.prefab.clone(),
            profile: definition.profile.clone(),
            count: 1,
            tier: definition.tier,
        }
    }
}

/// Everything needed to run one wave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedWaveData {
    /// 1-based wave number.
    pub wave_number: u32,
    /// Roster, one entry per distinct prefab.
    pub enemies_to_spawn: Vec<SpawnEntry>,
    /// Live enemies allowed at once.
    pub max_simultaneous: u32,
    /// Seconds between spawns.
    pub spawn_interval: f32,
    /// Scale applied to spawned enemies.
    pub difficulty_multiplier: f32,
    /// Special-wave classification.
    pub wave_type: WaveType,
}

impl GeneratedWaveData {
    /// Sum of all roster counts.
    #[must_use]
    pub fn total_enemy_count(&self) -> u32 {
        self.enemies_to_spawn.iter().map(|e| e.count).sum()
    }

    /// Roster count for one prefab, 0 if absent.
    #[must_use]
    pub fn count_of(&self, prefab: &PrefabId) -> u32 {
        self.enemies_to_spawn
            .iter()
            .find(|e| &e.prefab == prefab)
            .map_or(0, |e| e.count)
    }
}

// =============================================================================
// Generator
// =============================================================================

/// Produces waves from a profile.
///
/// Implementations must be pure apart from `rng`.
pub trait WaveGenerator {
    /// Builds wave `wave_number`.
    fn generate_wave(
        &self,
        wave_number: u32,
        profile: &WaveGenerationProfile,
        rng: &mut dyn RngCore,
    ) -> GeneratedWaveData;

    /// Builds wave `wave_number` from the stream [`wave_rng`] derives for it.
    fn preview_wave(
        &self,
        wave_number: u32,
        profile: &WaveGenerationProfile,
        seed: u64,
    ) -> GeneratedWaveData {
        self.generate_wave(wave_number, profile, &mut wave_rng(seed, wave_number))
    }
}

/// Curve-driven generator with elite and boss waves.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardWaveGenerator;

impl StandardWaveGenerator {
    /// Creates the generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Boss when divisible by the boss interval, else Elite when divisible by
    /// the elite interval. A zero interval never matches.
    #[must_use]
    pub fn wave_type(wave_number: u32, profile: &WaveGenerationProfile) -> WaveType {
        if wave_number.checked_rem(profile.boss_wave_interval) == Some(0) {
            WaveType::Boss
        } else if wave_number.checked_rem(profile.elite_wave_interval) == Some(0) {
            WaveType::Elite
        } else {
            WaveType::Normal
        }
    }

    /// `round(base + growth(n / 100) * 10)` bounded by the profile's range.
    ///
    /// Halves round to even.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn total_enemy_count(wave_number: u32, profile: &WaveGenerationProfile) -> u32 {
        let growth = profile
            .enemy_count_growth_curve
            .evaluate(wave_number as f32 / 100.0);
        let raw = (profile.base_enemy_count as f32 + growth * 10.0).round_ties_even();
        let count = if raw.is_finite() && raw > 0.0 {
            raw as u32
        } else {
            0
        };
        count
            .max(profile.base_enemy_count)
            .min(profile.max_enemy_count_per_wave)
    }

    /// `base * (1 + n * growth) * scaling(n)`, plus the elite bonus on elite
    /// waves or twice the bonus on boss waves.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn difficulty_multiplier(
        wave_number: u32,
        wave_type: WaveType,
        profile: &WaveGenerationProfile,
    ) -> f32 {
        let n = wave_number as f32;
        let scaled = profile.base_difficulty_multiplier
            * (1.0 + n * profile.difficulty_growth_rate)
            * profile.difficulty_scaling_curve.evaluate(n);
        match wave_type {
            WaveType::Normal => scaled,
            WaveType::Elite => scaled + profile.elite_wave_difficulty_bonus,
            WaveType::Boss => scaled + profile.elite_wave_difficulty_bonus * 2.0,
        }
    }

    /// `base / speed(n)`, floored at the minimum interval.
    ///
    /// A non-positive speed falls back to the base interval.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn spawn_interval(wave_number: u32, profile: &WaveGenerationProfile) -> f32 {
        let speed = profile.spawn_speed_curve.evaluate(wave_number as f32);
        let interval = if speed > 0.0 {
            profile.base_spawn_interval / speed
        } else {
            warn!(wave = wave_number, speed, "non-positive spawn speed, using base interval");
            profile.base_spawn_interval
        };
        interval.max(profile.min_spawn_interval)
    }

    /// Draw weight of one type for a wave. Boss tier is always 0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn spawn_weight(
        definition: &EnemyTypeDefinition,
        wave_number: u32,
        wave_type: WaveType,
        profile: &WaveGenerationProfile,
    ) -> f32 {
        let n = wave_number as f32;
        let base = definition.base_spawn_weight;
        match definition.tier {
            EnemyTier::Basic => base * profile.basic_enemy_weight_curve.evaluate(n),
            EnemyTier::Advanced => base * profile.advanced_enemy_weight_curve.evaluate(n),
            EnemyTier::Elite if wave_type == WaveType::Elite => base * 2.0,
            EnemyTier::Elite => base * 0.5,
            EnemyTier::Boss => 0.0,
        }
    }

    fn compose(
        wave_number: u32,
        wave_type: WaveType,
        total: u32,
        profile: &WaveGenerationProfile,
        rng: &mut dyn RngCore,
    ) -> Vec<SpawnEntry> {
        let available: Vec<&EnemyTypeDefinition> = profile.available_types(wave_number).collect();
        if available.is_empty() {
            warn!(wave = wave_number, "no enemy types available");
            return Vec::new();
        }

        let mut roster: Vec<SpawnEntry> = Vec::new();
        let mut remaining = total;

        if wave_type == WaveType::Boss {
            let bosses: Vec<&EnemyTypeDefinition> = available
                .iter()
                .copied()
                .filter(|t| t.tier == EnemyTier::Boss)
                .collect();
            let boss = if bosses.is_empty() {
                warn!(wave = wave_number, "no boss-tier type available, reserving any type");
                available.choose(rng)
            } else {
                bosses.choose(rng)
            };
            if let Some(boss) = boss {
                roster.push(SpawnEntry::single(boss));
                remaining = remaining.saturating_sub(1);
            }
        }

        let weighted: Vec<(&EnemyTypeDefinition, f32)> = available
            .iter()
            .map(|t| (*t, Self::spawn_weight(t, wave_number, wave_type, profile)))
            .filter(|(_, w)| *w > 0.0)
            .collect();
        let total_weight: f32 = weighted.iter().map(|(_, w)| w).sum();
        if remaining > 0 && !(total_weight > 0.0 && total_weight.is_finite()) {
            warn!(wave = wave_number, remaining, "no positive spawn weights, roster cut short");
            return roster;
        }

        for _ in 0..remaining {
            let roll = rng.gen_range(0.0..total_weight);
            let picked = Self::pick(&weighted, roll);
            match roster.iter_mut().find(|e| e.prefab == picked.prefab) {
                Some(entry) => entry.count += 1,
                None => roster.push(SpawnEntry::single(picked)),
            }
        }
        roster
    }

    /// First entry whose cumulative weight reaches `roll`, else the last.
    fn pick<'a>(weighted: &[(&'a EnemyTypeDefinition, f32)], roll: f32) -> &'a EnemyTypeDefinition {
        let mut cumulative = 0.0_f32;
        for &(definition, weight) in weighted {
            cumulative += weight;
            if cumulative >= roll {
                return definition;
            }
        }
        weighted[weighted.len() - 1].0
    }
}

impl WaveGenerator for StandardWaveGenerator {
    fn generate_wave(
        &self,
        wave_number: u32,
        profile: &WaveGenerationProfile,
        rng: &mut dyn RngCore,
    ) -> GeneratedWaveData {
        let wave_type = Self::wave_type(wave_number, profile);
        let total = Self::total_enemy_count(wave_number, profile);
        GeneratedWaveData {
            wave_number,
            enemies_to_spawn: Self::compose(wave_number, wave_type, total, profile, rng),
            max_simultaneous: profile.max_simultaneous_enemies,
            spawn_interval: Self::spawn_interval(wave_number, profile),
            difficulty_multiplier: Self::difficulty_multiplier(wave_number, wave_type, profile),
            wave_type,
        }
    }
}

// =============================================================================
// Seeding & Preview
// =============================================================================

/// Random stream for one wave, derived from `(seed, wave_number)`.
#[must_use]
pub fn wave_rng(seed: u64, wave_number: u32) -> ChaCha8Rng {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    wave_number.hash(&mut hasher);
    ChaCha8Rng::seed_from_u64(hasher.finish())
}

/// Generates wave `wave_number` exactly as a run seeded with `seed` would.
#[must_use]
pub fn preview_wave(wave_number: u32, profile: &WaveGenerationProfile, seed: u64) -> GeneratedWaveData {
    StandardWaveGenerator.preview_wave(wave_number, profile, seed)
}

/// Previews a range of waves in parallel, returned in wave order.
#[must_use]
pub fn preview_waves(
    waves: RangeInclusive<u32>,
    profile: &WaveGenerationProfile,
    seed: u64,
) -> Vec<GeneratedWaveData> {
    let mut previews: Vec<GeneratedWaveData> = waves
        .into_par_iter()
        .map(|n| preview_wave(n, profile, seed))
        .collect();
    previews.sort_by_key(|w| w.wave_number);
    previews
}

// =============================================================================
// Tests
// =============================================================================
