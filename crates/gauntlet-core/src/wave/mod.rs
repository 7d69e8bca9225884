//! Procedural waves: composition, lifecycle, and orchestration.
//!
//! - [`composer`] turns a wave number and a [`WaveGenerationProfile`] into a
//!   [`GeneratedWaveData`]
//! - [`state`] tracks one wave from spawning to the last death
//! - [`orchestrator`] paces spawns through an [`EnemyFactory`] and starts the
//!   next wave when its [`WaveTrigger`] fires
//!
//! # Example
//!
//! ```
//! use gauntlet_core::wave::{
//!     DelayedTrigger, EnemyTier, EnemyTypeDefinition, WaveGenerationProfile, WaveOrchestrator,
//!     WaveState,
//! };
//!
//! let profile = WaveGenerationProfile {
//!     available_enemy_types: vec![EnemyTypeDefinition::new("Grunt", "grunt", "grunt", EnemyTier::Basic)],
//!     ..WaveGenerationProfile::default()
//! };
//!
//! let mut waves = WaveOrchestrator::new(profile, DelayedTrigger::new(3.0), 42);
//! waves.begin(0.0);
//! assert_eq!(waves.current_wave(), 1);
//! assert_eq!(waves.wave_state(), WaveState::Spawning);
//! ```

pub mod composer;
pub mod curve;
pub mod orchestrator;
pub mod profile;
pub mod state;
pub mod trigger;

pub use composer::{
    preview_wave, preview_waves, wave_rng, GeneratedWaveData, SpawnEntry, StandardWaveGenerator,
    WaveGenerator, WaveType,
};
pub use curve::{Curve, Keyframe};
pub use orchestrator::{
    DifficultyModifier, EnemyFactory, HealthDifficultyModifier, Spawned, WaveOrchestrator,
};
pub use profile::{EnemyTier, EnemyTypeDefinition, WaveGenerationProfile};
pub use state::{WaveListener, WaveState, WaveStateManager};
pub use trigger::{DelayedTrigger, ManualTrigger, WaveTrigger};
