//! # Gauntlet Core
//!
//! Combat and wave-survival simulation core for Gauntlet.
//!
//! This crate provides a deterministic, engine-independent model of an arena
//! in which waves of hostile agents are generated, spawned, and fought.
//!
//! ## Architecture
//!
//! - **Combat**: health trackers with an ordered damage-modifier pipeline
//!   and observer notifications
//! - **Agents**: enemy state machines over pluggable movement and detection
//! - **Waves**: procedural composition, lifecycle tracking, and spawn pacing
//! - **Simulation**: a fixed-step driver tying the above to a defended player
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gauntlet_core::config::GauntletConfig;
//! use gauntlet_core::simulation::Simulation;
//!
//! let config = GauntletConfig::from_json_file("gauntlet.json")?;
//! let mut sim = Simulation::new(config)?;
//! while !sim.is_over() {
//!     sim.step();
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

// Core modules
pub mod agent;
pub mod arena;
pub mod combat;
pub mod config;
pub mod entity;
pub mod simulation;
pub mod wave;

// Test modules
#[cfg(test)]
mod tests;

pub use arena::Arena;
pub use config::{ConfigError, GauntletConfig};
pub use simulation::Simulation;
