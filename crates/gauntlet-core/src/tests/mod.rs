//! Crate-level tests and shared test fixtures.
//!
//! - **Determinism tests**: the same seed produces identical runs
//! - **Integration tests**: full runs through the public simulation API
//! - **Helpers**: scripted agent capabilities, recording factories and
//!   listeners, and ready-made profiles and configs
//!
//! # Test Structure
//!
//! - `determinism.rs`: seed reproducibility of waves and whole runs
//! - `integration.rs`: end-to-end wave survival scenarios
//! - `helpers.rs`: fixtures used by unit tests across the crate

mod determinism;
mod helpers;
mod integration;

// Re-export for convenience
pub use helpers::*;
