//! Capabilities an agent consumes but does not implement.
//!
//! Pathfinding, steering, and perception live outside the core. An
//! [`EnemyAgent`](super::EnemyAgent) only talks to them through these two
//! traits. [`super::kinematic`] provides simple in-crate implementations for
//! headless runs and tests.

use glam::Vec3;

use crate::entity::EntityId;

/// Locomotion for one agent.
pub trait Movement {
    /// Current world position.
    fn position(&self) -> Vec3;

    /// Starts or retargets movement toward `destination` at `speed`.
    fn move_towards(&mut self, destination: Vec3, speed: f32);

    /// Halts movement and clears the destination.
    fn stop(&mut self);

    /// Turns toward `target` at up to `rotation_speed`.
    fn face_target(&mut self, target: Vec3, rotation_speed: f32);

    /// True when there is no outstanding destination.
    fn has_reached_destination(&self) -> bool;

    /// Current velocity.
    fn velocity(&self) -> Vec3;

    /// Advances self-integrated movers by `dt` seconds. Externally driven
    /// movers ignore it.
    fn integrate(&mut self, _dt: f32) {}

    /// Enables or disables the mover. Disabled movers must not move.
    fn set_enabled(&mut self, _enabled: bool) {}
}

/// Perception for one agent.
pub trait Detection {
    /// Closest entity this agent can currently detect, if any.
    fn find_closest_target(&self) -> Option<EntityId>;

    /// True if `target` is in range, in view, and visible.
    fn can_detect(&self, target: EntityId) -> bool;

    /// True if nothing blocks the straight line to `position`.
    fn has_line_of_sight(&self, position: Vec3) -> bool;

    /// Resolves an entity reference to a position. `None` means the
    /// reference no longer points at anything.
    fn target_position(&self, target: EntityId) -> Option<Vec3>;
}
