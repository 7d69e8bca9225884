//! Built-in movement and detection for headless simulation.
//!
//! - [`KinematicMover`]: straight-line mover integrated on the XZ plane
//! - [`RadiusSensor`]: range + field-of-view + occluder line-of-sight check
//! - [`TargetBoard`]: positions of everything agents may target
//!
//! A mover and a sensor attached to the same agent share a [`Pose`] cell so
//! the sensor always looks out from where the mover currently is.
//!
//! # Example
//!
//! ```
//! use std::cell::{Cell, RefCell};
//! use std::rc::Rc;
//! use glam::Vec3;
//! use gauntlet_core::agent::{Detection, KinematicMover, Movement, Pose, RadiusSensor, TargetBoard};
//! use gauntlet_core::entity::EntityId;
//!
//! let board = Rc::new(RefCell::new(TargetBoard::new()));
//! board.borrow_mut().set_position(EntityId::new(100), Vec3::new(0.0, 0.0, 5.0));
//!
//! let pose = Rc::new(Cell::new(Pose::at(Vec3::ZERO)));
//! let mut mover = KinematicMover::new(Rc::clone(&pose), 0.5);
//! let sensor = RadiusSensor::new(pose, board, 10.0, 120.0);
//!
//! assert_eq!(sensor.find_closest_target(), Some(EntityId::new(100)));
//!
//! mover.move_towards(Vec3::new(0.0, 0.0, 5.0), 2.0);
//! mover.integrate(1.0);
//! assert!((mover.position().z - 2.0).abs() < 0.0001);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{Detection, Movement};
use crate::entity::EntityId;

// =============================================================================
// Pose
// =============================================================================

/// Position and facing shared between a mover and a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World position.
    pub position: Vec3,
    /// Unit forward vector on the XZ plane.
    pub forward: Vec3,
}

impl Pose {
    /// Pose at `position` facing +Z.
    #[must_use]
    pub const fn at(position: Vec3) -> Self {
        Self {
            position,
            forward: Vec3::Z,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

/// Yaw of a vector on the XZ plane, measured from +Z toward +X.
fn yaw_of(direction: Vec3) -> f32 {
    direction.x.atan2(direction.z)
}

fn forward_from_yaw(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

/// Wraps an angle into `(-PI, PI]`.
fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

// =============================================================================
// Mover
// =============================================================================

/// Straight-line mover with arrival radius and turn-rate limited facing.
///
/// Nothing moves until [`integrate`](Movement::integrate) is called.
#[derive(Debug)]
pub struct KinematicMover {
    pose: Rc<Cell<Pose>>,
    stopping_distance: f32,
    destination: Option<Vec3>,
    speed: f32,
    velocity: Vec3,
    facing_goal: Option<(Vec3, f32)>,
    enabled: bool,
}

impl KinematicMover {
    /// Creates a mover writing to `pose`. Arrival happens within
    /// `stopping_distance` of the destination.
    #[must_use]
    pub fn new(pose: Rc<Cell<Pose>>, stopping_distance: f32) -> Self {
        Self {
            pose,
            stopping_distance: stopping_distance.max(0.0),
            destination: None,
            speed: 0.0,
            velocity: Vec3::ZERO,
            facing_goal: None,
            enabled: true,
        }
    }

    /// Outstanding destination, if any.
    #[must_use]
    pub const fn destination(&self) -> Option<Vec3> {
        self.destination
    }

    /// Current facing.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.pose.get().forward
    }

    fn step_translation(&mut self, pose: &mut Pose, dt: f32) {
        let Some(destination) = self.destination else {
            self.velocity = Vec3::ZERO;
            return;
        };
        let offset = destination - pose.position;
        let distance = offset.length();
        if distance <= self.stopping_distance {
            self.destination = None;
            self.velocity = Vec3::ZERO;
            return;
        }

        let travel = (self.speed * dt).min(distance - self.stopping_distance);
        let direction = offset / distance;
        pose.position += direction * travel;
        self.velocity = direction * self.speed;

        if distance - travel <= self.stopping_distance {
            self.destination = None;
            self.velocity = Vec3::ZERO;
        }
    }

    fn step_rotation(&mut self, pose: &mut Pose, dt: f32) {
        let Some((target, rate)) = self.facing_goal else {
            return;
        };
        let to_target = Vec3::new(target.x - pose.position.x, 0.0, target.z - pose.position.z);
        if to_target.length_squared() <= f32::EPSILON {
            self.facing_goal = None;
            return;
        }
        let current = yaw_of(pose.forward);
        let diff = wrap_angle(yaw_of(to_target) - current);
        let max_step = rate * dt;
        let step = diff.clamp(-max_step, max_step);
        pose.forward = forward_from_yaw(current + step);
        if (diff - step).abs() <= f32::EPSILON {
            self.facing_goal = None;
        }
    }
}

impl Movement for KinematicMover {
    fn position(&self) -> Vec3 {
        self.pose.get().position
    }

    fn move_towards(&mut self, destination: Vec3, speed: f32) {
        if !self.enabled {
            return;
        }
        self.destination = Some(destination);
        self.speed = speed.max(0.0);
    }

    fn stop(&mut self) {
        self.destination = None;
        self.velocity = Vec3::ZERO;
    }

    fn face_target(&mut self, target: Vec3, rotation_speed: f32) {
        if self.enabled {
            self.facing_goal = Some((target, rotation_speed.max(0.0)));
        }
    }

    fn has_reached_destination(&self) -> bool {
        self.destination.is_none()
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn integrate(&mut self, dt: f32) {
        if !self.enabled || dt <= 0.0 {
            return;
        }
        let mut pose = self.pose.get();
        self.step_translation(&mut pose, dt);
        self.step_rotation(&mut pose, dt);
        self.pose.set(pose);
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.stop();
            self.facing_goal = None;
        }
    }
}

// =============================================================================
// Target Board
// =============================================================================

/// Sphere that blocks line of sight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Occluder {
    /// Sphere center.
    pub center: Vec3,
    /// Sphere radius.
    pub radius: f32,
}

impl Occluder {
    /// True if the segment `from -> to` passes through the sphere.
    #[must_use]
    pub fn blocks(&self, from: Vec3, to: Vec3) -> bool {
        let segment = to - from;
        let length_sq = segment.length_squared();
        let t = if length_sq > 0.0 {
            ((self.center - from).dot(segment) / length_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let closest = from + segment * t;
        closest.distance_squared(self.center) < self.radius * self.radius
    }
}

/// Everything built-in sensors can see: target positions and occluders.
///
/// Targets are stored in a `BTreeMap` so ties in distance resolve to the
/// lowest id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetBoard {
    targets: BTreeMap<EntityId, Vec3>,
    occluders: Vec<Occluder>,
}

impl TargetBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or moves a target.
    pub fn set_position(&mut self, id: EntityId, position: Vec3) {
        self.targets.insert(id, position);
    }

    /// Removes a target. Sensors then report it as gone.
    pub fn remove(&mut self, id: EntityId) -> Option<Vec3> {
        self.targets.remove(&id)
    }

    /// Position of a target.
    #[must_use]
    pub fn position(&self, id: EntityId) -> Option<Vec3> {
        self.targets.get(&id).copied()
    }

    /// Targets in id order.
    pub fn targets(&self) -> impl Iterator<Item = (EntityId, Vec3)> + '_ {
        self.targets.iter().map(|(id, pos)| (*id, *pos))
    }

    /// Adds a line-of-sight blocker.
    pub fn add_occluder(&mut self, occluder: Occluder) {
        self.occluders.push(occluder);
    }

    /// True if no occluder blocks `from -> to`.
    #[must_use]
    pub fn is_visible(&self, from: Vec3, to: Vec3) -> bool {
        !self.occluders.iter().any(|o| o.blocks(from, to))
    }
}

// =============================================================================
// Sensor
// =============================================================================

/// Detects board targets within range and a horizontal view cone.
#[derive(Debug)]
pub struct RadiusSensor {
    pose: Rc<Cell<Pose>>,
    board: Rc<RefCell<TargetBoard>>,
    range: f32,
    half_fov: f32,
}

impl RadiusSensor {
    /// Creates a sensor. `fov_degrees` is the full cone angle.
    #[must_use]
    pub fn new(
        pose: Rc<Cell<Pose>>,
        board: Rc<RefCell<TargetBoard>>,
        range: f32,
        fov_degrees: f32,
    ) -> Self {
        Self {
            pose,
            board,
            range: range.max(0.0),
            half_fov: (fov_degrees.clamp(0.0, 360.0) * 0.5).to_radians(),
        }
    }

    /// Detection range.
    #[must_use]
    pub const fn range(&self) -> f32 {
        self.range
    }

    fn detects_position(&self, pose: Pose, board: &TargetBoard, position: Vec3) -> bool {
        let offset = position - pose.position;
        if offset.length() > self.range {
            return false;
        }
        let flat = Vec3::new(offset.x, 0.0, offset.z);
        if flat.length_squared() > f32::EPSILON {
            let angle = pose.forward.angle_between(flat);
            if angle > self.half_fov {
                return false;
            }
        }
        board.is_visible(pose.position, position)
    }
}

impl Detection for RadiusSensor {
    fn find_closest_target(&self) -> Option<EntityId> {
        let pose = self.pose.get();
        let board = self.board.borrow();
        let mut best: Option<(EntityId, f32)> = None;
        for (id, position) in board.targets() {
            if !self.detects_position(pose, &board, position) {
                continue;
            }
            let distance = pose.position.distance(position);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((id, distance));
            }
        }
        best.map(|(id, _)| id)
    }

    fn can_detect(&self, target: EntityId) -> bool {
        let board = self.board.borrow();
        board
            .position(target)
            .is_some_and(|position| self.detects_position(self.pose.get(), &board, position))
    }

    fn has_line_of_sight(&self, position: Vec3) -> bool {
        self.board.borrow().is_visible(self.pose.get().position, position)
    }

    fn target_position(&self, target: EntityId) -> Option<Vec3> {
        self.board.borrow().position(target)
    }
}

// =============================================================================
// Tests
// =============================================================================
