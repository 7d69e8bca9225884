//! Piecewise-linear response curves for wave tuning.
//!
//! Curves map a scalar input to an output through sorted keyframes. Inputs
//! before the first key or after the last are clamped to the end values, so a
//! curve never extrapolates.
//!
//! # Example
//!
//! ```
//! use gauntlet_core::wave::Curve;
//!
//! let ramp = Curve::linear(0.0, 1.0, 10.0, 3.0);
//! assert!((ramp.evaluate(5.0) - 2.0).abs() < 0.0001);
//! assert!((ramp.evaluate(50.0) - 3.0).abs() < 0.0001);
//! ```

use serde::{Deserialize, Serialize};

/// A single `(time, value)` control point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Input coordinate.
    pub time: f32,
    /// Output at `time`.
    pub value: f32,
}

impl Keyframe {
    /// Creates a keyframe.
    #[must_use]
    pub const fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

/// Keyframed curve with linear interpolation.
///
/// Keys are kept sorted by time. An empty curve evaluates to 0.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Keyframe>", into = "Vec<Keyframe>")]
pub struct Curve {
    keys: Vec<Keyframe>,
}

impl Curve {
    /// Builds a curve from keys in any order. Non-finite keys are dropped.
    #[must_use]
    pub fn new(keys: Vec<Keyframe>) -> Self {
        let mut keys: Vec<_> = keys
            .into_iter()
            .filter(|k| k.time.is_finite() && k.value.is_finite())
            .collect();
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }

    /// A curve returning `value` everywhere.
    #[must_use]
    pub fn constant(value: f32) -> Self {
        Self::new(vec![Keyframe::new(0.0, value)])
    }

    /// A straight ramp from `(t0, v0)` to `(t1, v1)`.
    #[must_use]
    pub fn linear(t0: f32, v0: f32, t1: f32, v1: f32) -> Self {
        Self::new(vec![Keyframe::new(t0, v0), Keyframe::new(t1, v1)])
    }

    /// Control points in time order.
    #[must_use]
    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    /// Returns true if the curve has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Samples the curve at `t`.
    #[must_use]
    pub fn evaluate(&self, t: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0.0;
        };
        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        // First key strictly after t; t is inside (first.time, last.time).
        let upper = self.keys.partition_point(|k| k.time <= t);
        let a = self.keys[upper - 1];
        let b = self.keys[upper];
        let span = b.time - a.time;
        if span <= 0.0 {
            return b.value;
        }
        let alpha = (t - a.time) / span;
        a.value + (b.value - a.value) * alpha
    }
}

impl From<Vec<Keyframe>> for Curve {
    fn from(keys: Vec<Keyframe>) -> Self {
        Self::new(keys)
    }
}

impl From<Curve> for Vec<Keyframe> {
    fn from(curve: Curve) -> Self {
        curve.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_curve_is_zero() {
        assert!(Curve::default().evaluate(3.0).abs() < 0.0001);
    }

    #[test]
    fn constant_is_flat() {
        let curve = Curve::constant(1.5);
        for t in [-10.0, 0.0, 0.5, 100.0] {
            assert!((curve.evaluate(t) - 1.5).abs() < 0.0001);
        }
    }

    #[test]
    fn clamps_outside_keys() {
        let curve = Curve::linear(1.0, 10.0, 2.0, 20.0);
        assert!((curve.evaluate(0.0) - 10.0).abs() < 0.0001);
        assert!((curve.evaluate(5.0) - 20.0).abs() < 0.0001);
    }

    #[test]
    fn interpolates_between_middle_keys() {
        let curve = Curve::new(vec![
            Keyframe::new(0.0, 0.0),
            Keyframe::new(1.0, 10.0),
            Keyframe::new(3.0, 0.0),
        ]);
        assert!((curve.evaluate(0.5) - 5.0).abs() < 0.0001);
        assert!((curve.evaluate(2.0) - 5.0).abs() < 0.0001);
        assert!((curve.evaluate(1.0) - 10.0).abs() < 0.0001);
    }

    #[test]
    fn unsorted_keys_are_sorted() {
        let curve = Curve::new(vec![Keyframe::new(2.0, 4.0), Keyframe::new(0.0, 0.0)]);
        assert!((curve.evaluate(1.0) - 2.0).abs() < 0.0001);
    }

    #[test]
    fn non_finite_keys_dropped() {
        let curve = Curve::new(vec![Keyframe::new(f32::NAN, 1.0), Keyframe::new(0.0, 2.0)]);
        assert_eq!(curve.keys().len(), 1);
    }

    #[test]
    fn serializes_as_key_list() {
        let curve = Curve::linear(0.0, 1.0, 1.0, 2.0);
        let json = serde_json::to_string(&curve).unwrap();
        assert!(json.starts_with('['));

        let back: Curve = serde_json::from_str(&json).unwrap();
        assert_eq!(back, curve);
    }
}
