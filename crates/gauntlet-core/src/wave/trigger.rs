//! Next-wave triggers.
//!
//! The orchestrator enables its trigger when a wave completes and polls it
//! every tick; a trigger that fires disables itself until enabled again.

use tracing::debug;

/// Decides when the next wave starts.
pub trait WaveTrigger {
    /// Arms the trigger at simulation time `now`.
    fn enable(&mut self, now: f32);

    /// Disarms the trigger.
    fn disable(&mut self);

    /// True while armed.
    fn is_enabled(&self) -> bool;

    /// Returns true exactly once per arming, when the trigger fires.
    fn poll(&mut self, now: f32) -> bool;

    /// Asks the trigger to fire at the next poll. Returns false when the
    /// trigger does not accept requests or is not armed.
    fn request(&mut self) -> bool {
        false
    }
}

impl<T: WaveTrigger + ?Sized> WaveTrigger for Box<T> {
    fn enable(&mut self, now: f32) {
        (**self).enable(now);
    }

    fn disable(&mut self) {
        (**self).disable();
    }

    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }

    fn poll(&mut self, now: f32) -> bool {
        (**self).poll(now)
    }

    fn request(&mut self) -> bool {
        (**self).request()
    }
}

/// Fires a fixed delay after being enabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayedTrigger {
    delay: f32,
    enabled_at: Option<f32>,
}

impl DelayedTrigger {
    /// Delay used between waves when none is configured.
    pub const DEFAULT_DELAY: f32 = 3.0;

    /// Creates a disarmed trigger. Negative delays are treated as 0.
    #[must_use]
    pub fn new(delay: f32) -> Self {
        Self {
            delay: delay.max(0.0),
            enabled_at: None,
        }
    }

    /// Seconds between arming and firing.
    #[must_use]
    pub const fn delay(&self) -> f32 {
        self.delay
    }
}

impl Default for DelayedTrigger {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

impl WaveTrigger for DelayedTrigger {
    fn enable(&mut self, now: f32) {
        self.enabled_at = Some(now);
    }

    fn disable(&mut self) {
        self.enabled_at = None;
    }

    fn is_enabled(&self) -> bool {
        self.enabled_at.is_some()
    }

    fn poll(&mut self, now: f32) -> bool {
        match self.enabled_at {
            Some(at) if now >= at + self.delay => {
                debug!(now, delay = self.delay, "delayed trigger fired");
                self.disable();
                true
            }
            _ => false,
        }
    }
}

/// Fires only when requested while armed, e.g. from a UI button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManualTrigger {
    enabled: bool,
    pressed: bool,
}

impl ManualTrigger {
    /// Creates a disarmed trigger.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enabled: false,
            pressed: false,
        }
    }

    /// Same as [`WaveTrigger::request`].
    pub fn press(&mut self) -> bool {
        if self.enabled {
            self.pressed = true;
        }
        self.enabled
    }
}

impl WaveTrigger for ManualTrigger {
    fn enable(&mut self, _now: f32) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.pressed = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn poll(&mut self, _now: f32) -> bool {
        if self.enabled && self.pressed {
            debug!("manual trigger fired");
            self.disable();
            return true;
        }
        false
    }

    fn request(&mut self) -> bool {
        self.press()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod delayed_tests {
        use super::*;

        #[test]
        fn fires_after_delay_then_disarms() {
            let mut trigger = DelayedTrigger::new(2.0);
            trigger.enable(10.0);

            assert!(!trigger.poll(11.9));
            assert!(trigger.poll(12.0));
            assert!(!trigger.is_enabled());
            assert!(!trigger.poll(20.0));
        }

        #[test]
        fn disarmed_never_fires() {
            let mut trigger = DelayedTrigger::new(0.0);
            assert!(!trigger.poll(100.0));
        }

        #[test]
        fn disable_cancels_pending_fire() {
            let mut trigger = DelayedTrigger::new(1.0);
            trigger.enable(0.0);
            trigger.disable();
            assert!(!trigger.poll(5.0));
        }

        #[test]
        fn requests_are_ignored() {
            let mut trigger = DelayedTrigger::default();
            trigger.enable(0.0);
            assert!(!trigger.request());
            assert!(!trigger.poll(1.0));
        }

        #[test]
        fn negative_delay_is_zero() {
            assert!(DelayedTrigger::new(-4.0).delay().abs() < 0.0001);
        }
    }

    mod manual_tests {
        use super::*;

        #[test]
        fn press_while_armed_fires_once() {
            let mut trigger = ManualTrigger::new();
            trigger.enable(0.0);
            assert!(!trigger.poll(1.0));

            assert!(trigger.press());
            assert!(trigger.poll(1.0));
            assert!(!trigger.poll(1.1));
            assert!(!trigger.is_enabled());
        }

        #[test]
        fn press_while_disarmed_is_dropped() {
            let mut trigger = ManualTrigger::new();
            assert!(!trigger.press());
            trigger.enable(0.0);
            assert!(!trigger.poll(0.0));
        }

        #[test]
        fn boxed_trigger_forwards_requests() {
            let mut trigger: Box<dyn WaveTrigger> = Box::new(ManualTrigger::new());
            trigger.enable(0.0);
            assert!(trigger.request());
            assert!(trigger.poll(0.0));
        }
    }
}
