//! Replay gate: decides whether a landing or a resting finger sounds its key.

use crate::key_state::KeyRuntime;

#[derive(Debug, Clone, Copy)]
pub struct ReplayGate {
    interval_us: u64,
}

impl ReplayGate {
    pub fn new(interval_us: u64) -> Self {
        Self { interval_us }
    }

    pub fn interval_us(&self) -> u64 {
        self.interval_us
    }

    fn cooled_down(&self, key: &KeyRuntime, t_us: u64) -> bool {
        match key.last_trigger_us {
            None => true,
            Some(last) => t_us.saturating_sub(last) > self.interval_us,
        }
    }

    /// A finger arrived on the key. Sounds unless the key already sounded
    /// within the replay interval; a suppressed landing leaves no trace.
    pub fn on_landing(&self, key: &mut KeyRuntime, t_us: u64) -> bool {
        self.fire_if_cooled(key, t_us)
    }

    /// A finger is still resting on the key it occupied last frame. Re-sounds
    /// once the interval since the last trigger has passed, without requiring
    /// a lift.
    pub fn on_resting(&self, key: &mut KeyRuntime, t_us: u64) -> bool {
        // a key that never sounded has no cooldown to expire
        key.last_trigger_us.is_some() && self.fire_if_cooled(key, t_us)
    }

    fn fire_if_cooled(&self, key: &mut KeyRuntime, t_us: u64) -> bool {
        if self.cooled_down(key, t_us) {
            key.last_trigger_us = Some(t_us);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: u64 = 1_000_000;

    #[test]
    fn test_first_landing_triggers() {
        let gate = ReplayGate::new(5 * SEC);
        let mut key = KeyRuntime::default();
        assert!(gate.on_landing(&mut key, 0));
        assert_eq!(key.last_trigger_us, Some(0));
    }

    #[test]
    fn test_second_landing_within_interval_suppressed() {
        let gate = ReplayGate::new(5 * SEC);
        let mut key = KeyRuntime::default();
        assert!(gate.on_landing(&mut key, 0));
        assert!(!gate.on_landing(&mut key, 2 * SEC));
        assert_eq!(key.last_trigger_us, Some(0), "suppressed landing leaves no trace");
    }

    #[test]
    fn test_landing_after_interval_triggers() {
        let gate = ReplayGate::new(5 * SEC);
        let mut key = KeyRuntime::default();
        gate.on_landing(&mut key, 0);
        assert!(gate.on_landing(&mut key, 5 * SEC + 1));
    }

    #[test]
    fn test_exact_interval_is_still_cooling() {
        let gate = ReplayGate::new(5 * SEC);
        let mut key = KeyRuntime::default();
        gate.on_landing(&mut key, 0);
        assert!(!gate.on_landing(&mut key, 5 * SEC));
        assert!(!gate.on_resting(&mut key, 5 * SEC));
    }

    #[test]
    fn test_resting_retriggers_after_interval() {
        let gate = ReplayGate::new(5 * SEC);
        let mut key = KeyRuntime::default();
        gate.on_landing(&mut key, 0);
        assert!(!gate.on_resting(&mut key, 3 * SEC));
        assert!(gate.on_resting(&mut key, 6 * SEC));
        assert_eq!(key.last_trigger_us, Some(6 * SEC));
        assert!(!gate.on_resting(&mut key, 7 * SEC));
    }

    #[test]
    fn test_resting_on_never_triggered_key_is_silent() {
        let gate = ReplayGate::new(5 * SEC);
        let mut key = KeyRuntime::default();
        assert!(!gate.on_resting(&mut key, 10 * SEC));
    }

    #[test]
    fn test_clock_going_backwards_does_not_fire() {
        let gate = ReplayGate::new(SEC);
        let mut key = KeyRuntime {
            last_trigger_us: Some(10 * SEC),
            last_visual_us: Some(10 * SEC),
        };
        assert!(!gate.on_landing(&mut key, 2 * SEC));
    }
}
