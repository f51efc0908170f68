use crate::key_state::KeyRuntime;

/// Decides which keys render as pressed. Purely time-driven per key: nothing
/// but elapsed time clears a key, and clearing one key never touches another.
#[derive(Debug, Clone, Copy)]
pub struct VisualTracker {
    hold_us: u64,
}

impl VisualTracker {
    pub fn new(hold_us: u64) -> Self {
        Self { hold_us }
    }

    pub fn hold_us(&self) -> u64 {
        self.hold_us
    }

    /// Record a trigger.
    pub fn activate(&self, key: &mut KeyRuntime, t_us: u64) {
        key.last_visual_us = Some(t_us);
    }

    pub fn is_pressed(&self, key: &KeyRuntime, now_us: u64) -> bool {
        match key.last_visual_us {
            Some(t) => now_us >= t && now_us - t < self.hold_us,
            None => false,
        }
    }
}
