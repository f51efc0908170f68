//! Per-fingertip key occupancy.
//!
//! Slots are identified by (hand order in the frame, finger). Hands are not
//! re-identified across frames: if the detector swaps the order of two hands,
//! their slots swap too and each finger looks like a fresh landing. Landings
//! still pass through the replay gate, so a swap cannot re-sound a key that
//! triggered within the replay interval.

use crate::types::FINGER_COUNT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FingerSlot {
    pub hand: usize,
    pub finger: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum SlotState {
    OnKey(usize),
    #[default]
    OffKey,
}

/// What one fingertip did this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerEvent {
    /// Arrived on a key from no key or from a different key.
    Landing(usize),
    /// Still on the same key as last frame.
    Resting(usize),
    /// Not over any key.
    Off,
}

pub struct FingerTracker {
    slots: Vec<SlotState>,
    seen: Vec<bool>,
}

impl FingerTracker {
    pub fn new(max_hands: usize) -> Self {
        let n = max_hands * FINGER_COUNT;
        Self {
            slots: vec![SlotState::OffKey; n],
            seen: vec![false; n],
        }
    }

    fn slot_index(&self, slot: FingerSlot) -> Option<usize> {
        if slot.finger >= FINGER_COUNT {
            return None;
        }
        let i = slot.hand * FINGER_COUNT + slot.finger;
        (i < self.slots.len()).then_some(i)
    }

    /// Feed one fingertip's hit-test result. Slots outside the tracked range
    /// report `Off` and keep no state.
    pub fn observe(&mut self, slot: FingerSlot, hit: Option<usize>) -> FingerEvent {
        let Some(i) = self.slot_index(slot) else {
            return FingerEvent::Off;
        };
        self.seen[i] = true;

        let prev = self.slots[i];
        match hit {
            None => {
                self.slots[i] = SlotState::OffKey;
                FingerEvent::Off
            }
            Some(k) => {
                self.slots[i] = SlotState::OnKey(k);
                if prev == SlotState::OnKey(k) {
                    FingerEvent::Resting(k)
                } else {
                    FingerEvent::Landing(k)
                }
            }
        }
    }

    /// Close the frame: every slot not observed since the last call (its hand
    /// vanished) goes back to `OffKey`.
    pub fn end_frame(&mut self) {
        for (state, seen) in self.slots.iter_mut().zip(self.seen.iter_mut()) {
            if !*seen {
                *state = SlotState::OffKey;
            }
            *seen = false;
        }
    }
}
