use crate::render::DrawCommand;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

// ─── Geometry ───────────────────────────────────────────────────────────────

/// A position in frame pixel space. Origin is the top-left corner, `y` grows
/// downward (the keyboard hangs from the top edge of the frame).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

// ─── Hand landmarks (from the external detector) ───────────────────────────

/// One landmark in normalized image coordinates: 0.0–1.0 across width/height.
/// Detectors may report slightly out-of-range values near the frame edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    /// Convert to pixels, optionally mirroring horizontally (selfie view).
    pub fn to_pixels(&self, width: u32, height: u32, mirror: bool) -> Point {
        let nx = if mirror { 1.0 - self.x } else { self.x };
        Point::new(nx * width as f32, self.y * height as f32)
    }
}

/// A detected hand: the full landmark set in detector order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    pub landmarks: Vec<Landmark>,
}

impl Hand {
    pub fn landmark(&self, index: usize) -> Option<Landmark> {
        self.landmarks.get(index).copied()
    }

    /// Build a hand whose five fingertips sit at the given normalized
    /// positions; all other landmarks are parked at the wrist origin.
    pub fn with_fingertips(tips: [(f32, f32); FINGER_COUNT]) -> Self {
        let mut landmarks = vec![Landmark::default(); HAND_LANDMARK_COUNT];
        for (finger, &(x, y)) in tips.iter().enumerate() {
            landmarks[FINGERTIP_LANDMARKS[finger]] = Landmark { x, y };
        }
        Self { landmarks }
    }
}

/// One captured video frame, reduced to what the core consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandFrame {
    /// Microseconds since session start
    pub timestamp_us: u64,
    /// Frame size in pixels
    pub width: u32,
    pub height: u32,
    /// Zero or more detected hands, in detector order
    pub hands: Vec<Hand>,
}

// ─── Keys ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyKind {
    White,
    Black,
}

/// Identity of a key: its kind, its position within that kind, and its
/// position in the combined index space (white keys first, then black).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyId {
    pub kind: KeyKind,
    /// 0..N-1 for white keys, 0..M-1 for black keys
    pub ordinal: usize,
    /// 0..N+M-1
    pub index: usize,
    /// Position of the key's name within its octave: the white key within
    /// C..B, or for a black key the white-key boundary it sits on.
    pub note: usize,
}

impl KeyId {
    pub fn white(ordinal: usize) -> Self {
        Self {
            kind: KeyKind::White,
            ordinal,
            index: ordinal,
            note: ordinal % 7,
        }
    }

    /// A black key centered `offset` white-key widths from the left edge,
    /// named as the sharp of the white key left of that boundary.
    pub fn black(ordinal: usize, index: usize, offset: f32) -> Self {
        Self {
            kind: KeyKind::Black,
            ordinal,
            index,
            note: (offset.round() as i64).rem_euclid(7) as usize,
        }
    }

    /// Note name of this key, repeating per octave.
    pub fn label(&self) -> &'static str {
        match self.kind {
            KeyKind::White => WHITE_KEY_NAMES[self.note % 7],
            KeyKind::Black => BLACK_KEY_NAMES[self.note % 7],
        }
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            KeyKind::White => "white",
            KeyKind::Black => "black",
        };
        write!(f, "{}#{} ({}, key {})", kind, self.ordinal, self.label(), self.index)
    }
}

/// Screen region of one key. Keys hang from the top edge, so the rectangle
/// spans `[x_start, x_end)` horizontally and `[0, height)` vertically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyRect {
    pub id: KeyId,
    pub x_start: f32,
    pub x_end: f32,
    pub height: f32,
}

impl KeyRect {
    pub fn width(&self) -> f32 {
        self.x_end - self.x_start
    }
}

// ─── Core outputs ───────────────────────────────────────────────────────────

/// A sound emission decided by the replay gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub timestamp_us: u64,
    pub key: KeyId,
    /// True when a lingering finger re-sounded the key after the cooldown
    /// without lifting; false for a fresh landing.
    pub resting: bool,
}

/// Where one tracked fingertip was this frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FingertipState {
    pub hand: usize,
    pub finger: usize,
    pub position: Point,
    /// Combined key index under the fingertip, if any
    pub key: Option<usize>,
}

/// Complete per-frame snapshot. Produced by the coordinator, consumed by the
/// console display, data logger and OSC sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PianoFrame {
    pub timestamp_us: u64,
    pub width: u32,
    pub height: u32,
    /// Visual "pressed" state per combined key index
    pub pressed: Vec<bool>,
    pub fingertips: Vec<FingertipState>,
    /// Triggers emitted while processing this frame, in emission order
    pub triggers: Vec<Trigger>,
    /// Overlay for this frame, back to front
    #[serde(default)]
    pub draw: Vec<DrawCommand>,
}

impl PianoFrame {
    pub fn pressed_count(&self) -> usize {
        self.pressed.iter().filter(|&&p| p).count()
    }
}

impl fmt::Display for PianoFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>10}µs  {}x{}  tips={}  pressed={}  triggers={}",
            self.timestamp_us,
            self.width,
            self.height,
            self.fingertips.len(),
            self.pressed_count(),
            self.triggers.len(),
        )
    }
}

// ─── Compact serialization ──────────────────────────────────────────────────

/// Short-key representation for JSONL logging.
/// Field mapping: t=timestamp_us, w=width, h=height, p=indices of pressed
/// keys, f=fingertips as [hand, finger, x, y, key or -1], k=triggered key
/// indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactFrame {
    pub t: u64,
    pub w: u32,
    pub h: u32,
    pub p: Vec<usize>,
    pub f: Vec<(usize, usize, f32, f32, i64)>,
    pub k: Vec<usize>,
}

impl From<&PianoFrame> for CompactFrame {
    fn from(frame: &PianoFrame) -> Self {
        Self {
            t: frame.timestamp_us,
            w: frame.width,
            h: frame.height,
            p: frame
                .pressed
                .iter()
                .enumerate()
                .filter(|(_, &p)| p)
                .map(|(i, _)| i)
                .collect(),
            f: frame
                .fingertips
                .iter()
                .map(|tip| {
                    (
                        tip.hand,
                        tip.finger,
                        tip.position.x,
                        tip.position.y,
                        tip.key.map(|k| k as i64).unwrap_or(-1),
                    )
                })
                .collect(),
            k: frame.triggers.iter().map(|t| t.key.index).collect(),
        }
    }
}

// ─── Inter-thread messages ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum InputEvent {
    Frame(HandFrame),
    /// External stop signal, checked once per frame
    Quit,
}

// ─── Session clock ──────────────────────────────────────────────────────────

/// Monotonic clock for the piano session.
#[derive(Clone)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Constants ──────────────────────────────────────────────────────────────

/// Landmarks per hand in the MediaPipe hand model.
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Tracked fingers per hand.
pub const FINGER_COUNT: usize = 5;

/// Fingertip landmark indices: thumb, index, middle, ring, pinky.
pub const FINGERTIP_LANDMARKS: [usize; FINGER_COUNT] = [4, 8, 12, 16, 20];

pub const FINGER_NAMES: [&str; FINGER_COUNT] = ["thumb", "index", "middle", "ring", "pinky"];

pub const WHITE_KEY_NAMES: [&str; 7] = ["C", "D", "E", "F", "G", "A", "B"];
/// Indexed by the white-key boundary within the octave; boundaries 0 and 3
/// only carry a key with explicit offsets.
pub const BLACK_KEY_NAMES: [&str; 7] = ["B#", "C#", "D#", "E#", "F#", "G#", "A#"];

pub const US_PER_SEC: u64 = 1_000_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_flips_x() {
        let lm = Landmark { x: 0.25, y: 0.5 };
        let p = lm.to_pixels(400, 200, true);
        assert_eq!(p, Point::new(300.0, 100.0));
        let q = lm.to_pixels(400, 200, false);
        assert_eq!(q, Point::new(100.0, 100.0));
    }

    #[test]
    fn test_with_fingertips_places_tips() {
        let hand = Hand::with_fingertips([(0.1, 0.1), (0.2, 0.2), (0.3, 0.3), (0.4, 0.4), (0.5, 0.5)]);
        assert_eq!(hand.landmarks.len(), HAND_LANDMARK_COUNT);
        assert_eq!(hand.landmark(8), Some(Landmark { x: 0.2, y: 0.2 }));
        assert_eq!(hand.landmark(21), None);
    }

    #[test]
    fn test_key_labels_wrap_per_octave() {
        assert_eq!(KeyId::white(8).label(), "D");
        // sixth black key of the default pattern sits on boundary 8
        assert_eq!(KeyId::black(5, 15, 8.0).label(), "C#");
    }

    #[test]
    fn test_black_label_follows_position() {
        // a lone key between F and G is F# whatever its ordinal
        assert_eq!(KeyId::black(0, 7, 4.0).label(), "F#");
        assert_eq!(KeyId::black(0, 7, 2.4).label(), "D#");
        assert_eq!(KeyId::black(1, 8, 3.0).label(), "E#");
    }

    #[test]
    fn test_compact_frame_encodes_missing_key() {
        let frame = PianoFrame {
            timestamp_us: 42,
            width: 100,
            height: 50,
            pressed: vec![false, true, false],
            fingertips: vec![FingertipState {
                hand: 0,
                finger: 1,
                position: Point::new(10.0, 20.0),
                key: None,
            }],
            triggers: vec![],
            draw: vec![],
        };
        let c = CompactFrame::from(&frame);
        assert_eq!(c.p, vec![1]);
        assert_eq!(c.f[0].4, -1);
        assert!(c.k.is_empty());
    }
}
