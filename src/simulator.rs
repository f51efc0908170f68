use crate::config::PianoConfig;
use crate::layout::KeyboardLayout;
use crate::types::*;
use crossbeam_channel::Sender;
use log::{info, warn};
use std::thread;
use std::time::Duration;

/// Generates scripted hand frames that exercise the full key-press pipeline
/// without a camera or landmark detector.
///
/// Each simulated hand plays with its index finger; the other fingertips
/// hang below the keyboard.
pub struct Simulator {
    clock: SessionClock,
    tx: Sender<InputEvent>,
    layout: KeyboardLayout,
    mirror: bool,
    fps: u32,
    /// Sleep between frames and stamp them from the session clock. When off,
    /// frames are produced as fast as possible with tick-based timestamps.
    paced: bool,
    tick: u64,
}

/// Index fingertip position per hand, in pixels; `None` = hand not in view.
#[derive(Clone, Default)]
struct SimState {
    hands: [Option<Point>; 2],
}

/// Where a lifted finger hovers: below the keyboard, fraction of height.
const HOVER_Y: f32 = 0.6;
/// Where a parked (non-playing) fingertip sits, fraction of height.
const PARKED_Y: f32 = 0.9;

impl Simulator {
    pub fn new(
        clock: SessionClock,
        tx: Sender<InputEvent>,
        config: &PianoConfig,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Self {
        Self {
            clock,
            tx,
            layout: KeyboardLayout::generate(width, height, &config.layout),
            mirror: config.mirror,
            fps: fps.max(1),
            paced: true,
            tick: 0,
        }
    }

    /// Disable real-time pacing (for tests and offline runs).
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    /// Play the named demo sequence, then return (the source disconnects and
    /// the session ends). Blocks the calling thread.
    pub fn run(&mut self, demo: &str) {
        let gestures = match demo {
            "scale" => scale_sequence(self.layout.white.len()),
            "chord" => chord_sequence(&self.layout),
            "linger" => linger_sequence(),
            other => {
                warn!("Unknown demo '{}', using 'scale'", other);
                scale_sequence(self.layout.white.len())
            }
        };
        info!("Simulator starting '{}' demo ({} gestures)...", demo, gestures.len());

        let mut state = SimState::default();
        for gesture in &gestures {
            if !self.execute(gesture, &mut state) {
                info!("Coordinator gone, simulator stopping");
                return;
            }
        }
        info!("Demo sequence complete.");
    }

    /// Returns false once the receiving side has hung up.
    fn execute(&mut self, gesture: &Gesture, state: &mut SimState) -> bool {
        match gesture {
            Gesture::Hold { ms } => {
                info!("  hold {}ms", ms);
                for _ in 0..self.ticks(*ms) {
                    if !self.emit_tick(state) {
                        return false;
                    }
                }
            }

            Gesture::Enter { hand } => {
                info!("  hand {} enters", hand);
                state.hands[*hand] = Some(self.hover_point(self.layout.width as f32 / 2.0));
            }

            Gesture::Leave { hand } => {
                info!("  hand {} leaves", hand);
                state.hands[*hand] = None;
            }

            Gesture::Press { hand, key } => {
                let Some(target) = self.key_point(*key) else {
                    warn!("  press: no key {}", key);
                    return true;
                };
                info!("  hand {} presses key {}", hand, key);
                state.hands[*hand] = Some(target);
            }

            Gesture::Lift { hand } => {
                info!("  hand {} lifts", hand);
                if let Some(p) = state.hands[*hand] {
                    state.hands[*hand] = Some(self.hover_point(p.x));
                }
            }

            Gesture::Glide { hand, to_key, ms } => {
                let (Some(from), Some(to)) = (state.hands[*hand], self.key_point(*to_key)) else {
                    return true;
                };
                info!("  hand {} glides to key {} over {}ms", hand, to_key, ms);
                let ticks = self.ticks(*ms).max(1);
                for i in 0..ticks {
                    let t = (i + 1) as f32 / ticks as f32;
                    state.hands[*hand] = Some(Point::new(lerp(from.x, to.x, t), to.y));
                    if !self.emit_tick(state) {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn ticks(&self, ms: u32) -> u64 {
        ms as u64 * self.fps as u64 / 1000
    }

    /// A point comfortably inside the key: black keys are touched near
    /// their middle, white keys below the black-key zone.
    fn key_point(&self, key: usize) -> Option<Point> {
        let rect = self.layout.key(key)?;
        let y = match rect.id.kind {
            KeyKind::Black => rect.height * 0.5,
            KeyKind::White => rect.height * 0.9,
        };
        Some(Point::new((rect.x_start + rect.x_end) / 2.0, y))
    }

    fn hover_point(&self, x: f32) -> Point {
        Point::new(x, self.layout.height as f32 * HOVER_Y)
    }

    fn hand_at(&self, p: Point) -> Hand {
        let w = self.layout.width as f32;
        let h = self.layout.height as f32;
        let nx = |x: f32| {
            let n = x / w;
            if self.mirror {
                1.0 - n
            } else {
                n
            }
        };
        let parked = |dx: f32| (nx(p.x + dx), PARKED_Y);
        Hand::with_fingertips([
            parked(-40.0),
            (nx(p.x), p.y / h),
            parked(20.0),
            parked(40.0),
            parked(60.0),
        ])
    }

    /// Emit one frame. Returns false if nobody is listening any more.
    fn emit_tick(&mut self, state: &SimState) -> bool {
        let frame_us = US_PER_SEC / self.fps as u64;
        let ts = if self.paced {
            self.clock.now_us()
        } else {
            self.tick * frame_us
        };
        self.tick += 1;

        let frame = HandFrame {
            timestamp_us: ts,
            width: self.layout.width,
            height: self.layout.height,
            hands: state.hands.iter().flatten().map(|&p| self.hand_at(p)).collect(),
        };
        if self.tx.send(InputEvent::Frame(frame)).is_err() {
            return false;
        }

        if self.paced {
            thread::sleep(Duration::from_micros(frame_us));
        }
        true
    }
}

// ─── Gesture types ──────────────────────────────────────────────────────────

enum Gesture {
    Hold { ms: u32 },
    Enter { hand: usize },
    Leave { hand: usize },
    /// Index finger jumps onto a key (combined index).
    Press { hand: usize, key: usize },
    /// Index finger rises off the keyboard.
    Lift { hand: usize },
    /// Index finger slides across the keys to another key.
    Glide { hand: usize, to_key: usize, ms: u32 },
}

/// Up and down the white keys with hand 0, lifting between notes.
fn scale_sequence(white_keys: usize) -> Vec<Gesture> {
    let mut g = vec![Gesture::Enter { hand: 0 }, Gesture::Hold { ms: 300 }];
    let up = 0..white_keys;
    let down = (0..white_keys.saturating_sub(1)).rev();
    for key in up.chain(down) {
        g.push(Gesture::Press { hand: 0, key });
        g.push(Gesture::Hold { ms: 250 });
        g.push(Gesture::Lift { hand: 0 });
        g.push(Gesture::Hold { ms: 150 });
    }
    g.push(Gesture::Leave { hand: 0 });
    g.push(Gesture::Hold { ms: 500 });
    g
}

/// Two hands: alternating notes, a glissando, and a black key.
fn chord_sequence(layout: &KeyboardLayout) -> Vec<Gesture> {
    let n = layout.white.len();
    let first_black = n;
    vec![
        Gesture::Enter { hand: 0 },
        Gesture::Enter { hand: 1 },
        Gesture::Hold { ms: 300 },
        Gesture::Press { hand: 0, key: 0 },
        Gesture::Press { hand: 1, key: n.saturating_sub(1).min(4) },
        Gesture::Hold { ms: 600 },
        Gesture::Lift { hand: 0 },
        Gesture::Lift { hand: 1 },
        Gesture::Hold { ms: 300 },
        Gesture::Press { hand: 0, key: first_black },
        Gesture::Hold { ms: 500 },
        Gesture::Lift { hand: 0 },
        Gesture::Press { hand: 1, key: 0 },
        Gesture::Glide { hand: 1, to_key: n.saturating_sub(1), ms: 1500 },
        Gesture::Lift { hand: 1 },
        Gesture::Hold { ms: 400 },
        Gesture::Leave { hand: 0 },
        Gesture::Leave { hand: 1 },
        Gesture::Hold { ms: 500 },
    ]
}

/// One finger resting on a key long enough to re-sound after the replay
/// interval.
fn linger_sequence() -> Vec<Gesture> {
    vec![
        Gesture::Enter { hand: 0 },
        Gesture::Hold { ms: 300 },
        Gesture::Press { hand: 0, key: 2 },
        Gesture::Hold { ms: 11_000 },
        Gesture::Lift { hand: 0 },
        Gesture::Hold { ms: 500 },
    ]
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
