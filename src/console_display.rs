use crate::config::LayoutConfig;
use crate::types::*;
use crossbeam_channel::Receiver;
use std::io::{self, Write};

/// Renders a live ASCII view of the keyboard and fingertips.
pub struct ConsoleDisplay {
    rx: Receiver<PianoFrame>,
    update_hz: u32,
    /// Input frame rate, used to decimate down to `update_hz`.
    source_fps: u32,
    white_keys: usize,
    black_offsets: Vec<f32>,
}

impl ConsoleDisplay {
    pub fn new(rx: Receiver<PianoFrame>, update_hz: u32, source_fps: u32, layout: &LayoutConfig) -> Self {
        Self {
            rx,
            update_hz,
            source_fps,
            white_keys: layout.white_keys,
            black_offsets: layout.black_key_offsets(),
        }
    }

    pub fn run(&self) {
        let skip = if self.update_hz == 0 {
            1
        } else {
            (self.source_fps / self.update_hz).max(1) as u64
        };
        let mut count: u64 = 0;
        let mut notes: Vec<String> = Vec::new();
        let mut stdout = io::stdout();

        for frame in self.rx.iter() {
            count += 1;
            for t in &frame.triggers {
                notes.push(t.key.label().to_string());
            }
            if notes.len() > 16 {
                notes.drain(..notes.len() - 16);
            }
            if count % skip != 0 {
                continue;
            }

            // Clear screen and move cursor home
            print!("\x1b[2J\x1b[H");
            println!("╔══════════════════════════════════════════════════════════╗");
            println!("║  AIR PIANO - Live Monitor                                ║");
            println!("╠══════════════════════════════════════════════════════════╣");
            let secs = frame.timestamp_us as f64 / US_PER_SEC as f64;
            println!("║  Time: {:>8.2}s   Frame: {}x{}", secs, frame.width, frame.height);
            println!("║");
            for line in keyboard_lines(&frame, self.white_keys, &self.black_offsets) {
                println!("║  {}", line);
            }
            println!("║");
            for tip in &frame.fingertips {
                let key = match tip.key {
                    Some(k) => format!("key {}", k),
                    None => "---".to_string(),
                };
                println!(
                    "║  hand {} {:>6}: ({:>6.1}, {:>6.1})  {}",
                    tip.hand, FINGER_NAMES[tip.finger], tip.position.x, tip.position.y, key
                );
            }
            println!("║");
            println!("║  Recent: {}", notes.join(" "));
            println!("╚══════════════════════════════════════════════════════════╝");
            let _ = stdout.flush();
        }
    }
}

/// Two text rows: black keys above white keys, pressed keys highlighted.
/// Each white key is three columns wide; black keys sit at their offsets.
fn keyboard_lines(frame: &PianoFrame, white_keys: usize, black_offsets: &[f32]) -> [String; 2] {
    let pressed = |i: usize| frame.pressed.get(i).copied().unwrap_or(false);
    let cols = white_keys * 3 + 1;
    let mut top = vec![' '; cols];
    let mut bottom = vec![' '; cols];

    for i in 0..white_keys {
        let c = i * 3;
        bottom[c] = '│';
        bottom[c + 1] = if pressed(i) { '█' } else { '░' };
        bottom[c + 2] = if pressed(i) { '█' } else { '░' };
    }
    bottom[cols - 1] = '│';

    for (j, &offset) in black_offsets.iter().enumerate() {
        let c = (offset * 3.0).round();
        if c >= 0.0 && (c as usize) < cols {
            top[c as usize] = if pressed(white_keys + j) { '▓' } else { '▄' };
        }
    }

    [top.into_iter().collect(), bottom.into_iter().collect()]
}
