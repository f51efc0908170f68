//! JSONL hand-landmark streams: recorded sessions or a live detector piping
//! its output into stdin.
//!
//! First line is a header:
//! `{"format":"air-piano-landmarks","width":1280,"height":720,"fps":30}`
//!
//! Every following line is one frame:
//! `{"t":33333,"hands":[[[x,y],[x,y,z],...],...]}`
//! with landmarks in normalized coordinates, detector order. `t` (µs) is
//! optional; `w`/`h` override the frame size from that frame on.

use crate::types::{HandFrame, Hand, InputEvent, Landmark, SessionClock, US_PER_SEC};
use crossbeam_channel::Sender;
use log::{error, info, warn};
use serde::Deserialize;
use std::fmt;
use std::io::BufRead;
use std::thread;
use std::time::{Duration, Instant};

pub const FORMAT: &str = "air-piano-landmarks";

/// Parsed header (first line of a landmark stream).
#[derive(Debug)]
pub struct StreamHeader {
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

#[derive(Deserialize)]
struct FrameLine {
    t: Option<u64>,
    w: Option<u32>,
    h: Option<u32>,
    #[serde(default)]
    hands: Vec<Vec<Vec<f32>>>,
}

/// Why a frame could not be read.
#[derive(Debug)]
pub enum FrameError {
    /// The underlying stream failed; nothing more can be read.
    Io(std::io::Error),
    /// One line was malformed; later lines may still be fine.
    Parse(String),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Io(e) => write!(f, "read line: {}", e),
            FrameError::Parse(e) => write!(f, "parse frame: {}", e),
        }
    }
}

/// Line-by-line landmark stream reader.
pub struct LandmarkReader<R: BufRead> {
    reader: R,
    pub header: StreamHeader,
    width: u32,
    height: u32,
    frame_index: u64,
    line_buf: String,
}

impl<R: BufRead> LandmarkReader<R> {
    /// Read and validate the header line.
    pub fn open(mut reader: R) -> Result<Self, String> {
        let mut first_line = String::new();
        reader
            .read_line(&mut first_line)
            .map_err(|e| format!("read header: {}", e))?;

        let first_line = first_line.trim();
        if first_line.is_empty() {
            return Err("empty stream".into());
        }

        let raw: serde_json::Value =
            serde_json::from_str(first_line).map_err(|e| format!("parse header: {}", e))?;

        let format = raw["format"]
            .as_str()
            .ok_or("missing \"format\" field")?
            .to_string();
        if format != FORMAT {
            return Err(format!("unknown format: {}", format));
        }

        let width = raw["width"].as_u64().unwrap_or(1280) as u32;
        let height = raw["height"].as_u64().unwrap_or(720) as u32;
        let fps = raw["fps"].as_u64().unwrap_or(30).max(1) as u32;

        Ok(Self {
            reader,
            header: StreamHeader {
                format,
                width,
                height,
                fps,
            },
            width,
            height,
            frame_index: 0,
            line_buf: String::new(),
        })
    }

    /// Read the next frame. Returns `None` at end of stream.
    pub fn next_frame(&mut self) -> Option<Result<HandFrame, FrameError>> {
        loop {
            self.line_buf.clear();
            match self.reader.read_line(&mut self.line_buf) {
                Ok(0) => return None,
                Ok(_) => {
                    let trimmed = self.line_buf.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let line = match serde_json::from_str::<FrameLine>(trimmed) {
                        Ok(line) => line,
                        Err(e) => return Some(Err(FrameError::Parse(e.to_string()))),
                    };
                    return Some(self.to_frame(line));
                }
                Err(e) => return Some(Err(FrameError::Io(e))),
            }
        }
    }

    fn to_frame(&mut self, line: FrameLine) -> Result<HandFrame, FrameError> {
        let hands = line
            .hands
            .into_iter()
            .map(|points| {
                points
                    .into_iter()
                    .map(|p| match p.as_slice() {
                        [x, y, ..] => Ok(Landmark { x: *x, y: *y }),
                        _ => Err(FrameError::Parse(format!(
                            "landmark needs at least 2 coordinates, got {}",
                            p.len()
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(|landmarks| Hand { landmarks })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(w) = line.w {
            self.width = w;
        }
        if let Some(h) = line.h {
            self.height = h;
        }
        let timestamp_us = line
            .t
            .unwrap_or(self.frame_index * US_PER_SEC / self.header.fps as u64);
        self.frame_index += 1;

        Ok(HandFrame {
            timestamp_us,
            width: self.width,
            height: self.height,
            hands,
        })
    }
}

/// How a landmark stream is turned into session time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Live input: forward frames as they arrive, stamped by the session clock.
    Live,
    /// Recorded input: replay at the recorded pace, keeping recorded stamps.
    Recorded,
    /// Recorded input as fast as possible (offline analysis, tests).
    Unpaced,
}

/// Frame source backed by a landmark stream. Ends the session when the
/// stream ends or fails.
pub struct LandmarkSource<R: BufRead> {
    reader: LandmarkReader<R>,
    tx: Sender<InputEvent>,
    clock: SessionClock,
    pacing: Pacing,
}

impl<R: BufRead> LandmarkSource<R> {
    pub fn new(
        reader: LandmarkReader<R>,
        tx: Sender<InputEvent>,
        clock: SessionClock,
        pacing: Pacing,
    ) -> Self {
        Self {
            reader,
            tx,
            clock,
            pacing,
        }
    }

    pub fn run(mut self) {
        info!(
            "Landmark stream: {}x{} @ {} fps ({:?})",
            self.reader.header.width, self.reader.header.height, self.reader.header.fps, self.pacing
        );

        let start = Instant::now();
        let mut first_ts: Option<u64> = None;
        let mut sent: u64 = 0;
        let mut skipped: u64 = 0;

        while let Some(result) = self.reader.next_frame() {
            let mut frame = match result {
                Ok(f) => f,
                Err(e @ FrameError::Parse(_)) => {
                    warn!("Skipping landmark line: {}", e);
                    skipped += 1;
                    continue;
                }
                Err(e @ FrameError::Io(_)) => {
                    error!("Landmark stream failed: {}", e);
                    break;
                }
            };

            match self.pacing {
                Pacing::Live => frame.timestamp_us = self.clock.now_us(),
                Pacing::Recorded => {
                    // Pace to real time relative to the first recorded frame
                    let first = *first_ts.get_or_insert(frame.timestamp_us);
                    let target = Duration::from_micros(frame.timestamp_us.saturating_sub(first));
                    let elapsed = start.elapsed();
                    if elapsed < target {
                        thread::sleep(target - elapsed);
                    }
                }
                Pacing::Unpaced => {}
            }

            if self.tx.send(InputEvent::Frame(frame)).is_err() {
                // Coordinator shut down, stop reading
                break;
            }
            sent += 1;
        }

        info!("Landmark stream ended: {} frames, {} skipped lines", sent, skipped);
    }
}
