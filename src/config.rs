//! Session configuration: keyboard geometry, detection slack, timing windows
//! and sample assets.
//!
//! Stored as pretty JSON. Every field has a default so a partial file only
//! needs to name what it changes.

use crate::types::{FINGERTIP_LANDMARKS, FINGER_COUNT, US_PER_SEC};
use anyhow::{bail, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Keyboard geometry, relative to the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Number of white keys spread across the full frame width.
    pub white_keys: usize,
    /// Black key centers, in multiples of the white-key width from the left
    /// edge. `None` repeats the piano pattern (boundaries 1,2,4,5,6 of each
    /// octave) across all white keys.
    pub black_offsets: Option<Vec<f32>>,
    /// White key height as a fraction of frame height.
    pub white_height_ratio: f32,
    /// Black key width as a fraction of white key width.
    pub black_width_ratio: f32,
    /// Black key height as a fraction of white key height.
    pub black_height_ratio: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            white_keys: 7,
            black_offsets: None,
            white_height_ratio: 1.0 / 3.0,
            black_width_ratio: 0.55,
            black_height_ratio: 0.65,
        }
    }
}

/// Black key boundaries within one octave of seven white keys.
const OCTAVE_BLACK_BOUNDARIES: [usize; 5] = [1, 2, 4, 5, 6];

impl LayoutConfig {
    /// Black key centers in white-key widths, explicit or derived.
    pub fn black_key_offsets(&self) -> Vec<f32> {
        if let Some(offsets) = &self.black_offsets {
            return offsets.clone();
        }
        let mut offsets = Vec::new();
        let mut octave = 0;
        loop {
            for &b in &OCTAVE_BLACK_BOUNDARIES {
                let center = octave * 7 + b;
                if center >= self.white_keys {
                    return offsets;
                }
                offsets.push(center as f32);
            }
            octave += 1;
        }
    }
}

/// Per-key sample files, resolved against `sample_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleConfig {
    pub sample_dir: PathBuf,
    /// White key `i` plays `white[i % len]`.
    pub white: Vec<String>,
    /// Black key `j` plays `black[j % len]`.
    pub black: Vec<String>,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            sample_dir: PathBuf::from("./samples"),
            white: ["C", "D", "E", "F", "G", "A", "B"]
                .iter()
                .map(|n| format!("{}.wav", n))
                .collect(),
            black: ["C#", "D#", "F#", "G#", "A#"]
                .iter()
                .map(|n| format!("{}.wav", n))
                .collect(),
        }
    }
}

impl SampleConfig {
    pub fn white_paths(&self) -> Vec<PathBuf> {
        self.white.iter().map(|f| self.sample_dir.join(f)).collect()
    }

    pub fn black_paths(&self) -> Vec<PathBuf> {
        self.black.iter().map(|f| self.sample_dir.join(f)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PianoConfig {
    pub layout: LayoutConfig,
    /// Extra pixels below a white key's bottom edge that still count as a hit.
    pub white_slack_px: f32,
    /// Extra pixels below a black key's bottom edge that still count as a hit.
    pub black_slack_px: f32,
    /// Minimum silence before the same key may sound again (ms).
    pub replay_interval_ms: u64,
    /// How long a key renders as pressed after its last trigger (ms).
    pub visual_hold_ms: u64,
    /// Landmark indices of thumb, index, middle, ring and pinky tips.
    pub fingertip_landmarks: [usize; FINGER_COUNT],
    /// Hands beyond this many per frame are ignored.
    pub max_hands: usize,
    /// Flip landmarks horizontally so the overlay behaves like a mirror.
    pub mirror: bool,
    pub samples: SampleConfig,
}

impl Default for PianoConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            white_slack_px: 0.0,
            black_slack_px: 20.0,
            replay_interval_ms: 5000,
            visual_hold_ms: 700,
            fingertip_landmarks: FINGERTIP_LANDMARKS,
            max_hands: 2,
            mirror: true,
            samples: SampleConfig::default(),
        }
    }
}

impl PianoConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("read config {:?}", path))?;
        let config: Self = serde_json::from_str(&data)
            .with_context(|| format!("parse config {:?}", path))?;
        config.validate()?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("write config {:?}", path))?;
        info!("Config saved to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let l = &self.layout;
        if l.white_keys == 0 {
            bail!("layout.white_keys must be at least 1");
        }
        for (name, v) in [
            ("white_height_ratio", l.white_height_ratio),
            ("black_width_ratio", l.black_width_ratio),
            ("black_height_ratio", l.black_height_ratio),
        ] {
            if !(v > 0.0 && v.is_finite()) {
                bail!("layout.{} must be positive, got {}", name, v);
            }
        }
        if self.white_slack_px < 0.0 || self.black_slack_px < 0.0 {
            bail!("hit-test slack must not be negative");
        }
        for (name, ms) in [
            ("replay_interval_ms", self.replay_interval_ms),
            ("visual_hold_ms", self.visual_hold_ms),
        ] {
            if ms > MAX_WINDOW_MS {
                bail!("{} must be at most {} (one day), got {}", name, MAX_WINDOW_MS, ms);
            }
        }
        if self.samples.white.is_empty() || self.samples.black.is_empty() {
            bail!("samples.white and samples.black must each name at least one file");
        }
        Ok(())
    }

    pub fn replay_interval_us(&self) -> u64 {
        ms_to_us(self.replay_interval_ms)
    }

    pub fn visual_hold_us(&self) -> u64 {
        ms_to_us(self.visual_hold_ms)
    }
}

/// Upper bound for the replay and visual windows.
const MAX_WINDOW_MS: u64 = 24 * 60 * 60 * 1000;

fn ms_to_us(ms: u64) -> u64 {
    ms.saturating_mul(US_PER_SEC / 1000)
}
