//! Sound playback seam and the WAV sample bank behind it.

use crate::config::SampleConfig;
use crate::types::{KeyId, KeyKind};
use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader};
use log::{debug, info};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Plays the note for a key. Called exactly once per trigger, from the frame
/// loop, and must not block on the audio finishing.
pub trait SoundPlayer {
    fn play(&mut self, key: KeyId);
}

// ─── Samples ────────────────────────────────────────────────────────────────

/// A decoded mono sample, normalized -1.0 to 1.0.
#[derive(Debug, Clone)]
pub struct Sample {
    pub name: String,
    pub sample_rate: u32,
    pub data: Arc<Vec<f32>>,
}

impl Sample {
    pub fn duration_secs(&self) -> f64 {
        self.data.len() as f64 / self.sample_rate as f64
    }
}

/// Decode a WAV file to mono f32.
pub fn decode_wav(path: &Path) -> Result<Sample> {
    let reader = WavReader::open(path).with_context(|| format!("open WAV {:?}", path))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()
            .with_context(|| format!("decode WAV {:?}", path))?,
        SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<Vec<f32>, _>>()
                .with_context(|| format!("decode WAV {:?}", path))?
        }
    };

    let mono: Vec<f32> = if channels <= 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    if mono.is_empty() {
        bail!("WAV {:?} contains no samples", path);
    }

    let sample = Sample {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        sample_rate: spec.sample_rate,
        data: Arc::new(mono),
    };
    debug!(
        "Decoded {} ({:.2}s @ {}Hz, {} ch)",
        sample.name,
        sample.duration_secs(),
        sample.sample_rate,
        channels
    );
    Ok(sample)
}

/// All note samples, loaded up front so a missing file stops the session
/// before the first frame instead of silently dropping notes later.
#[derive(Debug, Clone)]
pub struct SampleBank {
    white: Vec<Sample>,
    black: Vec<Sample>,
}

impl SampleBank {
    pub fn load(config: &SampleConfig) -> Result<Self> {
        let white = config
            .white_paths()
            .iter()
            .map(|p| decode_wav(p))
            .collect::<Result<Vec<_>>>()
            .context("load white key samples")?;
        let black = config
            .black_paths()
            .iter()
            .map(|p| decode_wav(p))
            .collect::<Result<Vec<_>>>()
            .context("load black key samples")?;
        if white.is_empty() || black.is_empty() {
            bail!("sample bank needs at least one white and one black sample");
        }
        info!(
            "Sample bank: {} white, {} black from {:?}",
            white.len(),
            black.len(),
            config.sample_dir
        );
        Ok(Self { white, black })
    }

    /// Sample for a key; ordinals wrap around the per-kind list.
    pub fn sample_for(&self, key: KeyId) -> &Sample {
        let list = match key.kind {
            KeyKind::White => &self.white,
            KeyKind::Black => &self.black,
        };
        &list[key.ordinal % list.len()]
    }
}

// ─── Players ────────────────────────────────────────────────────────────────

/// Logs each note instead of playing it (muted or headless sessions).
#[derive(Default)]
pub struct LogPlayer {
    bank: Option<SampleBank>,
}

impl LogPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bank(bank: SampleBank) -> Self {
        Self { bank: Some(bank) }
    }
}

impl SoundPlayer for LogPlayer {
    fn play(&mut self, key: KeyId) {
        match &self.bank {
            Some(bank) => debug!("♪ {} → {}", key, bank.sample_for(key).name),
            None => debug!("♪ {}", key),
        }
    }
}

/// Records every played key. Clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingPlayer {
    played: Arc<Mutex<Vec<KeyId>>>,
}

impl RecordingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<KeyId> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl SoundPlayer for RecordingPlayer {
    fn play(&mut self, key: KeyId) {
        if let Ok(mut played) = self.played.lock() {
            played.push(key);
        }
    }
}
