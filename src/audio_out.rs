use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender};
use log::{error, info, warn};
use std::sync::Arc;

use crate::sound::{Sample, SampleBank, SoundPlayer};
use crate::types::KeyId;

/// Voices beyond this many are dropped, oldest first.
const MAX_VOICES: usize = 32;
/// Per-voice gain, leaves headroom for chords.
const VOICE_GAIN: f32 = 0.5;

/// Native sample playback via cpal.
///
/// Holds the cpal `Stream` alive. Drop this to stop playback. `play` only
/// queues a voice for the audio callback, so it never waits on the device.
pub struct NativePlayer {
    _stream: Stream,
    voice_tx: Sender<Voice>,
    bank: SampleBank,
    out_rate: u32,
}

impl NativePlayer {
    /// Open the default output device and start the stream.
    pub fn start(bank: SampleBank) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("No default audio output device found"))?;

        info!(
            "Audio output: {}",
            device.name().unwrap_or_else(|_| "unknown".into())
        );

        let supported = device.default_output_config()?;
        let format = supported.sample_format();
        let out_rate = supported.sample_rate().0;
        let config: StreamConfig = supported.into();
        let channels = config.channels as usize;
        info!("Playback config: {}Hz  {} ch  {:?}", out_rate, channels, format);

        // Voices travel to the realtime callback without locking
        let (voice_tx, voice_rx) = crossbeam_channel::bounded::<Voice>(64);
        let mut mixer = Mixer::new(voice_rx);
        let err_fn = |e: cpal::StreamError| error!("Audio stream error: {e}");

        let stream = match format {
            SampleFormat::F32 => device.build_output_stream(
                &config,
                move |data: &mut [f32], _| mixer.fill(data, channels),
                err_fn,
                None,
            )?,
            SampleFormat::I16 => {
                let mut scratch: Vec<f32> = Vec::new();
                device.build_output_stream(
                    &config,
                    move |data: &mut [i16], _| {
                        scratch.resize(data.len(), 0.0);
                        mixer.fill(&mut scratch, channels);
                        for (out, &s) in data.iter_mut().zip(scratch.iter()) {
                            *out = (s * i16::MAX as f32) as i16;
                        }
                    },
                    err_fn,
                    None,
                )?
            }
            fmt => anyhow::bail!("Unsupported sample format {fmt:?}. Use an F32 or I16 device."),
        };

        stream.play()?;

        Ok(Self {
            _stream: stream,
            voice_tx,
            bank,
            out_rate,
        })
    }
}

impl SoundPlayer for NativePlayer {
    fn play(&mut self, key: KeyId) {
        let voice = Voice::new(self.bank.sample_for(key), self.out_rate);
        if self.voice_tx.try_send(voice).is_err() {
            warn!("Audio queue full, dropped note {}", key);
        }
    }
}

// ─── Mixing ──────────────────────────────────────────────────────────────────

/// One sounding sample, stepped at the ratio of sample rate to output rate.
struct Voice {
    data: Arc<Vec<f32>>,
    pos: f64,
    step: f64,
}

impl Voice {
    fn new(sample: &Sample, out_rate: u32) -> Self {
        Self {
            data: Arc::clone(&sample.data),
            pos: 0.0,
            step: sample.sample_rate as f64 / out_rate.max(1) as f64,
        }
    }

    fn next(&mut self) -> Option<f32> {
        let s = *self.data.get(self.pos as usize)?;
        self.pos += self.step;
        Some(s)
    }
}

struct Mixer {
    rx: Receiver<Voice>,
    voices: Vec<Voice>,
}

impl Mixer {
    fn new(rx: Receiver<Voice>) -> Self {
        Self {
            rx,
            voices: Vec::with_capacity(MAX_VOICES),
        }
    }

    /// Fill an interleaved buffer; every channel gets the same mono mix.
    fn fill(&mut self, out: &mut [f32], channels: usize) {
        while let Ok(v) = self.rx.try_recv() {
            if self.voices.len() == MAX_VOICES {
                self.voices.remove(0);
            }
            self.voices.push(v);
        }

        for frame in out.chunks_mut(channels.max(1)) {
            let mut mix = 0.0f32;
            for v in &mut self.voices {
                if let Some(s) = v.next() {
                    mix += s * VOICE_GAIN;
                }
            }
            let mix = mix.clamp(-1.0, 1.0);
            frame.iter_mut().for_each(|o| *o = mix);
        }

        self.voices.retain(|v| (v.pos as usize) < v.data.len());
    }
}
