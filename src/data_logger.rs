use crate::config::PianoConfig;
use crate::types::*;
use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use log::info;
use serde_json::json;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Records a session to `<output_dir>/session_<unix secs>/`:
/// `manifest.json` (config), `frames.jsonl` (one `CompactFrame` per line)
/// and `stats.json` written at shutdown.
pub struct DataLogger {
    rx: Receiver<PianoFrame>,
    session_dir: PathBuf,
    config: PianoConfig,
}

impl DataLogger {
    pub fn new(rx: Receiver<PianoFrame>, output_dir: &Path, config: PianoConfig) -> Result<Self> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let session_dir = output_dir.join(format!("session_{}", timestamp));
        fs::create_dir_all(&session_dir)
            .with_context(|| format!("create session dir {:?}", session_dir))?;

        Ok(Self {
            rx,
            session_dir,
            config,
        })
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Run the logger until the coordinator hangs up. Blocks the calling thread.
    pub fn run(&self) -> Result<()> {
        info!("Data logger → {:?}", self.session_dir);

        self.write_manifest()?;

        let frames_path = self.session_dir.join("frames.jsonl");
        let frames_file = File::create(&frames_path)
            .with_context(|| format!("create {:?}", frames_path))?;
        let mut frames_writer = BufWriter::new(frames_file);

        let mut frame_count: u64 = 0;
        let mut notes_per_key: BTreeMap<usize, u64> = BTreeMap::new();
        let mut first_ts: Option<u64> = None;
        let mut last_ts: u64 = 0;

        for frame in self.rx.iter() {
            let line = serde_json::to_string(&CompactFrame::from(&frame))?;
            writeln!(frames_writer, "{}", line)?;
            frame_count += 1;
            first_ts.get_or_insert(frame.timestamp_us);
            last_ts = frame.timestamp_us;
            for trigger in &frame.triggers {
                *notes_per_key.entry(trigger.key.index).or_default() += 1;
            }

            if frame_count % 1000 == 0 {
                frames_writer.flush()?;
                info!("Logged {} frames", frame_count);
            }
        }
        frames_writer.flush()?;

        let total_notes: u64 = notes_per_key.values().sum();
        let duration_us = last_ts.saturating_sub(first_ts.unwrap_or(last_ts));
        let stats = json!({
            "total_frames": frame_count,
            "total_notes": total_notes,
            "duration_secs": duration_us as f64 / US_PER_SEC as f64,
            "notes_per_key": notes_per_key,
        });
        let stats_path = self.session_dir.join("stats.json");
        fs::write(&stats_path, serde_json::to_string_pretty(&stats)?)
            .with_context(|| format!("write {:?}", stats_path))?;

        info!(
            "Session saved: {} frames, {} notes → {:?}",
            frame_count, total_notes, self.session_dir
        );
        Ok(())
    }

    fn write_manifest(&self) -> Result<()> {
        let manifest = json!({
            "version": env!("CARGO_PKG_VERSION"),
            "system": "air-piano",
            "config": self.config,
            "frame_format": {
                "t": "timestamp_us",
                "w": "width",
                "h": "height",
                "p": "pressed key indices",
                "f": "fingertips [hand, finger, x, y, key or -1]",
                "k": "triggered key indices",
            },
        });

        let path = self.session_dir.join("manifest.json");
        fs::write(&path, serde_json::to_string_pretty(&manifest)?)
            .with_context(|| format!("write {:?}", path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn frame(t: u64, triggered: &[usize]) -> PianoFrame {
        PianoFrame {
            timestamp_us: t,
            width: 700,
            height: 480,
            pressed: vec![false; 12],
            fingertips: vec![],
            triggers: triggered
                .iter()
                .map(|&i| Trigger {
                    timestamp_us: t,
                    key: KeyId::white(i),
                    resting: false,
                })
                .collect(),
            draw: vec![],
        }
    }

    #[test]
    fn test_writes_manifest_frames_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = unbounded();
        let logger = DataLogger::new(rx, dir.path(), PianoConfig::default()).unwrap();
        tx.send(frame(0, &[3])).unwrap();
        tx.send(frame(500_000, &[])).unwrap();
        tx.send(frame(2_000_000, &[3, 4])).unwrap();
        drop(tx);
        logger.run().unwrap();

        let session = logger.session_dir();
        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(session.join("manifest.json")).unwrap())
                .unwrap();
        assert_eq!(manifest["system"], "air-piano");
        assert_eq!(manifest["config"]["replay_interval_ms"], 5000);

        let lines: Vec<CompactFrame> = fs::read_to_string(session.join("frames.jsonl"))
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].k, vec![3, 4]);

        let stats: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(session.join("stats.json")).unwrap())
                .unwrap();
        assert_eq!(stats["total_frames"], 3);
        assert_eq!(stats["total_notes"], 3);
        assert_eq!(stats["notes_per_key"]["3"], 2);
        assert_eq!(stats["duration_secs"], 2.0);
    }
}
