use air_piano::config::PianoConfig;
use air_piano::console_display;
use air_piano::coordinator;
use air_piano::data_logger;
use air_piano::landmark_reader::{self, LandmarkReader, Pacing};
use air_piano::osc_sender;
use air_piano::simulator;
use air_piano::sound::{LogPlayer, SampleBank, SoundPlayer};
use air_piano::types::*;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossbeam_channel::{bounded, Sender};
use log::{error, info, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::thread;

#[derive(Parser)]
#[command(name = "air-piano")]
#[command(about = "Play a virtual piano overlay with your fingertips")]
struct Cli {
    /// Hand landmark stream (JSONL); "-" reads a live detector from stdin.
    /// Without this, the built-in simulator plays a demo.
    #[arg(long)]
    landmarks: Option<String>,

    /// Replay a recorded landmark file as fast as possible instead of in real time
    #[arg(long)]
    fast: bool,

    /// Simulator demo sequence: "scale" (default), "chord" or "linger"
    #[arg(long, default_value = "scale")]
    demo: String,

    /// Simulated frame size and rate
    #[arg(long, default_value_t = 1280)]
    width: u32,
    #[arg(long, default_value_t = 720)]
    height: u32,
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// JSON config file (layout, timing, samples)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective config to this path and exit
    #[arg(long)]
    dump_config: Option<PathBuf>,

    /// Override: number of white keys
    #[arg(long)]
    white_keys: Option<usize>,

    /// Override: minimum time between repeats of the same key (ms)
    #[arg(long)]
    replay_ms: Option<u64>,

    /// Override: how long a key stays lit after a press (ms)
    #[arg(long)]
    hold_ms: Option<u64>,

    /// Override: directory holding the note samples
    #[arg(long)]
    samples: Option<PathBuf>,

    /// Do not mirror landmarks horizontally
    #[arg(long)]
    no_mirror: bool,

    /// Log notes instead of playing samples
    #[arg(long)]
    mute: bool,

    /// Enable console display (terminal TUI)
    #[arg(long)]
    console: bool,

    /// Console display refresh rate (Hz)
    #[arg(long, default_value_t = 10)]
    display_hz: u32,

    /// Enable OSC output
    #[arg(long)]
    osc: bool,

    /// OSC target address
    #[arg(long, default_value = "127.0.0.1:9000")]
    osc_target: String,

    /// Enable session logging
    #[arg(long)]
    log_data: bool,

    /// Output directory for logged sessions
    #[arg(long, default_value = "./sessions")]
    output_dir: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    if let Err(e) = run(Cli::parse()) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn effective_config(cli: &Cli) -> Result<PianoConfig> {
    let mut config = match &cli.config {
        Some(path) => PianoConfig::load(path)?,
        None => PianoConfig::default(),
    };
    if let Some(n) = cli.white_keys {
        config.layout.white_keys = n;
    }
    if let Some(ms) = cli.replay_ms {
        config.replay_interval_ms = ms;
    }
    if let Some(ms) = cli.hold_ms {
        config.visual_hold_ms = ms;
    }
    if let Some(dir) = &cli.samples {
        config.samples.sample_dir = dir.clone();
    }
    if cli.no_mirror {
        config.mirror = false;
    }
    config.validate()?;
    Ok(config)
}

/// Load the note samples up front; a missing sample ends startup here.
fn sound_player(cli: &Cli, config: &PianoConfig) -> Result<Box<dyn SoundPlayer>> {
    if cli.mute {
        info!("Muted: notes are logged only");
        return Ok(Box::new(LogPlayer::new()));
    }
    let bank = SampleBank::load(&config.samples)?;

    #[cfg(feature = "audio")]
    {
        let player = air_piano::audio_out::NativePlayer::start(bank)
            .context("start audio output")?;
        Ok(Box::new(player))
    }
    #[cfg(not(feature = "audio"))]
    {
        warn!("Native playback requires the 'audio' feature. Notes will be logged only.");
        Ok(Box::new(LogPlayer::with_bank(bank)))
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = effective_config(&cli)?;
    if let Some(path) = &cli.dump_config {
        return config.save(path);
    }

    let clock = SessionClock::new();
    let player = sound_player(&cli, &config)?;

    info!("═══════════════════════════════════════════════");
    info!("  AIR PIANO v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "  Keys: {} white, {} black",
        config.layout.white_keys,
        config.layout.black_key_offsets().len()
    );
    info!(
        "  Replay interval: {}ms  Visual hold: {}ms",
        config.replay_interval_ms, config.visual_hold_ms
    );
    match &cli.landmarks {
        Some(src) => info!("  Source: landmark stream {}", src),
        None => info!("  Source: SIMULATOR ({})", cli.demo),
    }
    if cli.console { info!("  UI: Console TUI"); }
    info!("  Type q + Enter to quit");
    info!("═══════════════════════════════════════════════");

    // Channel: frame source → coordinator
    let (input_tx, input_rx) = bounded::<InputEvent>(256);

    // Channels: coordinator → consumers
    let mut frame_txs: Vec<Sender<PianoFrame>> = Vec::new();
    let mut handles = Vec::new();

    // ─── Console display ─────────────────────────────────────────────
    if cli.console {
        let (tx, rx) = bounded::<PianoFrame>(256);
        frame_txs.push(tx);
        let hz = cli.display_hz;
        let fps = cli.fps;
        let display = console_display::ConsoleDisplay::new(rx, hz, fps, &config.layout);
        handles.push(thread::Builder::new().name("display".into()).spawn(move || {
            display.run();
        })?);
    }

    // ─── OSC sender ─────────────────────────────────────────────────
    if cli.osc {
        let (tx, rx) = bounded::<PianoFrame>(1024);
        frame_txs.push(tx);
        let target = cli.osc_target.clone();
        handles.push(thread::Builder::new().name("osc".into()).spawn(move || {
            osc_sender::OscSender::new(rx, target).run();
        })?);
    }

    // ─── Data logger ────────────────────────────────────────────────
    if cli.log_data {
        let (tx, rx) = bounded::<PianoFrame>(4096);
        frame_txs.push(tx);
        let logger = data_logger::DataLogger::new(rx, &cli.output_dir, config.clone())?;
        handles.push(thread::Builder::new().name("logger".into()).spawn(move || {
            if let Err(e) = logger.run() {
                error!("Data logger failed: {:#}", e);
            }
        })?);
    }

    // ─── Session control ────────────────────────────────────────────
    // Not joined: it blocks on stdin and dies with the process.
    if cli.landmarks.as_deref() != Some("-") {
        let quit_tx = input_tx.clone();
        thread::Builder::new().name("control".into()).spawn(move || {
            watch_for_quit(io::stdin().lock(), quit_tx);
        })?;
    }

    // ─── Frame source ───────────────────────────────────────────────
    let source: Box<dyn FnOnce(Sender<InputEvent>) + Send> = match cli.landmarks.as_deref() {
        Some("-") => {
            let reader = LandmarkReader::open(BufReader::new(io::stdin()))
                .map_err(|e| anyhow!("landmark stream on stdin: {}", e))?;
            let clock = clock.clone();
            Box::new(move |tx| {
                landmark_reader::LandmarkSource::new(reader, tx, clock, Pacing::Live).run()
            })
        }
        Some(path) => {
            let file = File::open(path).with_context(|| format!("open landmark file {}", path))?;
            let reader = LandmarkReader::open(BufReader::new(file))
                .map_err(|e| anyhow!("landmark file {}: {}", path, e))?;
            let pacing = if cli.fast { Pacing::Unpaced } else { Pacing::Recorded };
            let clock = clock.clone();
            Box::new(move |tx| {
                landmark_reader::LandmarkSource::new(reader, tx, clock, pacing).run()
            })
        }
        None => {
            info!("Starting simulator...");
            let sim_clock = clock.clone();
            let sim_config = config.clone();
            let (w, h, fps) = (cli.width, cli.height, cli.fps);
            let demo = cli.demo.clone();
            Box::new(move |tx| {
                simulator::Simulator::new(sim_clock, tx, &sim_config, w, h, fps).run(&demo)
            })
        }
    };

    // The control thread keeps a sender alive, so the end of the source is
    // signalled explicitly rather than by disconnect.
    let end_tx = input_tx.clone();
    handles.push(thread::Builder::new().name("source".into()).spawn(move || {
        source(input_tx);
        let _ = end_tx.send(InputEvent::Quit);
    })?);

    // ─── Coordinator (this thread) ──────────────────────────────────
    // The sound player stays on this thread: native output streams are not Send.
    coordinator::Coordinator::new(input_rx, frame_txs, config, player).run();

    // Consumers exit once the coordinator drops its senders; a live source
    // exits on its next send.
    for h in handles {
        let _ = h.join();
    }
    info!("Session ended");
    Ok(())
}

/// Sends `Quit` when the user types `q`. End of input or a read error only
/// stops watching; a closed stdin (daemon, CI, `< /dev/null`) is not a quit.
fn watch_for_quit<R: BufRead>(input: R, tx: Sender<InputEvent>) {
    for line in input.lines() {
        let Ok(line) = line else { return };
        if line.trim().eq_ignore_ascii_case("q") {
            let _ = tx.send(InputEvent::Quit);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::io::Cursor;

    #[test]
    fn test_closed_input_does_not_quit() {
        let (tx, rx) = unbounded();
        watch_for_quit(Cursor::new(""), tx);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_other_lines_ignored_until_q() {
        let (tx, rx) = unbounded();
        watch_for_quit(Cursor::new("hello\n\nquit\n"), tx);
        assert!(rx.try_recv().is_err());

        let (tx, rx) = unbounded();
        watch_for_quit(Cursor::new("x\n Q \nq\n"), tx);
        assert!(matches!(rx.try_recv(), Ok(InputEvent::Quit)));
        assert!(rx.try_recv().is_err(), "one quit only");
    }
}
