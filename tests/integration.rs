//! End-to-end integration tests for the air piano pipeline.
//!
//! These tests exercise the full data flow:
//!   frame source → InputEvent channel → Coordinator → PianoFrame channel → assertions
//!
//! Notes are captured with a `RecordingPlayer` instead of a sound device.

use crossbeam_channel::bounded;
use std::io::Cursor;
use std::thread;

use air_piano::config::PianoConfig;
use air_piano::coordinator::Coordinator;
use air_piano::data_logger::DataLogger;
use air_piano::landmark_reader::{LandmarkReader, LandmarkSource, Pacing};
use air_piano::simulator::Simulator;
use air_piano::sound::RecordingPlayer;
use air_piano::types::*;

// ─── Helpers ───────────────────────────────────────────────────────────────

const SEC: u64 = 1_000_000;
const W: u32 = 700;
const H: u32 = 480;

// 10 white keys at 700px: white key 3 spans [210, 280), below the black keys
const KEY3: (f32, f32) = (245.0, 150.0);
const OFF_KEYS: (f32, f32) = (245.0, 400.0);

fn config() -> PianoConfig {
    let mut cfg = PianoConfig::default();
    cfg.layout.white_keys = 10;
    cfg.mirror = false;
    cfg
}

/// A hand with only the index fingertip at pixel (x, y); the other tips sit
/// below the keyboard.
fn index_at((x, y): (f32, f32)) -> Hand {
    let below = (0.5, 0.95);
    Hand::with_fingertips([below, (x / W as f32, y / H as f32), below, below, below])
}

fn frame_at(t: u64, hands: Vec<Hand>) -> InputEvent {
    InputEvent::Frame(HandFrame {
        timestamp_us: t,
        width: W,
        height: H,
        hands,
    })
}

/// Run a coordinator in a background thread, feeding it a sequence of events.
/// Collects output PianoFrames until the input channel closes.
fn run_pipeline(events: Vec<InputEvent>, config: PianoConfig) -> (Vec<PianoFrame>, RecordingPlayer) {
    let (input_tx, input_rx) = bounded::<InputEvent>(4096);
    let (frame_tx, frame_rx) = bounded::<PianoFrame>(4096);
    let rec = RecordingPlayer::new();
    let player = Box::new(rec.clone());

    let coord_handle = thread::Builder::new()
        .name("test-coordinator".into())
        .spawn(move || {
            Coordinator::new(input_rx, vec![frame_tx], config, player).run();
        })
        .unwrap();

    for event in events {
        input_tx.send(event).unwrap();
    }
    drop(input_tx);

    coord_handle.join().unwrap();
    (frame_rx.iter().collect(), rec)
}

fn triggered(frames: &[PianoFrame]) -> Vec<(u64, usize, bool)> {
    frames
        .iter()
        .flat_map(|f| f.triggers.iter().map(|t| (t.timestamp_us, t.key.index, t.resting)))
        .collect()
}

// ─── Replay and visual timing ──────────────────────────────────────────────

#[test]
fn test_relanding_suppressed_then_resting_resounds() {
    let events = vec![
        frame_at(0, vec![index_at(KEY3)]),
        frame_at(SEC, vec![index_at(OFF_KEYS)]),
        frame_at(2 * SEC, vec![index_at(KEY3)]),
        frame_at(4 * SEC, vec![index_at(KEY3)]),
        frame_at(6 * SEC, vec![index_at(KEY3)]),
    ];
    let (frames, rec) = run_pipeline(events, config());

    assert_eq!(frames.len(), 5);
    assert_eq!(triggered(&frames), vec![(0, 3, false), (6 * SEC, 3, true)]);
    assert_eq!(rec.played().len(), 2);
}

#[test]
fn test_exactly_interval_is_not_enough() {
    let events = vec![
        frame_at(0, vec![index_at(KEY3)]),
        frame_at(5 * SEC, vec![index_at(KEY3)]),
        frame_at(5 * SEC + 1, vec![index_at(KEY3)]),
    ];
    let (frames, _) = run_pipeline(events, config());
    assert_eq!(triggered(&frames), vec![(0, 3, false), (5 * SEC + 1, 3, true)]);
}

#[test]
fn test_visual_clears_at_exactly_hold() {
    let hold = config().visual_hold_us();
    let events = vec![
        frame_at(0, vec![index_at(KEY3)]),
        frame_at(hold - 1, vec![]),
        frame_at(hold, vec![]),
    ];
    let (frames, _) = run_pipeline(events, config());
    assert!(frames[0].pressed[3]);
    assert!(frames[1].pressed[3]);
    assert!(!frames[2].pressed[3]);
    assert_eq!(frames[2].pressed_count(), 0);
}

#[test]
fn test_quit_stops_processing() {
    let events = vec![
        frame_at(0, vec![index_at(KEY3)]),
        InputEvent::Quit,
        frame_at(6 * SEC, vec![index_at(OFF_KEYS)]),
        frame_at(7 * SEC, vec![index_at(KEY3)]),
    ];
    let (frames, rec) = run_pipeline(events, config());
    assert_eq!(frames.len(), 1);
    assert_eq!(rec.played().len(), 1);
}

// ─── Hit-testing through the pipeline ──────────────────────────────────────

#[test]
fn test_no_black_keys_point_maps_to_white_key_1() {
    let mut cfg = config();
    cfg.layout.black_offsets = Some(vec![]);
    let (frames, _) = run_pipeline(vec![frame_at(0, vec![index_at((75.0, 50.0))])], cfg);
    assert_eq!(frames[0].pressed.len(), 10);
    assert_eq!(triggered(&frames), vec![(0, 1, false)]);
}

#[test]
fn test_black_key_wins_over_white_beneath() {
    let events = vec![
        frame_at(0, vec![index_at((75.0, 50.0))]),
        frame_at(SEC, vec![index_at((75.0, 130.0))]),
    ];
    let (frames, rec) = run_pipeline(events, config());
    assert_eq!(triggered(&frames), vec![(0, 10, false), (SEC, 1, false)]);
    assert_eq!(rec.played()[0].kind, KeyKind::Black);
    assert_eq!(rec.played()[1].kind, KeyKind::White);
}

// ─── Sources ───────────────────────────────────────────────────────────────

#[test]
fn test_landmark_stream_end_to_end() {
    let tip = |x: f32, y: f32| {
        let mut lm = vec![[0.0f32, 0.0]; HAND_LANDMARK_COUNT];
        lm[8] = [x / W as f32, y / H as f32];
        lm[4] = [0.1, 0.95];
        lm[12] = [0.3, 0.95];
        lm[16] = [0.5, 0.95];
        lm[20] = [0.7, 0.95];
        serde_json::to_string(&lm).unwrap()
    };
    let stream = format!(
        "{{\"format\":\"air-piano-landmarks\",\"width\":{W},\"height\":{H},\"fps\":30}}\n\
         {{\"t\":0,\"hands\":[{}]}}\n\
         not json\n\
         {{\"t\":3000000,\"hands\":[]}}\n\
         {{\"t\":3100000,\"hands\":[{}]}}\n",
        tip(KEY3.0, KEY3.1),
        tip(KEY3.0, KEY3.1),
    );

    let (input_tx, input_rx) = bounded::<InputEvent>(64);
    let (frame_tx, frame_rx) = bounded::<PianoFrame>(64);
    let rec = RecordingPlayer::new();
    let player = Box::new(rec.clone());

    let reader = LandmarkReader::open(Cursor::new(stream.into_bytes())).unwrap();
    let source = thread::spawn(move || {
        LandmarkSource::new(reader, input_tx, SessionClock::new(), Pacing::Unpaced).run();
    });
    Coordinator::new(input_rx, vec![frame_tx], config(), player).run();
    source.join().unwrap();

    let frames: Vec<PianoFrame> = frame_rx.iter().collect();
    assert_eq!(frames.len(), 3, "malformed line skipped");
    // lifted in between, but still within the replay interval
    assert_eq!(triggered(&frames), vec![(0, 3, false)]);
    assert_eq!(rec.played().len(), 1);
}

#[test]
fn test_simulator_session_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config();
    cfg.layout.white_keys = 7;

    let (input_tx, input_rx) = bounded::<InputEvent>(4096);
    let (log_tx, log_rx) = bounded::<PianoFrame>(4096);
    let logger = DataLogger::new(log_rx, dir.path(), cfg.clone()).unwrap();
    let session_dir = logger.session_dir().to_path_buf();

    let sim_cfg = cfg.clone();
    let sim = thread::spawn(move || {
        Simulator::new(SessionClock::new(), input_tx, &sim_cfg, 1280, 720, 30)
            .unpaced()
            .run("scale");
    });
    let log = thread::spawn(move || logger.run());

    let rec = RecordingPlayer::new();
    Coordinator::new(input_rx, vec![log_tx], cfg, Box::new(rec.clone())).run();
    sim.join().unwrap();
    log.join().unwrap().unwrap();

    assert_eq!(rec.played().len(), 7);
    let stats: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(session_dir.join("stats.json")).unwrap())
            .unwrap();
    assert_eq!(stats["total_notes"], 7);
    assert!(session_dir.join("frames.jsonl").exists());
    assert!(session_dir.join("manifest.json").exists());
}
