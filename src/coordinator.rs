use crate::config::PianoConfig;
use crate::debounce::ReplayGate;
use crate::finger_tracker::{FingerEvent, FingerSlot, FingerTracker};
use crate::hit_test::{self, HitSlack};
use crate::key_state::KeyStateTable;
use crate::layout::KeyboardLayout;
use crate::render;
use crate::sound::SoundPlayer;
use crate::types::*;
use crate::visual::VisualTracker;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, trace};

/// The per-frame key-press pipeline:
/// landmarks → hit test → finger tracker → replay gate → sound + visual.
///
/// Owns all session state (finger slots, per-key runtime records). Layout is
/// re-derived from each frame's size, so a resolution change mid-session is
/// picked up on the next frame.
pub struct PianoCore {
    config: PianoConfig,
    slack: HitSlack,
    gate: ReplayGate,
    visual: VisualTracker,
    tracker: FingerTracker,
    keys: KeyStateTable,
    frame_size: Option<(u32, u32)>,
}

impl PianoCore {
    pub fn new(config: PianoConfig) -> Self {
        Self {
            slack: HitSlack {
                white_px: config.white_slack_px,
                black_px: config.black_slack_px,
            },
            gate: ReplayGate::new(config.replay_interval_us()),
            visual: VisualTracker::new(config.visual_hold_us()),
            tracker: FingerTracker::new(config.max_hands),
            keys: KeyStateTable::new(),
            frame_size: None,
            config,
        }
    }

    pub fn keys(&self) -> &KeyStateTable {
        &self.keys
    }

    /// Run one frame to completion. Every emitted trigger has already been
    /// handed to `player` when this returns.
    pub fn process(&mut self, frame: &HandFrame, player: &mut dyn SoundPlayer) -> PianoFrame {
        let t = frame.timestamp_us;
        let tip_landmarks = self.config.fingertip_landmarks;
        let max_hands = self.config.max_hands;
        let mirror = self.config.mirror;
        let layout = KeyboardLayout::generate(frame.width, frame.height, &self.config.layout);
        if self.frame_size != Some((frame.width, frame.height)) {
            debug!(
                "Keyboard laid out for {}x{}: {} keys",
                frame.width,
                frame.height,
                layout.key_count()
            );
            self.frame_size = Some((frame.width, frame.height));
        }
        let mut fingertips = Vec::new();
        let mut triggers = Vec::new();

        if frame.hands.len() > max_hands {
            trace!(
                "{} hands detected, tracking the first {}",
                frame.hands.len(),
                max_hands
            );
        }

        for (hand_idx, hand) in frame.hands.iter().take(max_hands).enumerate() {
            for (finger, &landmark_idx) in tip_landmarks.iter().enumerate() {
                // a truncated landmark set leaves the slot unobserved
                let Some(lm) = hand.landmark(landmark_idx) else {
                    continue;
                };
                let position = lm.to_pixels(frame.width, frame.height, mirror);
                let hit = hit_test::resolve(position, &layout, self.slack);
                let slot = FingerSlot { hand: hand_idx, finger };

                let fired = match self.tracker.observe(slot, hit) {
                    FingerEvent::Landing(k) => self
                        .gate
                        .on_landing(self.keys.entry(k), t)
                        .then_some((k, false)),
                    FingerEvent::Resting(k) => self
                        .gate
                        .on_resting(self.keys.entry(k), t)
                        .then_some((k, true)),
                    FingerEvent::Off => None,
                };

                if let Some((k, resting)) = fired {
                    if let Some(rect) = layout.key(k) {
                        let trigger = Trigger {
                            timestamp_us: t,
                            key: rect.id,
                            resting,
                        };
                        self.emit(trigger, player);
                        triggers.push(trigger);
                    }
                }

                fingertips.push(FingertipState {
                    hand: hand_idx,
                    finger,
                    position,
                    key: hit,
                });
            }
        }
        self.tracker.end_frame();

        let pressed: Vec<bool> = layout
            .keys()
            .map(|k| self.visual.is_pressed(&self.keys.get(k.id.index), t))
            .collect();
        let draw = render::draw_list(&layout, &pressed, &fingertips);

        PianoFrame {
            timestamp_us: t,
            width: frame.width,
            height: frame.height,
            pressed,
            fingertips,
            triggers,
            draw,
        }
    }

    fn emit(&mut self, trigger: Trigger, player: &mut dyn SoundPlayer) {
        debug!(
            "{} {} at {}µs",
            if trigger.resting { "re-sound" } else { "press" },
            trigger.key,
            trigger.timestamp_us
        );
        player.play(trigger.key);
        self.visual.activate(self.keys.entry(trigger.key.index), trigger.timestamp_us);
    }
}

/// Receives hand frames from the active source, runs them through
/// [`PianoCore`], plays triggered notes and fans the resulting
/// [`PianoFrame`]s out to downstream consumers.
///
/// Runs on the calling thread until the source disconnects (end of stream or
/// read failure) or an [`InputEvent::Quit`] arrives.
pub struct Coordinator {
    input_rx: Receiver<InputEvent>,
    frame_txs: Vec<Sender<PianoFrame>>,
    core: PianoCore,
    player: Box<dyn SoundPlayer>,
}

impl Coordinator {
    pub fn new(
        input_rx: Receiver<InputEvent>,
        frame_txs: Vec<Sender<PianoFrame>>,
        config: PianoConfig,
        player: Box<dyn SoundPlayer>,
    ) -> Self {
        Self {
            input_rx,
            frame_txs,
            core: PianoCore::new(config),
            player,
        }
    }

    pub fn run(&mut self) {
        info!(
            "Coordinator running (replay {}ms, visual hold {}ms)",
            self.core.gate.interval_us() / 1000,
            self.core.visual.hold_us() / 1000
        );

        let mut frame_count: u64 = 0;
        let mut trigger_count: u64 = 0;

        for event in self.input_rx.iter() {
            let frame = match event {
                InputEvent::Frame(frame) => frame,
                InputEvent::Quit => {
                    info!("Quit requested");
                    break;
                }
            };

            let out = self.core.process(&frame, self.player.as_mut());
            trigger_count += out.triggers.len() as u64;

            for tx in &self.frame_txs {
                let _ = tx.send(out.clone());
            }

            frame_count += 1;
            if frame_count % 300 == 0 {
                debug!("Coordinator: {} frames processed", frame_count);
                trace!("Latest: {}", out);
            }
        }

        info!(
            "Coordinator shutting down after {} frames, {} notes ({} keys played)",
            frame_count,
            trigger_count,
            self.core.keys().touched()
        );
    }
}
