pub mod config;
pub mod console_display;
pub mod coordinator;
pub mod data_logger;
pub mod debounce;
pub mod finger_tracker;
pub mod key_state;
pub mod landmark_reader;
pub mod layout;
pub mod osc_sender;
pub mod render;
pub mod simulator;
pub mod sound;
pub mod types;
pub mod visual;

#[cfg(feature = "audio")]
pub mod audio_out;
