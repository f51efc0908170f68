use std::collections::HashMap;

/// Runtime record for one key, kept for the whole session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyRuntime {
    /// When the key last sounded (µs); `None` until its first trigger.
    pub last_trigger_us: Option<u64>,
    /// When the key last lit up (µs); set together with every trigger.
    pub last_visual_us: Option<u64>,
}

/// Key index → runtime record. Keys that never triggered have no entry and
/// read as the default record.
#[derive(Debug, Default)]
pub struct KeyStateTable {
    keys: HashMap<usize, KeyRuntime>,
}

impl KeyStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: usize) -> KeyRuntime {
        self.keys.get(&key).copied().unwrap_or_default()
    }

    pub fn entry(&mut self, key: usize) -> &mut KeyRuntime {
        self.keys.entry(key).or_default()
    }

    /// Number of keys that have ever triggered.
    pub fn touched(&self) -> usize {
        self.keys.len()
    }
}
