//! Keyboard geometry, re-derived from the frame size every frame.

use crate::config::LayoutConfig;
use crate::types::{KeyId, KeyRect};

/// White and black key rectangles for one frame size.
///
/// Combined key indices are `0..white.len()` for white keys followed by
/// `white.len()..white.len() + black.len()` for black keys.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyboardLayout {
    pub width: u32,
    pub height: u32,
    pub white: Vec<KeyRect>,
    pub black: Vec<KeyRect>,
}

impl KeyboardLayout {
    /// Lay out `config.white_keys` equal white keys across the full frame
    /// width, then one black key centered on each configured offset.
    ///
    /// Never fails: a frame narrower than the key count just produces very
    /// narrow (or zero-width) keys that nothing will hit.
    pub fn generate(width: u32, height: u32, config: &LayoutConfig) -> Self {
        let n = config.white_keys;
        let white_w = if n == 0 { 0.0 } else { width as f32 / n as f32 };
        let white_h = height as f32 * config.white_height_ratio;

        let white = (0..n)
            .map(|i| KeyRect {
                id: KeyId::white(i),
                x_start: i as f32 * white_w,
                x_end: (i + 1) as f32 * white_w,
                height: white_h,
            })
            .collect();

        let black_w = white_w * config.black_width_ratio;
        let black_h = white_h * config.black_height_ratio;
        let black = config
            .black_key_offsets()
            .into_iter()
            .enumerate()
            .map(|(j, offset)| {
                let center = offset * white_w;
                KeyRect {
                    id: KeyId::black(j, n + j, offset),
                    x_start: center - black_w / 2.0,
                    x_end: center + black_w / 2.0,
                    height: black_h,
                }
            })
            .collect();

        Self {
            width,
            height,
            white,
            black,
        }
    }

    pub fn key_count(&self) -> usize {
        self.white.len() + self.black.len()
    }

    /// Look up a key by combined index.
    pub fn key(&self, index: usize) -> Option<&KeyRect> {
        if index < self.white.len() {
            self.white.get(index)
        } else {
            self.black.get(index - self.white.len())
        }
    }

    /// All keys in combined-index order: white keys, then black keys.
    pub fn keys(&self) -> impl Iterator<Item = &KeyRect> {
        self.white.iter().chain(self.black.iter())
    }
}
