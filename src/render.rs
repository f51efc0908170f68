//! Draw list for the overlay. Drawing itself belongs to whatever window or
//! video sink consumes the list; commands are in back-to-front order.

use crate::layout::KeyboardLayout;
use crate::types::{FingertipState, KeyKind, KeyRect, Point};
use serde::{Deserialize, Serialize};

/// RGB, 0–255 per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u8, pub u8, pub u8);

pub const WHITE_KEY: Color = Color(255, 255, 255);
pub const WHITE_KEY_PRESSED: Color = Color(192, 192, 192);
pub const BLACK_KEY: Color = Color(0, 0, 0);
pub const BLACK_KEY_PRESSED: Color = Color(128, 128, 128);
pub const KEY_BORDER: Color = Color(0, 0, 0);
pub const FINGERTIP: Color = Color(0, 255, 0);

pub const BORDER_PX: u32 = 2;
pub const FINGERTIP_RADIUS_PX: f32 = 10.0;
/// Distance from a key's bottom edge to its label baseline.
pub const LABEL_OFFSET_PX: f32 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    FillRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Color,
    },
    OutlineRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Color,
        thickness: u32,
    },
    Label {
        text: String,
        at: Point,
        color: Color,
    },
    Marker {
        at: Point,
        radius: f32,
        color: Color,
    },
}

fn fill(key: &KeyRect, color: Color) -> DrawCommand {
    DrawCommand::FillRect {
        x: key.x_start,
        y: 0.0,
        w: key.width(),
        h: key.height,
        color,
    }
}

/// Build the overlay: white keys (fill, border, label), then black keys on
/// top, then fingertip markers.
///
/// `pressed` is indexed by combined key index; missing entries read as not
/// pressed.
pub fn draw_list(
    layout: &KeyboardLayout,
    pressed: &[bool],
    fingertips: &[FingertipState],
) -> Vec<DrawCommand> {
    let is_pressed = |i: usize| pressed.get(i).copied().unwrap_or(false);
    let mut cmds = Vec::with_capacity(layout.white.len() * 3 + layout.black.len() * 2 + fingertips.len());

    for key in &layout.white {
        let color = if is_pressed(key.id.index) {
            WHITE_KEY_PRESSED
        } else {
            WHITE_KEY
        };
        cmds.push(fill(key, color));
        cmds.push(DrawCommand::OutlineRect {
            x: key.x_start,
            y: 0.0,
            w: key.width(),
            h: key.height,
            color: KEY_BORDER,
            thickness: BORDER_PX,
        });
        cmds.push(DrawCommand::Label {
            text: key.id.label().to_string(),
            at: Point::new(key.x_start + 10.0, key.height + LABEL_OFFSET_PX),
            color: KEY_BORDER,
        });
    }

    for key in &layout.black {
        debug_assert_eq!(key.id.kind, KeyKind::Black);
        let color = if is_pressed(key.id.index) {
            BLACK_KEY_PRESSED
        } else {
            BLACK_KEY
        };
        cmds.push(fill(key, color));
        cmds.push(DrawCommand::Label {
            text: key.id.label().to_string(),
            at: Point::new(key.x_start + 5.0, key.height + LABEL_OFFSET_PX),
            color: WHITE_KEY,
        });
    }

    for tip in fingertips {
        cmds.push(DrawCommand::Marker {
            at: tip.position,
            radius: FINGERTIP_RADIUS_PX,
            color: FINGERTIP,
        });
    }

    cmds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;

    fn fills(cmds: &[DrawCommand]) -> Vec<Color> {
        cmds.iter()
            .filter_map(|c| match c {
                DrawCommand::FillRect { color, .. } => Some(*color),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_order_white_then_black_then_markers() {
        let layout = KeyboardLayout::generate(700, 480, &LayoutConfig::default());
        let tips = [FingertipState {
            hand: 0,
            finger: 1,
            position: Point::new(10.0, 10.0),
            key: Some(0),
        }];
        let cmds = draw_list(&layout, &[], &tips);
        assert_eq!(cmds.len(), 7 * 3 + 5 * 2 + 1);
        let colors = fills(&cmds);
        assert!(colors[..7].iter().all(|&c| c == WHITE_KEY));
        assert!(colors[7..].iter().all(|&c| c == BLACK_KEY));
        assert!(matches!(cmds.last(), Some(DrawCommand::Marker { .. })));
    }

    #[test]
    fn test_pressed_keys_change_fill() {
        let layout = KeyboardLayout::generate(700, 480, &LayoutConfig::default());
        let mut pressed = vec![false; layout.key_count()];
        pressed[2] = true;
        pressed[7] = true; // first black key
        let colors = fills(&draw_list(&layout, &pressed, &[]));
        assert_eq!(colors[2], WHITE_KEY_PRESSED);
        assert_eq!(colors[1], WHITE_KEY);
        assert_eq!(colors[7], BLACK_KEY_PRESSED);
        assert_eq!(colors[8], BLACK_KEY);
    }

    #[test]
    fn test_labels_use_note_names() {
        let layout = KeyboardLayout::generate(700, 480, &LayoutConfig::default());
        let labels: Vec<String> = draw_list(&layout, &[], &[])
            .into_iter()
            .filter_map(|c| match c {
                DrawCommand::Label { text, .. } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(labels[0], "C");
        assert_eq!(labels[6], "B");
        assert_eq!(labels[7], "C#");
    }
}
