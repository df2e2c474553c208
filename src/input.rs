use glam::Vec2;
use serde::{Deserialize, Serialize};
use winit::event::{MouseButton as WinitMouseButton, MouseScrollDelta, VirtualKeyCode};

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

pub fn map_mouse_button(button: WinitMouseButton) -> MouseButton {
    let index = match button {
        WinitMouseButton::Left => 0,
        WinitMouseButton::Right => 1,
        WinitMouseButton::Middle => 2,
        WinitMouseButton::Other(value) => value as u8,
    };
    MouseButton::new(index)
}

/// Runtime actions bound to keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    ToggleLightMarkers,
    ToggleFrustums,
    Quit,
}

pub fn map_key(code: VirtualKeyCode) -> Option<KeyAction> {
    match code {
        VirtualKeyCode::L => Some(KeyAction::ToggleLightMarkers),
        VirtualKeyCode::F => Some(KeyAction::ToggleFrustums),
        VirtualKeyCode::Escape => Some(KeyAction::Quit),
        _ => None,
    }
}

/// Normalizes a winit scroll delta to line units. Trackpads report pixel
/// deltas; one wheel line is treated as roughly 40 pixels.
pub fn scroll_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => position.y as f32 / 40.0,
    }
}

pub fn cursor_position(x: f64, y: f64) -> Vec2 {
    Vec2::new(x as f32, y as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_button_is_index_zero() {
        assert_eq!(map_mouse_button(WinitMouseButton::Left), MouseButton::LEFT);
        assert_eq!(map_mouse_button(WinitMouseButton::Middle).index(), 2);
    }

    #[test]
    fn toggle_keys_are_mapped() {
        assert_eq!(
            map_key(VirtualKeyCode::L),
            Some(KeyAction::ToggleLightMarkers)
        );
        assert_eq!(map_key(VirtualKeyCode::F), Some(KeyAction::ToggleFrustums));
        assert_eq!(map_key(VirtualKeyCode::Escape), Some(KeyAction::Quit));
        assert_eq!(map_key(VirtualKeyCode::A), None);
    }

    #[test]
    fn scroll_lines_normalizes_pixels() {
        assert_eq!(scroll_lines(MouseScrollDelta::LineDelta(0.0, 3.0)), 3.0);
        let pixels = MouseScrollDelta::PixelDelta(winit::dpi::PhysicalPosition::new(0.0, 80.0));
        assert_eq!(scroll_lines(pixels), 2.0);
    }
}
