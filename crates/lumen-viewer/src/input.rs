//! Keyboard and mouse state sampled into fly-camera input

use glam::Vec2;
use lumen_render::FlyInput;
use std::collections::HashSet;
use winit::keyboard::KeyCode;

/// Tracks held keys and cursor drags between frames
#[derive(Debug, Default)]
pub struct InputState {
    keys_down: HashSet<KeyCode>,
    look_button_down: bool,
    cursor: Option<Vec2>,
    drag: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_key_down(&mut self, key: KeyCode) {
        self.keys_down.insert(key);
    }

    pub fn process_key_up(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Left mouse button state
    pub fn set_look_button(&mut self, down: bool) {
        self.look_button_down = down;
    }

    /// Cursor moved to `position` in window pixels. Movement only counts
    /// toward the drag while the look button is held.
    pub fn process_cursor_move(&mut self, position: Vec2) {
        if let Some(previous) = self.cursor {
            if self.look_button_down {
                self.drag += position - previous;
            }
        }
        self.cursor = Some(position);
    }

    /// Forget held keys and buttons, e.g. when focus is lost
    pub fn clear(&mut self) {
        self.keys_down.clear();
        self.look_button_down = false;
        self.drag = Vec2::ZERO;
    }

    fn any_down(&self, keys: &[KeyCode]) -> bool {
        keys.iter().any(|key| self.keys_down.contains(key))
    }

    /// Movement for this frame; drains the accumulated drag
    pub fn take_fly_input(&mut self) -> FlyInput {
        let input = FlyInput {
            forward: self.is_key_down(KeyCode::KeyW),
            back: self.is_key_down(KeyCode::KeyS),
            left: self.is_key_down(KeyCode::KeyA),
            right: self.is_key_down(KeyCode::KeyD),
            up: self.is_key_down(KeyCode::Space),
            down: self.is_key_down(KeyCode::KeyC),
            fast: self.any_down(&[KeyCode::ShiftLeft, KeyCode::ShiftRight]),
            slow: self.any_down(&[KeyCode::AltLeft, KeyCode::AltRight]),
            look_drag: self.drag,
        };
        self.drag = Vec2::ZERO;
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_directions() {
        let mut input = InputState::new();
        input.process_key_down(KeyCode::KeyW);
        input.process_key_down(KeyCode::ShiftLeft);
        input.process_key_down(KeyCode::KeyC);
        let fly = input.take_fly_input();
        assert!(fly.forward && fly.fast && fly.down);
        assert!(!fly.back && !fly.slow && !fly.up);

        input.process_key_up(KeyCode::KeyW);
        assert!(!input.take_fly_input().forward);
    }

    #[test]
    fn drag_counts_only_while_button_held() {
        let mut input = InputState::new();
        input.process_cursor_move(Vec2::new(10.0, 10.0));
        input.process_cursor_move(Vec2::new(20.0, 10.0));
        assert_eq!(input.take_fly_input().look_drag, Vec2::ZERO);

        input.set_look_button(true);
        input.process_cursor_move(Vec2::new(25.0, 7.0));
        input.process_cursor_move(Vec2::new(30.0, 5.0));
        assert_eq!(input.take_fly_input().look_drag, Vec2::new(10.0, -5.0));
        assert_eq!(input.take_fly_input().look_drag, Vec2::ZERO);
    }

    #[test]
    fn clear_releases_everything() {
        let mut input = InputState::new();
        input.process_key_down(KeyCode::KeyD);
        input.set_look_button(true);
        input.clear();
        let fly = input.take_fly_input();
        assert_eq!(fly, FlyInput::default());
    }
}
