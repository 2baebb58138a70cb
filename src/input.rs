use std::collections::HashSet;
use std::time::Duration;

use glam::Vec2;
use gridcaster::config::StageToggle;
use gridcaster::{FrameInput, Rotate};
use winit::event::ElementState;
use winit::keyboard::KeyCode;

/// Keyboard state between redraws.
#[derive(Default)]
pub struct InputState {
    keys_down: HashSet<KeyCode>,
    // Edge-triggered keys seen since the last frame
    pressed: Vec<KeyCode>,
}

impl InputState {
    pub fn key(&mut self, code: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                // Ignore auto-repeat for edge-triggered keys
                if self.keys_down.insert(code) {
                    self.pressed.push(code);
                }
            }
            ElementState::Released => {
                self.keys_down.remove(&code);
            }
        }
    }

    pub fn is_down(&self, code: KeyCode) -> bool {
        self.keys_down.contains(&code)
    }

    /// Builds this frame's input and clears the edge-triggered keys.
    pub fn take_frame(&mut self, dt: Duration) -> FrameInput {
        let mut move_intent = Vec2::ZERO;
        if self.is_down(KeyCode::KeyW) {
            move_intent.y -= 1.0;
        }
        if self.is_down(KeyCode::KeyS) {
            move_intent.y += 1.0;
        }
        if self.is_down(KeyCode::KeyA) {
            move_intent.x -= 1.0;
        }
        if self.is_down(KeyCode::KeyD) {
            move_intent.x += 1.0;
        }

        let rotate = match (self.is_down(KeyCode::KeyQ), self.is_down(KeyCode::KeyE)) {
            (true, false) => Rotate::Left,
            (false, true) => Rotate::Right,
            _ => Rotate::None,
        };

        let mut toggles = Vec::new();
        let mut next_mode = false;
        for code in self.pressed.drain(..) {
            match code {
                KeyCode::KeyF => toggles.push(StageToggle::FishEye),
                KeyCode::KeyT => toggles.push(StageToggle::Textures),
                KeyCode::KeyP => toggles.push(StageToggle::Sprites),
                KeyCode::KeyC => toggles.push(StageToggle::Collision),
                KeyCode::Tab => next_mode = true,
                _ => {}
            }
        }

        FrameInput {
            move_intent,
            rotate,
            toggles,
            next_mode,
            dt,
        }
    }
}
