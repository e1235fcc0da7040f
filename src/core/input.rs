//! Input state tracking

use std::collections::HashSet;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Tracks keyboard and mouse state between frames
pub struct InputState {
    /// Currently held keys
    keys_pressed: HashSet<KeyCode>,
    /// Keys that went down this frame
    keys_just_pressed: HashSet<KeyCode>,
    /// Raw mouse motion collected since the last frame
    mouse_delta_accumulated: (f32, f32),
    /// Mouse motion exposed for the current frame
    mouse_delta: (f32, f32),
    /// Whether the cursor is grabbed for mouse look
    mouse_captured: bool,
}

impl InputState {
    /// Create new input state
    pub fn new() -> Self {
        Self {
            keys_pressed: HashSet::new(),
            keys_just_pressed: HashSet::new(),
            mouse_delta_accumulated: (0.0, 0.0),
            mouse_delta: (0.0, 0.0),
            mouse_captured: false,
        }
    }

    /// Process a window event
    pub fn process_event(&mut self, event: &WindowEvent) {
        if let WindowEvent::KeyboardInput {
            event: KeyEvent {
                physical_key: PhysicalKey::Code(key_code),
                state,
                repeat,
                ..
            },
            ..
        } = event
        {
            match state {
                ElementState::Pressed => self.press(*key_code, *repeat),
                ElementState::Released => self.release(*key_code),
            }
        }
    }

    fn press(&mut self, key: KeyCode, repeat: bool) {
        if !repeat && !self.keys_pressed.contains(&key) {
            self.keys_just_pressed.insert(key);
        }
        self.keys_pressed.insert(key);
    }

    fn release(&mut self, key: KeyCode) {
        self.keys_pressed.remove(&key);
    }

    /// Process device event for raw mouse motion (used while the cursor is grabbed)
    pub fn process_mouse_motion(&mut self, delta: (f64, f64)) {
        if self.mouse_captured {
            self.mouse_delta_accumulated.0 += delta.0 as f32;
            self.mouse_delta_accumulated.1 += delta.1 as f32;
        }
    }

    /// Latch accumulated mouse motion for this frame. Call before reading input.
    pub fn begin_frame(&mut self) {
        self.mouse_delta = self.mouse_delta_accumulated;
        self.mouse_delta_accumulated = (0.0, 0.0);
    }

    /// Call at end of frame to reset per-frame state
    pub fn end_frame(&mut self) {
        self.keys_just_pressed.clear();
        self.mouse_delta = (0.0, 0.0);
    }

    /// Check if key is currently pressed
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Check if key was just pressed this frame
    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.keys_just_pressed.contains(&key)
    }

    /// Mouse delta for the current frame
    pub fn mouse_delta(&self) -> (f32, f32) {
        self.mouse_delta
    }

    /// Set mouse captured state
    pub fn set_mouse_captured(&mut self, captured: bool) {
        self.mouse_captured = captured;
        self.mouse_delta = (0.0, 0.0);
        self.mouse_delta_accumulated = (0.0, 0.0);
    }

    /// Check if mouse is captured
    pub fn is_mouse_captured(&self) -> bool {
        self.mouse_captured
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}
