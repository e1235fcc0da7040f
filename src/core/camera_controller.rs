//! Flight camera controller

use crate::core::camera::Camera;
use crate::core::input::InputState;
use crate::core::types::Vec3;
use winit::keyboard::KeyCode;

/// Movement intent for one frame, decoupled from the keyboard
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlightCommands {
    /// +1 forward, -1 backward
    pub thrust: f32,
    /// +1 right, -1 left
    pub strafe: f32,
    /// +1 up, -1 down
    pub lift: f32,
    /// Mouse look delta in pixels
    pub look: (f32, f32),
    /// Use boost speed instead of cruise speed
    pub boost: bool,
}

impl FlightCommands {
    /// Read WASD / QE / Shift and mouse motion from the input state
    pub fn from_input(input: &InputState) -> Self {
        let axis = |pos: KeyCode, neg: KeyCode| {
            let mut v = 0.0;
            if input.is_key_pressed(pos) {
                v += 1.0;
            }
            if input.is_key_pressed(neg) {
                v -= 1.0;
            }
            v
        };

        Self {
            thrust: axis(KeyCode::KeyW, KeyCode::KeyS),
            strafe: axis(KeyCode::KeyD, KeyCode::KeyA),
            lift: axis(KeyCode::KeyE, KeyCode::KeyQ),
            look: if input.is_mouse_captured() { input.mouse_delta() } else { (0.0, 0.0) },
            boost: input.is_key_pressed(KeyCode::ShiftLeft) || input.is_key_pressed(KeyCode::ShiftRight),
        }
    }
}

/// Free-flight controller with mouse look and terrain clearance
#[derive(Clone, Debug)]
pub struct FlightController {
    /// Cruise speed in units per second
    pub cruise_speed: f32,
    /// Speed while boosting
    pub boost_speed: f32,
    /// Mouse sensitivity
    pub sensitivity: f32,
    /// Minimum height kept above the terrain surface
    pub min_clearance: f32,
    /// Current yaw (rotation around Y axis) in radians
    yaw: f32,
    /// Current pitch (rotation around X axis) in radians
    pitch: f32,
}

impl FlightController {
    /// Create new controller
    pub fn new(cruise_speed: f32, boost_speed: f32) -> Self {
        Self {
            cruise_speed,
            boost_speed,
            sensitivity: 1.0,
            min_clearance: 5.0,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Apply one frame of commands.
    ///
    /// `ground` returns terrain height at a world (x, z); the camera is pushed
    /// up so it never sinks below `ground + min_clearance`.
    pub fn apply(
        &mut self,
        camera: &mut Camera,
        commands: &FlightCommands,
        dt: f32,
        ground: impl Fn(f32, f32) -> f32,
    ) {
        let (dx, dy) = commands.look;
        if dx != 0.0 || dy != 0.0 {
            self.yaw -= dx * self.sensitivity * 0.001;
            self.pitch -= dy * self.sensitivity * 0.001;
            // Clamp pitch to prevent gimbal lock
            self.pitch = self.pitch.clamp(-1.5, 1.5);
        }
        camera.set_rotation_euler(self.yaw, self.pitch);

        let mut velocity = camera.front() * commands.thrust
            + camera.right() * commands.strafe
            + Vec3::Y * commands.lift;

        if velocity.length_squared() > 0.0 {
            velocity = velocity.normalize();
            let speed = if commands.boost { self.boost_speed } else { self.cruise_speed };
            camera.position += velocity * speed * dt;
        }

        let floor = ground(camera.position.x, camera.position.z) + self.min_clearance;
        if camera.position.y < floor {
            camera.position.y = floor;
        }
    }

    /// Set initial orientation from angles (in radians)
    pub fn set_orientation(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        self.pitch = pitch.clamp(-1.5, 1.5);
    }

    /// Get current yaw
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Get current pitch
    pub fn pitch(&self) -> f32 {
        self.pitch
    }
}

impl Default for FlightController {
    fn default() -> Self {
        Self::new(150.0, 800.0)
    }
}
