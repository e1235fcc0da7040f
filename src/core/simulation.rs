//! Per-frame simulation state.
//!
//! Everything the update and draw call sites need for one frame lives here
//! and is passed explicitly instead of being kept in globals.

use serde::{Deserialize, Serialize};

use crate::core::camera::Camera;
use crate::core::types::Vec3;

/// Fixed sun position used when the day cycle is disabled.
pub const DEFAULT_LIGHT_POSITION: Vec3 = Vec3::new(500.0, 800.0, 300.0);

/// Weather presets the demo can cycle through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weather {
    #[default]
    Clear,
    Rain,
    Snow,
}

impl Weather {
    /// Next preset in the cycle Clear -> Rain -> Snow -> Clear.
    pub fn next(self) -> Self {
        match self {
            Weather::Clear => Weather::Rain,
            Weather::Rain => Weather::Snow,
            Weather::Snow => Weather::Clear,
        }
    }

    /// Clear color of the sky (linear RGB).
    pub fn sky_color(self) -> [f64; 3] {
        match self {
            Weather::Clear => [0.53, 0.81, 0.92],
            Weather::Rain => [0.38, 0.42, 0.48],
            Weather::Snow => [0.78, 0.80, 0.84],
        }
    }

    /// Multiplier on the directional light.
    pub fn light_intensity(self) -> f32 {
        match self {
            Weather::Clear => 1.0,
            Weather::Rain => 0.55,
            Weather::Snow => 0.8,
        }
    }

    /// Fog density used by the terrain shader.
    pub fn fog_density(self) -> f32 {
        match self {
            Weather::Clear => 0.00025,
            Weather::Rain => 0.0009,
            Weather::Snow => 0.0012,
        }
    }
}

/// State advanced once per frame by the application.
#[derive(Clone, Debug)]
pub struct SimulationState {
    pub camera: Camera,
    /// Seconds since the previous frame
    pub delta_time: f32,
    /// Seconds since start
    pub elapsed: f32,
    pub frame: u64,
    pub weather: Weather,
    /// Length of a full day in seconds; 0 keeps the sun fixed
    pub day_length_seconds: f32,
}

impl SimulationState {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            delta_time: 0.0,
            elapsed: 0.0,
            frame: 0,
            weather: Weather::Clear,
            day_length_seconds: 0.0,
        }
    }

    /// Step the clocks forward by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        self.delta_time = dt;
        self.elapsed += dt;
        self.frame += 1;
    }

    /// World-space light position. Orbits around the Y axis when a day
    /// length is configured.
    pub fn light_position(&self) -> Vec3 {
        if self.day_length_seconds <= 0.0 {
            return DEFAULT_LIGHT_POSITION;
        }
        let angle = self.elapsed / self.day_length_seconds * std::f32::consts::TAU;
        let radius = DEFAULT_LIGHT_POSITION.x.hypot(DEFAULT_LIGHT_POSITION.z);
        Vec3::new(
            radius * angle.cos(),
            DEFAULT_LIGHT_POSITION.y,
            radius * angle.sin(),
        )
    }

    /// Cycle to the next weather preset.
    pub fn cycle_weather(&mut self) {
        self.weather = self.weather.next();
        log::info!("Weather: {:?}", self.weather);
    }
}

impl Default for SimulationState {
    fn default() -> Self {
        Self::new(Camera::default())
    }
}
