//! Scene configuration loaded from JSON

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::clutter::ClutterConfig;
use crate::core::error::Error;
use crate::core::simulation::Weather;
use crate::core::types::Result;
use crate::streaming::StreamingConfig;
use crate::terrain::generator::TerrainParams;

/// Everything needed to set up a flight scene
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Initial camera position
    pub camera_position: [f32; 3],
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub cruise_speed: f32,
    pub boost_speed: f32,
    /// Height kept between the camera and the ground
    pub min_clearance: f32,
    /// Length of a full day in seconds; 0 keeps the sun fixed
    pub day_length_seconds: f32,
    pub weather: Weather,
    pub terrain: TerrainParams,
    pub clutter: ClutterConfig,
    pub streaming: StreamingConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            window_title: "Skyscape".into(),
            window_width: 1280,
            window_height: 720,
            camera_position: [0.0, 120.0, 0.0],
            fov_degrees: 45.0,
            cruise_speed: 150.0,
            boost_speed: 800.0,
            min_clearance: 5.0,
            day_length_seconds: 0.0,
            weather: Weather::Clear,
            terrain: TerrainParams::default(),
            clutter: ClutterConfig::default(),
            streaming: StreamingConfig::default(),
        }
    }
}

impl SceneConfig {
    /// Read a JSON scene file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config: SceneConfig = serde_json::from_str(&json)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        log::info!("Loaded scene config from {}", path.display());
        Ok(config)
    }

    /// Write this config as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.streaming.validate()?;
        self.clutter.validate()?;
        if self.terrain.min_elevation >= self.terrain.max_elevation {
            return Err(Error::Config(format!(
                "terrain elevation range {}..{} is empty",
                self.terrain.min_elevation, self.terrain.max_elevation
            )));
        }
        if self.cruise_speed <= 0.0 || self.boost_speed <= 0.0 {
            return Err(Error::Config("camera speeds must be positive".into()));
        }
        Ok(())
    }

    pub fn camera_position(&self) -> Vec3 {
        Vec3::from_array(self.camera_position)
    }
}
