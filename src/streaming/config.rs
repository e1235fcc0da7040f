//! Streaming configuration

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;

/// Where chunk CPU work happens
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationMode {
    /// Every required chunk is built before `update` returns
    #[default]
    Synchronous,
    /// Chunks are built on worker threads and become resident over several
    /// updates
    Background,
}

/// Parameters of the chunk streaming window
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Cells per chunk edge
    pub chunk_size: u32,
    /// Chebyshev radius of required chunks around the camera chunk
    pub view_distance: i32,
    /// Extra radius before a resident chunk is evicted
    pub eviction_margin: i32,
    pub mode: GenerationMode,
    /// Background mode: chunk uploads per update
    pub max_uploads_per_frame: usize,
    /// Background mode: concurrent chunk builds
    pub worker_threads: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 64,
            view_distance: 5,
            eviction_margin: 2,
            mode: GenerationMode::Synchronous,
            max_uploads_per_frame: 4,
            worker_threads: 2,
        }
    }
}

impl StreamingConfig {
    pub fn new(chunk_size: u32, view_distance: i32) -> Self {
        Self {
            chunk_size,
            view_distance,
            ..Default::default()
        }
    }

    /// Chebyshev distance beyond which resident chunks are evicted
    pub fn eviction_distance(&self) -> i32 {
        self.view_distance.saturating_add(self.eviction_margin)
    }

    /// Reject settings the streamer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".into()));
        }
        if self.view_distance < 0 {
            return Err(Error::Config(format!(
                "view_distance must not be negative (got {})",
                self.view_distance
            )));
        }
        if self.eviction_margin < 0 {
            return Err(Error::Config(format!(
                "eviction_margin must not be negative (got {})",
                self.eviction_margin
            )));
        }
        if self.mode == GenerationMode::Background {
            if self.max_uploads_per_frame == 0 {
                return Err(Error::Config("max_uploads_per_frame must be positive".into()));
            }
            if self.worker_threads == 0 {
                return Err(Error::Config("worker_threads must be positive".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = StreamingConfig::default();
        assert_eq!(cfg.chunk_size, 64);
        assert_eq!(cfg.view_distance, 5);
        assert_eq!(cfg.eviction_distance(), 7);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(StreamingConfig::new(0, 2).validate().is_err());
        assert!(StreamingConfig::new(32, -1).validate().is_err());
        assert!(StreamingConfig::new(32, 0).validate().is_ok());

        let cfg = StreamingConfig {
            mode: GenerationMode::Background,
            worker_threads: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_deserialize_partial() {
        let cfg: StreamingConfig =
            serde_json::from_str(r#"{ "view_distance": 3, "mode": "Background" }"#).unwrap();
        assert_eq!(cfg.view_distance, 3);
        assert_eq!(cfg.chunk_size, 64);
        assert_eq!(cfg.mode, GenerationMode::Background);
    }
}
