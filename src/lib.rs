//! Skyscape - infinite procedural terrain streamed around a flying camera

pub mod core;
pub mod terrain;
pub mod clutter;
pub mod streaming;
pub mod render;
pub mod scene;
pub mod streamer;

pub use core::error::Error;
pub use core::types::Result;
pub use streamer::TerrainStreamer;
