//! Render pipelines

pub mod terrain;

pub use terrain::{DrawUniform, TerrainPipeline, DEPTH_FORMAT};
