//! Terrain decorations: trees, cabins, flowers and boats.
//!
//! Decorations are scattered per chunk when the chunk is built and drawn as
//! instances of a small set of shared meshes.

pub mod config;
pub mod instance;
pub mod library;
pub mod scatter;

pub use config::{ClutterConfig, DecorationKind, ScatterRule};
pub use instance::{BoatInstance, ChunkInstances, FlowerInstance, Placement};
pub use library::{DecorationLibrary, DecorationMeshes};
pub use scatter::ScatterGenerator;
