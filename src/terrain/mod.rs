//! Procedural terrain generation

pub mod generator;
pub use generator::{HeightField, TerrainParams};

pub mod biome;
pub use biome::Biome;

pub mod mesh;
pub use mesh::{build_chunk_mesh, MeshData, TerrainVertex};
