//! Camera-driven chunk streaming

pub mod chunk;
pub mod config;
pub mod coord;
pub mod loader;
pub mod priority;
pub mod store;

pub use chunk::{Chunk, ChunkBuilder, ChunkData};
pub use config::{GenerationMode, StreamingConfig};
pub use coord::ChunkCoord;
pub use loader::{ChunkLoader, LoadRequest, LoadResult};
pub use priority::{ChunkPriority, ChunkPriorityQueue};
pub use store::{ChunkStore, InstanceCounts, UpdateStats};
