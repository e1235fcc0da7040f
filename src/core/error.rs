//! Error types for the Skyscape terrain streamer

use thiserror::Error;

use crate::streaming::ChunkCoord;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("GPU out of memory: requested {requested} bytes, {available} bytes available")]
    GpuOutOfMemory { requested: u64, available: u64 },

    #[error("Window error: {0}")]
    Window(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Failed to build chunk {coord}: {source}")]
    ChunkBuild {
        coord: ChunkCoord,
        #[source]
        source: Box<Error>,
    },

    #[error("Streaming error: {0}")]
    Streaming(String),
}

impl Error {
    /// Wrap an error raised while building the chunk at `coord`.
    pub fn chunk_build(coord: ChunkCoord, source: Error) -> Self {
        Error::ChunkBuild {
            coord,
            source: Box::new(source),
        }
    }

    /// Whether the error came from the GPU refusing an allocation.
    pub fn is_out_of_memory(&self) -> bool {
        match self {
            Error::GpuOutOfMemory { .. } => true,
            Error::ChunkBuild { source, .. } => source.is_out_of_memory(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_build_display_includes_coord() {
        let err = Error::chunk_build(
            ChunkCoord::new(3, -4),
            Error::GpuOutOfMemory { requested: 1024, available: 0 },
        );
        let msg = err.to_string();
        assert!(msg.contains("(3, -4)"), "got {msg}");
        assert!(err.is_out_of_memory());
    }

    #[test]
    fn test_other_errors_are_not_oom() {
        assert!(!Error::Gpu("lost device".into()).is_out_of_memory());
        assert!(!Error::Config("bad".into()).is_out_of_memory());
    }
}
