//! Chunk build output and resident chunks

use std::sync::Arc;

use glam::Vec3;

use crate::clutter::{ChunkInstances, ScatterGenerator};
use crate::core::error::Error;
use crate::core::types::Result;
use crate::render::buffer::{BufferAllocator, GpuMesh};
use crate::streaming::coord::ChunkCoord;
use crate::terrain::{build_chunk_mesh, HeightField, MeshData};

/// CPU-side result of building a chunk, ready for upload
#[derive(Clone, Debug)]
pub struct ChunkData {
    pub coord: ChunkCoord,
    pub origin: Vec3,
    pub mesh: MeshData,
    pub instances: ChunkInstances,
}

/// A resident chunk: uploaded terrain mesh plus its decorations.
///
/// Never mutated after creation. Dropping it releases its GPU buffers.
#[derive(Debug)]
pub struct Chunk {
    pub coord: ChunkCoord,
    pub origin: Vec3,
    pub mesh: GpuMesh,
    pub instances: ChunkInstances,
}

impl Chunk {
    /// Upload `data`. On failure nothing stays allocated.
    pub fn upload(allocator: &dyn BufferAllocator, data: ChunkData) -> Result<Self> {
        let label = format!("chunk_{}_{}", data.coord.x, data.coord.z);
        let mesh = GpuMesh::upload(allocator, &label, &data.mesh)
            .map_err(|e| Error::chunk_build(data.coord, e))?;

        Ok(Self {
            coord: data.coord,
            origin: data.origin,
            mesh,
            instances: data.instances,
        })
    }
}

/// Everything needed to build chunk CPU data. Cheap to clone and shareable
/// across worker threads.
#[derive(Clone)]
pub struct ChunkBuilder {
    field: Arc<HeightField>,
    scatter: Arc<ScatterGenerator>,
    chunk_size: u32,
}

impl ChunkBuilder {
    pub fn new(field: Arc<HeightField>, scatter: Arc<ScatterGenerator>, chunk_size: u32) -> Self {
        Self {
            field,
            scatter,
            chunk_size,
        }
    }

    pub fn field(&self) -> &HeightField {
        &self.field
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Height field samples, mesh and scatter for `coord`
    pub fn build(&self, coord: ChunkCoord) -> ChunkData {
        let mesh = build_chunk_mesh(&self.field, coord.x, coord.z, self.chunk_size);
        let instances = self.scatter.scatter(&self.field, coord, self.chunk_size);
        log::trace!(
            "Built chunk {}: {} vertices, {} decorations",
            coord,
            mesh.vertices.len(),
            instances.total()
        );

        ChunkData {
            coord,
            origin: coord.world_origin(self.chunk_size),
            mesh,
            instances,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clutter::ClutterConfig;
    use crate::render::buffer::HeadlessAllocator;

    fn builder(size: u32) -> ChunkBuilder {
        let field = Arc::new(HeightField::default());
        let scatter = Arc::new(ScatterGenerator::new(ClutterConfig::default(), field.params().seed));
        ChunkBuilder::new(field, scatter, size)
    }

    #[test]
    fn test_build_chunk_data() {
        let data = builder(16).build(ChunkCoord::new(2, -1));
        assert_eq!(data.mesh.vertices.len(), 17 * 17);
        assert_eq!(data.origin, Vec3::new(32.0, 0.0, -16.0));
    }

    #[test]
    fn test_upload_failure_is_tagged_with_coord() {
        let allocator = HeadlessAllocator::with_budget(16);
        let data = builder(8).build(ChunkCoord::new(1, 1));
        let err = Chunk::upload(&allocator, data).unwrap_err();
        assert!(err.is_out_of_memory());
        assert!(matches!(err, Error::ChunkBuild { coord, .. } if coord == ChunkCoord::new(1, 1)));
        assert_eq!(allocator.ledger().live_buffers(), 0);
    }

    #[test]
    fn test_chunk_drop_releases_buffers() {
        let allocator = HeadlessAllocator::new();
        let chunk = Chunk::upload(&allocator, builder(8).build(ChunkCoord::new(0, 0))).unwrap();
        assert_eq!(allocator.ledger().live_buffers(), 2);
        drop(chunk);
        assert_eq!(allocator.ledger().live_buffers(), 0);
    }
}
