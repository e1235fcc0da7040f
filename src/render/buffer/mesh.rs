//! Uploaded mesh: vertex buffer plus optional index buffer

use super::allocator::{BufferAllocator, BufferUsage, GpuBuffer};
use crate::core::types::Result;
use crate::terrain::MeshData;

/// Mesh resident in GPU memory
#[derive(Debug)]
pub struct GpuMesh {
    pub vertex_buffer: GpuBuffer,
    pub index_buffer: Option<GpuBuffer>,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl GpuMesh {
    /// Allocate and fill vertex and index buffers for `mesh`.
    ///
    /// If the index allocation fails the vertex buffer is dropped before the
    /// error is returned, so nothing leaks.
    pub fn upload(allocator: &dyn BufferAllocator, label: &str, mesh: &MeshData) -> Result<Self> {
        let vertex_buffer = allocator.create_buffer(
            &format!("{label}_vertices"),
            BufferUsage::Vertex,
            bytemuck::cast_slice(&mesh.vertices),
        )?;

        let index_buffer = if mesh.indices.is_empty() {
            None
        } else {
            Some(allocator.create_buffer(
                &format!("{label}_indices"),
                BufferUsage::Index,
                bytemuck::cast_slice(&mesh.indices),
            )?)
        };

        Ok(Self {
            vertex_buffer,
            index_buffer,
            vertex_count: mesh.vertices.len() as u32,
            index_count: mesh.indices.len() as u32,
        })
    }

    /// Total bytes held by the mesh
    pub fn size_bytes(&self) -> u64 {
        self.vertex_buffer.size() + self.index_buffer.as_ref().map_or(0, |b| b.size())
    }
}
