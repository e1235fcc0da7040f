//! Chunk mesh construction
//!
//! A chunk of `size` cells is a `(size + 1) x (size + 1)` vertex grid laid
//! out row-major (z outer, x inner) and triangulated two triangles per cell.
//! World coordinates are computed with integers before the float conversion
//! so edge vertices shared by two chunks come out bit-identical.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use super::generator::{normal_from_neighbors, HeightField};

/// Vertex layout shared by terrain and decoration meshes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl TerrainVertex {
    pub fn new(position: Vec3, normal: Vec3, color: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            color: color.to_array(),
        }
    }
}

/// CPU-side mesh ready for upload
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Size in bytes of the vertex data
    pub fn vertex_bytes(&self) -> u64 {
        std::mem::size_of_val(self.vertices.as_slice()) as u64
    }

    /// Size in bytes of the index data
    pub fn index_bytes(&self) -> u64 {
        std::mem::size_of_val(self.indices.as_slice()) as u64
    }
}

/// World coordinate of grid line `i` of chunk `chunk`, as a float.
#[inline]
pub fn grid_world(chunk: i32, size: u32, i: u32) -> f32 {
    (chunk as i64 * size as i64 + i as i64) as f32
}

/// Build the terrain mesh of chunk `(chunk_x, chunk_z)`.
pub fn build_chunk_mesh(field: &HeightField, chunk_x: i32, chunk_z: i32, size: u32) -> MeshData {
    let verts = size as usize + 1;
    // Heights with a one-sample border for the normal stencil
    let padded = verts + 2;
    let mut heights = vec![0.0f32; padded * padded];

    let base_x = chunk_x as i64 * size as i64;
    let base_z = chunk_z as i64 * size as i64;

    for pz in 0..padded {
        let wz = (base_z + pz as i64 - 1) as f32;
        for px in 0..padded {
            let wx = (base_x + px as i64 - 1) as f32;
            heights[pz * padded + px] = field.height(wx, wz);
        }
    }

    let h = |x: usize, z: usize| heights[z * padded + x];

    let mut vertices = Vec::with_capacity(verts * verts);
    for z in 0..verts {
        let wz = grid_world(chunk_z, size, z as u32);
        for x in 0..verts {
            let wx = grid_world(chunk_x, size, x as u32);
            let (px, pz) = (x + 1, z + 1);
            let y = h(px, pz);
            let normal = normal_from_neighbors(h(px - 1, pz), h(px + 1, pz), h(px, pz - 1), h(px, pz + 1));
            vertices.push(TerrainVertex::new(Vec3::new(wx, y, wz), normal, field.color(y)));
        }
    }

    let cells = size as usize;
    let mut indices = Vec::with_capacity(cells * cells * 6);
    for z in 0..cells {
        for x in 0..cells {
            let top_left = (z * verts + x) as u32;
            let top_right = top_left + 1;
            let bottom_left = ((z + 1) * verts + x) as u32;
            let bottom_right = bottom_left + 1;

            indices.extend_from_slice(&[top_left, bottom_left, top_right]);
            indices.extend_from_slice(&[top_right, bottom_left, bottom_right]);
        }
    }

    MeshData { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(mesh: &MeshData, size: u32, x: u32, z: u32) -> TerrainVertex {
        mesh.vertices[(z * (size + 1) + x) as usize]
    }

    #[test]
    fn test_vertex_and_index_counts() {
        let field = HeightField::default();
        let mesh = build_chunk_mesh(&field, 0, 0, 8);
        assert_eq!(mesh.vertices.len(), 81);
        assert_eq!(mesh.indices.len(), 8 * 8 * 6);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn test_first_cell_winding() {
        let field = HeightField::default();
        let mesh = build_chunk_mesh(&field, 0, 0, 4);
        // top_left=0, top_right=1, bottom_left=5, bottom_right=6
        assert_eq!(&mesh.indices[..6], &[0, 5, 1, 1, 5, 6]);
    }

    #[test]
    fn test_positions_sample_height_field() {
        let field = HeightField::default();
        let mesh = build_chunk_mesh(&field, -3, 2, 16);
        for v in &mesh.vertices {
            let [x, y, z] = v.position;
            assert_eq!(y.to_bits(), field.height(x, z).to_bits());
            let n = field.normal(x, z);
            assert_eq!(v.normal, n.to_array());
        }
        let first = vertex(&mesh, 16, 0, 0);
        assert_eq!(first.position[0], -48.0);
        assert_eq!(first.position[2], 32.0);
    }

    #[test]
    fn test_shared_edges_match() {
        let field = HeightField::default();
        let size = 16;
        let a = build_chunk_mesh(&field, 4, -1, size);
        let east = build_chunk_mesh(&field, 5, -1, size);
        let south = build_chunk_mesh(&field, 4, 0, size);

        for i in 0..=size {
            assert_eq!(vertex(&a, size, size, i), vertex(&east, size, 0, i));
            assert_eq!(vertex(&a, size, i, size), vertex(&south, size, i, 0));
        }
    }
}
