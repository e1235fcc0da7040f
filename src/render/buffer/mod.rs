//! GPU buffer management

pub mod allocator;
pub mod camera_buffer;
pub mod mesh;

pub use allocator::{
    AllocationLedger, BufferAllocator, BufferUsage, DeviceAllocator, GpuBuffer, HeadlessAllocator,
};
pub use camera_buffer::{CameraBuffer, CameraUniform};
pub use mesh::GpuMesh;
