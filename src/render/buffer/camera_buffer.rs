//! GPU uniform buffer for per-frame camera and lighting data

use bytemuck::{Pod, Zeroable};

use crate::core::simulation::SimulationState;

/// Per-frame uniform data for GPU (must match shader struct exactly)
/// WGSL vec3 has 16-byte alignment, so each vec3 is followed by an f32
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    /// View-projection matrix (64 bytes, offset 0)
    pub view_proj: [[f32; 4]; 4],
    /// Camera position in world space (12 bytes, offset 64)
    pub position: [f32; 3],
    /// Fog density (4 bytes, offset 76)
    pub fog_density: f32,
    /// Light position in world space (12 bytes, offset 80)
    pub light_position: [f32; 3],
    /// Light intensity multiplier (4 bytes, offset 92)
    pub light_intensity: f32,
    /// Sky color used for fog (12 bytes, offset 96)
    pub sky_color: [f32; 3],
    /// Elapsed seconds (4 bytes, offset 108)
    pub time: f32,
}

impl CameraUniform {
    /// Create uniform data from the simulation state
    pub fn from_state(state: &SimulationState) -> Self {
        let sky = state.weather.sky_color();
        Self {
            view_proj: state.camera.view_projection().to_cols_array_2d(),
            position: state.camera.position.to_array(),
            fog_density: state.weather.fog_density(),
            light_position: state.light_position().to_array(),
            light_intensity: state.weather.light_intensity(),
            sky_color: [sky[0] as f32, sky[1] as f32, sky[2] as f32],
            time: state.elapsed,
        }
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::from_state(&SimulationState::default())
    }
}

/// GPU buffer for camera uniform
pub struct CameraBuffer {
    /// Uniform buffer
    buffer: wgpu::Buffer,
    /// Bind group layout
    bind_group_layout: wgpu::BindGroupLayout,
    /// Bind group
    bind_group: wgpu::BindGroup,
}

impl CameraBuffer {
    /// Create new camera buffer
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("camera_uniform"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            buffer,
            bind_group_layout,
            bind_group,
        }
    }

    /// Update buffer with this frame's camera and lighting
    pub fn update(&self, queue: &wgpu::Queue, state: &SimulationState) {
        let uniform = CameraUniform::from_state(state);
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Get bind group layout
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// Get bind group
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::simulation::Weather;

    #[test]
    fn test_uniform_size() {
        // Must be exactly 112 bytes to match WGSL struct layout
        let size = std::mem::size_of::<CameraUniform>();
        assert_eq!(size, 112, "CameraUniform must be exactly 112 bytes, got {} bytes", size);
    }

    #[test]
    fn test_from_state() {
        let mut state = SimulationState::default();
        state.weather = Weather::Rain;
        state.advance(1.5);
        let uniform = CameraUniform::from_state(&state);

        assert_eq!(uniform.position, state.camera.position.to_array());
        assert_eq!(uniform.light_intensity, Weather::Rain.light_intensity());
        assert_eq!(uniform.time, 1.5);
    }
}
