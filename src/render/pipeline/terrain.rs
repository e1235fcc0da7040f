//! Forward pipeline drawing terrain chunks and decorations

use bytemuck::{Pod, Zeroable};

use crate::core::simulation::SimulationState;
use crate::render::buffer::CameraBuffer;
use crate::render::shader::DrawCall;
use crate::terrain::TerrainVertex;

/// Depth buffer format used by the pipeline
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Per-draw uniform data (must match shader struct exactly)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DrawUniform {
    /// Model matrix (64 bytes, offset 0)
    pub model: [[f32; 4]; 4],
    /// Tint for white vertices (12 bytes, offset 64)
    pub tint: [f32; 3],
    /// Padding to 80 bytes
    pub _pad: f32,
}

impl From<&DrawCall> for DrawUniform {
    fn from(call: &DrawCall) -> Self {
        Self {
            model: call.model.to_cols_array_2d(),
            tint: call.tint.to_array(),
            _pad: 0.0,
        }
    }
}

/// Vertex buffer layout of [`TerrainVertex`]
pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<TerrainVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}

fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// Renders recorded draw calls with one pipeline
pub struct TerrainPipeline {
    pipeline: wgpu::RenderPipeline,
    camera: CameraBuffer,
    draw_layout: wgpu::BindGroupLayout,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    /// Draws that fit in `draw_buffer`
    draw_capacity: usize,
    /// Distance between consecutive draw uniforms
    draw_stride: u64,
    depth_view: wgpu::TextureView,
    staging: Vec<u8>,
}

impl TerrainPipeline {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("terrain_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../../shaders/terrain.wgsl").into()),
        });

        let camera = CameraBuffer::new(device);

        let draw_uniform_size = std::mem::size_of::<DrawUniform>() as u64;
        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(draw_uniform_size),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("terrain_pipeline_layout"),
            bind_group_layouts: &[camera.bind_group_layout(), &draw_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("terrain_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout()],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        let draw_stride = align_up(
            draw_uniform_size,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let draw_capacity = 1024;
        let (draw_buffer, draw_bind_group) =
            Self::create_draw_buffer(device, &draw_layout, draw_capacity, draw_stride);

        Self {
            pipeline,
            camera,
            draw_layout,
            draw_buffer,
            draw_bind_group,
            draw_capacity,
            draw_stride,
            depth_view: Self::create_depth_view(device, width, height),
            staging: Vec::new(),
        }
    }

    fn create_draw_buffer(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: usize,
        stride: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("draw_uniforms"),
            size: capacity as u64 * stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniform>() as u64),
                }),
            }],
        });

        (buffer, bind_group)
    }

    fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Recreate the depth buffer after a surface resize
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_view = Self::create_depth_view(device, width, height);
    }

    /// Grow the draw uniform buffer to hold at least `draws` entries
    fn reserve(&mut self, device: &wgpu::Device, draws: usize) {
        if draws <= self.draw_capacity {
            return;
        }
        let capacity = draws.next_power_of_two();
        log::debug!("Growing draw uniform buffer to {} draws", capacity);
        let (buffer, bind_group) =
            Self::create_draw_buffer(device, &self.draw_layout, capacity, self.draw_stride);
        self.draw_buffer = buffer;
        self.draw_bind_group = bind_group;
        self.draw_capacity = capacity;
    }

    /// Clear to the sky color and replay `draws`
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        state: &SimulationState,
        draws: &[DrawCall],
    ) {
        self.camera.update(queue, state);
        self.reserve(device, draws.len());

        let stride = self.draw_stride as usize;
        self.staging.clear();
        self.staging.resize(draws.len() * stride, 0);
        for (i, call) in draws.iter().enumerate() {
            let uniform = DrawUniform::from(call);
            let start = i * stride;
            self.staging[start..start + std::mem::size_of::<DrawUniform>()]
                .copy_from_slice(bytemuck::bytes_of(&uniform));
        }
        if !self.staging.is_empty() {
            queue.write_buffer(&self.draw_buffer, 0, &self.staging);
        }

        let [r, g, b] = state.weather.sky_color();
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("terrain_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a: 1.0 }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, self.camera.bind_group(), &[]);

        for (i, call) in draws.iter().enumerate() {
            let Some(vertex_buffer) = &call.vertex_buffer else {
                continue;
            };
            let offset = (i as u64 * self.draw_stride) as wgpu::DynamicOffset;
            pass.set_bind_group(1, &self.draw_bind_group, &[offset]);
            pass.set_vertex_buffer(0, vertex_buffer.slice(..));

            match &call.index_buffer {
                Some(index_buffer) if call.index_count > 0 => {
                    pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..call.index_count, 0, 0..1);
                }
                _ => pass.draw(0..call.vertex_count, 0..1),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};

    #[test]
    fn test_draw_uniform_size() {
        assert_eq!(std::mem::size_of::<DrawUniform>(), 80);
    }

    #[test]
    fn test_vertex_layout_stride() {
        let layout = vertex_layout();
        assert_eq!(layout.array_stride, 36);
        assert_eq!(layout.attributes.len(), 3);
        assert_eq!(layout.attributes[2].offset, 24);
    }

    #[test]
    fn test_draw_uniform_from_call() {
        let call = DrawCall {
            model: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            tint: Vec3::new(0.5, 0.25, 1.0),
            vertex_buffer: None,
            index_buffer: None,
            vertex_count: 3,
            index_count: 0,
        };
        let uniform = DrawUniform::from(&call);
        assert_eq!(uniform.model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(uniform.tint, [0.5, 0.25, 1.0]);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(80, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
    }
}
