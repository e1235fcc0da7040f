//! Shader abstraction used by the draw paths
//!
//! The streamer talks to the renderer through [`Shader`]: set named uniforms,
//! then draw a mesh with whatever uniform state is current. Names are not
//! validated here. [`RecordingShader`] captures the calls so the wgpu
//! pipeline can replay them and tests can inspect them without a GPU.

use std::collections::HashMap;

use glam::{Mat4, Vec3};

use crate::render::buffer::GpuMesh;

/// Per-draw model matrix uniform
pub const MODEL: &str = "model";
/// Per-draw color multiplier for tintable vertices
pub const TINT: &str = "tint";

/// Minimal uniform-and-draw interface
pub trait Shader {
    fn use_program(&mut self);
    fn set_mat4(&mut self, name: &str, value: &Mat4);
    fn set_vec3(&mut self, name: &str, value: Vec3);
    fn set_float(&mut self, name: &str, value: f32);
    fn set_int(&mut self, name: &str, value: i32);
    /// Issue a draw of `mesh` with the current uniform state
    fn draw_mesh(&mut self, mesh: &GpuMesh);
}

/// One recorded call
#[derive(Clone, Debug, PartialEq)]
pub enum ShaderCommand {
    UseProgram,
    SetMat4(String, Mat4),
    SetVec3(String, Vec3),
    SetFloat(String, f32),
    SetInt(String, i32),
    Draw { vertex_count: u32, index_count: u32 },
}

/// A draw with the uniform values it was issued with
#[derive(Clone, Debug)]
pub struct DrawCall {
    pub model: Mat4,
    pub tint: Vec3,
    pub vertex_buffer: Option<wgpu::Buffer>,
    pub index_buffer: Option<wgpu::Buffer>,
    pub vertex_count: u32,
    pub index_count: u32,
}

/// Shader that records everything it is asked to do
#[derive(Default)]
pub struct RecordingShader {
    commands: Vec<ShaderCommand>,
    draws: Vec<DrawCall>,
    mat4s: HashMap<String, Mat4>,
    vec3s: HashMap<String, Vec3>,
    floats: HashMap<String, f32>,
    ints: HashMap<String, i32>,
    record_commands: bool,
}

impl RecordingShader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also keep the full command log, not just the draws
    pub fn with_command_log() -> Self {
        Self {
            record_commands: true,
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[ShaderCommand] {
        &self.commands
    }

    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    /// Take the recorded draws, keeping uniform state
    pub fn take_draws(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.draws)
    }

    /// Forget draws and commands
    pub fn clear(&mut self) {
        self.commands.clear();
        self.draws.clear();
    }

    pub fn mat4(&self, name: &str) -> Option<Mat4> {
        self.mat4s.get(name).copied()
    }

    pub fn vec3(&self, name: &str) -> Option<Vec3> {
        self.vec3s.get(name).copied()
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        self.floats.get(name).copied()
    }

    pub fn int(&self, name: &str) -> Option<i32> {
        self.ints.get(name).copied()
    }

    fn log(&mut self, command: ShaderCommand) {
        if self.record_commands {
            self.commands.push(command);
        }
    }
}

impl Shader for RecordingShader {
    fn use_program(&mut self) {
        self.log(ShaderCommand::UseProgram);
    }

    fn set_mat4(&mut self, name: &str, value: &Mat4) {
        self.mat4s.insert(name.to_owned(), *value);
        self.log(ShaderCommand::SetMat4(name.to_owned(), *value));
    }

    fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.vec3s.insert(name.to_owned(), value);
        self.log(ShaderCommand::SetVec3(name.to_owned(), value));
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.floats.insert(name.to_owned(), value);
        self.log(ShaderCommand::SetFloat(name.to_owned(), value));
    }

    fn set_int(&mut self, name: &str, value: i32) {
        self.ints.insert(name.to_owned(), value);
        self.log(ShaderCommand::SetInt(name.to_owned(), value));
    }

    fn draw_mesh(&mut self, mesh: &GpuMesh) {
        self.draws.push(DrawCall {
            model: self.mat4(MODEL).unwrap_or(Mat4::IDENTITY),
            tint: self.vec3(TINT).unwrap_or(Vec3::ONE),
            vertex_buffer: mesh.vertex_buffer.raw().cloned(),
            index_buffer: mesh.index_buffer.as_ref().and_then(|b| b.raw().cloned()),
            vertex_count: mesh.vertex_count,
            index_count: mesh.index_count,
        });
        self.log(ShaderCommand::Draw {
            vertex_count: mesh.vertex_count,
            index_count: mesh.index_count,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::buffer::HeadlessAllocator;
    use crate::terrain::{build_chunk_mesh, HeightField};

    #[test]
    fn test_draw_snapshots_uniforms() {
        let allocator = HeadlessAllocator::new();
        let mesh = GpuMesh::upload(&allocator, "m", &build_chunk_mesh(&HeightField::default(), 0, 0, 2)).unwrap();

        let mut shader = RecordingShader::with_command_log();
        shader.use_program();
        shader.draw_mesh(&mesh);
        let model = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        shader.set_mat4(MODEL, &model);
        shader.set_vec3(TINT, Vec3::new(1.0, 0.0, 0.0));
        shader.draw_mesh(&mesh);

        let draws = shader.draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].model, Mat4::IDENTITY);
        assert_eq!(draws[1].model, model);
        assert_eq!(draws[1].tint, Vec3::X);
        assert_eq!(draws[1].index_count, 24);
        assert!(draws[1].vertex_buffer.is_none());

        assert_eq!(shader.commands()[0], ShaderCommand::UseProgram);
        assert_eq!(shader.commands().len(), 5);
    }

    #[test]
    fn test_scalar_uniforms() {
        let mut shader = RecordingShader::new();
        shader.set_float("time", 2.5);
        shader.set_int("weather", 2);
        assert_eq!(shader.float("time"), Some(2.5));
        assert_eq!(shader.int("weather"), Some(2));
        assert!(shader.commands().is_empty());
    }
}
