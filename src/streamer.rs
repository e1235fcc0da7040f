//! Terrain streamer: the entry point tying terrain, decorations and chunk
//! residency together.

use std::sync::Arc;

use glam::Vec3;

use crate::clutter::{ClutterConfig, DecorationLibrary, DecorationMeshes, ScatterGenerator};
use crate::core::types::Result;
use crate::render::buffer::BufferAllocator;
use crate::render::shader::Shader;
use crate::scene::SceneConfig;
use crate::streaming::{ChunkBuilder, ChunkStore, InstanceCounts, StreamingConfig, UpdateStats};
use crate::terrain::{HeightField, TerrainParams};

/// Infinite terrain around a moving camera
pub struct TerrainStreamer {
    field: Arc<HeightField>,
    store: ChunkStore,
    decorations: DecorationMeshes,
}

impl TerrainStreamer {
    /// Streamer with default terrain and decoration settings
    pub fn new(allocator: Arc<dyn BufferAllocator>, config: StreamingConfig) -> Result<Self> {
        Self::with_params(allocator, config, TerrainParams::default(), ClutterConfig::default())
    }

    /// Streamer built from a scene config
    pub fn from_scene(allocator: Arc<dyn BufferAllocator>, scene: &SceneConfig) -> Result<Self> {
        Self::with_params(
            allocator,
            scene.streaming.clone(),
            scene.terrain.clone(),
            scene.clutter.clone(),
        )
    }

    /// Create the streamer and upload the shared decoration meshes.
    /// No chunk exists until the first [`update`](Self::update).
    pub fn with_params(
        allocator: Arc<dyn BufferAllocator>,
        config: StreamingConfig,
        terrain: TerrainParams,
        clutter: ClutterConfig,
    ) -> Result<Self> {
        config.validate()?;
        clutter.validate()?;

        let seed = terrain.seed;
        let field = Arc::new(HeightField::new(terrain));
        let scatter = Arc::new(ScatterGenerator::new(clutter, seed));
        let builder = ChunkBuilder::new(Arc::clone(&field), scatter, config.chunk_size);

        let decorations = DecorationMeshes::upload(allocator.as_ref(), &DecorationLibrary::build())?;

        log::info!(
            "Terrain streamer: chunk size {}, view distance {}, eviction margin {}, {:?} generation",
            config.chunk_size,
            config.view_distance,
            config.eviction_margin,
            config.mode
        );

        let store = ChunkStore::new(config, builder, allocator)?;

        Ok(Self {
            field,
            store,
            decorations,
        })
    }

    /// Stream chunks for the camera at `camera_pos`
    pub fn update(&mut self, camera_pos: Vec3) -> Result<UpdateStats> {
        self.store.update(camera_pos)
    }

    /// Terrain height at world (x, z)
    pub fn get_height(&self, x: f32, z: f32) -> f32 {
        self.field.height(x, z)
    }

    pub fn draw<S: Shader + ?Sized>(&self, shader: &mut S) {
        self.store.draw(shader);
    }

    pub fn draw_trees<S: Shader + ?Sized>(&self, shader: &mut S) {
        self.store.draw_trees(shader, &self.decorations.tree);
    }

    pub fn draw_cabins<S: Shader + ?Sized>(&self, shader: &mut S) {
        self.store.draw_cabins(shader, &self.decorations.cabin);
    }

    pub fn draw_flowers<S: Shader + ?Sized>(&self, shader: &mut S, time: f32) {
        self.store.draw_flowers(shader, &self.decorations.flower, time);
    }

    pub fn draw_boats<S: Shader + ?Sized>(&self, shader: &mut S, time: f32) {
        self.store.draw_boats(shader, &self.decorations.boat, time);
    }

    /// Terrain and every decoration kind
    pub fn draw_all<S: Shader + ?Sized>(&self, shader: &mut S, time: f32) {
        self.draw(shader);
        self.draw_trees(shader);
        self.draw_cabins(shader);
        self.draw_flowers(shader, time);
        self.draw_boats(shader, time);
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn instance_counts(&self) -> InstanceCounts {
        self.store.instance_counts()
    }
}
