//! Camera-driven chunk residency.
//!
//! The store keeps every chunk within `view_distance` (Chebyshev, in chunks)
//! of the camera chunk resident and evicts chunks once they are farther than
//! `view_distance + eviction_margin`. The gap between the two radii keeps a
//! camera oscillating across a chunk border from rebuilding the same chunks
//! every frame.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glam::{Mat4, Vec3};
use rayon::prelude::*;

use crate::core::error::Error;
use crate::core::types::Result;
use crate::render::buffer::{BufferAllocator, GpuMesh};
use crate::render::shader::{Shader, MODEL, TINT};
use crate::streaming::chunk::{Chunk, ChunkBuilder, ChunkData};
use crate::streaming::config::{GenerationMode, StreamingConfig};
use crate::streaming::coord::ChunkCoord;
use crate::streaming::loader::{ChunkLoader, LoadResult};
use crate::streaming::priority::{ChunkPriority, ChunkPriorityQueue};

/// What one call to [`ChunkStore::update`] did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub camera_chunk: ChunkCoord,
    /// Chunks built and inserted
    pub built: usize,
    /// Chunks evicted
    pub evicted: usize,
    /// Background results dropped because they were no longer required
    pub discarded: usize,
    /// Background builds requested or awaiting upload
    pub pending: usize,
    /// Chunks resident after the update
    pub resident: usize,
}

impl UpdateStats {
    /// Whether the resident set changed
    pub fn changed(&self) -> bool {
        self.built > 0 || self.evicted > 0
    }
}

/// Decoration counts over all resident chunks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstanceCounts {
    pub trees: usize,
    pub cabins: usize,
    pub flowers: usize,
    pub boats: usize,
}

/// Map of resident chunks and the logic deciding what is resident
pub struct ChunkStore {
    config: StreamingConfig,
    builder: ChunkBuilder,
    allocator: Arc<dyn BufferAllocator>,
    chunks: HashMap<ChunkCoord, Chunk>,
    queue: ChunkPriorityQueue,
    loader: Option<ChunkLoader>,
    /// Background results waiting for an upload slot
    ready: Vec<ChunkData>,
}

impl ChunkStore {
    /// Create an empty store. Background mode starts the loader here.
    pub fn new(
        config: StreamingConfig,
        builder: ChunkBuilder,
        allocator: Arc<dyn BufferAllocator>,
    ) -> Result<Self> {
        config.validate()?;
        if builder.chunk_size() != config.chunk_size {
            return Err(Error::Config(format!(
                "builder chunk size {} does not match streaming chunk size {}",
                builder.chunk_size(),
                config.chunk_size
            )));
        }

        let loader = match config.mode {
            GenerationMode::Synchronous => None,
            GenerationMode::Background => {
                Some(ChunkLoader::new(builder.clone(), config.worker_threads)?)
            }
        };

        Ok(Self {
            config,
            builder,
            allocator,
            chunks: HashMap::new(),
            queue: ChunkPriorityQueue::new(),
            loader,
            ready: Vec::new(),
        })
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Bring the resident set in line with the camera position.
    ///
    /// Evicts chunks beyond the eviction distance, then builds missing
    /// required chunks nearest first. If an upload fails the error names the
    /// chunk; chunks inserted before the failure stay resident and the failed
    /// one is retried on the next call.
    pub fn update(&mut self, camera_pos: Vec3) -> Result<UpdateStats> {
        let size = self.config.chunk_size;
        let camera_chunk = ChunkCoord::from_world_pos(camera_pos, size);
        let mut stats = UpdateStats {
            camera_chunk,
            ..Default::default()
        };

        let evict_beyond = self.config.eviction_distance();
        let before = self.chunks.len();
        self.chunks.retain(|coord, _| {
            let keep = coord.chebyshev_distance(camera_chunk) <= evict_beyond;
            if !keep {
                log::trace!("Evicting chunk {}", coord);
            }
            keep
        });
        stats.evicted = before - self.chunks.len();

        let chunks = &self.chunks;
        self.queue.update(camera_pos, size, self.config.view_distance, |c| {
            chunks.contains_key(&c)
        });
        let missing = self.queue.drain_ordered();

        match self.config.mode {
            GenerationMode::Synchronous => self.build_synchronous(&missing, &mut stats)?,
            GenerationMode::Background => self.stream_background(camera_chunk, &missing, &mut stats)?,
        }

        stats.resident = self.chunks.len();
        if stats.changed() || stats.discarded > 0 {
            log::debug!(
                "Chunk update at {}: built {}, evicted {}, discarded {}, pending {}, resident {}",
                camera_chunk,
                stats.built,
                stats.evicted,
                stats.discarded,
                stats.pending,
                stats.resident
            );
        }
        Ok(stats)
    }

    /// Build CPU data for every missing chunk in parallel, then upload on
    /// the calling thread.
    fn build_synchronous(&mut self, missing: &[ChunkPriority], stats: &mut UpdateStats) -> Result<()> {
        if missing.is_empty() {
            return Ok(());
        }

        let builder = &self.builder;
        let built: Vec<ChunkData> = missing.par_iter().map(|p| builder.build(p.coord)).collect();

        for data in built {
            self.insert(data)?;
            stats.built += 1;
        }
        Ok(())
    }

    /// Request missing chunks from the loader and upload a bounded number of
    /// finished ones.
    fn stream_background(
        &mut self,
        camera_chunk: ChunkCoord,
        missing: &[ChunkPriority],
        stats: &mut UpdateStats,
    ) -> Result<()> {
        let view = self.config.view_distance;
        let in_range = |c: ChunkCoord| c.chebyshev_distance(camera_chunk) <= view;

        let loader = self
            .loader
            .as_mut()
            .ok_or_else(|| Error::Streaming("background mode without a chunk loader".into()))?;

        loader.retain_pending(in_range);

        let mut ready: HashSet<ChunkCoord> = self.ready.iter().map(|d| d.coord).collect();
        for result in loader.poll_results() {
            match result {
                LoadResult::Built(data) => {
                    let fresh = !self.chunks.contains_key(&data.coord) && !ready.contains(&data.coord);
                    if in_range(data.coord) && fresh {
                        ready.insert(data.coord);
                        self.ready.push(data);
                    } else {
                        log::trace!("Discarding stale chunk {}", data.coord);
                        stats.discarded += 1;
                    }
                }
                LoadResult::Failed(coord, reason) => {
                    log::error!("Background build of chunk {} failed: {}", coord, reason);
                    stats.discarded += 1;
                }
            }
        }

        let before = self.ready.len();
        self.ready.retain(|d| in_range(d.coord));
        stats.discarded += before - self.ready.len();

        ready.retain(|c| in_range(*c));
        for p in missing {
            if !ready.contains(&p.coord) {
                loader.request(p.coord, p.priority);
            }
        }

        self.ready.sort_by_key(|d| d.coord.chebyshev_distance(camera_chunk));
        let take = self.config.max_uploads_per_frame.min(self.ready.len());
        let batch: Vec<ChunkData> = self.ready.drain(..take).collect();

        stats.pending = loader.pending_count() + self.ready.len();

        for data in batch {
            self.insert(data)?;
            stats.built += 1;
        }
        Ok(())
    }

    fn insert(&mut self, data: ChunkData) -> Result<()> {
        let coord = data.coord;
        match Chunk::upload(self.allocator.as_ref(), data) {
            Ok(chunk) => {
                self.chunks.insert(coord, chunk);
                Ok(())
            }
            Err(e) => {
                log::warn!("{}", e);
                Err(e)
            }
        }
    }

    /// Terrain height at world (x, z), whether or not the chunk is resident
    pub fn get_height(&self, x: f32, z: f32) -> f32 {
        self.builder.field().height(x, z)
    }

    pub fn get(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Resident coordinates, sorted
    pub fn resident_coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = self.chunks.keys().copied().collect();
        coords.sort();
        coords
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn instance_counts(&self) -> InstanceCounts {
        self.chunks.values().fold(InstanceCounts::default(), |mut acc, chunk| {
            acc.trees += chunk.instances.trees.len();
            acc.cabins += chunk.instances.cabins.len();
            acc.flowers += chunk.instances.flowers.len();
            acc.boats += chunk.instances.boats.len();
            acc
        })
    }

    /// One terrain draw per resident chunk
    pub fn draw<S: Shader + ?Sized>(&self, shader: &mut S) {
        shader.use_program();
        shader.set_mat4(MODEL, &Mat4::IDENTITY);
        shader.set_vec3(TINT, Vec3::ONE);
        for chunk in self.chunks.values() {
            shader.draw_mesh(&chunk.mesh);
        }
    }

    /// One draw of `mesh` per tree
    pub fn draw_trees<S: Shader + ?Sized>(&self, shader: &mut S, mesh: &GpuMesh) {
        shader.use_program();
        shader.set_vec3(TINT, Vec3::ONE);
        for tree in self.chunks.values().flat_map(|c| &c.instances.trees) {
            shader.set_mat4(MODEL, &tree.model_matrix());
            shader.draw_mesh(mesh);
        }
    }

    /// One draw of `mesh` per cabin
    pub fn draw_cabins<S: Shader + ?Sized>(&self, shader: &mut S, mesh: &GpuMesh) {
        shader.use_program();
        shader.set_vec3(TINT, Vec3::ONE);
        for cabin in self.chunks.values().flat_map(|c| &c.instances.cabins) {
            shader.set_mat4(MODEL, &cabin.model_matrix());
            shader.draw_mesh(mesh);
        }
    }

    /// One draw of `mesh` per flower, swaying with `time` and tinted with
    /// its petal color
    pub fn draw_flowers<S: Shader + ?Sized>(&self, shader: &mut S, mesh: &GpuMesh, time: f32) {
        shader.use_program();
        for flower in self.chunks.values().flat_map(|c| &c.instances.flowers) {
            shader.set_mat4(MODEL, &flower.animated_matrix(time));
            shader.set_vec3(TINT, flower.petal_color);
            shader.draw_mesh(mesh);
        }
    }

    /// One draw of `mesh` per boat, bobbing and rolling with `time`
    pub fn draw_boats<S: Shader + ?Sized>(&self, shader: &mut S, mesh: &GpuMesh, time: f32) {
        shader.use_program();
        shader.set_vec3(TINT, Vec3::ONE);
        for boat in self.chunks.values().flat_map(|c| &c.instances.boats) {
            shader.set_mat4(MODEL, &boat.animated_matrix(time));
            shader.draw_mesh(mesh);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clutter::{ClutterConfig, ScatterGenerator};
    use crate::render::buffer::HeadlessAllocator;
    use crate::render::shader::RecordingShader;
    use crate::terrain::HeightField;

    fn store(config: StreamingConfig, allocator: Arc<HeadlessAllocator>) -> ChunkStore {
        let field = Arc::new(HeightField::default());
        let scatter = Arc::new(ScatterGenerator::new(ClutterConfig::default(), field.params().seed));
        let builder = ChunkBuilder::new(field, scatter, config.chunk_size);
        ChunkStore::new(config, builder, allocator).unwrap()
    }

    #[test]
    fn test_initial_update_fills_square() {
        let allocator = Arc::new(HeadlessAllocator::new());
        let mut store = store(StreamingConfig::new(32, 2), allocator.clone());

        let stats = store.update(Vec3::new(1.0, 50.0, 1.0)).unwrap();
        assert_eq!(stats.built, 25);
        assert_eq!(stats.evicted, 0);
        assert_eq!(stats.resident, 25);
        let mut expected: Vec<_> = ChunkCoord::new(0, 0).square(2).collect();
        expected.sort();
        assert_eq!(store.resident_coords(), expected);
        assert_eq!(allocator.ledger().live_buffers(), 50);
    }

    #[test]
    fn test_hysteresis_keeps_nearby_chunks() {
        let allocator = Arc::new(HeadlessAllocator::new());
        let mut store = store(StreamingConfig::new(16, 1), allocator);

        store.update(Vec3::new(8.0, 0.0, 8.0)).unwrap();
        // One chunk east: the west column is at distance 2, inside the margin
        let stats = store.update(Vec3::new(24.0, 0.0, 8.0)).unwrap();
        assert_eq!(stats.evicted, 0);
        assert_eq!(stats.built, 3);
        assert!(store.contains(ChunkCoord::new(-1, 0)));

        // Four chunks east: distance 5 > 1 + 2
        let stats = store.update(Vec3::new(72.0, 0.0, 8.0)).unwrap();
        assert!(!store.contains(ChunkCoord::new(-1, 0)));
        assert!(stats.evicted > 0);
    }

    #[test]
    fn test_draw_issues_one_call_per_chunk() {
        let allocator = Arc::new(HeadlessAllocator::new());
        let mut store = store(StreamingConfig::new(16, 1), allocator);
        store.update(Vec3::ZERO).unwrap();

        let mut shader = RecordingShader::new();
        store.draw(&mut shader);
        assert_eq!(shader.draws().len(), 9);
        assert!(shader.draws().iter().all(|d| d.model == Mat4::IDENTITY));
    }

    #[test]
    fn test_decoration_draws_use_placements() {
        let allocator = Arc::new(HeadlessAllocator::new());
        let mut store = store(StreamingConfig::new(64, 2), allocator.clone());
        store.update(Vec3::ZERO).unwrap();

        let mesh = GpuMesh::upload(allocator.as_ref(), "tree", &crate::clutter::library::tree_mesh()).unwrap();
        let mut shader = RecordingShader::new();
        store.draw_trees(&mut shader, &mesh);

        let counts = store.instance_counts();
        assert_eq!(shader.draws().len(), counts.trees);
        for draw in shader.draws() {
            let origin = draw.model.transform_point3(Vec3::ZERO);
            let expected = store.get_height(origin.x, origin.z);
            assert!((origin.y - expected).abs() < 1e-3);
        }

        shader.clear();
        store.draw_flowers(&mut shader, &mesh, 1.0);
        assert_eq!(shader.draws().len(), counts.flowers);
    }

    #[test]
    fn test_builder_size_mismatch_rejected() {
        let field = Arc::new(HeightField::default());
        let scatter = Arc::new(ScatterGenerator::new(ClutterConfig::default(), 1));
        let builder = ChunkBuilder::new(field, scatter, 32);
        let result = ChunkStore::new(StreamingConfig::new(64, 2), builder, Arc::new(HeadlessAllocator::new()));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
