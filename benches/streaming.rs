use criterion::{criterion_group, criterion_main, Criterion, black_box};

use skyscape::clutter::{ClutterConfig, ScatterGenerator};
use skyscape::render::buffer::HeadlessAllocator;
use skyscape::render::shader::RecordingShader;
use skyscape::streaming::{ChunkBuilder, ChunkCoord, ChunkPriorityQueue, StreamingConfig};
use skyscape::terrain::{build_chunk_mesh, HeightField};
use skyscape::TerrainStreamer;

use glam::Vec3;
use std::sync::Arc;

fn builder(chunk_size: u32) -> ChunkBuilder {
    let field = Arc::new(HeightField::default());
    let scatter = Arc::new(ScatterGenerator::new(ClutterConfig::default(), field.params().seed));
    ChunkBuilder::new(field, scatter, chunk_size)
}

fn bench_height_sample(c: &mut Criterion) {
    let field = HeightField::default();

    c.bench_function("height_sample", |b| {
        let mut x = 0.0f32;
        b.iter(|| {
            x += 1.37;
            field.height(black_box(x), black_box(x * 0.5))
        });
    });
}

fn bench_chunk_mesh_32(c: &mut Criterion) {
    let field = HeightField::default();

    c.bench_function("chunk_mesh_32", |b| {
        b.iter(|| build_chunk_mesh(&field, black_box(3), black_box(-2), 32));
    });
}

fn bench_chunk_mesh_64(c: &mut Criterion) {
    let field = HeightField::default();

    c.bench_function("chunk_mesh_64", |b| {
        b.iter(|| build_chunk_mesh(&field, black_box(3), black_box(-2), 64));
    });
}

fn bench_scatter(c: &mut Criterion) {
    let field = HeightField::default();
    let scatter = ScatterGenerator::new(ClutterConfig::default(), field.params().seed);

    c.bench_function("scatter_chunk_64", |b| {
        let mut i = 0;
        b.iter(|| {
            i += 1;
            scatter.scatter(&field, black_box(ChunkCoord::new(i % 17, i / 17)), 64)
        });
    });
}

fn bench_chunk_build(c: &mut Criterion) {
    let builder = builder(64);

    c.bench_function("chunk_build_64", |b| {
        b.iter(|| builder.build(black_box(ChunkCoord::new(5, 7))));
    });
}

fn bench_priority_update(c: &mut Criterion) {
    let mut queue = ChunkPriorityQueue::new();

    c.bench_function("priority_update_radius_8", |b| {
        b.iter(|| {
            queue.update(black_box(Vec3::new(130.0, 40.0, -75.0)), 64, 8, |_| false);
            black_box(queue.drain_ordered().len())
        });
    });
}

fn bench_update_while_moving(c: &mut Criterion) {
    let allocator = Arc::new(HeadlessAllocator::new());
    let mut streamer = TerrainStreamer::new(allocator, StreamingConfig::new(32, 3))
        .expect("streamer");
    let mut x = 0.0f32;
    streamer.update(Vec3::ZERO).expect("initial update");

    c.bench_function("update_while_moving", |b| {
        b.iter(|| {
            // One new chunk column roughly every 8 updates
            x += 4.0;
            black_box(streamer.update(Vec3::new(x, 80.0, 0.0)).expect("update"))
        });
    });
}

fn bench_draw_all(c: &mut Criterion) {
    let allocator = Arc::new(HeadlessAllocator::new());
    let mut streamer = TerrainStreamer::new(allocator, StreamingConfig::new(32, 4))
        .expect("streamer");
    streamer.update(Vec3::ZERO).expect("update");
    let mut shader = RecordingShader::new();

    c.bench_function("draw_all_81_chunks", |b| {
        b.iter(|| {
            shader.clear();
            streamer.draw_all(&mut shader, black_box(1.5));
            black_box(shader.draws().len())
        });
    });
}

criterion_group!(
    benches,
    bench_height_sample,
    bench_chunk_mesh_32,
    bench_chunk_mesh_64,
    bench_scatter,
    bench_chunk_build,
    bench_priority_update,
    bench_update_while_moving,
    bench_draw_all,
);
criterion_main!(benches);
