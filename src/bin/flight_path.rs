//! Headless flight: streams terrain along a scripted path without a window.
//!
//! Usage: cargo run --release --bin flight_path -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>        Scene JSON file (default: built-in scene)
//!   --seed <SEED>          Terrain seed override
//!   --distance <UNITS>     Length of the flight (default: 4000)
//!   --speed <UNITS/S>      Flight speed (default: 150)
//!   --fps <N>              Simulated frame rate (default: 60)
//!   --view-distance <N>    View distance override in chunks
//!   --chunk-size <N>       Chunk size override in cells
//!   --budget-mb <MB>       Host memory budget for chunk buffers
//!   --background           Build chunks on worker threads

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use glam::Vec3;

use skyscape::core::camera_controller::{FlightCommands, FlightController};
use skyscape::core::camera::Camera;
use skyscape::render::buffer::{BufferAllocator, HeadlessAllocator};
use skyscape::render::shader::RecordingShader;
use skyscape::scene::SceneConfig;
use skyscape::streaming::GenerationMode;
use skyscape::TerrainStreamer;

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> skyscape::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut scene = match parse_str_arg(&args, "--config") {
        Some(path) => SceneConfig::load(PathBuf::from(path))?,
        None => SceneConfig::default(),
    };
    if let Some(seed) = parse_arg(&args, "--seed") {
        scene.terrain.seed = seed;
    }
    if let Some(view_distance) = parse_arg(&args, "--view-distance") {
        scene.streaming.view_distance = view_distance;
    }
    if let Some(chunk_size) = parse_arg(&args, "--chunk-size") {
        scene.streaming.chunk_size = chunk_size;
    }
    if args.iter().any(|a| a == "--background") {
        scene.streaming.mode = GenerationMode::Background;
    }
    scene.validate()?;

    let distance: f32 = parse_arg(&args, "--distance").unwrap_or(4000.0);
    let speed: f32 = parse_arg(&args, "--speed").unwrap_or(scene.cruise_speed);
    let fps: f32 = parse_arg(&args, "--fps").unwrap_or(60.0);
    let dt = 1.0 / fps.max(1.0);

    let allocator = match parse_arg::<u64>(&args, "--budget-mb") {
        Some(mb) => Arc::new(HeadlessAllocator::with_budget(mb * 1024 * 1024)),
        None => Arc::new(HeadlessAllocator::new()),
    };

    println!("=== Skyscape Flight Path ===");
    println!("Seed:          {}", scene.terrain.seed);
    println!("Chunk size:    {}", scene.streaming.chunk_size);
    println!("View distance: {}", scene.streaming.view_distance);
    println!("Mode:          {:?}", scene.streaming.mode);
    println!("Distance:      {} at {} units/s, {} fps", distance, speed, fps);
    println!();

    let mut streamer = TerrainStreamer::from_scene(allocator.clone(), &scene)?;

    // Fly a gentle weave, slightly nose down so the ground clamp kicks in
    let mut camera = Camera::new(scene.camera_position(), scene.fov_degrees, 16.0 / 9.0);
    let mut controller = FlightController::new(speed, scene.boost_speed);
    controller.min_clearance = scene.min_clearance;
    controller.set_orientation(-std::f32::consts::FRAC_PI_2, -0.2);

    let start_pos = camera.position;
    let mut shader = RecordingShader::new();
    let mut elapsed = 0.0f32;
    let mut frames = 0u64;
    let mut total_built = 0usize;
    let mut total_evicted = 0usize;
    let mut deferred_frames = 0u64;
    let mut worst_update_ms = 0.0f64;
    let mut peak_bytes = 0u64;
    let started = Instant::now();

    while horizontal_distance(start_pos, camera.position) < distance {
        let commands = FlightCommands {
            thrust: 1.0,
            look: ((elapsed * 0.5).sin() * 2.0, 0.0),
            ..Default::default()
        };
        controller.apply(&mut camera, &commands, dt, |x, z| streamer.get_height(x, z));
        elapsed += dt;
        frames += 1;

        let update_start = Instant::now();
        match streamer.update(camera.position) {
            Ok(stats) => {
                total_built += stats.built;
                total_evicted += stats.evicted;
                if stats.changed() {
                    log::debug!(
                        "Frame {}: camera chunk {}, built {}, evicted {}, resident {}",
                        frames, stats.camera_chunk, stats.built, stats.evicted, stats.resident
                    );
                }
            }
            Err(e) if e.is_out_of_memory() => {
                deferred_frames += 1;
                log::warn!("Frame {}: {}", frames, e);
            }
            Err(e) => return Err(e),
        }
        worst_update_ms = worst_update_ms.max(update_start.elapsed().as_secs_f64() * 1000.0);
        peak_bytes = peak_bytes.max(allocator.ledger().live_bytes());

        shader.clear();
        streamer.draw_all(&mut shader, elapsed);
    }

    let counts = streamer.instance_counts();
    let ledger = allocator.ledger();

    println!("=== Summary ===");
    println!("Frames:            {}", frames);
    println!("Wall time:         {:.2}s", started.elapsed().as_secs_f64());
    println!("Worst update:      {:.2}ms", worst_update_ms);
    println!("Chunks built:      {}", total_built);
    println!("Chunks evicted:    {}", total_evicted);
    println!("Deferred frames:   {}", deferred_frames);
    println!("Resident chunks:   {}", streamer.store().len());
    println!("Draws last frame:  {}", shader.draws().len());
    println!(
        "Decorations:       {} trees, {} cabins, {} flowers, {} boats",
        counts.trees, counts.cabins, counts.flowers, counts.boats
    );
    println!(
        "Buffers:           {} live, {:.1} MB live, {:.1} MB peak",
        ledger.live_buffers(),
        ledger.live_bytes() as f64 / (1024.0 * 1024.0),
        peak_bytes as f64 / (1024.0 * 1024.0)
    );
    println!(
        "Allocations:       {} created, {} released",
        ledger.total_allocations(),
        ledger.total_releases()
    );
    println!("Final position:    {:?}", camera.position);

    Ok(())
}

fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    (a.x - b.x).hypot(a.z - b.z)
}

/// Parse a numeric argument
fn parse_arg<T: std::str::FromStr>(args: &[String], name: &str) -> Option<T> {
    parse_str_arg(args, name)?.parse().ok()
}

/// Parse a string argument
fn parse_str_arg(args: &[String], name: &str) -> Option<String> {
    let i = args.iter().position(|a| a == name)?;
    args.get(i + 1).cloned()
}
