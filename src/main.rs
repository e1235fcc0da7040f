//! Skyscape - fly over an endless procedural landscape

use std::path::PathBuf;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

use skyscape::core::{
    camera::Camera,
    camera_controller::{FlightCommands, FlightController},
    input::InputState,
    logging,
    simulation::SimulationState,
    time::FrameTimer,
};
use skyscape::render::{
    buffer::DeviceAllocator,
    context::GpuContext,
    pipeline::TerrainPipeline,
    shader::RecordingShader,
};
use skyscape::scene::SceneConfig;
use skyscape::streaming::GenerationMode;
use skyscape::TerrainStreamer;

/// GPU objects created once the window exists
struct RenderResources {
    gpu: GpuContext,
    pipeline: TerrainPipeline,
    streamer: TerrainStreamer,
}

struct App {
    scene: SceneConfig,
    window: Option<Arc<Window>>,
    resources: Option<RenderResources>,
    state: SimulationState,
    controller: FlightController,
    input: InputState,
    timer: FrameTimer,
    shader: RecordingShader,
    cursor_grabbed: bool,
}

impl App {
    fn new(scene: SceneConfig) -> Self {
        let aspect = scene.window_width as f32 / scene.window_height.max(1) as f32;
        let camera = Camera::new(scene.camera_position(), scene.fov_degrees, aspect);

        let mut state = SimulationState::new(camera);
        state.weather = scene.weather;
        state.day_length_seconds = scene.day_length_seconds;

        let mut controller = FlightController::new(scene.cruise_speed, scene.boost_speed);
        controller.min_clearance = scene.min_clearance;

        Self {
            scene,
            window: None,
            resources: None,
            state,
            controller,
            input: InputState::new(),
            timer: FrameTimer::new(),
            shader: RecordingShader::new(),
            cursor_grabbed: false,
        }
    }

    fn create_resources(&self, window: Arc<Window>) -> skyscape::Result<RenderResources> {
        let gpu = pollster::block_on(GpuContext::new(window))?;
        let (width, height) = gpu.size();

        let allocator = Arc::new(DeviceAllocator::new(gpu.device.clone()));
        let streamer = TerrainStreamer::from_scene(allocator, &self.scene)?;
        let pipeline = TerrainPipeline::new(&gpu.device, gpu.format(), width, height);

        Ok(RenderResources {
            gpu,
            pipeline,
            streamer,
        })
    }

    fn toggle_cursor_grab(&mut self) {
        if let Some(window) = &self.window {
            self.cursor_grabbed = !self.cursor_grabbed;

            if self.cursor_grabbed {
                window.set_cursor_grab(CursorGrabMode::Confined)
                    .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked))
                    .ok();
                window.set_cursor_visible(false);
            } else {
                window.set_cursor_grab(CursorGrabMode::None).ok();
                window.set_cursor_visible(true);
            }

            self.input.set_mouse_captured(self.cursor_grabbed);
        }
    }

    /// Advance the simulation and stream terrain around the new camera position
    fn update(&mut self, event_loop: &ActiveEventLoop) {
        let Some(resources) = &mut self.resources else {
            return;
        };

        self.timer.tick();
        let dt = self.timer.delta_secs();
        self.input.begin_frame();

        if self.input.is_key_just_pressed(KeyCode::F7) {
            self.state.cycle_weather();
        }

        let commands = FlightCommands::from_input(&self.input);
        let streamer = &resources.streamer;
        self.controller.apply(&mut self.state.camera, &commands, dt, |x, z| {
            streamer.get_height(x, z)
        });
        self.state.advance(dt);

        match resources.streamer.update(self.state.camera.position) {
            Ok(stats) if stats.changed() => log::debug!(
                "Camera chunk {}: built {}, evicted {}, resident {}, pending {}",
                stats.camera_chunk, stats.built, stats.evicted, stats.resident, stats.pending
            ),
            Ok(_) => {}
            Err(e) if e.is_out_of_memory() => {
                // Missing chunks are retried on the next frame
                log::warn!("Chunk upload deferred: {}", e);
            }
            Err(e) => {
                log::error!("Terrain streaming failed: {}", e);
                event_loop.exit();
            }
        }
    }

    fn render(&mut self) {
        let Some(resources) = &mut self.resources else {
            return;
        };

        let frame = match resources.gpu.get_current_texture() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Skipping frame: {}", e);
                let (width, height) = resources.gpu.size();
                resources.gpu.resize(width, height);
                return;
            }
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.shader.clear();
        resources.streamer.draw_all(&mut self.shader, self.state.elapsed);
        let draws = self.shader.take_draws();

        let mut encoder = resources.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });
        resources.pipeline.render(
            &resources.gpu.device,
            &resources.gpu.queue,
            &mut encoder,
            &view,
            &self.state,
            &draws,
        );
        resources.gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }

    fn update_title(&self) {
        let (Some(window), Some(resources)) = (&self.window, &self.resources) else {
            return;
        };
        let position = self.state.camera.position;
        window.set_title(&format!(
            "{} - {:.1} FPS | {} chunks | ({:.0}, {:.0}, {:.0}) | {:?} | Tab=mouse, WASD/QE=fly, Shift=boost, F7=weather",
            self.scene.window_title,
            self.timer.fps(),
            resources.streamer.store().len(),
            position.x,
            position.y,
            position.z,
            self.state.weather,
        ));
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(self.scene.window_title.clone())
            .with_inner_size(PhysicalSize::new(self.scene.window_width, self.scene.window_height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let resources = match self.create_resources(window.clone()) {
            Ok(resources) => resources,
            Err(e) => {
                log::error!("Failed to initialize renderer: {}", e);
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        self.state.camera.set_aspect(size.width as f32, size.height as f32);

        // Start above the ground
        let position = self.state.camera.position;
        let floor = resources.streamer.get_height(position.x, position.z) + self.controller.min_clearance;
        self.state.camera.position.y = position.y.max(floor);

        log::info!("Window created: {}x{}", size.width, size.height);
        log::info!("GPU: {}", resources.gpu.adapter.get_info().name);

        self.window = Some(window);
        self.resources = Some(resources);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.input.process_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    if let Some(resources) = &mut self.resources {
                        resources.gpu.resize(size.width, size.height);
                        resources.pipeline.resize(&resources.gpu.device, size.width, size.height);
                        self.state.camera.set_aspect(size.width as f32, size.height as f32);
                    }
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed() && !event.repeat {
                    match event.physical_key {
                        PhysicalKey::Code(KeyCode::Escape) => {
                            if self.cursor_grabbed {
                                self.toggle_cursor_grab();
                            } else {
                                event_loop.exit();
                            }
                        }
                        PhysicalKey::Code(KeyCode::Tab) => self.toggle_cursor_grab(),
                        _ => {}
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if state.is_pressed() && button == winit::event::MouseButton::Left && !self.cursor_grabbed {
                    self.toggle_cursor_grab();
                }
            }
            WindowEvent::RedrawRequested => {
                self.update(event_loop);
                self.render();
                self.update_title();

                self.input.end_frame();

                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.process_mouse_motion(delta);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() {
    logging::init();
    log::info!("Skyscape starting...");

    let args: Vec<String> = std::env::args().collect();
    let scene = match load_scene(&args) {
        Ok(scene) => scene,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };

    let mut app = App::new(scene);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {}", e);
        std::process::exit(1);
    }
}

/// Scene from `--config`, with command line overrides applied on top
fn load_scene(args: &[String]) -> skyscape::Result<SceneConfig> {
    let mut scene = match parse_path_arg(args, "--config", "-c") {
        Some(path) => SceneConfig::load(&path)?,
        None => SceneConfig::default(),
    };

    if let Some(view_distance) = parse_arg(args, "--view-distance", "-v") {
        scene.streaming.view_distance = view_distance;
    }
    if let Some(chunk_size) = parse_arg(args, "--chunk-size", "-s") {
        scene.streaming.chunk_size = chunk_size;
    }
    if args.iter().any(|a| a == "--background") {
        scene.streaming.mode = GenerationMode::Background;
    }

    scene.validate()?;
    Ok(scene)
}

/// Parse --config argument from command line
fn parse_path_arg(args: &[String], long: &str, short: &str) -> Option<PathBuf> {
    let i = args.iter().position(|a| a == long || a == short)?;
    args.get(i + 1).map(PathBuf::from)
}

/// Parse a numeric argument from command line
fn parse_arg<T: std::str::FromStr>(args: &[String], long: &str, short: &str) -> Option<T> {
    let i = args.iter().position(|a| a == long || a == short)?;
    args.get(i + 1)?.parse().ok()
}
