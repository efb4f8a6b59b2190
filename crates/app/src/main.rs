//! trivis - triangle viewer entry point.
//!
//! Parses the triangle input, opens a window and drives the presentation
//! loop from the winit event loop until the window is closed.

mod cli;
mod input;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use trivis_core::{Config, FrameStats, Timer};
use trivis_platform::Window;
use trivis_renderer::{PresentationLoop, Renderer};

use crate::cli::Args;
use crate::input::TriangleScene;

/// Camera orbit angle per arrow key press, in radians.
const ROTATE_STEP: f32 = 0.05;

struct App {
    config: Config,
    scene: TriangleScene,
    // Declared before the window so the surface goes first.
    presenter: Option<PresentationLoop<Renderer>>,
    window: Option<Window>,
    timer: Timer,
    stats: FrameStats,
    failure: Option<anyhow::Error>,
}

impl App {
    fn new(config: Config, scene: TriangleScene) -> Self {
        Self {
            config,
            scene,
            presenter: None,
            window: None,
            timer: Timer::new(),
            stats: FrameStats::new(Duration::from_secs(1)),
            failure: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_config = &self.config.window;
        let window = Window::new(
            event_loop,
            window_config.width,
            window_config.height,
            &window_config.title,
        )
        .context("Failed to create window")?;

        let mut renderer =
            Renderer::new(&window, &self.config).context("Failed to create renderer")?;
        renderer
            .load_geometry(&self.scene.triangles, &self.scene.wireframe)
            .context("Failed to upload geometry")?;

        if let Some(bounds) = &self.scene.bounds {
            renderer.camera_mut().frame_bounds(bounds);
        }

        info!("Initialization complete, entering main loop");
        self.presenter = Some(PresentationLoop::new(renderer));
        self.window = Some(window);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{:#}", err);
        self.failure = Some(err);
        event_loop.exit();
    }

    fn shutdown(&mut self) {
        if let Some(mut presenter) = self.presenter.take()
            && let Err(e) = presenter.shutdown()
        {
            error!("Failed to drain the device: {}", e);
        }
    }

    fn on_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode) {
        let (yaw, pitch) = match key {
            KeyCode::ArrowLeft => (ROTATE_STEP, 0.0),
            KeyCode::ArrowRight => (-ROTATE_STEP, 0.0),
            KeyCode::ArrowUp => (0.0, ROTATE_STEP),
            KeyCode::ArrowDown => (0.0, -ROTATE_STEP),
            KeyCode::Escape => {
                event_loop.exit();
                return;
            }
            _ => return,
        };
        if let Some(presenter) = self.presenter.as_mut() {
            presenter.driver_mut().camera_mut().orbit(yaw, pitch);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none()
            && let Err(e) = self.init(event_loop)
        {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let Some(window) = self.window.as_mut() else {
                    return;
                };
                window.resize(size.width, size.height);

                if let Some(presenter) = self.presenter.as_mut() {
                    presenter.driver_mut().set_window_extent(window.extent());
                    if !window.is_minimized() {
                        presenter.request_recreate();
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(report) = self.stats.record(self.timer.tick()) {
                    debug!(
                        "{} frames, {:.2} ms/frame ({:.1} fps)",
                        report.frames, report.average_frame_ms, report.fps
                    );
                }

                let Some(presenter) = self.presenter.as_mut() else {
                    return;
                };
                if let Err(e) = presenter.run_iteration() {
                    self.fail(event_loop, anyhow::Error::new(e).context("Frame failed"));
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed()
                    && let PhysicalKey::Code(key) = event.physical_key
                {
                    self.on_key(event_loop, key);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        // A minimized window gets no redraws until the next resize event.
        if window.is_minimized() {
            event_loop.set_control_flow(ControlFlow::Wait);
        } else {
            event_loop.set_control_flow(ControlFlow::Poll);
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

fn load_scene(args: &Args, config: &Config) -> Result<TriangleScene> {
    let Some(path) = &args.input else {
        info!("No input given, presenting an empty scene");
        return Ok(TriangleScene::default());
    };

    let text = input::read_input(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let triangles = input::parse_triangles(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    info!("Loaded {} triangle(s) from {}", triangles.len(), path.display());
    Ok(input::build_scene(&triangles, config.scene.show_bounds))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    trivis_core::init_logging(&config.logging.filter);
    info!("Starting trivis");

    let scene = load_scene(&args, &config)?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, scene);
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
