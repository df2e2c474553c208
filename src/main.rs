use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use glam::Vec2;
use log::{info, warn};
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, KeyboardInput, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::WindowBuilder;

use umbra_viewer::app::run_headless;
use umbra_viewer::input::{self, KeyAction, MouseButton};
use umbra_viewer::render::{fixed_camera, CameraParams, DebugToggles, Renderer};
use umbra_viewer::scene::{CameraMode, Scene, ScenePreset};
use umbra_viewer::OrbitCamera;

const WINDOW_TITLE: &str = "Umbra Viewer";

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let scene = Scene::preset(options.scene, options.model.as_deref());

    if options.headless {
        run_headless(&scene, options.frames);
        return Ok(());
    }
    println!("{}", scene.summary());

    match run_interactive(&scene) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!(
                    "{err}. Falling back to --headless mode (set DISPLAY or install X11 libs to enable rendering)."
                );
                run_headless(&scene, options.frames);
                Ok(())
            } else {
                Err(err)
            }
        }
    }
}

fn run_interactive(scene: &Scene) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop =
        event_loop.map_err(|panic| WindowInitError::from_panic("event loop", panic))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(1280.0, 720.0))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let renderer = block_on(Renderer::new(Arc::clone(&window), scene))?;
    if let Some(advisory) = renderer.advisory() {
        warn!("{advisory}");
        window.set_title(&format!("{WINDOW_TITLE} [{advisory}]"));
    }

    let orbit = match scene.camera {
        CameraMode::Orbit { initial } => Some(initial),
        CameraMode::Fixed { .. } => None,
    };

    let mut app = AppState {
        renderer,
        camera_mode: scene.camera,
        orbit,
        debug: DebugToggles::default(),
        cursor: Vec2::ZERO,
        start: Instant::now(),
        last_error: None,
    };

    let mut event_loop = event_loop;
    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        if let Err(err) = app.process_event(&event, control_flow) {
            app.last_error = Some(err);
            control_flow.set_exit();
        }
    });

    if let Some(position) = app.orbit.map(|orbit| orbit.position()) {
        println!(
            "final camera position: ({:.1}, {:.1}, {:.1})",
            position.x, position.y, position.z
        );
    }

    if let Some(err) = app.last_error {
        return Err(err);
    }

    Ok(())
}

struct AppState {
    renderer: Renderer,
    camera_mode: CameraMode,
    orbit: Option<OrbitCamera>,
    debug: DebugToggles,
    cursor: Vec2,
    start: Instant,
    last_error: Option<anyhow::Error>,
}

impl AppState {
    fn process_event(&mut self, event: &Event<()>, control_flow: &mut ControlFlow) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.renderer.window_id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        control_flow.set_exit();
                    }
                    WindowEvent::Resized(size) => {
                        self.renderer.resize(*size);
                    }
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        self.renderer.resize(**new_inner_size);
                    }
                    WindowEvent::KeyboardInput { input, .. } => {
                        self.handle_keyboard(input, control_flow);
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        if input::map_mouse_button(*button) == MouseButton::LEFT {
                            if let Some(orbit) = self.orbit.as_mut() {
                                match state {
                                    ElementState::Pressed => orbit.mouse_pressed(self.cursor),
                                    ElementState::Released => orbit.mouse_released(),
                                }
                            }
                        }
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        self.cursor = input::cursor_position(position.x, position.y);
                        if let Some(orbit) = self.orbit.as_mut() {
                            orbit.mouse_dragged(self.cursor);
                        }
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        if let Some(orbit) = self.orbit.as_mut() {
                            orbit.mouse_scrolled(input::scroll_lines(*delta));
                        }
                    }
                    _ => {}
                }
            }
            Event::RedrawRequested(window_id) if *window_id == self.renderer.window_id() => {
                self.redraw()?;
            }
            Event::MainEventsCleared => {
                self.renderer.window().request_redraw();
            }
            _ => {}
        }
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        if let Some(orbit) = self.orbit.as_mut() {
            orbit.update();
        }
        let camera = self.camera_params();
        let elapsed = self.start.elapsed().as_secs_f32();
        if let Err(err) = self.renderer.render(&camera, elapsed, self.debug) {
            match err {
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                    let size = self.renderer.window().inner_size();
                    self.renderer.resize(size);
                }
                wgpu::SurfaceError::OutOfMemory => {
                    return Err(anyhow!("GPU is out of memory"));
                }
                wgpu::SurfaceError::Timeout => {
                    info!("Surface timeout; retrying next frame");
                }
            }
        }
        Ok(())
    }

    fn camera_params(&self) -> CameraParams {
        let aspect = self.renderer.aspect();
        match (self.camera_mode, self.orbit.as_ref()) {
            (_, Some(orbit)) => orbit.camera_params(aspect),
            (CameraMode::Fixed { position, target }, None) => {
                fixed_camera(position, target, aspect)
            }
            (CameraMode::Orbit { initial }, None) => initial.camera_params(aspect),
        }
    }

    fn handle_keyboard(&mut self, input: &KeyboardInput, control_flow: &mut ControlFlow) {
        if input.state != ElementState::Pressed {
            return;
        }
        let Some(action) = input.virtual_keycode.and_then(input::map_key) else {
            return;
        };
        match action {
            KeyAction::ToggleLightMarkers => {
                self.debug.light_markers = !self.debug.light_markers;
            }
            KeyAction::ToggleFrustums => {
                self.debug.frustums = !self.debug.frustums;
            }
            KeyAction::Quit => control_flow.set_exit(),
        }
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

struct CliOptions {
    scene: ScenePreset,
    model: Option<PathBuf>,
    frames: u32,
    headless: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut scene = ScenePreset::Cube;
        let mut model = None;
        let mut frames = 10;
        let mut headless = false;
        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--scene" => {
                    let Some(name) = args.next() else {
                        return Err(anyhow!("--scene requires a name (cube, orbit or model)"));
                    };
                    scene = ScenePreset::from_name(&name)
                        .ok_or_else(|| anyhow!("Unknown scene: {name}"))?;
                }
                "--model" => {
                    let Some(path) = args.next() else {
                        return Err(anyhow!("--model requires a path to an OBJ file"));
                    };
                    model = Some(PathBuf::from(path));
                }
                "--frames" => {
                    let Some(count) = args.next() else {
                        return Err(anyhow!("--frames requires a count"));
                    };
                    frames = count
                        .parse()
                        .map_err(|_| anyhow!("Invalid frame count: {count}"))?;
                }
                "--headless" => headless = true,
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Usage: umbra-viewer [--scene cube|orbit|model] [--model <path.obj>] [--frames N] [--headless]"
                    ));
                }
            }
        }
        Ok(Self {
            scene,
            model,
            frames,
            headless,
        })
    }
}
