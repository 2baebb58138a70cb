use std::num::NonZeroU32;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use anyhow::Context;
use gridcaster::{Engine, MapDocument};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::input::InputState;
use crate::scaler::{ScaleLut, blit_nearest, build_scale_lut};
use crate::textures::TexturePalette;

mod input;
mod renderer;
mod scaler;
mod textures;

type Surface = softbuffer::Surface<Rc<Window>, Rc<Window>>;

struct App {
    window: Option<Rc<Window>>,
    surface: Option<Surface>,
    engine: Engine,
    palette: TexturePalette,

    // HUD
    frame_counter: u32,
    last_fps_print: Instant,

    // Internal buffer: map view and 3D view side by side
    fb_small: Vec<u32>,
    fb_w: usize,
    fb_h: usize,

    scale_lut: ScaleLut,

    input: InputState,
    last_tick: Instant,
}

impl App {
    fn new(engine: Engine) -> Self {
        let config = engine.config();
        let fb_w = config.view_width * 2;
        let fb_h = config.view_height;
        let palette = TexturePalette::generate(config.texture_size);
        Self {
            window: None,
            surface: None,
            engine,
            palette,

            frame_counter: 0,
            last_fps_print: Instant::now(),

            fb_small: vec![0; fb_w * fb_h],
            fb_w,
            fb_h,

            scale_lut: ScaleLut::empty(),

            input: InputState::default(),
            last_tick: Instant::now(),
        }
    }

    fn create_surface(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let attributes = Window::default_attributes()
            .with_title("gridcaster")
            .with_inner_size(LogicalSize::new(self.fb_w as f64, self.fb_h as f64));

        let window = Rc::new(
            event_loop
                .create_window(attributes)
                .context("create window")?,
        );
        let context = softbuffer::Context::new(window.clone())
            .map_err(|e| anyhow::anyhow!("softbuffer context: {e}"))?;
        let surface = softbuffer::Surface::new(&context, window.clone())
            .map_err(|e| anyhow::anyhow!("softbuffer surface: {e}"))?;

        let size = window.inner_size();
        self.scale_lut = build_scale_lut(
            size.width as usize,
            size.height as usize,
            self.fb_w,
            self.fb_h,
        );

        self.surface = Some(surface);
        self.window = Some(window);
        Ok(())
    }

    fn tick(&mut self) {
        // The engine clamps long frames itself
        let now = Instant::now();
        let dt = now.duration_since(self.last_tick);
        self.last_tick = now;

        let input = self.input.take_frame(dt);
        self.engine.step(&input);
    }

    fn redraw(&mut self, id: WindowId) -> anyhow::Result<()> {
        self.tick();

        let (window, surface) = match (&self.window, &mut self.surface) {
            (Some(w), Some(s)) if w.id() == id => (w, s),
            _ => return Ok(()),
        };

        let size = window.inner_size();
        let (Some(nw), Some(nh)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            return Ok(()); // Minimized window, skip drawing
        };
        let (dw, dh) = (size.width as usize, size.height as usize);
        if self.scale_lut.dst_width() != dw || self.scale_lut.dst_height() != dh {
            self.scale_lut = build_scale_lut(dw, dh, self.fb_w, self.fb_h);
        }

        surface
            .resize(nw, nh)
            .map_err(|e| anyhow::anyhow!("resize surface: {e}"))?;

        renderer::render_frame(
            &mut self.fb_small,
            self.fb_w,
            self.fb_h,
            &self.engine,
            &self.palette,
        );

        let mut buf = surface
            .buffer_mut()
            .map_err(|e| anyhow::anyhow!("buffer_mut: {e}"))?;
        blit_nearest(&mut buf, dw, &self.fb_small, &self.scale_lut);
        buf.present()
            .map_err(|e| anyhow::anyhow!("present: {e}"))?;

        self.frame_counter += 1;
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_fps_print).as_secs_f32();
        if elapsed >= 1.0 {
            let fps = self.frame_counter as f32 / elapsed;
            let pose = self.engine.pose();
            let mode = self.engine.mode().name();
            info!(
                fps,
                x = pose.position.x,
                y = pose.position.y,
                mode,
                "frame stats"
            );
            window.set_title(&format!(
                "gridcaster | {mode} | {fps:.0} fps | pos ({:.2}, {:.2}) dir ({:.2}, {:.2})",
                pose.position.x, pose.position.y, pose.direction.x, pose.direction.y
            ));
            self.frame_counter = 0;
            self.last_fps_print = now;
        }

        window.request_redraw();
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.create_surface(event_loop) {
            error!("{err:#}");
            event_loop.exit();
            return;
        }
        self.last_tick = Instant::now();
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("close requested; stopping");
                event_loop.exit();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                if code == KeyCode::Escape {
                    info!("escape pressed; stopping");
                    event_loop.exit();
                    return;
                }
                self.input.key(code, state);
            }

            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw(id) {
                    error!("{err:#}");
                    event_loop.exit();
                }
            }

            WindowEvent::Resized(new_size) => {
                self.scale_lut = build_scale_lut(
                    new_size.width as usize,
                    new_size.height as usize,
                    self.fb_w,
                    self.fb_h,
                );
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn load_engine() -> anyhow::Result<Engine> {
    match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            let engine = Engine::load(&path)
                .with_context(|| format!("loading map {}", path.display()))?;
            info!(path = %path.display(), "map loaded");
            Ok(engine)
        }
        None => {
            warn!("no map path given; using the demo map");
            Engine::from_document(&MapDocument::demo()).context("building the demo map")
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let engine = load_engine()?;

    let event_loop = EventLoop::new().context("create event loop")?;
    // Render continuously; each redraw requests the next
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(engine);
    event_loop.run_app(&mut app).context("event loop")?;
    Ok(())
}
