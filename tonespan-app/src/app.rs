use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::ThreadRng;
use tracing::error;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use tonespan_audio::{slider_gain, synthesize, CpalSink, PlaybackSink, STIMULUS_MS};
use tonespan_core::{ScenarioPhase, HARMONIC_FREQUENCIES, SAMPLE_RATE, UNRELATED_FREQUENCIES};
use tonespan_session::{Session, SessionConfig};

use crate::render::{GridRenderer, GridView, READY_CELL};
use crate::results::CsvRecorder;

type AppSession = Session<ThreadRng, GridView, CpalSink, CsvRecorder>;

/// Play the reference tone once, for checking the output device and volume.
pub fn play_test_sound(volume: u8) -> Result<()> {
    let mut sink = CpalSink::new(SAMPLE_RATE)?;
    let wave = Arc::new(synthesize(HARMONIC_FREQUENCIES[4], SAMPLE_RATE));
    sink.play(wave, slider_gain(volume));
    std::thread::sleep(Duration::from_millis(STIMULUS_MS + 100));
    Ok(())
}

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<GridRenderer>,
    session: AppSession,
    cursor: (f32, f32),
    quantum: Duration,
    next_tick: Option<Instant>,
    title: String,
}

impl App {
    pub fn new(cli: &crate::Cli, recorder: CsvRecorder) -> Result<Self> {
        let config = SessionConfig {
            volume: cli.volume,
            ..SessionConfig::default()
        };
        let quantum = config.tick_quantum();
        let sink = CpalSink::new(config.sample_rate)?;
        let mut session = Session::new(
            config,
            rand::rng(),
            GridView::default(),
            sink,
            recorder,
            cli.participant.clone(),
        );
        session.register_scenario("harmonic", Some(&HARMONIC_FREQUENCIES))?;
        session.register_scenario("unrelated", Some(&UNRELATED_FREQUENCIES))?;
        session.register_scenario("silent", None)?;
        session.start()?;

        Ok(Self {
            window: None,
            pixels: None,
            renderer: None,
            session,
            cursor: (0.0, 0.0),
            quantum,
            next_tick: None,
            title: "Tonespan".to_string(),
        })
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        let result = event_loop.run_app(&mut self);
        result.map_err(Into::into)
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(self.title.as_str())
            .with_inner_size(LogicalSize::new(540.0, 540.0));
        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();

        let surface_texture = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface_texture)?);
        self.renderer = Some(GridRenderer::new(size.width, size.height)?);

        window.request_redraw();
        self.window = Some(window);
        self.next_tick = Some(Instant::now() + self.quantum);
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut())
        else {
            return Ok(());
        };
        renderer.render(&self.session.view, pixels.frame_mut())?;
        pixels.render()?;
        self.session.view.dirty = false;
        Ok(())
    }

    /// Push pending view changes out: window title for labels, a redraw for
    /// everything else.
    fn sync_presentation(&mut self) {
        if !self.session.view.dirty {
            return;
        }
        let wanted = if self.session.view.closing {
            "Thank you for participating".to_string()
        } else if self.session.view.label.is_empty() {
            "Tonespan".to_string()
        } else {
            self.session.view.label.clone()
        };
        if wanted != self.title {
            self.title = wanted;
            if let Some(window) = &self.window {
                window.set_title(&self.title);
            }
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(err) = pixels.resize_surface(size.width, size.height) {
                error!("failed to resize surface: {err}");
            }
            if let Err(err) = pixels.resize_buffer(size.width, size.height) {
                error!("failed to resize buffer: {err}");
            }
        }
        if let Some(renderer) = &mut self.renderer {
            if let Err(err) = renderer.resize(size.width, size.height) {
                error!("failed to resize renderer: {err}");
            }
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn press_ready(&mut self) {
        if let Some(name) = self.session.active_scenario().map(|s| s.name.clone()) {
            self.session.ready_pressed(&name);
        }
    }

    fn choose(&mut self, index: usize) {
        if let Some(name) = self.session.active_scenario().map(|s| s.name.clone()) {
            self.session.stimulus_chosen(&name, index);
        }
    }

    fn handle_key(&mut self, key: PhysicalKey, event_loop: &ActiveEventLoop) {
        let PhysicalKey::Code(code) = key else { return };
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Space | KeyCode::Enter => self.press_ready(),
            _ => {
                if let Some(index) = digit_index(code) {
                    self.choose(index);
                }
            }
        }
    }

    fn handle_click(&mut self) {
        let Some(cell) = self
            .renderer
            .as_ref()
            .and_then(|r| r.cell_at(self.cursor.0, self.cursor.1))
        else {
            return;
        };
        let Some(phase) = self.session.active_scenario().map(|s| s.phase) else {
            return;
        };
        match phase {
            ScenarioPhase::Idle if cell == READY_CELL => self.press_ready(),
            ScenarioPhase::AwaitingInput => self.choose(cell),
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(err) = self.create_window_and_surface(event_loop) {
                error!("failed to create window and surface: {err:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.render() {
                    error!("render failed: {err:#}");
                    event_loop.exit();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                self.handle_key(event.physical_key, event_loop);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput { state, button, .. }
                if state.is_pressed() && button == MouseButton::Left =>
            {
                self.handle_click();
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(mut next_tick) = self.next_tick else {
            return;
        };
        let now = Instant::now();
        while next_tick <= now {
            if let Err(err) = self.session.tick(self.quantum) {
                error!("session error: {err:#}");
                event_loop.exit();
                return;
            }
            next_tick += self.quantum;
        }
        self.next_tick = Some(next_tick);
        event_loop.set_control_flow(ControlFlow::WaitUntil(next_tick));
        self.sync_presentation();
    }
}

fn digit_index(code: KeyCode) -> Option<usize> {
    Some(match code {
        KeyCode::Digit1 => 0,
        KeyCode::Digit2 => 1,
        KeyCode::Digit3 => 2,
        KeyCode::Digit4 => 3,
        KeyCode::Digit5 => 4,
        KeyCode::Digit6 => 5,
        KeyCode::Digit7 => 6,
        KeyCode::Digit8 => 7,
        KeyCode::Digit9 => 8,
        _ => return None,
    })
}
