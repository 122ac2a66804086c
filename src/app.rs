use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, info};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes},
};

use crate::config::RendererConfig;
use crate::errors::{RenderError, Result};
use crate::gfx::{rendering::GpuContext, scene::Scene, RenderEngine};

/// Builds the scene once the window and device exist
pub type SetupCallback = Box<dyn FnOnce(&Arc<GpuContext>, u32, u32) -> Result<Scene>>;
/// Runs before every frame, typically to animate the camera
pub type UpdateCallback = Box<dyn FnMut(&mut Scene, &FrameInfo)>;

/// Frame counter and surface size handed to the update callback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub frame: u64,
    pub width: u32,
    pub height: u32,
}

impl FrameInfo {
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Number of frames averaged per frame time report
pub const FRAME_REPORT_INTERVAL: u64 = 1000;

/// Averages frame times over [`FRAME_REPORT_INTERVAL`] frames
#[derive(Debug)]
pub struct FrameTimer {
    frames: u64,
    window_start: Option<Instant>,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self {
            frames: 0,
            window_start: None,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Counts a frame finished at `now`
    ///
    /// Returns the average frame time whenever a full interval has elapsed.
    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        let start = *self.window_start.get_or_insert(now);
        self.frames += 1;
        if self.frames % FRAME_REPORT_INTERVAL != 0 {
            return None;
        }
        self.window_start = Some(now);
        Some(now.duration_since(start) / FRAME_REPORT_INTERVAL as u32)
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Window, event loop and render loop around one [`Scene`]
pub struct PenumbraApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    config: RendererConfig,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    scene: Option<Scene>,
    setup: Option<SetupCallback>,
    update: Option<UpdateCallback>,
    timer: FrameTimer,
    error: Option<RenderError>,
}

impl PenumbraApp {
    pub fn new(config: RendererConfig) -> Result<Self> {
        let event_loop = EventLoop::new()?;

        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                config,
                window: None,
                render_engine: None,
                scene: None,
                setup: None,
                update: None,
                timer: FrameTimer::new(),
                error: None,
            },
        })
    }

    pub fn with_setup<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&Arc<GpuContext>, u32, u32) -> Result<Scene> + 'static,
    {
        self.app_state.setup = Some(Box::new(setup));
        self
    }

    pub fn with_update<F>(mut self, update: F) -> Self
    where
        F: FnMut(&mut Scene, &FrameInfo) + 'static,
    {
        self.app_state.update = Some(Box::new(update));
        self
    }

    /// Runs the event loop until the window closes
    ///
    /// Setup failures and fatal surface errors end the loop and are returned.
    pub fn run(mut self) -> Result<()> {
        let Some(event_loop) = self.event_loop.take() else {
            return Ok(());
        };
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self.app_state)?;

        match self.app_state.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn fail(&mut self, event_loop: &ActiveEventLoop, e: RenderError) {
        error!("{}", e);
        self.error = Some(e);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = Arc::new(
            event_loop.create_window(
                WindowAttributes::default()
                    .with_title(self.config.title.clone())
                    .with_inner_size(PhysicalSize::new(self.config.width, self.config.height)),
            )?,
        );
        self.window = Some(window.clone());

        let (width, height) = window.inner_size().into();
        let engine = RenderEngine::new(window, width, height, self.config.clone())?;

        let scene = match self.setup.take() {
            Some(setup) => setup(engine.context(), width, height)?,
            None => Scene::new(engine.context(), width, height)?,
        };

        self.scene = Some(scene);
        self.render_engine = Some(engine);
        Ok(())
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let (Some(render_engine), Some(scene)) = (self.render_engine.as_mut(), self.scene.as_mut())
        else {
            return;
        };

        match event {
            WindowEvent::KeyboardInput {
                event:
                    winit::event::KeyEvent {
                        physical_key: winit::keyboard::PhysicalKey::Code(key_code),
                        ..
                    },
                ..
            } => {
                if matches!(key_code, winit::keyboard::KeyCode::Escape) {
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if width == 0 || height == 0 {
                    return;
                }
                render_engine.resize(width, height);
                if let Err(e) = scene.resize(width, height) {
                    self.fail(event_loop, e);
                }
            }
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let (width, height) = render_engine.surface_size();
                let info = FrameInfo {
                    frame: self.timer.frames(),
                    width,
                    height,
                };
                if let Some(update) = self.update.as_mut() {
                    update(scene, &info);
                }

                if let Err(e) = render_engine.render_frame(scene) {
                    self.fail(event_loop, e);
                    return;
                }

                if let Some(average) = self.timer.tick(Instant::now()) {
                    info!(
                        "{} frames, {:.3} ms per frame",
                        self.timer.frames(),
                        average.as_secs_f64() * 1000.0
                    );
                }
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_timer_reports_every_interval() {
        let mut timer = FrameTimer::new();
        let start = Instant::now();
        let frame = Duration::from_millis(2);

        let mut reports = Vec::new();
        for i in 0..(2 * FRAME_REPORT_INTERVAL) {
            if let Some(average) = timer.tick(start + frame * (i as u32 + 1)) {
                reports.push(average);
            }
        }

        assert_eq!(reports.len(), 2);
        assert_eq!(timer.frames(), 2 * FRAME_REPORT_INTERVAL);
        // The first window starts at the first frame, so it spans one frame less
        assert!(reports[0] < frame);
        assert_eq!(reports[1], frame);
    }

    #[test]
    fn test_frame_info_aspect() {
        let info = FrameInfo {
            frame: 0,
            width: 1024,
            height: 768,
        };
        assert!((info.aspect() - 4.0 / 3.0).abs() < 1e-6);
    }
}
