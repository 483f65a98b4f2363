//! Window setup and the render loop.
//!
//! `run` drives a winit `ApplicationHandler`: the window is created on
//! resume, the GPU context and scene are built once, and every redraw while
//! focused advances the scene and renders one frame. Unfocused the loop
//! yields without drawing. A fatal setup or render error stops the loop and
//! surfaces as the `Err` of `run`.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use futures::future::LocalBoxFuture;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, DeviceId, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Fullscreen, Window, WindowId};

use crate::context::Context;
use crate::scene::Scene;

/// Builds the scene against a freshly created context. Runs once, on the
/// first resume.
pub type SceneBuilder =
    Box<dyn for<'a> FnOnce(&'a mut Context) -> LocalBoxFuture<'a, Result<Scene>>>;

struct AppState {
    ctx: Context,
    scene: Scene,
}

struct App {
    title: String,
    builder: Option<SceneBuilder>,
    runtime: tokio::runtime::Runtime,
    state: Option<AppState>,
    focused: bool,
    last_frame: Instant,
    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(title: &str, builder: SceneBuilder) -> Result<Self> {
        Ok(Self {
            title: title.to_string(),
            builder: Some(builder),
            runtime: tokio::runtime::Runtime::new()?,
            state: None,
            focused: true,
            last_frame: Instant::now(),
            fatal: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.fatal = Some(error);
        event_loop.exit();
    }

    /// Records the focus change and drops stale timing so refocusing doesn't
    /// produce one huge step. Returns whether a frame must be scheduled: the
    /// redraw chain stops while unfocused, so regaining focus restarts it.
    fn focus_changed(&mut self, focused: bool) -> bool {
        self.focused = focused;
        self.last_frame = Instant::now();
        focused
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        // Unfocused: no simulation, no draw, and no follow-up request. The
        // `Focused(true)` arm restarts the chain.
        if !self.focused {
            return;
        }
        let dt = self.last_frame.elapsed().as_secs_f32();
        self.last_frame = Instant::now();

        let Some(state) = self.state.as_mut() else {
            return;
        };

        state.scene.update(&state.ctx.queue, dt);
        if let Some(sky) = &state.scene.sky {
            sky.follow(
                &state.ctx.queue,
                cgmath::EuclideanSpace::to_vec(state.ctx.camera.position),
            );
        }
        state.ctx.update_camera(dt);

        match state.ctx.render(&state.scene) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = state.ctx.window.inner_size();
                state.ctx.resize(size.width, size.height);
            }
            Err(e) => {
                self.fail(event_loop, anyhow::anyhow!("render failed: {e}"));
                return;
            }
        }
        state.ctx.window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title(&self.title)
            .with_inner_size(PhysicalSize::new(1366, 768))
            .with_fullscreen(Some(Fullscreen::Borderless(None)));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, anyhow::anyhow!("window creation failed: {e}"));
                return;
            }
        };
        window.set_cursor_visible(false);

        let builder = self.builder.take().expect("scene builder consumed twice");
        let result = self.runtime.block_on(async {
            let mut ctx = Context::new(window).await?;
            let scene = builder(&mut ctx).await?;
            Ok::<_, anyhow::Error>(AppState { ctx, scene })
        });
        match result {
            Ok(state) => {
                state.ctx.window.request_redraw();
                self.last_frame = Instant::now();
                self.state = Some(state);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(state) = self.state.as_mut() {
                    state.ctx.resize(size.width, size.height);
                }
            }
            WindowEvent::Focused(focused) => {
                if self.focus_changed(focused) {
                    if let Some(state) = &self.state {
                        state.ctx.window.request_redraw();
                    }
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                if let Some(state) = self.state.as_mut() {
                    state.ctx.controller.process_key(code, key_state);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if self.focused {
                if let Some(state) = self.state.as_mut() {
                    state.ctx.controller.process_mouse(dx, dy);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        let builder: SceneBuilder = Box::new(|_ctx| {
            Box::pin(async { Err::<Scene, _>(anyhow::anyhow!("no scene in this test")) })
        });
        App::new("test", builder).unwrap()
    }

    #[test]
    fn losing_focus_stops_the_redraw_chain() {
        let mut app = test_app();
        assert!(app.focused);
        // No frame is scheduled on focus loss; the redraw chain goes quiet.
        assert!(!app.focus_changed(false));
        assert!(!app.focused);
    }

    #[test]
    fn regaining_focus_schedules_a_frame_and_resets_the_clock() {
        let mut app = test_app();
        app.focus_changed(false);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let stale = app.last_frame;
        assert!(app.focus_changed(true));
        // The first frame after refocusing must not see the idle time as dt.
        assert!(app.last_frame > stale);
    }
}

/// Run the demo until the window closes. Returns `Err` when setup or
/// rendering fails fatally; the caller maps that to the exit code.
pub fn run(title: &str, builder: SceneBuilder) -> Result<()> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(title, builder)?;
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
