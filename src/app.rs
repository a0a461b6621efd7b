use std::sync::Arc;

use anyhow::Context;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    config::{EngineConfig, ShadingPath},
    engine::Engine,
    gfx::{backend::WgpuBackend, scene::VoxelScene},
};

/// The engine as hosted by the viewer.
pub type WgpuEngine = Engine<WgpuBackend, VoxelScene>;

/// Windowed host: creates the surface, initializes the engine and pumps
/// `step` once per redraw.
pub struct VxgiApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    config: EngineConfig,
    window: Option<Arc<Window>>,
    engine: Option<WgpuEngine>,
    fatal: Option<anyhow::Error>,
}

impl VxgiApp {
    pub fn new(config: EngineConfig) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new().context("failed to create event loop")?;
        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                config,
                window: None,
                engine: None,
                fatal: None,
            },
        })
    }

    /// Runs the event loop until the window closes or init fails.
    pub fn run(mut self) -> anyhow::Result<()> {
        let event_loop = self
            .event_loop
            .take()
            .context("event loop already consumed")?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop
            .run_app(&mut self.app_state)
            .context("event loop failed")?;

        // Release GPU objects before the window goes away.
        self.app_state.engine = None;
        match self.app_state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn start(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window = event_loop
            .create_window(
                WindowAttributes::default()
                    .with_title("vxgi")
                    .with_inner_size(winit::dpi::LogicalSize::new(1200, 800)),
            )
            .context("failed to create window")?;
        let window = Arc::new(window);
        self.window = Some(window.clone());

        let (width, height) = window.inner_size().into();
        let backend = pollster::block_on(WgpuBackend::new(window, width, height))?;

        let mut engine = Engine::new(backend, self.config.clone());
        engine.init().context("engine init failed")?;
        self.engine = Some(engine);
        Ok(())
    }

    /// Viewer shortcuts. Returns whether the key was consumed.
    fn handle_shortcut(&mut self, event: &KeyEvent, event_loop: &ActiveEventLoop) -> bool {
        let PhysicalKey::Code(code) = event.physical_key else {
            return false;
        };
        if event.state != ElementState::Pressed || event.repeat {
            return matches!(code, KeyCode::Escape | KeyCode::KeyO | KeyCode::KeyV | KeyCode::KeyF);
        }
        let Some(engine) = self.engine.as_mut() else {
            return false;
        };

        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::KeyO => {
                let use_ortho = !engine.config().use_ortho;
                engine.set_use_ortho(use_ortho);
                log::info!("orthographic projection: {}", use_ortho);
            }
            KeyCode::KeyV => {
                let enabled = !engine.config().draw_voxel_overlay;
                engine.set_draw_voxel_overlay(enabled);
                log::info!("voxel overlay: {}", enabled);
            }
            KeyCode::KeyF => {
                let shading = match engine.config().shading {
                    ShadingPath::Deferred => ShadingPath::Forward,
                    ShadingPath::Forward => ShadingPath::Deferred,
                };
                engine.set_shading(shading);
                log::info!("shading path: {:?}", shading);
            }
            _ => return false,
        }
        true
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(err) = self.start(event_loop) {
            log::error!("{:#}", err);
            self.fatal = Some(err);
            event_loop.exit();
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
            WindowEvent::KeyboardInput { event, .. } => {
                if self.handle_shortcut(&event, event_loop) {
                    return;
                }
                if let Some(controller) = self
                    .engine
                    .as_mut()
                    .and_then(|engine| engine.camera_controller_mut())
                {
                    controller.process_keyed_events(&event);
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                // Minimised windows report 0x0.
                if width == 0 || height == 0 {
                    return;
                }
                if let Some(engine) = self.engine.as_mut() {
                    if let Err(err) = engine.resize(width, height) {
                        log::error!("resize to {}x{} failed: {}", width, height, err);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(engine) = self.engine.as_mut() {
                    if let Err(err) = engine.step() {
                        log::error!("frame failed: {}", err);
                    }
                }
            }
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let Some(controller) = self
            .engine
            .as_mut()
            .and_then(|engine| engine.camera_controller_mut())
        {
            controller.process_events(&event);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}
