//! Windowed demo application.
//!
//! Opens a window, renders one scene per frame through the [`WgpuBackend`]
//! and maps keys to runtime toggles:
//!
//! | Key   | Action                              |
//! |-------|-------------------------------------|
//! | `1`   | toggle noise warp                   |
//! | `2`   | toggle glyph dither                 |
//! | `3`   | toggle diffuse                      |
//! | `4`   | toggle blur                         |
//! | `P`   | toggle pointer tracking             |
//! | `Tab` | cycle pulse ring, ripple and glowing frame |

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::backend::{FrameError, RenderBackend, WgpuBackend};
use crate::clock::FrameClock;
use crate::compositor::{GlowingFrameScene, PulseRing, PulseRingConfig, RippleScene, StageId};
use crate::effects::{GlowingFrameParams, RippleWaveParams};
use crate::gpu::GpuContext;
use crate::pointer::SurfaceRect;
use crate::render_graph::Extent;

/// Which scene the app starts with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SceneKind {
    #[default]
    PulseRing,
    Ripple,
    GlowingFrame,
}

impl SceneKind {
    fn next(self) -> Self {
        match self {
            SceneKind::PulseRing => SceneKind::Ripple,
            SceneKind::Ripple => SceneKind::GlowingFrame,
            SceneKind::GlowingFrame => SceneKind::PulseRing,
        }
    }
}

/// Configuration for the app window.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub scene: SceneKind,
    pub pulse_ring: PulseRingConfig,
    pub ripple: RippleWaveParams,
    pub glowing_frame: GlowingFrameParams,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Shaderstack".to_string(),
            width: 800,
            height: 600,
            scene: SceneKind::default(),
            pulse_ring: PulseRingConfig::default(),
            ripple: RippleWaveParams::default(),
            glowing_frame: GlowingFrameParams::default(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn scene(mut self, scene: SceneKind) -> Self {
        self.scene = scene;
        self
    }

    pub fn pulse_ring(mut self, config: PulseRingConfig) -> Self {
        self.pulse_ring = config;
        self
    }

    pub fn ripple(mut self, params: RippleWaveParams) -> Self {
        self.ripple = params;
        self
    }

    pub fn glowing_frame(mut self, params: GlowingFrameParams) -> Self {
        self.glowing_frame = params;
        self
    }
}

/// Run the demo until the window is closed.
///
/// # Example
/// ```ignore
/// shaderstack::run(
///     AppConfig::new()
///         .title("Pulse Ring")
///         .pulse_ring(PulseRingConfig::new().stage(StageId::Blur, true)),
/// )?;
/// ```
pub fn run(config: AppConfig) -> Result<(), winit::error::EventLoopError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ShaderstackApp::Pending { config };
    event_loop.run_app(&mut app)
}

enum ActiveScene {
    PulseRing(PulseRing),
    Ripple(RippleScene),
    GlowingFrame(GlowingFrameScene),
}

impl ActiveScene {
    fn mount(kind: SceneKind, backend: &mut dyn RenderBackend, config: &AppConfig) -> Self {
        log::info!("Mounting {:?} scene", kind);
        match kind {
            SceneKind::PulseRing => {
                ActiveScene::PulseRing(PulseRing::mount(backend, &config.pulse_ring))
            }
            SceneKind::Ripple => ActiveScene::Ripple(RippleScene::mount(&config.ripple)),
            SceneKind::GlowingFrame => {
                ActiveScene::GlowingFrame(GlowingFrameScene::mount(&config.glowing_frame))
            }
        }
    }

    fn kind(&self) -> SceneKind {
        match self {
            ActiveScene::PulseRing(_) => SceneKind::PulseRing,
            ActiveScene::Ripple(_) => SceneKind::Ripple,
            ActiveScene::GlowingFrame(_) => SceneKind::GlowingFrame,
        }
    }

    fn render(
        &mut self,
        backend: &mut dyn RenderBackend,
        delta: f32,
        viewport: Extent,
    ) -> Result<usize, FrameError> {
        match self {
            ActiveScene::PulseRing(scene) => scene.render(backend, delta, viewport),
            ActiveScene::Ripple(scene) => scene.render(backend, delta, viewport),
            ActiveScene::GlowingFrame(scene) => scene.render(backend, delta, viewport),
        }
    }

    fn handle_pointer(&mut self, event: &WindowEvent) {
        if let ActiveScene::PulseRing(scene) = self {
            scene.pointer_mut().handle_event(event);
        }
    }

    fn resize_pointer(&mut self, surface: SurfaceRect) {
        if let ActiveScene::PulseRing(scene) = self {
            scene.pointer_mut().resize(surface);
        }
    }

    fn unmount(self, backend: &mut dyn RenderBackend) {
        match self {
            ActiveScene::PulseRing(scene) => scene.unmount(backend),
            ActiveScene::Ripple(scene) => scene.unmount(backend),
            ActiveScene::GlowingFrame(scene) => scene.unmount(backend),
        }
    }
}

enum ShaderstackApp {
    Pending {
        config: AppConfig,
    },
    Running {
        window: Arc<Window>,
        backend: WgpuBackend,
        scene: Option<ActiveScene>,
        config: AppConfig,
        clock: FrameClock,
    },
    Failed,
}

impl ShaderstackApp {
    fn start(
        config: AppConfig,
        event_loop: &ActiveEventLoop,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu = GpuContext::new(window.clone())?;
        let mut backend = WgpuBackend::new(gpu);

        let mut scene = ActiveScene::mount(config.scene, &mut backend, &config);
        let size = window.inner_size();
        scene.resize_pointer(SurfaceRect::from_size(size.width as f32, size.height as f32));

        Ok(ShaderstackApp::Running {
            window,
            backend,
            scene: Some(scene),
            config,
            clock: FrameClock::new(),
        })
    }
}

impl ApplicationHandler for ShaderstackApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !matches!(self, ShaderstackApp::Pending { .. }) {
            return;
        }
        let ShaderstackApp::Pending { config } = std::mem::replace(self, ShaderstackApp::Failed)
        else {
            return;
        };
        match ShaderstackApp::start(config, event_loop) {
            Ok(running) => *self = running,
            Err(e) => {
                log::error!("Failed to start: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let ShaderstackApp::Running {
            window,
            backend,
            scene,
            config,
            clock,
        } = self
        else {
            return;
        };
        let Some(active) = scene.as_mut() else {
            return;
        };

        active.handle_pointer(&event);

        match event {
            WindowEvent::CloseRequested => {
                if let Some(active) = scene.take() {
                    active.unmount(backend);
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                backend.resize_surface(Extent::new(size.width, size.height));
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                let PhysicalKey::Code(key) = event.physical_key else {
                    return;
                };
                match key {
                    KeyCode::Tab => {
                        let next = active.kind().next();
                        if let Some(old) = scene.take() {
                            old.unmount(backend);
                        }
                        let mut mounted = ActiveScene::mount(next, backend, config);
                        let size = window.inner_size();
                        mounted.resize_pointer(SurfaceRect::from_size(
                            size.width as f32,
                            size.height as f32,
                        ));
                        *scene = Some(mounted);
                    }
                    _ => {
                        if let ActiveScene::PulseRing(ring) = active {
                            handle_pulse_ring_key(ring, key);
                        }
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                let delta = clock.tick_at(Instant::now()).delta;

                let size = window.inner_size();
                let viewport = Extent::new(size.width, size.height);
                match active.render(backend, delta, viewport) {
                    Ok(_) => {}
                    Err(FrameError::Surface(msg)) => log::warn!("Skipped frame: {}", msg),
                    Err(e) => log::error!("Frame failed: {}", e),
                }
                window.request_redraw();
            }
            _ => {}
        }
    }
}

fn handle_pulse_ring_key(ring: &mut PulseRing, key: KeyCode) {
    let stage = match key {
        KeyCode::Digit1 => StageId::NoiseWarp,
        KeyCode::Digit2 => StageId::GlyphDither,
        KeyCode::Digit3 => StageId::Diffuse,
        KeyCode::Digit4 => StageId::Blur,
        KeyCode::KeyP => {
            let pointer = ring.pointer_mut();
            let enabled = !pointer.is_enabled();
            pointer.set_enabled(enabled);
            log::info!("Pointer tracking {}", if enabled { "on" } else { "off" });
            return;
        }
        _ => return,
    };
    let enabled = ring.toggle_stage(stage);
    log::info!("{} {}", stage, if enabled { "enabled" } else { "disabled" });
}
