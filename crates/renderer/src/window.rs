use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, error, info, warn};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::window::{Window, WindowBuilder};

use crate::encode::PixelAttributes;
use crate::gpu::GpuState;
use crate::router::{Canvas, InboundMessage, PhaseRenderer, Router};
use crate::types::{AdapterProfile, Pointer, RawImage, RendererConfig};

const DEFAULT_WINDOW_SIZE: (u32, u32) = (800, 600);

/// Maps a cursor position in physical pixels to the centred pointer space
/// (`-0.5..0.5` across the window on both axes).
pub fn pointer_from_cursor(position: PhysicalPosition<f64>, size: PhysicalSize<u32>) -> Pointer {
    let width = f64::from(size.width.max(1));
    let height = f64::from(size.height.max(1));
    Pointer::new(
        (position.x / width - 0.5) as f32,
        (position.y / height - 0.5) as f32,
    )
}

/// Longest side requested for a window sized after its image.
const MAX_WINDOW_REQUEST: u32 = 4096;

/// Window size to request once the image is known: `None` when the size is
/// configured, otherwise the image size scaled down to fit
/// `MAX_WINDOW_REQUEST` with its aspect ratio kept.
fn requested_window_size(
    configured: Option<(u32, u32)>,
    image: &RawImage,
) -> Option<PhysicalSize<u32>> {
    if configured.is_some() || image.width == 0 || image.height == 0 {
        return None;
    }
    let longest = image.width.max(image.height);
    if longest <= MAX_WINDOW_REQUEST {
        return Some(PhysicalSize::new(image.width, image.height));
    }
    let scale = |side: u32| {
        let scaled = u64::from(side) * u64::from(MAX_WINDOW_REQUEST) / u64::from(longest);
        (scaled as u32).max(1)
    };
    Some(PhysicalSize::new(scale(image.width), scale(image.height)))
}

/// Armed GPU pipeline bound to the viewer window.
pub(crate) struct WindowState {
    // Declared before `window`: the surface must be released first.
    gpu: GpuState,
    window: Arc<Window>,
}

impl WindowState {
    pub(crate) fn adapter_profile(&self) -> &AdapterProfile {
        self.gpu.adapter_profile()
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
    }

    fn recover_surface(&mut self) {
        let size = self.window.inner_size();
        if size != self.gpu.size() {
            self.gpu.resize(size);
        } else {
            self.gpu.reconfigure();
        }
        self.window.request_redraw();
    }
}

impl PhaseRenderer for WindowState {
    fn set_phase(&mut self, phase: f32) {
        self.gpu.set_phase(phase);
    }

    fn render(&mut self) -> Result<()> {
        match self.gpu.render() {
            Ok(()) => Ok(()),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!(phase = self.gpu.phase(), "surface lost or outdated; reconfiguring");
                self.recover_surface();
                Ok(())
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(anyhow!("surface out of memory")),
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout; retrying on next update");
                Ok(())
            }
            Err(other) => {
                warn!(error = ?other, "surface error; retrying on next update");
                Ok(())
            }
        }
    }
}

/// The viewer window before the first image has been seen.
pub(crate) struct GpuCanvas {
    window: Arc<Window>,
    config: RendererConfig,
}

impl Canvas for GpuCanvas {
    type Renderer = WindowState;

    fn arm(self, image: &RawImage, attributes: &PixelAttributes) -> Result<WindowState> {
        if let Some(requested) = requested_window_size(self.config.surface_size, image) {
            if self.window.request_inner_size(requested).is_none() {
                debug!(?requested, "window resize requested; waiting for the compositor");
            }
        }
        // Only the vertex buffers depend on the image; the surface follows the window.
        let size = self.window.inner_size();
        let gpu = GpuState::new(self.window.as_ref(), size, attributes, &self.config)?;
        let state = WindowState {
            gpu,
            window: self.window,
        };
        let profile = state.adapter_profile();
        info!(
            adapter = %profile.name,
            backend = ?profile.backend,
            "pixel sort pipeline ready"
        );
        if profile.is_software() {
            warn!("software rasterizer detected; large images may render slowly");
        }
        Ok(state)
    }
}

enum HostEvent {
    Image(RawImage),
    Failed(anyhow::Error),
}

/// Windowed viewer: owns the event loop, the router and the GPU pipeline.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Opens the window immediately and runs until it is closed.
    ///
    /// `load_image` runs on a separate thread; its result is delivered to the
    /// event loop as the `image` message. A failed load is logged and closes
    /// the window.
    pub fn run<F>(self, load_image: F) -> Result<()>
    where
        F: FnOnce() -> Result<RawImage> + Send + 'static,
    {
        let Renderer { config } = self;
        let event_loop = EventLoopBuilder::<HostEvent>::with_user_event()
            .build()
            .map_err(|err| anyhow!("failed to create event loop: {err}"))?;

        let (width, height) = config.surface_size.unwrap_or(DEFAULT_WINDOW_SIZE);
        let window = WindowBuilder::new()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(width, height))
            .build(&event_loop)
            .map_err(|err| anyhow!("failed to create viewer window: {err}"))?;
        let window = Arc::new(window);

        let proxy = event_loop.create_proxy();
        thread::Builder::new()
            .name("pixelsort-loader".into())
            .spawn(move || {
                let event = match load_image() {
                    Ok(image) => HostEvent::Image(image),
                    Err(err) => HostEvent::Failed(err),
                };
                if proxy.send_event(event).is_err() {
                    debug!("event loop closed before the image was delivered");
                }
            })
            .context("failed to spawn image loader thread")?;

        let mut router = Router::new(config.phase);
        router.route(InboundMessage::canvas(GpuCanvas {
            window: Arc::clone(&window),
            config,
        }))?;

        let failure: Rc<RefCell<Option<anyhow::Error>>> = Rc::new(RefCell::new(None));
        let loop_failure = Rc::clone(&failure);
        let run_result = event_loop.run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);
            match event {
                Event::UserEvent(HostEvent::Image(image)) => {
                    info!(width = image.width, height = image.height, "image received");
                    if let Err(err) = router.route(InboundMessage::image(image)) {
                        error!(error = ?err, "failed to build pixel sort pipeline");
                        loop_failure.borrow_mut().replace(err);
                        elwt.exit();
                    }
                }
                Event::UserEvent(HostEvent::Failed(err)) => {
                    error!(error = ?err, "failed to load image; closing window");
                    loop_failure.borrow_mut().replace(err);
                    elwt.exit();
                }
                Event::WindowEvent { window_id, event } if window_id == window.id() => match event
                {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                    WindowEvent::CursorMoved { position, .. } => {
                        let pointer = pointer_from_cursor(position, window.inner_size());
                        if let Err(err) = router.route(InboundMessage::mouse(pointer)) {
                            error!(error = ?err, "failed to route pointer update");
                        }
                    }
                    WindowEvent::Resized(new_size) => {
                        if let Some(renderer) = router.renderer() {
                            match renderer.try_borrow_mut() {
                                Ok(mut state) => state.resize(new_size),
                                Err(_) => warn!("renderer busy; skipping resize"),
                            }
                            window.request_redraw();
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        if let Err(err) = router.redraw() {
                            error!(error = ?err, "failed to redraw; closing window");
                            loop_failure.borrow_mut().replace(err);
                            elwt.exit();
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        });

        run_result.map_err(|err| anyhow!("window event loop error: {err}"))?;
        let failure = failure.borrow_mut().take();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_maps_to_centred_pointer() {
        let size = PhysicalSize::new(200, 100);
        let centre = pointer_from_cursor(PhysicalPosition::new(100.0, 50.0), size);
        assert_eq!(centre, Pointer::new(0.0, 0.0));

        let top_left = pointer_from_cursor(PhysicalPosition::new(0.0, 0.0), size);
        assert_eq!(top_left, Pointer::new(-0.5, -0.5));

        let bottom_right = pointer_from_cursor(PhysicalPosition::new(200.0, 100.0), size);
        assert_eq!(bottom_right, Pointer::new(0.5, 0.5));
    }

    #[test]
    fn cursor_outside_window_is_not_clamped() {
        let pointer =
            pointer_from_cursor(PhysicalPosition::new(-50.0, 300.0), PhysicalSize::new(100, 100));
        assert_eq!(pointer, Pointer::new(-1.0, 2.5));
    }

    #[test]
    fn configured_size_suppresses_window_request() {
        let image = RawImage::new(640, 480, Vec::new());
        assert_eq!(requested_window_size(Some((800, 600)), &image), None);
        assert_eq!(
            requested_window_size(None, &image),
            Some(PhysicalSize::new(640, 480))
        );
    }

    #[test]
    fn panorama_request_fits_window_limit() {
        let image = RawImage::new(20000, 1000, Vec::new());
        assert_eq!(
            requested_window_size(None, &image),
            Some(PhysicalSize::new(MAX_WINDOW_REQUEST, 204))
        );

        let sliver = RawImage::new(1, 100_000, Vec::new());
        assert_eq!(
            requested_window_size(None, &sliver),
            Some(PhysicalSize::new(1, MAX_WINDOW_REQUEST))
        );
    }

    #[test]
    fn zero_sized_window_does_not_divide_by_zero() {
        let pointer =
            pointer_from_cursor(PhysicalPosition::new(1.0, 1.0), PhysicalSize::new(0, 0));
        assert!(pointer.x.is_finite() && pointer.y.is_finite());
    }
}
