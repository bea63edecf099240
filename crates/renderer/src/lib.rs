//! Pixel-sort interpolation renderer.
//!
//! Every pixel of an image becomes one point. Points carry their position on
//! the image grid and the color of the pixel that occupies that slot once the
//! image is sorted by brightness; the vertex program reconstructs where that
//! color originally lived and blends between the two layouts by `phase`.
//!
//! ```text
//!   host thread ── image ──▶ EventLoopProxy ──▶ Router::route
//!                                                  │ (first image only)
//!                                  sort::sorted_order + PixelAttributes::encode
//!                                                  ▼
//!   CursorMoved ─▶ pointer cell ─▶ PhaseMapping ─▶ PhaseRenderer::set_phase + render
//! ```
//!
//! `Router` and the reactive `cell` module are independent of wgpu; the
//! windowed `Renderer` plugs `GpuState` in through the `Canvas` and
//! `PhaseRenderer` traits.

pub mod cell;
mod compile;
pub mod encode;
mod gpu;
pub mod router;
pub mod sort;
pub mod types;
mod window;

pub use cell::{ReactiveCell, Subscription};
pub use encode::{
    calc_aspect_ratio, grid_position, past_position, vertex_position, ColorIndexAttribute,
    PixelAttributes, PositionAttribute,
};
pub use router::{Canvas, FirstImage, InboundMessage, PhaseRenderer, Router};
pub use sort::{brightness, sorted_order, PixelSample};
pub use types::{
    AdapterProfile, Antialiasing, ColorSpaceMode, GpuPowerPreference, PhaseMapping, Pointer,
    RawImage, RendererConfig,
};
pub use window::{pointer_from_cursor, Renderer};
