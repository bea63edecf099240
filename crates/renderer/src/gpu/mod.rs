//! wgpu side of the interpolation renderer.
//!
//! - `context` owns instance/device/surface wiring and rebuilds swapchain
//!   state when the window resizes.
//! - `pipeline` compiles the GLSL point program and declares the two vertex
//!   streams (grid positions, sorted color+index).
//! - `uniforms` mirrors the `SortParams` block; only `phase` changes per frame.
//! - `state` uploads the attribute buffers once and encodes one point-list
//!   draw per render.

mod context;
mod pipeline;
mod state;
mod uniforms;

pub(crate) use state::GpuState;
