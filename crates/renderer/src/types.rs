use std::fmt;

/// Bytes per RGBA sample in a [`RawImage`].
pub const BYTES_PER_PIXEL: usize = 4;

/// Raw RGBA pixel payload as delivered by the host.
///
/// `data` is expected to hold `width * height * 4` bytes in R,G,B,A order, but
/// nothing enforces it: a trailing partial stride is dropped during extraction
/// and a short buffer simply yields fewer samples.
#[derive(Clone, PartialEq, Eq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RawImage {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// Number of grid cells implied by the dimensions.
    pub fn grid_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Bytes left over after the last complete RGBA stride.
    pub fn trailing_bytes(&self) -> usize {
        self.data.len() % BYTES_PER_PIXEL
    }
}

impl fmt::Debug for RawImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Pointer position reported by the host, centred on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pointer {
    pub x: f32,
    pub y: f32,
}

impl Pointer {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Maps the pointer's vertical component onto the interpolation phase.
///
/// `phase = clamp(gain * (y + offset), 0, 1)`; the defaults reproduce the
/// plain `y + 0.5` mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseMapping {
    pub gain: f32,
    pub offset: f32,
}

impl PhaseMapping {
    pub fn phase_for(&self, pointer: Pointer) -> f32 {
        (self.gain * (pointer.y + self.offset)).clamp(0.0, 1.0)
    }
}

impl Default for PhaseMapping {
    fn default() -> Self {
        Self {
            gain: 1.0,
            offset: 0.5,
        }
    }
}

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Pick the gamma-encoded swapchain, matching how the source colors are stored.
    #[default]
    Auto,
    /// Write colors as-is into a non-sRGB surface.
    Gamma,
    /// Treat colors as linear and let an sRGB surface encode them.
    Linear,
}

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    #[default]
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

/// Summary of the adapter wgpu picked, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub max_buffer_size: u64,
}

impl AdapterProfile {
    pub fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            max_buffer_size: limits.max_buffer_size,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window title.
    pub title: String,
    /// Window size in physical pixels; `None` sizes the window to the image.
    pub surface_size: Option<(u32, u32)>,
    pub antialiasing: Antialiasing,
    pub color_space: ColorSpaceMode,
    pub gpu_power: GpuPowerPreference,
    /// Clear color behind the points.
    pub background: [f64; 4],
    pub phase: PhaseMapping,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            title: "Pixel Sort".to_string(),
            surface_size: None,
            antialiasing: Antialiasing::default(),
            color_space: ColorSpaceMode::default(),
            gpu_power: GpuPowerPreference::default(),
            background: [0.0, 0.0, 0.0, 1.0],
            phase: PhaseMapping::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_mapping_clamps_to_unit_range() {
        let mapping = PhaseMapping::default();
        let phases: Vec<f32> = [-10.0, -0.5, 0.0, 0.5, 10.0]
            .into_iter()
            .map(|y| mapping.phase_for(Pointer::new(0.0, y)))
            .collect();
        assert_eq!(phases, vec![0.0, 0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn phase_mapping_ignores_horizontal_component() {
        let mapping = PhaseMapping::default();
        assert_eq!(
            mapping.phase_for(Pointer::new(-3.0, 0.25)),
            mapping.phase_for(Pointer::new(7.0, 0.25))
        );
    }

    #[test]
    fn phase_mapping_applies_gain() {
        let mapping = PhaseMapping {
            gain: 2.0,
            offset: 0.5,
        };
        assert_eq!(mapping.phase_for(Pointer::new(0.0, -0.25)), 0.5);
        assert_eq!(mapping.phase_for(Pointer::new(0.0, 0.0)), 1.0);
    }

    #[test]
    fn trailing_bytes_counts_partial_stride() {
        let image = RawImage::new(1, 1, vec![0; 5]);
        assert_eq!(image.trailing_bytes(), 1);
        assert_eq!(image.grid_len(), 1);
    }
}
