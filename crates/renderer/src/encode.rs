//! Vertex attribute streams for the interpolation program.
//!
//! Two parallel streams are produced:
//!
//! * `position` – one clip-space coordinate per grid cell in row-major order,
//!   independent of the sort.
//! * `color_index` – one `[r, g, b, original_index]` tuple per pixel in
//!   ascending brightness order.
//!
//! Vertex `i` reads slot `i` of each stream, so the two are deliberately not
//! co-indexed by pixel. The vertex program recovers the second position from
//! `original_index` with the same grid formula (see [`past_position`]).
//!
//! The row coordinate uses `ceil(k / w)` rather than `floor`. Both the encoder
//! and the vertex program rely on it; keep them in sync.

use anyhow::{bail, Result};
use bytemuck::{Pod, Zeroable};

use crate::sort::PixelSample;

/// Largest grid accepted for encoding; bigger images are rejected before any
/// buffer is allocated.
pub const MAX_GRID_POINTS: u64 = 1 << 28;

/// Grid indices above this no longer survive the `f32` index channel exactly.
pub const EXACT_INDEX_LIMIT: u64 = 1 << 24;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PositionAttribute {
    pub position: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ColorIndexAttribute {
    /// Red, green, blue in 0–255 followed by the 1-based original grid index.
    pub color_index: [f32; 4],
}

/// Both attribute streams for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelAttributes {
    pub width: u32,
    pub height: u32,
    pub positions: Vec<PositionAttribute>,
    pub color_indices: Vec<ColorIndexAttribute>,
}

impl PixelAttributes {
    pub fn encode(width: u32, height: u32, sorted: &[PixelSample]) -> Result<Self> {
        Ok(Self {
            width,
            height,
            positions: encode_positions(width, height)?,
            color_indices: encode_color_indices(sorted),
        })
    }

    /// Number of points drawn; each vertex needs a slot in both streams.
    pub fn vertex_count(&self) -> u32 {
        self.positions.len().min(self.color_indices.len()) as u32
    }
}

/// Forward grid formula for linear index `k`.
pub fn grid_position(k: u32, width: u32, height: u32) -> [f32; 2] {
    let w = width as f32;
    let h = height as f32;
    let x = 2.0 * ((k % width) as f32 / w) - 1.0;
    let y = 2.0 * ((k as f32 / w).ceil() / h) - 1.0;
    [x, y]
}

/// Number of grid cells for `width x height`, computed without overflow.
pub fn point_count(width: u32, height: u32) -> Result<u32> {
    let points = u64::from(width) * u64::from(height);
    if points > MAX_GRID_POINTS {
        bail!("{width}x{height} image has {points} pixels; at most {MAX_GRID_POINTS} are supported");
    }
    // MAX_GRID_POINTS fits in u32.
    Ok(points as u32)
}

/// Whether every 1-based index of a `points`-cell grid is exact as `f32`.
pub fn indices_are_exact(points: u32) -> bool {
    u64::from(points) <= EXACT_INDEX_LIMIT
}

pub fn encode_positions(width: u32, height: u32) -> Result<Vec<PositionAttribute>> {
    let points = point_count(width, height)?;
    Ok((0..points)
        .map(|k| PositionAttribute {
            position: grid_position(k, width, height),
        })
        .collect())
}

pub fn encode_color_indices(sorted: &[PixelSample]) -> Vec<ColorIndexAttribute> {
    sorted
        .iter()
        .map(|sample| ColorIndexAttribute {
            color_index: [
                f32::from(sample.r),
                f32::from(sample.g),
                f32::from(sample.b),
                sample.original_index as f32,
            ],
        })
        .collect()
}

/// Aspect vector derived from the image dimensions, uploaded once.
pub fn calc_aspect_ratio(width: u32, height: u32) -> [f32; 2] {
    [width as f32 / height as f32, 1.0]
}

/// Mirror of the vertex program's reconstruction from `original_index`:
/// the forward grid formula evaluated at `index` with the vertical axis negated.
pub fn past_position(index: f32, width: u32, height: u32) -> [f32; 2] {
    let w = width as f32;
    let h = height as f32;
    let x = 2.0 * glsl_mod(index, w) / w - 1.0;
    let y = -(2.0 * (index / w).ceil() / h - 1.0);
    [x, y]
}

/// Mirror of the full vertex program for vertex slot `vertex`.
pub fn vertex_position(attributes: &PixelAttributes, vertex: usize, phase: f32) -> Option<[f32; 2]> {
    let position = attributes.positions.get(vertex)?.position;
    let color_index = attributes.color_indices.get(vertex)?.color_index;
    let past = past_position(color_index[3], attributes.width, attributes.height);

    let aspect = calc_aspect_ratio(attributes.width, attributes.height);
    let largest = aspect[0].max(aspect[1]);
    let ar = [aspect[0] / largest, aspect[1] / largest];

    let mixed = [
        mix(past[0], position[0], phase),
        mix(past[1], position[1], phase),
    ];
    Some([mixed[0] * ar[0], mixed[1] * ar[1]])
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

fn glsl_mod(x: f32, y: f32) -> f32 {
    x - y * (x / y).floor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::{extract, sort_by_brightness};

    const EPS: f32 = 1e-6;

    fn close(a: [f32; 2], b: [f32; 2]) -> bool {
        (a[0] - b[0]).abs() < EPS && (a[1] - b[1]).abs() < EPS
    }

    #[test]
    fn positions_follow_row_major_grid_order() {
        let positions = encode_positions(4, 3).unwrap();
        assert_eq!(positions.len(), 12);
        assert_eq!(positions[0].position, [-1.0, -1.0]);
        assert_eq!(positions[1].position, [-0.5, 2.0 * (1.0 / 3.0) - 1.0]);
        assert_eq!(positions[4].position[0], -1.0);
    }

    #[test]
    fn row_coordinate_uses_ceil_at_last_row_boundaries() {
        let (w, h) = (4, 3);
        let first_of_last_row = grid_position(w * (h - 1), w, h);
        assert!(close(first_of_last_row, [-1.0, 2.0 * (2.0 / 3.0) - 1.0]));

        let last = grid_position(w * h - 1, w, h);
        assert!(close(last, [0.5, 1.0]));
    }

    #[test]
    fn color_index_carries_original_index_in_fourth_channel() {
        let data = [255, 0, 0, 7, 0, 0, 0, 9];
        let mut samples = extract(&data);
        sort_by_brightness(&mut samples);
        let encoded = encode_color_indices(&samples);
        assert_eq!(encoded[0].color_index, [0.0, 0.0, 0.0, 2.0]);
        assert_eq!(encoded[1].color_index, [255.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn past_position_matches_flipped_forward_formula() {
        let (w, h) = (5, 4);
        for index in 1..=w * h {
            let past = past_position(index as f32, w, h);
            let forward = grid_position(index, w, h);
            assert!(
                close(past, [forward[0], -forward[1]]),
                "index {index}: {past:?} vs {forward:?}"
            );
        }
    }

    #[test]
    fn buffers_have_matching_lengths() {
        let data: Vec<u8> = (0..6 * 4).map(|v| v as u8).collect();
        let mut samples = extract(&data);
        sort_by_brightness(&mut samples);
        let attributes = PixelAttributes::encode(3, 2, &samples).unwrap();
        assert_eq!(attributes.positions.len(), 6);
        assert_eq!(attributes.color_indices.len(), 6);
        assert_eq!(attributes.vertex_count(), 6);
    }

    #[test]
    fn short_payload_limits_vertex_count() {
        let samples = extract(&[0u8; 8]);
        let attributes = PixelAttributes::encode(2, 2, &samples).unwrap();
        assert_eq!(attributes.positions.len(), 4);
        assert_eq!(attributes.vertex_count(), 2);
        assert!(vertex_position(&attributes, 3, 0.5).is_none());
    }

    #[test]
    fn aspect_ratio_is_normalised_in_vertex_mirror() {
        let samples = extract(&[0u8; 4 * 4]);
        let attributes = PixelAttributes::encode(4, 1, &samples).unwrap();
        // Vertex 0 sits at grid cell 0 at phase 1: x = -1, y = -1, scaled by (1, 1/4).
        let position = vertex_position(&attributes, 0, 1.0).unwrap();
        assert!(close(position, [-1.0, -0.25]));
    }

    #[test]
    fn oversized_grid_is_rejected_without_overflow() {
        let samples = extract(&[1, 2, 3, 4]);
        let err = PixelAttributes::encode(65536, 65536, &samples).unwrap_err();
        assert!(err.to_string().contains("4294967296 pixels"), "{err}");
        assert!(point_count(u32::MAX, u32::MAX).is_err());
    }

    #[test]
    fn point_count_accepts_grid_at_limit() {
        assert_eq!(point_count(1 << 14, 1 << 14).unwrap(), 1 << 28);
        assert!(point_count(1 << 14, (1 << 14) + 1).is_err());
        assert_eq!(point_count(0, 7).unwrap(), 0);
    }

    #[test]
    fn index_precision_boundary() {
        let limit = EXACT_INDEX_LIMIT as u32;
        assert!(indices_are_exact(limit));
        assert!(!indices_are_exact(limit + 1));
        // The first index past the limit already rounds in the f32 channel.
        assert_ne!((limit + 1) as f32 as u32, limit + 1);
        assert_eq!(limit as f32 as u32, limit);
    }
}
