//! Brightness extraction and stable luminance ordering.

use std::cmp::Ordering;

use crate::types::{RawImage, BYTES_PER_PIXEL};

/// ITU-R BT.601 luma weights.
pub const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// One RGBA sample tagged with its luminance and 1-based grid index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSample {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
    pub brightness: f64,
    pub original_index: u32,
}

pub fn brightness(r: u8, g: u8, b: u8) -> f64 {
    LUMA_WEIGHTS[0] * f64::from(r) + LUMA_WEIGHTS[1] * f64::from(g) + LUMA_WEIGHTS[2] * f64::from(b)
}

/// Walks `data` in RGBA strides, dropping any trailing partial stride.
pub fn extract(data: &[u8]) -> Vec<PixelSample> {
    data.chunks_exact(BYTES_PER_PIXEL)
        .enumerate()
        .map(|(stride, px)| PixelSample {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
            brightness: brightness(px[0], px[1], px[2]),
            original_index: stride as u32 + 1,
        })
        .collect()
}

/// Stable ascending sort on brightness; ties keep their input order.
pub fn sort_by_brightness(samples: &mut [PixelSample]) {
    samples.sort_by(|a, b| {
        a.brightness
            .partial_cmp(&b.brightness)
            .unwrap_or(Ordering::Equal)
    });
}

/// Extracts and sorts every complete pixel of `image`.
pub fn sorted_order(image: &RawImage) -> Vec<PixelSample> {
    let trailing = image.trailing_bytes();
    if trailing != 0 {
        tracing::warn!(
            width = image.width,
            height = image.height,
            bytes = image.data.len(),
            dropped = trailing,
            "image payload is not a whole number of RGBA samples; dropping trailing bytes"
        );
    }

    let mut samples = extract(&image.data);
    if samples.len() != image.grid_len() {
        tracing::warn!(
            expected = image.grid_len(),
            actual = samples.len(),
            "image payload length does not match its dimensions"
        );
    }
    sort_by_brightness(&mut samples);
    samples
}
