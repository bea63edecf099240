use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use renderer::{sorted_order, RawImage};

use crate::cli::InspectArgs;

/// Decodes `path` into the RGBA8 payload the renderer expects.
pub fn load_raw_image(path: &Path) -> Result<RawImage> {
    let decoded = image::open(path)
        .with_context(|| format!("failed to decode image {}", path.display()))?;
    let rgba = decoded.into_rgba8();
    let (width, height) = rgba.dimensions();
    tracing::debug!(path = %path.display(), width, height, "decoded image");
    Ok(RawImage::new(width, height, rgba.into_raw()))
}

/// CPU-side summary of how an image sorts.
#[derive(Debug, Clone, PartialEq)]
pub struct SortReport {
    pub width: u32,
    pub height: u32,
    pub samples: usize,
    pub trailing_bytes: usize,
    pub brightness_range: Option<(f64, f64)>,
    pub leading_indices: Vec<u32>,
}

impl SortReport {
    pub fn from_image(image: &RawImage, top: usize) -> Self {
        let sorted = sorted_order(image);
        let brightness_range = sorted
            .first()
            .zip(sorted.last())
            .map(|(darkest, brightest)| (darkest.brightness, brightest.brightness));
        Self {
            width: image.width,
            height: image.height,
            samples: sorted.len(),
            trailing_bytes: image.trailing_bytes(),
            brightness_range,
            leading_indices: sorted
                .iter()
                .take(top)
                .map(|sample| sample.original_index)
                .collect(),
        }
    }
}

impl fmt::Display for SortReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "dimensions: {}x{}", self.width, self.height)?;
        writeln!(f, "samples: {}", self.samples)?;
        writeln!(f, "trailing bytes: {}", self.trailing_bytes)?;
        match self.brightness_range {
            Some((low, high)) => writeln!(f, "brightness: {low:.3} .. {high:.3}")?,
            None => writeln!(f, "brightness: n/a")?,
        }
        let indices: Vec<String> = self
            .leading_indices
            .iter()
            .map(|index| index.to_string())
            .collect();
        writeln!(f, "darkest first: {}", indices.join(" "))
    }
}

pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    let image = load_raw_image(&args.image)?;
    let report = SortReport::from_image(&image, args.top);
    print!("{report}");
    Ok(())
}
