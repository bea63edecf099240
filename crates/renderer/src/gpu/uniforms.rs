use bytemuck::{Pod, Zeroable};

use crate::encode::calc_aspect_ratio;

/// std140 mirror of the `SortParams` block in the vertex program.
///
/// Only `phase` changes after creation; the aspect vector and grid size are
/// fixed by the image the pipeline was armed with.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SortUniforms {
    pub aspect_ratio: [f32; 2],
    pub grid: [f32; 2],
    pub phase: f32,
    pub padding: [f32; 3],
}

unsafe impl Zeroable for SortUniforms {}
unsafe impl Pod for SortUniforms {}

impl SortUniforms {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            aspect_ratio: calc_aspect_ratio(width, height),
            grid: [width as f32, height as f32],
            phase: 0.0,
            padding: [0.0; 3],
        }
    }

    /// Stores `phase`, returning whether the value changed.
    pub fn set_phase(&mut self, phase: f32) -> bool {
        let phase = phase.clamp(0.0, 1.0);
        if self.phase == phase {
            return false;
        }
        self.phase = phase;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_std140_block() {
        assert_eq!(std::mem::size_of::<SortUniforms>(), 32);
        assert_eq!(std::mem::offset_of!(SortUniforms, grid), 8);
        assert_eq!(std::mem::offset_of!(SortUniforms, phase), 16);
    }

    #[test]
    fn new_uniforms_carry_grid_and_aspect() {
        let uniforms = SortUniforms::new(640, 480);
        assert_eq!(uniforms.grid, [640.0, 480.0]);
        assert_eq!(uniforms.aspect_ratio, [640.0 / 480.0, 1.0]);
        assert_eq!(uniforms.phase, 0.0);
    }

    #[test]
    fn set_phase_reports_changes_and_clamps() {
        let mut uniforms = SortUniforms::new(2, 1);
        assert!(uniforms.set_phase(0.25));
        assert!(!uniforms.set_phase(0.25));
        assert!(uniforms.set_phase(4.0));
        assert_eq!(uniforms.phase, 1.0);
    }
}
