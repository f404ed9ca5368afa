//! SSD anchors for the 192x192 MediaPipe palm detector.
//!
//! Layers sharing a stride are merged into one grid, so the 24x24 grid
//! carries 2 anchors per cell and the 12x12 grid carries 6.

use crate::pipeline::detector::common::PALM_INPUT_SIZE;

const STRIDES: [u32; 4] = [8, 16, 16, 16];
const ANCHORS_PER_LAYER: usize = 2;
const ANCHOR_OFFSET: f32 = 0.5;

pub const NUM_ANCHORS: usize = 2016;

/// Anchor centres `[x, y]` in normalized input coordinates, in the order
/// the model emits its regressors.
pub fn generate_anchors() -> Vec<[f32; 2]> {
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    let mut layer = 0;
    while layer < STRIDES.len() {
        let stride = STRIDES[layer];
        let mut per_cell = 0;
        while layer < STRIDES.len() && STRIDES[layer] == stride {
            per_cell += ANCHORS_PER_LAYER;
            layer += 1;
        }

        let grid = PALM_INPUT_SIZE.div_ceil(stride);
        for y in 0..grid {
            for x in 0..grid {
                let cx = (x as f32 + ANCHOR_OFFSET) / grid as f32;
                let cy = (y as f32 + ANCHOR_OFFSET) / grid as f32;
                anchors.extend(std::iter::repeat_n([cx, cy], per_cell));
            }
        }
    }

    anchors
}
