use std::time::Instant;

use image::RgbaImage;

/// Keypoints tracked per hand.
pub const NUM_LANDMARKS: usize = 21;
/// Length of a flattened landmark vector (x, y, z per keypoint).
pub const FEATURE_LEN: usize = NUM_LANDMARKS * 3;

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

impl Frame {
    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Frame {
            rgba: image.into_raw(),
            width,
            height,
            timestamp: Instant::now(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PalmRegion {
    pub bbox: [f32; 4],
    pub landmarks: Vec<(f32, f32)>,
    pub score: f32,
}
