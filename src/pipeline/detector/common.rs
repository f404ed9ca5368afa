use anyhow::{Context, Result, anyhow, ensure};
use fast_image_resize as fir;
use ndarray::Array4;
use rayon::prelude::*;

use crate::types::{Frame, NUM_LANDMARKS};

pub const HANDPOSE_INPUT_SIZE: u32 = 224;
pub const PALM_INPUT_SIZE: u32 = 192;

#[derive(Clone, Debug)]
pub struct LetterboxInfo {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_w: u32,
    pub orig_h: u32,
}

/// Rotated square crop sampled from the source frame for the handpose model.
#[derive(Clone, Debug)]
pub struct CropTransform {
    pub center: (f32, f32),
    pub side: f32,
    pub angle: f32,
    pub output_size: u32,
    pub orig_w: u32,
    pub orig_h: u32,
}

fn check_frame(frame: &Frame) -> Result<()> {
    let expected_len = (frame.width as usize)
        .saturating_mul(frame.height as usize)
        .saturating_mul(4);
    ensure!(
        frame.width > 0 && frame.height > 0,
        "frame has zero size ({}x{})",
        frame.width,
        frame.height
    );
    ensure!(
        frame.rgba.len() == expected_len,
        "frame buffer size mismatch: got {}, expected {}",
        frame.rgba.len(),
        expected_len
    );
    Ok(())
}

/// Letterboxes the frame into a `target_size` square tensor in NHWC layout
/// with channels scaled to `[0, 1]`.
pub fn prepare_frame_with_size(
    frame: &Frame,
    target_size: u32,
) -> Result<(Array4<f32>, LetterboxInfo)> {
    check_frame(frame)?;

    let scale = target_size as f32 / (frame.width.max(frame.height) as f32);
    let new_w = ((frame.width as f32 * scale).round() as u32).clamp(1, target_size);
    let new_h = ((frame.height as f32 * scale).round() as u32).clamp(1, target_size);

    let src_image = fir::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.rgba.clone(),
        fir::PixelType::U8x4,
    )?;
    let mut dst_image = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x4);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;
    let resized = dst_image.into_vec();

    let pad_x = ((target_size - new_w) / 2) as usize;
    let pad_y = ((target_size - new_h) / 2) as usize;
    let mut canvas = vec![0u8; (target_size as usize) * (target_size as usize) * 4];
    let dst_stride = target_size as usize * 4;
    let src_stride = new_w as usize * 4;
    for row in 0..(new_h as usize) {
        let dst_offset = (pad_y + row) * dst_stride + pad_x * 4;
        let src_offset = row * src_stride;
        canvas[dst_offset..dst_offset + src_stride]
            .copy_from_slice(&resized[src_offset..src_offset + src_stride]);
    }

    let normalized: Vec<f32> = canvas
        .par_chunks_exact(4)
        .flat_map_iter(|px| {
            [
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ]
        })
        .collect();
    let input = Array4::<f32>::from_shape_vec(
        (1, target_size as usize, target_size as usize, 3),
        normalized,
    )
    .map_err(|err| anyhow!("failed to build input tensor: {err}"))?;

    let letterbox = LetterboxInfo {
        scale,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
        orig_w: frame.width,
        orig_h: frame.height,
    };

    Ok((input, letterbox))
}

pub fn decode_landmarks(flat: &[f32]) -> Result<Vec<[f32; 3]>> {
    ensure!(
        flat.len() >= NUM_LANDMARKS * 3,
        "unexpected landmarks length: got {}, need {}",
        flat.len(),
        NUM_LANDMARKS * 3
    );

    Ok(flat
        .chunks_exact(3)
        .take(NUM_LANDMARKS)
        .map(|chunk| [chunk[0], chunk[1], chunk[2]])
        .collect())
}

/// Bilinearly samples a rotated `side`-wide square centred on `center` into
/// an `output_size` square tensor.
pub fn prepare_rotated_crop(
    frame: &Frame,
    center: (f32, f32),
    side: f32,
    angle: f32,
    output_size: u32,
) -> Result<(Array4<f32>, CropTransform)> {
    check_frame(frame)?;

    let transform = CropTransform {
        center,
        side,
        angle,
        output_size,
        orig_w: frame.width,
        orig_h: frame.height,
    };

    let size = output_size as usize;
    let data: Vec<f32> = (0..size * size)
        .into_par_iter()
        .flat_map_iter(|i| {
            let (x, y) = ((i % size) as f32 + 0.5, (i / size) as f32 + 0.5);
            let (src_x, src_y) = transform.to_frame(x, y);
            sample_rgb(frame, src_x, src_y)
        })
        .collect();

    let array = Array4::<f32>::from_shape_vec((1, size, size, 3), data)
        .map_err(|err| anyhow!("failed to build rotated crop tensor: {err}"))?;

    Ok((array, transform))
}

impl CropTransform {
    fn pixel_scale(&self) -> f32 {
        self.side / self.output_size as f32
    }

    /// Crop pixel coordinates to source frame pixels.
    fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        let half = self.output_size as f32 / 2.0;
        let scale = self.pixel_scale();
        let dx = (x - half) * scale;
        let dy = (y - half) * scale;
        let (sin, cos) = self.angle.sin_cos();
        (
            self.center.0 + dx * cos - dy * sin,
            self.center.1 + dx * sin + dy * cos,
        )
    }

    /// Crop-space landmarks to normalized image space: x and y divided by
    /// the frame size, z rescaled like x. Points past the frame edge keep
    /// values outside `[0, 1]`.
    pub fn normalize(&self, landmarks: &[[f32; 3]]) -> Vec<[f32; 3]> {
        let width = self.orig_w.max(1) as f32;
        let height = self.orig_h.max(1) as f32;
        let z_scale = self.pixel_scale() / width;
        landmarks
            .iter()
            .map(|&[x, y, z]| {
                let (px, py) = self.to_frame(x, y);
                [px / width, py / height, z * z_scale]
            })
            .collect()
    }
}

fn sample_rgb(frame: &Frame, x: f32, y: f32) -> [f32; 3] {
    if x.is_nan() || y.is_nan() {
        return [0.0, 0.0, 0.0];
    }
    let x0 = x.floor();
    let y0 = y.floor();

    let (w, h) = (frame.width as i32, frame.height as i32);
    let fetch = |cx: f32, cy: f32| -> [f32; 3] {
        let ix = cx as i32;
        let iy = cy as i32;
        if ix < 0 || iy < 0 || ix >= w || iy >= h {
            return [0.0, 0.0, 0.0];
        }
        let idx = (iy as usize * frame.width as usize + ix as usize) * 4;
        [
            frame.rgba[idx] as f32 / 255.0,
            frame.rgba[idx + 1] as f32 / 255.0,
            frame.rgba[idx + 2] as f32 / 255.0,
        ]
    };

    let fx = x - x0;
    let fy = y - y0;
    let c00 = fetch(x0, y0);
    let c10 = fetch(x0 + 1.0, y0);
    let c01 = fetch(x0, y0 + 1.0);
    let c11 = fetch(x0 + 1.0, y0 + 1.0);

    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
    std::array::from_fn(|c| lerp(lerp(c00[c], c10[c], fx), lerp(c01[c], c11[c], fx), fy))
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let rgba = (0..width * height)
            .flat_map(|_| [rgb[0], rgb[1], rgb[2], 255])
            .collect();
        Frame {
            rgba,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn letterbox_pads_the_short_side() {
        let frame = solid_frame(64, 32, [255, 0, 0]);
        let (input, letterbox) = prepare_frame_with_size(&frame, 32).unwrap();
        assert_eq!(input.shape(), &[1, 32, 32, 3]);
        assert_eq!(letterbox.scale, 0.5);
        assert_eq!(letterbox.pad_x, 0.0);
        assert_eq!(letterbox.pad_y, 8.0);
        // Padding rows stay black, image rows carry the red channel.
        assert_eq!(input[[0, 0, 0, 0]], 0.0);
        assert_eq!(input[[0, 16, 16, 0]], 1.0);
    }

    #[test]
    fn mismatched_buffers_are_rejected() {
        let mut frame = solid_frame(4, 4, [0, 0, 0]);
        frame.rgba.pop();
        assert!(prepare_frame_with_size(&frame, 32).is_err());
        assert!(prepare_rotated_crop(&frame, (2.0, 2.0), 4.0, 0.0, 8).is_err());
    }

    #[test]
    fn short_landmark_output_is_an_error() {
        assert!(decode_landmarks(&[0.0; 62]).is_err());
        let landmarks = decode_landmarks(&[1.0; 70]).unwrap();
        assert_eq!(landmarks.len(), NUM_LANDMARKS);
    }

    #[test]
    fn unrotated_crop_maps_back_to_frame_space() {
        let transform = CropTransform {
            center: (100.0, 50.0),
            side: 80.0,
            angle: 0.0,
            output_size: 160,
            orig_w: 200,
            orig_h: 100,
        };
        assert_eq!(transform.to_frame(80.0, 80.0), (100.0, 50.0));
        assert_eq!(transform.to_frame(0.0, 0.0), (60.0, 10.0));

        let normalized = transform.normalize(&[[80.0, 80.0, 10.0]]);
        assert_eq!(normalized[0][0], 0.5);
        assert_eq!(normalized[0][1], 0.5);
        assert!((normalized[0][2] - 10.0 * 0.5 / 200.0).abs() < 1e-6);
    }

    #[test]
    fn landmarks_outside_the_frame_are_not_clamped() {
        let transform = CropTransform {
            center: (100.0, 100.0),
            side: 200.0,
            angle: 0.0,
            output_size: 200,
            orig_w: 200,
            orig_h: 200,
        };
        assert_eq!(transform.to_frame(250.0, -30.0), (250.0, -30.0));

        let normalized = transform.normalize(&[[250.0, -30.0, 0.0], [200.0, 200.0, 0.0]]);
        assert!((normalized[0][0] - 1.25).abs() < 1e-6);
        assert!((normalized[0][1] + 0.15).abs() < 1e-6);
        assert_eq!(normalized[1][0], 1.0);
        assert_eq!(normalized[1][1], 1.0);
    }

    #[test]
    fn rotated_crop_samples_frame_colours() {
        let frame = solid_frame(16, 16, [0, 255, 0]);
        let (crop, _) =
            prepare_rotated_crop(&frame, (8.0, 8.0), 8.0, std::f32::consts::FRAC_PI_4, 8)
                .unwrap();
        assert_eq!(crop.shape(), &[1, 8, 8, 3]);
        assert!((crop[[0, 4, 4, 1]] - 1.0).abs() < 1e-6);
        assert_eq!(crop[[0, 4, 4, 0]], 0.0);
    }
}
