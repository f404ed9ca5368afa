use anyhow::{Result, anyhow, ensure};
use nokhwa::{Buffer, utils::FrameFormat};
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgba, yuyv422_to_rgba,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

#[derive(Debug)]
pub struct RgbaFrame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

pub fn convert_camera_frame(frame: &Buffer) -> Result<RgbaFrame> {
    let resolution = frame.resolution();
    let width = resolution.width_x;
    let height = resolution.height_y;

    let rgba = convert(frame.source_frame_format(), frame.buffer(), width, height)?;
    Ok(RgbaFrame {
        rgba,
        width,
        height,
    })
}

fn convert(format: FrameFormat, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    match format {
        FrameFormat::NV12 => nv12_to_rgba(data, width, height),
        FrameFormat::YUYV => yuyv_to_rgba(data, width, height),
        FrameFormat::MJPEG => mjpeg_to_rgba(data, width, height),
        FrameFormat::RAWRGB => packed_to_rgba(data, width, height, [0, 1, 2]),
        FrameFormat::RAWBGR => packed_to_rgba(data, width, height, [2, 1, 0]),
        FrameFormat::GRAY => gray_to_rgba(data, width, height),
    }
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

fn check_len(kind: &str, data: &[u8], expected: usize) -> Result<()> {
    ensure!(
        data.len() >= expected,
        "{kind} buffer too small: got {}, expected {expected}",
        data.len()
    );
    Ok(())
}

fn nv12_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let y_plane_len = pixel_count(width, height);
    let uv_plane_len = y_plane_len / 2;
    check_len("NV12", data, y_plane_len + uv_plane_len)?;

    let image = YuvBiPlanarImage {
        y_plane: &data[..y_plane_len],
        y_stride: width,
        uv_plane: &data[y_plane_len..y_plane_len + uv_plane_len],
        uv_stride: width,
        width,
        height,
    };

    let mut rgba = vec![0u8; y_plane_len * 4];
    yuv_nv12_to_rgba(
        &image,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12 to RGBA failed: {err:?}"))?;

    Ok(rgba)
}

fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    check_len("YUYV", data, pixel_count(width, height) * 2)?;

    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };

    let mut rgba = vec![0u8; pixel_count(width, height) * 4];
    yuyv422_to_rgba(
        &packed,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| anyhow!("YUYV422 to RGBA failed: {err:?}"))?;

    Ok(rgba)
}

fn mjpeg_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let rgba = decoder
        .decode()
        .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;

    let expected = pixel_count(width, height) * 4;
    ensure!(
        rgba.len() >= expected,
        "MJPEG decode produced too few bytes: got {}, expected {expected}",
        rgba.len()
    );
    Ok(rgba)
}

/// Expands 3-byte pixels to RGBA, reading channels in `order`.
fn packed_to_rgba(data: &[u8], width: u32, height: u32, order: [usize; 3]) -> Result<Vec<u8>> {
    check_len("RGB", data, pixel_count(width, height) * 3)?;

    let mut rgba = vec![0u8; pixel_count(width, height) * 4];
    rgba.par_chunks_mut(4)
        .zip(data.par_chunks_exact(3))
        .for_each(|(dst, src)| {
            dst[0] = src[order[0]];
            dst[1] = src[order[1]];
            dst[2] = src[order[2]];
            dst[3] = 255;
        });

    Ok(rgba)
}

fn gray_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let pixels = pixel_count(width, height);
    check_len("GRAY", data, pixels)?;

    let mut rgba = vec![0u8; pixels * 4];
    rgba.par_chunks_mut(4)
        .zip(data.par_iter().copied())
        .for_each(|(dst, value)| {
            dst[..3].fill(value);
            dst[3] = 255;
        });

    Ok(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgr_channels_are_swapped() {
        let bgr = [10, 20, 30, 40, 50, 60];
        let rgba = convert(FrameFormat::RAWBGR, &bgr, 2, 1).unwrap();
        assert_eq!(rgba, vec![30, 20, 10, 255, 60, 50, 40, 255]);

        let rgba = convert(FrameFormat::RAWRGB, &bgr, 2, 1).unwrap();
        assert_eq!(rgba, vec![10, 20, 30, 255, 40, 50, 60, 255]);
    }

    #[test]
    fn gray_is_replicated() {
        let rgba = convert(FrameFormat::GRAY, &[7, 200], 1, 2).unwrap();
        assert_eq!(rgba, vec![7, 7, 7, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn short_buffers_are_rejected() {
        let err = convert(FrameFormat::RAWRGB, &[1, 2, 3], 2, 1).unwrap_err();
        assert!(err.to_string().contains("RGB buffer too small"));
        assert!(convert(FrameFormat::YUYV, &[0; 4], 2, 2).is_err());
        assert!(convert(FrameFormat::NV12, &[0; 4], 2, 2).is_err());
    }
}
