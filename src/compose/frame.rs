//! Copying between packed RGBA FFmpeg frames and `image` buffers.
//!
//! FFmpeg pads every row to its own stride, `image` stores rows back to back,
//! so both directions copy row by row.

use ffmpeg_next as ffmpeg;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::util::frame::Video as VideoFrame;
use image::RgbaImage;

use crate::error::{Result, SubburnError};

const BYTES_PER_PIXEL: usize = 4;

/// Copy a `Pixel::RGBA` frame into a new image.
pub fn rgba_frame_to_image(frame: &VideoFrame) -> Result<RgbaImage> {
    if frame.format() != Pixel::RGBA {
        return Err(SubburnError::Composition(format!(
            "expected an RGBA frame, got {:?}",
            frame.format()
        )));
    }
    let (width, height) = (frame.width(), frame.height());
    let row_len = width as usize * BYTES_PER_PIXEL;
    let stride = frame.stride(0);
    let data = frame.data(0);

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let line = data.get(start..start + row_len).ok_or_else(|| {
            SubburnError::Composition(format!("RGBA frame row {} out of bounds", row))
        })?;
        pixels.extend_from_slice(line);
    }

    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| SubburnError::Composition("RGBA buffer size mismatch".to_string()))
}

/// Copy `image` into `frame`, which must be an RGBA frame of the same size.
pub fn image_into_rgba_frame(image: &RgbaImage, frame: &mut VideoFrame) -> Result<()> {
    if frame.format() != Pixel::RGBA || frame.width() != image.width() || frame.height() != image.height() {
        return Err(SubburnError::Composition(format!(
            "frame {}x{} {:?} does not fit a {}x{} RGBA image",
            frame.width(),
            frame.height(),
            frame.format(),
            image.width(),
            image.height()
        )));
    }
    let row_len = image.width() as usize * BYTES_PER_PIXEL;
    let stride = frame.stride(0);
    let data = frame.data_mut(0);

    for (row, line) in image.as_raw().chunks_exact(row_len).enumerate() {
        let start = row * stride;
        let dst = data.get_mut(start..start + row_len).ok_or_else(|| {
            SubburnError::Composition(format!("RGBA frame row {} out of bounds", row))
        })?;
        dst.copy_from_slice(line);
    }
    Ok(())
}

/// Allocate an RGBA frame to draw a `width`×`height` canvas into.
pub fn new_rgba_frame(width: u32, height: u32) -> VideoFrame {
    ffmpeg::util::frame::Video::new(Pixel::RGBA, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_copy_honors_stride() {
        ffmpeg::init().unwrap();
        // 3 px wide rows are 12 bytes; FFmpeg pads the stride past that
        let mut image = RgbaImage::new(3, 2);
        for (x, y, p) in image.enumerate_pixels_mut() {
            *p = Rgba([x as u8, y as u8, 7, 255]);
        }

        let mut frame = new_rgba_frame(3, 2);
        assert!(frame.stride(0) >= 12);
        image_into_rgba_frame(&image, &mut frame).unwrap();

        let back = rgba_frame_to_image(&frame).unwrap();
        assert_eq!(back, image);
        assert_eq!(back.get_pixel(2, 1), &Rgba([2, 1, 7, 255]));
    }

    #[test]
    fn test_size_mismatch_rejected() {
        ffmpeg::init().unwrap();
        let image = RgbaImage::new(4, 4);
        let mut frame = new_rgba_frame(2, 2);
        let err = image_into_rgba_frame(&image, &mut frame).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::CompositionError);
    }

    #[test]
    fn test_non_rgba_frame_rejected() {
        ffmpeg::init().unwrap();
        let frame = VideoFrame::new(Pixel::YUV420P, 4, 4);
        assert!(rgba_frame_to_image(&frame).is_err());
    }
}
