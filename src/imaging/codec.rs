//! Image decoding and encoding on top of the `image` crate.

use std::io::Cursor;

use image::{DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, RgbImage, RgbaImage};

use crate::imaging::ImageDecoder;
use crate::record::{Leaf, Tensor};
use crate::utils::error::{FrameError, Result};

/// Default decoder backed by `image::load_from_memory`.
///
/// The format is sniffed from the payload. Only the first frame of animated
/// GIF/WebP/APNG payloads is decoded. Output channel count follows the
/// decoded colour type (1 gray, 2 gray+alpha, 3 RGB, 4 RGBA); 16-bit and
/// float sources are narrowed to 8 bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl ImageCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ImageDecoder for ImageCodec {
    fn decode(&self, encoded: &[u8]) -> Result<Tensor<u8>> {
        let image = image::load_from_memory(encoded)
            .map_err(|e| FrameError::Decode(format!("unsupported or corrupt image: {e}")))?;
        image_to_tensor(image)
    }
}

/// Convert a decoded image into a `[H, W, C]` tensor
pub fn image_to_tensor(image: DynamicImage) -> Result<Tensor<u8>> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let (channels, raw) = match image {
        DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
        DynamicImage::ImageLumaA8(buf) => (2, buf.into_raw()),
        DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
        DynamicImage::ImageRgba8(buf) => (4, buf.into_raw()),
        other => match other.color().channel_count() {
            1 => (1, other.to_luma8().into_raw()),
            2 => (2, other.to_luma_alpha8().into_raw()),
            3 => (3, other.to_rgb8().into_raw()),
            _ => (4, other.to_rgba8().into_raw()),
        },
    };
    Tensor::new(vec![height, width, channels], raw)
}

/// Convert an image terminal back into a `DynamicImage`.
///
/// Float terminals are expected in `[0, 255]` and are rounded and clamped.
pub fn tensor_to_image(leaf: &Leaf) -> Result<DynamicImage> {
    let (shape, pixels) = match leaf {
        Leaf::Uint8(t) => (t.shape(), t.to_vec()),
        Leaf::Float32(t) => (
            t.shape(),
            t.data().iter().map(|v| v.round().clamp(0.0, 255.0) as u8).collect(),
        ),
        other => {
            return Err(FrameError::InvalidTensor(format!(
                "cannot convert a {} terminal into an image",
                other.dtype()
            )))
        }
    };

    let (height, width, channels) = match shape {
        &[h, w, c] => (h as u32, w as u32, c),
        other => {
            return Err(FrameError::InvalidTensor(format!(
                "expected an [H, W, C] image, got shape {:?}",
                other
            )))
        }
    };

    let mismatch = || FrameError::InvalidTensor("pixel buffer does not match image size".into());
    let image = match channels {
        1 => DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, pixels).ok_or_else(mismatch)?),
        2 => DynamicImage::ImageLumaA8(
            GrayAlphaImage::from_raw(width, height, pixels).ok_or_else(mismatch)?,
        ),
        3 => DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, pixels).ok_or_else(mismatch)?),
        4 => DynamicImage::ImageRgba8(RgbaImage::from_raw(width, height, pixels).ok_or_else(mismatch)?),
        c => {
            return Err(FrameError::InvalidTensor(format!(
                "unsupported channel count {c}"
            )))
        }
    };
    Ok(image)
}

/// Encode an image terminal as PNG bytes
pub fn encode_png(leaf: &Leaf) -> Result<Vec<u8>> {
    let image = tensor_to_image(leaf)?;
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}
