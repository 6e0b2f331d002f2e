//! Resizing of `[H, W, C]` images and `[N, H, W, C]` batches.

use crate::imaging::buffer::{apply_hwc, PixelOp};
use crate::imaging::{ImageResizer, ImageSize};
use crate::record::Tensor;
use crate::utils::error::{FrameError, Result};

/// Default resizer: `image::imageops::resize` with the triangle (bilinear)
/// filter, one frame at a time.
///
/// A `uint8` input produces float values that stay within `[0, 255]`. No
/// renormalization to `[0, 1]` happens here. Images must have 1 to 4
/// channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct BilinearResizer;

impl BilinearResizer {
    pub fn new() -> Self {
        Self
    }
}

impl ImageResizer for BilinearResizer {
    fn resize(&self, image: &Tensor<u8>, size: ImageSize) -> Result<Tensor<f32>> {
        if size.height == 0 || size.width == 0 {
            return Err(FrameError::Resize(format!(
                "target size must be non-zero, got {}x{}",
                size.height, size.width
            )));
        }

        let (batch, height, width, channels) = match image.shape() {
            &[h, w, c] => (None, h, w, c),
            &[n, h, w, c] => (Some(n), h, w, c),
            other => {
                return Err(FrameError::Resize(format!(
                    "expected a 3-D [H, W, C] image or 4-D [N, H, W, C] batch, got shape {:?}",
                    other
                )))
            }
        };
        if height == 0 || width == 0 {
            return Err(FrameError::Resize(format!(
                "cannot resize an empty {height}x{width} image"
            )));
        }

        let plane = height * width * channels;
        let mut out = Vec::with_capacity(batch.unwrap_or(1) * size.height * size.width * channels);
        let op = PixelOp::Resize {
            width: size.width as u32,
            height: size.height as u32,
        };
        for frame in image.data().chunks(plane.max(1)).take(batch.unwrap_or(1)) {
            let pixels = frame.iter().map(|&v| f32::from(v)).collect();
            let resized = apply_hwc(pixels, height, width, channels, op)
                .map_err(|e| FrameError::Resize(e.to_string()))?;
            out.extend(resized);
        }

        let shape = match batch {
            Some(n) => vec![n, size.height, size.width, channels],
            None => vec![size.height, size.width, channels],
        };
        Tensor::new(shape, out)
    }
}
