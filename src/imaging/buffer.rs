//! Geometric operations on float `[H, W, C]` pixels through `image::imageops`.
//!
//! Pixels are held as `ImageBuffer<P, Vec<f32>>` with `P` chosen from the
//! channel count (`Luma`, `LumaA`, `Rgb`, `Rgba`). The `imageops` filters clamp
//! float samples to `[0, 1]`, so filtered operations scale `[0, 255]` values
//! down before and back up after.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, LumaA, Pixel, Rgb, Rgba};

use crate::utils::error::{FrameError, Result};

/// One geometric operation on a single image
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PixelOp {
    /// Triangle-filter resize to `width x height`
    Resize { width: u32, height: u32 },
    /// Crop the window at `(x, y)` and resize it back to the source size
    CropResize { x: u32, y: u32, width: u32, height: u32 },
    FlipHorizontal,
    FlipVertical,
}

/// Apply `op` to a row-major `[H, W, C]` float image with values in
/// `[0, 255]`, returning the new pixel data.
///
/// `C` must be 1 to 4.
pub(crate) fn apply_hwc(
    data: Vec<f32>,
    height: usize,
    width: usize,
    channels: usize,
    op: PixelOp,
) -> Result<Vec<f32>> {
    match channels {
        1 => apply::<Luma<f32>>(data, height, width, op),
        2 => apply::<LumaA<f32>>(data, height, width, op),
        3 => apply::<Rgb<f32>>(data, height, width, op),
        4 => apply::<Rgba<f32>>(data, height, width, op),
        c => Err(FrameError::InvalidTensor(format!(
            "expected 1 to 4 channels, got {c}"
        ))),
    }
}

fn apply<P>(data: Vec<f32>, height: usize, width: usize, op: PixelOp) -> Result<Vec<f32>>
where
    P: Pixel<Subpixel = f32> + 'static,
{
    let filtered = matches!(op, PixelOp::Resize { .. } | PixelOp::CropResize { .. });
    let data = if filtered {
        data.into_iter().map(|v| v / 255.0).collect()
    } else {
        data
    };

    let buf = ImageBuffer::<P, Vec<f32>>::from_raw(width as u32, height as u32, data)
        .ok_or_else(|| FrameError::InvalidTensor("pixel buffer does not match image size".into()))?;

    let out = match op {
        PixelOp::Resize { width, height } => {
            imageops::resize(&buf, width, height, FilterType::Triangle)
        }
        PixelOp::CropResize {
            x,
            y,
            width: crop_w,
            height: crop_h,
        } => {
            let window = imageops::crop_imm(&buf, x, y, crop_w, crop_h).to_image();
            imageops::resize(&window, buf.width(), buf.height(), FilterType::Triangle)
        }
        PixelOp::FlipHorizontal => imageops::flip_horizontal(&buf),
        PixelOp::FlipVertical => imageops::flip_vertical(&buf),
    };

    let raw = out.into_raw();
    Ok(if filtered {
        raw.into_iter().map(|v| (v * 255.0).clamp(0.0, 255.0)).collect()
    } else {
        raw
    })
}
