//! Hand-off of transformed records to burn.
//!
//! Records come out of the frame stages one at a time; training code wants a
//! single `[N, H, W, C]` float tensor per image key. [`stack_leaf`] gathers
//! one keypath across a slice of records and builds that tensor.

use burn::prelude::*;

use crate::record::{Leaf, Record};
use crate::utils::error::{FrameError, Result};

/// Stack the rank-3 image terminal at `keypath` from every record into a
/// `[N, H, W, C]` float tensor.
///
/// `uint8` terminals are widened to float without rescaling. All terminals
/// must share one shape.
pub fn stack_leaf<B: Backend>(
    records: &[Record],
    keypath: &str,
    device: &B::Device,
) -> Result<Tensor<B, 4>> {
    if records.is_empty() {
        return Err(FrameError::InvalidTensor(format!(
            "cannot stack '{keypath}' from an empty batch"
        )));
    }

    let mut shape: Option<(usize, usize, usize)> = None;
    let mut images_data: Vec<f32> = Vec::new();

    for (i, record) in records.iter().enumerate() {
        let (hwc, pixels): (_, Vec<f32>) = match record.leaf_at(keypath)? {
            Leaf::Uint8(t) => (t.hwc()?, t.data().iter().map(|&v| f32::from(v)).collect()),
            Leaf::Float32(t) => (t.hwc()?, t.data().to_vec()),
            other => {
                return Err(FrameError::InvalidTensor(format!(
                    "'{keypath}' is a {} terminal, expected an image",
                    other.dtype()
                )))
            }
        };

        match shape {
            Some(expected) if expected != hwc => {
                return Err(FrameError::InvalidTensor(format!(
                    "record {i} has '{keypath}' of shape {hwc:?}, expected {expected:?}"
                )))
            }
            Some(_) => {}
            None => {
                images_data.reserve(records.len() * pixels.len());
                shape = Some(hwc);
            }
        }
        images_data.extend(pixels);
    }

    let (height, width, channels) = shape.unwrap_or_default();
    Ok(Tensor::<B, 4>::from_floats(
        TensorData::new(images_data, [records.len(), height, width, channels]),
        device,
    ))
}
