//! Image collaborators used by the frame stages.
//!
//! The stages in [`crate::transforms`] only decide *which* terminals to touch;
//! the pixel work is delegated to three collaborators:
//!
//! - [`ImageDecoder`]: encoded bytes to a `uint8` `[H, W, C]` tensor
//! - [`ImageResizer`]: `uint8` image (or batch) to a float tensor of a fixed
//!   spatial size, values kept in `[0, 255]`
//! - [`ImageAugmenter`]: pixel-space augmentation, deterministic for a seed
//!
//! Default implementations live in the submodules and are built on the
//! `image` crate (`imageops` for resizing, cropping and flipping) and
//! `rand_chacha`.

pub mod augmentation;
pub(crate) mod buffer;
pub mod codec;
pub mod resize;

use serde::{Deserialize, Serialize};

use crate::record::{Leaf, Tensor};
use crate::utils::error::Result;

pub use augmentation::{seeded_rng, AugmentConfig, AugmentOp, Augmenter, Pixels, RandomResizedCrop};
pub use codec::{encode_png, image_to_tensor, tensor_to_image, ImageCodec};
pub use resize::BilinearResizer;

/// Two-component augmentation seed
pub type AugmentSeed = [i64; 2];

/// Target spatial size of a resize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub height: usize,
    pub width: usize,
}

impl ImageSize {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    pub fn square(size: usize) -> Self {
        Self::new(size, size)
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        Self::square(128)
    }
}

impl From<(usize, usize)> for ImageSize {
    fn from((height, width): (usize, usize)) -> Self {
        Self::new(height, width)
    }
}

/// Decodes one encoded image
pub trait ImageDecoder {
    /// Decode `encoded` into a `[H, W, C]` tensor. Animated formats yield
    /// their first frame only.
    fn decode(&self, encoded: &[u8]) -> Result<Tensor<u8>>;
}

/// Resizes the spatial dimensions of an image or image batch
pub trait ImageResizer {
    /// Resize `[H, W, C]` or `[N, H, W, C]` to `size`. The output is float
    /// but stays in the `[0, 255]` range of the input.
    fn resize(&self, image: &Tensor<u8>, size: ImageSize) -> Result<Tensor<f32>>;
}

/// Applies a random pixel-space augmentation
pub trait ImageAugmenter {
    /// Augment a single image terminal. With a seed the result is fully
    /// determined by `(image, seed, config)`; without one the augmenter draws
    /// fresh randomness.
    fn augment(&self, image: &Leaf, seed: Option<AugmentSeed>, config: &AugmentConfig)
        -> Result<Leaf>;
}
