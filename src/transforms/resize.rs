//! Resizing of decoded image terminals.

use crate::imaging::{BilinearResizer, ImageResizer, ImageSize};
use crate::record::{DType, Leaf, Record};
use crate::tree::{selective_tree_map, KeypathMatch};
use crate::utils::error::Result;

/// Resize every `uint8` terminal whose keypath contains one of `pattern`.
///
/// Works on nested records. Takes `uint8` images (or image batches) and
/// returns float images still in `[0, 255]`; callers normalize further
/// downstream if they need to. Terminals that are already float are not
/// selected.
pub fn resize_images(
    record: &Record,
    pattern: impl Into<KeypathMatch>,
    size: impl Into<ImageSize>,
) -> Result<Record> {
    resize_images_with(record, pattern, size, &BilinearResizer::new())
}

/// [`resize_images`] with an explicit resizer
pub fn resize_images_with<R>(
    record: &Record,
    pattern: impl Into<KeypathMatch>,
    size: impl Into<ImageSize>,
    resizer: &R,
) -> Result<Record>
where
    R: ImageResizer + ?Sized,
{
    let size = size.into();
    let matcher = pattern.into().with_dtype(DType::Uint8);
    selective_tree_map(record, &matcher, |leaf| {
        let resized = resizer.resize(leaf.as_uint8()?, size)?;
        Ok(Leaf::Float32(resized))
    })
}
