//! Decoding of encoded image terminals.

use crate::imaging::{ImageCodec, ImageDecoder};
use crate::record::{DType, Leaf, Record};
use crate::tree::{selective_tree_map, KeypathMatch};
use crate::utils::error::Result;

/// Decode every `bytes` terminal whose keypath contains one of `pattern`.
///
/// Works on nested records. Decoded terminals become `uint8` `[H, W, C]`
/// tensors; animated payloads contribute their first frame only. Terminals of
/// any other dtype are never selected, even under a matching keypath.
pub fn decode_images(record: &Record, pattern: impl Into<KeypathMatch>) -> Result<Record> {
    decode_images_with(record, pattern, &ImageCodec::new())
}

/// [`decode_images`] with an explicit decoder
pub fn decode_images_with<D>(
    record: &Record,
    pattern: impl Into<KeypathMatch>,
    decoder: &D,
) -> Result<Record>
where
    D: ImageDecoder + ?Sized,
{
    let matcher = pattern.into().with_dtype(DType::Bytes);
    selective_tree_map(record, &matcher, |leaf| {
        let image = decoder.decode(leaf.as_bytes()?)?;
        Ok(Leaf::Uint8(image))
    })
}
