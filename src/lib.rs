//! # Frame Transforms
//!
//! Selective, keypath-aware transforms over nested trajectory records.
//!
//! A record is a tree of named entries whose terminals are tensors, encoded
//! image bytes or integers. Every stage in this crate walks that tree,
//! computes each terminal's `/`-joined keypath, and transforms only the
//! terminals a matcher selects; everything else is carried over untouched.
//!
//! ## Modules
//!
//! - `record`: the record tree and its terminal values
//! - `tree`: keypaths, matchers, `selective_tree_map` and tree utilities
//! - `imaging`: decoder, resizer and augmenter collaborators
//! - `transforms`: `decode_images`, `resize_images`, `augment`
//! - `config`: TOML configuration of a frame pipeline
//! - `pipeline`: ordered decode, resize and augment stages
//! - `batch`: stacking transformed images into a burn tensor
//! - `utils`: error type and logging setup
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use frame_transforms::{augment, decode_images, resize_images, AugmentOptions, KeypathMatch, Record};
//!
//! let record = Record::new()
//!     .with("_traj_index", 4i64)
//!     .with("observation", Record::new().with("image_0", jpeg_bytes));
//!
//! let record = decode_images(&record, "image")?;
//! let record = resize_images(&record, "image", (128, 128))?;
//! let record = augment(&record, &KeypathMatch::default(), &AugmentOptions::default())?;
//! ```

pub mod batch;
pub mod config;
pub mod imaging;
pub mod pipeline;
pub mod record;
pub mod transforms;
pub mod tree;
pub mod utils;

// Re-export commonly used items for convenience
pub use batch::stack_leaf;
pub use config::{AugmentStageConfig, DecodeConfig, PipelineConfig, ResizeConfig};
pub use imaging::{
    AugmentConfig, AugmentOp, AugmentSeed, Augmenter, BilinearResizer, ImageAugmenter, ImageCodec,
    ImageDecoder, ImageResizer, ImageSize,
};
pub use pipeline::FramePipeline;
pub use record::{DType, Leaf, Node, Record, Tensor, TRAJ_INDEX_KEY};
pub use transforms::{
    augment, augment_with, decode_images, decode_images_with, resize_images, resize_images_with,
    trajectory_seed, AugmentOptions,
};
pub use tree::{
    predicate, selective_tree_map, tree_map, KeypathMatch, Matcher, DEFAULT_IMAGE_MATCH,
    KEYPATH_DELIMITER,
};
pub use utils::error::{FrameError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
