//! Frame transforms: image stages expressed on top of [`selective_tree_map`].
//!
//! Each stage pairs a matcher with a collaborator call:
//!
//! | Stage | Selects | Does |
//! |---|---|---|
//! | [`decode_images`] | `bytes` terminals whose keypath contains a pattern | decode to `uint8` `[H, W, C]` |
//! | [`resize_images`] | `uint8` terminals whose keypath contains a pattern | resize to a fixed size, float in `[0, 255]` |
//! | [`augment`] | anything the given matcher selects | pixel augmentation, seeded per trajectory |
//!
//! The plain functions use the default collaborators from [`crate::imaging`];
//! the `*_with` variants take any implementation of the collaborator traits.
//!
//! [`selective_tree_map`]: crate::tree::selective_tree_map

pub mod augment;
pub mod decode;
pub mod resize;

pub use augment::{augment, augment_with, trajectory_seed, AugmentOptions};
pub use decode::{decode_images, decode_images_with};
pub use resize::{resize_images, resize_images_with};
