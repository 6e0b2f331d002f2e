//! Traversal of nested records.
//!
//! [`selective_tree_map`] is the mechanism every stage in this crate is built
//! on: walk a record depth-first, compute each terminal's keypath, and replace
//! only the terminals a [`Matcher`] selects.

pub mod keypath;
pub mod map;
pub mod matcher;
pub mod ops;

pub use keypath::KEYPATH_DELIMITER;
pub use map::{selective_tree_map, tree_map};
pub use matcher::{predicate, KeypathMatch, Matcher, DEFAULT_IMAGE_MATCH};
pub use ops::{flatten, tree_merge, unflatten};
