//! Deciding which terminals a transform applies to.
//!
//! A [`Matcher`] looks at a terminal's keypath and value and answers whether
//! the terminal is selected. Two ways to build one:
//!
//! - [`KeypathMatch`]: selected when any of a set of substrings occurs in the
//!   keypath, optionally restricted to one [`DType`]. This is what the image
//!   stages use (`"image"` matches `observation/image_0`, `image_wrist`, ...).
//! - any closure `Fn(&str, &Leaf) -> Result<bool>`, or [`predicate`] for an
//!   infallible closure.
//!
//! Matchers must be pure: the result may depend only on the keypath and the
//! value, never on traversal order or sibling terminals.

use serde::{Deserialize, Serialize};

use crate::record::{DType, Leaf};
use crate::utils::error::Result;

/// Default keypath substring used by the image stages
pub const DEFAULT_IMAGE_MATCH: &str = "image";

/// Selects terminals by keypath and value
pub trait Matcher {
    fn matches(&self, keypath: &str, leaf: &Leaf) -> Result<bool>;
}

impl<F> Matcher for F
where
    F: Fn(&str, &Leaf) -> Result<bool>,
{
    fn matches(&self, keypath: &str, leaf: &Leaf) -> Result<bool> {
        self(keypath, leaf)
    }
}

/// Adapts an infallible closure into a [`Matcher`]
pub fn predicate<F>(f: F) -> impl Matcher
where
    F: Fn(&str, &Leaf) -> bool,
{
    move |keypath: &str, leaf: &Leaf| -> Result<bool> { Ok(f(keypath, leaf)) }
}

/// Selects terminals whose keypath contains at least one of `patterns`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeypathMatch {
    patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dtype: Option<DType>,
}

impl KeypathMatch {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            dtype: None,
        }
    }

    /// Additionally require the terminal to have the given dtype
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn dtype(&self) -> Option<DType> {
        self.dtype
    }

    /// Keypath half of the test, ignoring any dtype restriction
    pub fn matches_keypath(&self, keypath: &str) -> bool {
        self.patterns.iter().any(|p| keypath.contains(p.as_str()))
    }
}

impl Default for KeypathMatch {
    fn default() -> Self {
        Self::new([DEFAULT_IMAGE_MATCH])
    }
}

impl Matcher for KeypathMatch {
    fn matches(&self, keypath: &str, leaf: &Leaf) -> Result<bool> {
        let dtype_ok = self.dtype.map_or(true, |d| leaf.dtype() == d);
        Ok(dtype_ok && self.matches_keypath(keypath))
    }
}

impl From<&str> for KeypathMatch {
    fn from(pattern: &str) -> Self {
        Self::new([pattern])
    }
}

impl From<String> for KeypathMatch {
    fn from(pattern: String) -> Self {
        Self::new([pattern])
    }
}

impl From<&[&str]> for KeypathMatch {
    fn from(patterns: &[&str]) -> Self {
        Self::new(patterns.iter().copied())
    }
}

impl From<Vec<&str>> for KeypathMatch {
    fn from(patterns: Vec<&str>) -> Self {
        Self::new(patterns)
    }
}

impl From<Vec<String>> for KeypathMatch {
    fn from(patterns: Vec<String>) -> Self {
        Self::new(patterns)
    }
}

impl<const N: usize> From<[&str; N]> for KeypathMatch {
    fn from(patterns: [&str; N]) -> Self {
        Self::new(patterns)
    }
}
