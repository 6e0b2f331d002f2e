//! Nested records flowing through the data-loading pipeline.
//!
//! A [`Record`] maps string keys to [`Node`]s, each of which is either a nested
//! record or a terminal [`Leaf`]. Records are treated as values: every
//! transform in this crate builds a new record and leaves its input untouched.

pub mod leaf;
pub mod tensor;

use std::collections::btree_map::{self, BTreeMap};

pub use leaf::{DType, Leaf};
pub use tensor::Tensor;

use crate::tree::keypath::KEYPATH_DELIMITER;
use crate::utils::error::{FrameError, Result, ResultExt};

/// Root key carrying the index of the trajectory a record belongs to
pub const TRAJ_INDEX_KEY: &str = "_traj_index";

/// A value stored under a key: a nested mapping or a terminal
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Map(Record),
    Leaf(Leaf),
}

impl Node {
    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&Record> {
        match self {
            Node::Map(record) => Some(record),
            Node::Leaf(_) => None,
        }
    }
}

impl From<Leaf> for Node {
    fn from(leaf: Leaf) -> Self {
        Node::Leaf(leaf)
    }
}

impl From<Record> for Node {
    fn from(record: Record) -> Self {
        Node::Map(record)
    }
}

impl From<i64> for Node {
    fn from(v: i64) -> Self {
        Node::Leaf(Leaf::Int(v))
    }
}

impl From<Tensor<u8>> for Node {
    fn from(t: Tensor<u8>) -> Self {
        Node::Leaf(Leaf::Uint8(t))
    }
}

impl From<Tensor<f32>> for Node {
    fn from(t: Tensor<f32>) -> Self {
        Node::Leaf(Leaf::Float32(t))
    }
}

/// A mapping from string keys to nested records or terminals.
///
/// Keys are kept ordered so that iteration, debug output and flattened views
/// are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: BTreeMap<String, Node>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, node: impl Into<Node>) -> Self {
        self.insert(key, node);
        self
    }

    /// Insert a node, returning the previous one stored under `key`
    pub fn insert(&mut self, key: impl Into<String>, node: impl Into<Node>) -> Option<Node> {
        self.entries.insert(key.into(), node.into())
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up a node by its full keypath (`"observation/image_0"`).
    ///
    /// Every `/` separates two keys, so keys containing `/` are unreachable.
    pub fn get_path(&self, keypath: &str) -> Option<&Node> {
        let mut segments = keypath.split(KEYPATH_DELIMITER);
        let mut node = self.entries.get(segments.next()?)?;
        for segment in segments {
            node = node.as_map()?.entries.get(segment)?;
        }
        Some(node)
    }

    /// Look up a terminal by its full keypath
    pub fn leaf_at(&self, keypath: &str) -> Result<&Leaf> {
        self.get_path(keypath)
            .and_then(Node::as_leaf)
            .with_context(|| keypath.to_string())
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Node> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of terminals at every depth
    pub fn leaf_count(&self) -> usize {
        self.entries
            .values()
            .map(|node| match node {
                Node::Map(inner) => inner.leaf_count(),
                Node::Leaf(_) => 1,
            })
            .sum()
    }

    /// Trajectory index stored at the root under [`TRAJ_INDEX_KEY`]
    pub fn traj_index(&self) -> Result<i64> {
        match self.entries.get(TRAJ_INDEX_KEY).context(TRAJ_INDEX_KEY)? {
            Node::Leaf(leaf) => leaf.as_int(),
            Node::Map(_) => Err(FrameError::InvalidTensor(format!(
                "'{TRAJ_INDEX_KEY}' must be an integer terminal, found a nested mapping"
            ))),
        }
    }

    /// Whether both records have the same keys and nesting at every level.
    /// Terminal values are not compared.
    pub fn same_structure(&self, other: &Record) -> bool {
        self.len() == other.len()
            && self.iter().all(|(key, node)| match (node, other.get(key)) {
                (Node::Map(a), Some(Node::Map(b))) => a.same_structure(b),
                (Node::Leaf(_), Some(Node::Leaf(_))) => true,
                _ => false,
            })
    }
}

impl<K: Into<String>, N: Into<Node>> FromIterator<(K, N)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, N)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, n)| (k.into(), n.into()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Node);
    type IntoIter = btree_map::Iter<'a, String, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for Record {
    type Item = (String, Node);
    type IntoIter = btree_map::IntoIter<String, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
