//! Selective, keypath-aware mapping over nested records.

use tracing::{debug, trace};

use crate::record::{Leaf, Node, Record};
use crate::tree::keypath::KeypathBuf;
use crate::tree::matcher::Matcher;
use crate::utils::error::{FrameError, Result};

/// Apply `transform` to every terminal selected by `matcher`.
///
/// The record is walked depth-first. Each terminal is visited exactly once:
/// the matcher is evaluated on its full keypath (`"observation/image_0"`, or
/// just `"label"` at the top level) and, when it answers true, the terminal is
/// replaced by `transform(terminal)`. Unselected terminals are carried over
/// unchanged and share storage with the input. The output always has the same
/// keys and nesting as `record`.
///
/// A failing matcher or transform aborts the whole call; the error is wrapped
/// with the keypath of the offending terminal and no partial record is
/// returned.
///
/// ```
/// use frame_transforms::record::{Leaf, Record};
/// use frame_transforms::tree::{selective_tree_map, KeypathMatch};
///
/// let record = Record::new()
///     .with("obs", Record::new().with("count", 1i64))
///     .with("count", 10i64);
/// let doubled = selective_tree_map(&record, &KeypathMatch::from("obs"), |leaf| {
///     Ok(Leaf::Int(leaf.as_int()? * 2))
/// })
/// .unwrap();
/// assert_eq!(doubled.leaf_at("obs/count").unwrap().as_int().unwrap(), 2);
/// assert_eq!(doubled.leaf_at("count").unwrap().as_int().unwrap(), 10);
/// ```
pub fn selective_tree_map<M, F>(record: &Record, matcher: &M, mut transform: F) -> Result<Record>
where
    M: Matcher + ?Sized,
    F: FnMut(&Leaf) -> Result<Leaf>,
{
    let mut mapper = SelectiveMapper {
        matcher,
        transform: &mut transform,
        keypath: KeypathBuf::new(),
        visited: 0,
        transformed: 0,
    };
    let output = mapper.map_record(record)?;

    debug!(
        visited = mapper.visited,
        transformed = mapper.transformed,
        "selective tree map complete"
    );
    Ok(output)
}

/// Apply `transform` to every terminal
pub fn tree_map<F>(record: &Record, transform: F) -> Result<Record>
where
    F: FnMut(&Leaf) -> Result<Leaf>,
{
    let everything = |_: &str, _: &Leaf| -> Result<bool> { Ok(true) };
    selective_tree_map(record, &everything, transform)
}

struct SelectiveMapper<'a, M: ?Sized, F> {
    matcher: &'a M,
    transform: &'a mut F,
    keypath: KeypathBuf,
    visited: usize,
    transformed: usize,
}

impl<M, F> SelectiveMapper<'_, M, F>
where
    M: Matcher + ?Sized,
    F: FnMut(&Leaf) -> Result<Leaf>,
{
    fn map_record(&mut self, record: &Record) -> Result<Record> {
        let mut out = Record::new();
        for (key, node) in record {
            self.keypath.push(key);
            let mapped = self.map_node(node);
            self.keypath.pop();
            out.insert(key.clone(), mapped?);
        }
        Ok(out)
    }

    fn map_node(&mut self, node: &Node) -> Result<Node> {
        match node {
            Node::Map(inner) => Ok(Node::Map(self.map_record(inner)?)),
            Node::Leaf(leaf) => {
                self.visited += 1;
                let keypath = self.keypath.as_str();

                let selected = self
                    .matcher
                    .matches(keypath, leaf)
                    .map_err(|e| FrameError::match_predicate(keypath, e))?;
                if !selected {
                    return Ok(Node::Leaf(leaf.clone()));
                }

                trace!(keypath, dtype = %leaf.dtype(), "transforming terminal");
                let replaced =
                    (self.transform)(leaf).map_err(|e| FrameError::transform(keypath, e))?;
                self.transformed += 1;
                Ok(Node::Leaf(replaced))
            }
        }
    }
}
