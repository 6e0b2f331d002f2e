//! Whole-record helpers: merging and flat keypath views.

use std::collections::BTreeMap;

use crate::record::{Leaf, Node, Record};
use crate::tree::keypath::{KeypathBuf, KEYPATH_DELIMITER};
use crate::utils::error::{FrameError, Result};

/// Deep-merge records left to right.
///
/// Nested mappings present in several records are merged recursively. For
/// any other collision the later record wins, including a mapping replacing
/// a terminal or a terminal replacing a mapping.
pub fn tree_merge<'a, I>(records: I) -> Record
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut merged = Record::new();
    for record in records {
        merge_into(&mut merged, record);
    }
    merged
}

fn merge_into(target: &mut Record, source: &Record) {
    for (key, node) in source {
        let merged = match (target.get(key), node) {
            (Some(Node::Map(existing)), Node::Map(incoming)) => {
                let mut inner = existing.clone();
                merge_into(&mut inner, incoming);
                Node::Map(inner)
            }
            _ => node.clone(),
        };
        target.insert(key.clone(), merged);
    }
}

/// Flat view of every terminal keyed by its keypath.
///
/// Keys containing `/` are joined unescaped, so the view only round-trips
/// through [`unflatten`] for records whose keys are free of the delimiter.
pub fn flatten(record: &Record) -> BTreeMap<String, Leaf> {
    let mut out = BTreeMap::new();
    let mut keypath = KeypathBuf::new();
    flatten_into(record, &mut keypath, &mut out);
    out
}

fn flatten_into(record: &Record, keypath: &mut KeypathBuf, out: &mut BTreeMap<String, Leaf>) {
    for (key, node) in record {
        keypath.push(key);
        match node {
            Node::Map(inner) => flatten_into(inner, keypath, out),
            Node::Leaf(leaf) => {
                out.insert(keypath.as_str().to_string(), leaf.clone());
            }
        }
        keypath.pop();
    }
}

/// Rebuild a nested record from a flat keypath view.
///
/// Fails when a keypath is both a terminal and the prefix of another keypath.
pub fn unflatten<I, K>(entries: I) -> Result<Record>
where
    I: IntoIterator<Item = (K, Leaf)>,
    K: AsRef<str>,
{
    let mut root = Record::new();
    for (keypath, leaf) in entries {
        let keypath = keypath.as_ref();
        let segments: Vec<&str> = keypath.split(KEYPATH_DELIMITER).collect();
        insert_path(&mut root, &segments, leaf, keypath)?;
    }
    Ok(root)
}

fn insert_path(record: &mut Record, segments: &[&str], leaf: Leaf, full: &str) -> Result<()> {
    let (head, rest) = match segments.split_first() {
        Some(split) => split,
        None => return Err(FrameError::Structure("empty keypath".to_string())),
    };

    if rest.is_empty() {
        if record.contains_key(head) {
            return Err(FrameError::Structure(format!(
                "keypath '{full}' collides with an existing entry"
            )));
        }
        record.insert(*head, leaf);
        return Ok(());
    }

    let mut child = match record.get(head) {
        Some(Node::Map(existing)) => existing.clone(),
        Some(Node::Leaf(_)) => {
            return Err(FrameError::Structure(format!(
                "keypath '{full}' descends through terminal '{head}'"
            )))
        }
        None => Record::new(),
    };
    insert_path(&mut child, rest, leaf, full)?;
    record.insert(*head, child);
    Ok(())
}
