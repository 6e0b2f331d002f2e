//! Keypaths: the `/`-joined chain of keys from the record root to a terminal.

/// Separator placed between keys of a keypath.
///
/// Keys are not escaped. A key that itself contains `/` yields a keypath
/// indistinguishable from a nested one: matchers see the joined string
/// unchanged, but [`Record::get_path`](crate::record::Record::get_path)
/// cannot reach such a key and [`unflatten`](crate::tree::unflatten) rebuilds
/// it as nested records.
pub const KEYPATH_DELIMITER: &str = "/";

/// Growable keypath reused across a depth-first traversal
#[derive(Debug, Default)]
pub(crate) struct KeypathBuf {
    path: String,
    marks: Vec<usize>,
}

impl KeypathBuf {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Descend into `key`
    pub(crate) fn push(&mut self, key: &str) {
        let mark = self.path.len();
        if !self.marks.is_empty() {
            self.path.push_str(KEYPATH_DELIMITER);
        }
        self.marks.push(mark);
        self.path.push_str(key);
    }

    /// Return to the parent of the last pushed key
    pub(crate) fn pop(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.path.truncate(mark);
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.path
    }
}
