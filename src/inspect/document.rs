//! Editable view of a file plus the pin table that suggested fixes resolve
//! their targets through.
//!
//! Fixes never hold tree nodes: at diagnosis time a node is pinned, which
//! records its byte range under a stable [`NodeKey`]. At apply time the key
//! is looked up again; an edit that invalidated the range makes the lookup
//! return nothing and the fix degrade to a no-op.

use std::path::{Path, PathBuf};

use tree_sitter::Node;

/// Stable handle to a pinned node range. Plain index, never a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeKey(u32);

/// Byte ranges captured during an inspection pass.
#[derive(Debug, Default)]
pub struct PinTable {
    spans: Vec<(usize, usize)>,
}

impl PinTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin(&mut self, node: Node) -> NodeKey {
        self.pin_range(node.start_byte(), node.end_byte())
    }

    pub fn pin_range(&mut self, start: usize, end: usize) -> NodeKey {
        let key = NodeKey(self.spans.len() as u32);
        self.spans.push((start, end));
        key
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// A document that fixes are applied to. Owns the text, the live pins and a
/// revision counter; a retired document refuses all edits.
pub struct Document {
    path: PathBuf,
    text: String,
    pins: Vec<Option<(usize, usize)>>,
    revision: u64,
    retired: bool,
}

impl Document {
    pub fn new(path: PathBuf, text: impl Into<String>, pins: PinTable) -> Self {
        Self {
            path,
            text: text.into(),
            pins: pins.spans.into_iter().map(Some).collect(),
            revision: 0,
            retired: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Marks the document as gone (the host analogue is a disposed editor
    /// document). Any later fix application becomes a no-op.
    pub fn retire(&mut self) {
        self.retired = true;
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// Re-resolves a pinned range; `None` once the target has been edited
    /// away or already consumed.
    pub fn resolve(&self, key: NodeKey) -> Option<(usize, usize)> {
        self.pins.get(key.0 as usize).copied().flatten()
    }

    /// Replaces the pinned range with `replacement` as one atomic edit, then
    /// tombstones the key and re-bases the surviving pins. Returns `false`
    /// when the key is no longer live.
    pub(crate) fn splice(&mut self, key: NodeKey, replacement: &str) -> bool {
        let Some((start, end)) = self.resolve(key) else {
            return false;
        };

        self.text.replace_range(start..end, replacement);
        let removed = end - start;
        let inserted = replacement.len();

        for (idx, slot) in self.pins.iter_mut().enumerate() {
            let Some((pin_start, pin_end)) = *slot else {
                continue;
            };

            if idx == key.0 as usize || (pin_start < end && pin_end > start) {
                // Consumed, or overlapping the edited range: no longer a
                // live node.
                *slot = None;
            } else if pin_start >= end {
                *slot = Some((pin_start - removed + inserted, pin_end - removed + inserted));
            }
        }

        self.revision += 1;
        true
    }
}
