//! The quick-fix application protocol.
//!
//! A fix carries text rendered at diagnosis time and a [`NodeKey`] into the
//! document's pin table. Nothing is recomputed at apply time: the key either
//! resolves to a live range (one atomic edit) or the fix silently does
//! nothing.

use super::document::{Document, NodeKey};

#[derive(Debug, Clone)]
pub enum FixAction {
    /// Replace the target with pre-rendered text.
    ReplaceWith(String),
    /// Remove the target outright.
    Delete,
}

#[derive(Debug, Clone)]
pub struct SuggestedFix {
    pub title: &'static str,
    pub action: FixAction,
    pub target: NodeKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixOutcome {
    Applied,
    /// The target was edited away in the meantime; nothing happened.
    TargetMissing,
    /// The document is gone; nothing happened.
    DocumentRetired,
}

impl SuggestedFix {
    pub fn replace_with(target: NodeKey, title: &'static str, expression: String) -> Self {
        Self {
            title,
            action: FixAction::ReplaceWith(expression),
            target,
        }
    }

    pub fn delete(target: NodeKey, title: &'static str) -> Self {
        Self {
            title,
            action: FixAction::Delete,
            target,
        }
    }

    /// Applies the fix. Safe to invoke at any later point: stale targets and
    /// retired documents are silent no-ops, and re-applying an already
    /// applied fix does nothing.
    pub fn apply(&self, doc: &mut Document) -> FixOutcome {
        if doc.is_retired() {
            return FixOutcome::DocumentRetired;
        }

        let replacement = match &self.action {
            FixAction::ReplaceWith(expression) => expression.as_str(),
            FixAction::Delete => "",
        };

        if doc.splice(self.target, replacement) {
            FixOutcome::Applied
        } else {
            FixOutcome::TargetMissing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::document::PinTable;
    use std::path::PathBuf;

    fn fixture(text: &str, range: (usize, usize)) -> (Document, NodeKey) {
        let mut pins = PinTable::new();
        let key = pins.pin_range(range.0, range.1);
        (Document::new(PathBuf::from("test.php"), text, pins), key)
    }

    #[test]
    fn replace_applies_once() {
        let (mut doc, key) = fixture("strtr($s, 'a', 'b')", (0, 19));
        let fix = SuggestedFix::replace_with(key, "use str_replace", "str_replace('a', 'b', $s)".into());

        assert_eq!(fix.apply(&mut doc), FixOutcome::Applied);
        assert_eq!(doc.text(), "str_replace('a', 'b', $s)");
        assert_eq!(fix.apply(&mut doc), FixOutcome::TargetMissing);
        assert_eq!(doc.text(), "str_replace('a', 'b', $s)");
    }

    #[test]
    fn delete_removes_exact_range() {
        let (mut doc, key) = fixture("static function () {}", (0, 6));
        let fix = SuggestedFix::delete(key, "drop static");

        assert_eq!(fix.apply(&mut doc), FixOutcome::Applied);
        assert_eq!(doc.text(), " function () {}");
    }

    #[test]
    fn stale_target_is_a_silent_noop() {
        let (mut doc, key) = fixture("aaa bbb", (4, 7));

        // An unrelated edit swallows the target.
        assert!(doc.splice(key, "x"));
        let fix = SuggestedFix::delete(key, "too late");
        let before = doc.text().to_owned();
        assert_eq!(fix.apply(&mut doc), FixOutcome::TargetMissing);
        assert_eq!(doc.text(), before);
    }

    #[test]
    fn retired_document_refuses_edits() {
        let (mut doc, key) = fixture("aaa", (0, 3));
        doc.retire();

        let fix = SuggestedFix::delete(key, "never lands");
        assert_eq!(fix.apply(&mut doc), FixOutcome::DocumentRetired);
        assert_eq!(doc.text(), "aaa");
    }
}
