//! Helpers for colocated inspector tests: parse a snippet, run a single
//! inspector over it, assert on messages or on the fixed output.

use std::path::PathBuf;
use std::sync::Arc;

use tree_sitter::Node;

use crate::inspect::dispatch::Dispatcher;
use crate::inspect::document::Document;
use crate::inspect::parser::ParsedSource;
use crate::inspect::project::ClassIndex;
use crate::inspect::resolve::walk_node;
use crate::inspect::settings::InspectionSettings;
use crate::inspect::Diagnostic;

use super::Inspector;

pub fn parse_php(source: &str) -> ParsedSource {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(tree_sitter_php::language())
        .expect("failed to load tree-sitter-php language");
    let tree = parser.parse(source, None).expect("failed to parse PHP source");

    ParsedSource {
        path: PathBuf::from("test.php"),
        source: Arc::new(source.to_owned()),
        tree,
    }
}

pub fn find_first<'a>(parsed: &'a ParsedSource, kind: &str) -> Option<Node<'a>> {
    let mut found = None;
    walk_node(parsed.tree.root_node(), &mut |node| {
        if found.is_none() && node.kind() == kind {
            found = Some(node);
        }
    });
    found
}

/// Runs one inspector over `source` with default settings, returning the
/// diagnostics and the document their fixes target.
pub fn check_source(
    inspector: Box<dyn Inspector>,
    source: &str,
) -> (Vec<Diagnostic>, Document) {
    let parsed = parse_php(source);
    let classes = ClassIndex::build(std::slice::from_ref(&parsed));
    let dispatcher = Dispatcher::new(vec![inspector]);
    let (diagnostics, pins) = dispatcher.run(&InspectionSettings::default(), &parsed, &classes);
    let doc = Document::new(parsed.path.clone(), source, pins);
    (diagnostics, doc)
}

/// Applies every suggested fix in diagnostic order and returns the patched
/// text.
pub fn apply_fixes(diagnostics: &[Diagnostic], doc: &mut Document) -> String {
    for diagnostic in diagnostics {
        if let Some(fix) = &diagnostic.fix {
            fix.apply(doc);
        }
    }
    doc.text().to_owned()
}

pub fn assert_messages(diagnostics: &[Diagnostic], expected: &[&str]) {
    assert_eq!(
        diagnostics.len(),
        expected.len(),
        "expected {} diagnostics, got {}: {:?}",
        expected.len(),
        diagnostics.len(),
        diagnostics.iter().map(|d| &d.message).collect::<Vec<_>>()
    );

    for (diagnostic, fragment) in diagnostics.iter().zip(expected) {
        assert!(
            diagnostic.message.contains(fragment),
            "expected message containing {fragment:?}, got {:?}",
            diagnostic.message
        );
    }
}

pub fn assert_no_diagnostics(diagnostics: &[Diagnostic]) {
    assert!(
        diagnostics.is_empty(),
        "expected no diagnostics, got: {:?}",
        diagnostics.iter().map(|d| &d.message).collect::<Vec<_>>()
    );
}
