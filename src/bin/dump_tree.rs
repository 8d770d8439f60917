//! Prints the tree-sitter parse tree for a PHP file, for working out which
//! node kinds and fields an inspector should look at.

use std::path::Path;

use anyhow::{Context, Result};

use php_inspect::inspect::parser::{PhpParser, TreeSitterPhpParser};

fn print_node(node: tree_sitter::Node, source: &str, indent: usize) {
    let text = node.utf8_text(source.as_bytes()).unwrap_or("<invalid utf8>");
    println!(
        "{:indent$}{} [{:?}:{:?}] {:?}",
        "",
        node.kind(),
        node.start_position(),
        node.end_position(),
        text.trim(),
        indent = indent * 2
    );

    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            print_node(cursor.node(), source, indent + 1);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
}

fn main() -> Result<()> {
    let path = std::env::args().nth(1).context("path argument missing")?;
    let mut parser = TreeSitterPhpParser::new()?;
    let parsed = parser.parse_file(Path::new(&path))?;

    print_node(parsed.tree.root_node(), &parsed.source, 0);
    Ok(())
}
