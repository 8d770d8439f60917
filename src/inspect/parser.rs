use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use tree_sitter::Parser;

/// Parsed contents of a source file. The tree is an immutable snapshot;
/// inspection code only reads structure from it.
pub struct ParsedSource {
    pub path: PathBuf,
    pub source: Arc<String>,
    pub tree: tree_sitter::Tree,
}

/// Abstracts the PHP parsing backend.
pub trait PhpParser {
    fn parse_file(&mut self, path: &Path) -> Result<ParsedSource>;
    fn parse_source(&mut self, path: &Path, source: &str) -> Result<ParsedSource>;
}

/// tree-sitter-php backed parser.
pub struct TreeSitterPhpParser {
    parser: Parser,
}

impl TreeSitterPhpParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(tree_sitter_php::language())
            .context("failed to load tree-sitter-php language")?;

        Ok(Self { parser })
    }
}

impl PhpParser for TreeSitterPhpParser {
    fn parse_file(&mut self, path: &Path) -> Result<ParsedSource> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        self.parse_source(path, &source)
    }

    fn parse_source(&mut self, path: &Path, source: &str) -> Result<ParsedSource> {
        let source = Arc::new(source.to_owned());
        let tree = self
            .parser
            .parse(source.as_str(), None)
            .context("tree-sitter failed to parse PHP source")?;

        Ok(ParsedSource {
            path: path.to_path_buf(),
            source,
            tree,
        })
    }
}
