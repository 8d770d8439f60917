pub mod dispatch;
pub mod document;
pub mod fix;
pub mod inspectors;
pub mod parser;
pub mod project;
pub mod resolve;
pub mod settings;

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use tree_sitter::{Node, Point};
use walkdir::WalkDir;

pub use document::{Document, NodeKey, PinTable};
pub use fix::{FixAction, FixOutcome, SuggestedFix};
pub use settings::{InspectionSettings, StrictnessCategory};

/// Severity attached to a reported finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Span {
    pub start: Point,
    pub end: Point,
}

/// A single finding: anchor span, message and an optional suggested fix.
///
/// Diagnostics are created once per match during a traversal pass and never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub rule: &'static str,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub snippet: Option<String>,
    pub fix: Option<SuggestedFix>,
}

impl Diagnostic {
    pub fn for_node(
        parsed: &parser::ParsedSource,
        rule: &'static str,
        severity: Severity,
        node: Node,
        message: impl Into<String>,
        fix: Option<SuggestedFix>,
    ) -> Self {
        let span = Span {
            start: node.start_position(),
            end: node.end_position(),
        };
        let snippet = parsed
            .source
            .lines()
            .nth(span.start.row)
            .map(ToOwned::to_owned);

        Self {
            file: parsed.path.clone(),
            rule,
            severity,
            message: message.into(),
            span,
            snippet,
            fix,
        }
    }

    pub fn to_json(&self) -> DiagnosticJson {
        DiagnosticJson {
            file: self.file.display().to_string(),
            rule: self.rule.to_string(),
            severity: self.severity.to_string(),
            line: self.span.start.row + 1,
            column: self.span.start.column + 1,
            message: self.message.clone(),
            fixable: self.fix.is_some(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const RESET: &str = "\x1b[0m";
        const BOLD_RED: &str = "\x1b[1;31m";
        const BOLD_YELLOW: &str = "\x1b[1;33m";
        const BLUE: &str = "\x1b[34m";

        let color = match self.severity {
            Severity::Error => BOLD_RED,
            _ => BOLD_YELLOW,
        };
        writeln!(f, "{}{}{}: {}", color, self.severity, RESET, self.message)?;
        writeln!(
            f,
            " --> {}:{}:{}",
            self.file.display(),
            self.span.start.row + 1,
            self.span.start.column + 1
        )?;

        if let Some(line) = &self.snippet {
            let caret_len = if self.span.start.row == self.span.end.row {
                self.span.end.column.saturating_sub(self.span.start.column)
            } else {
                line.len().saturating_sub(self.span.start.column)
            }
            .max(1);
            writeln!(f, "{BLUE}{:>4} |{RESET} {}", self.span.start.row + 1, line)?;
            writeln!(
                f,
                "{BLUE}     |{RESET} {}{}{}{}",
                " ".repeat(self.span.start.column),
                color,
                "^".repeat(caret_len),
                RESET
            )?;
        }

        if let Some(fix) = &self.fix {
            writeln!(f, "{BLUE}     ={RESET} help: {}", fix.title)?;
        }

        Ok(())
    }
}

#[derive(Serialize)]
pub struct DiagnosticJson {
    pub file: String,
    pub rule: String,
    pub severity: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub fixable: bool,
}

/// Outcome of inspecting a single file: the diagnostics plus the pin table
/// the suggested fixes point into.
pub struct FileReport {
    pub path: PathBuf,
    pub source: Arc<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub pins: PinTable,
}

impl FileReport {
    pub fn fixable_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.fix.is_some()).count()
    }

    /// Turns the report into an editable document plus the diagnostics whose
    /// fixes target it.
    pub fn into_document(self) -> (Document, Vec<Diagnostic>) {
        let text = Arc::try_unwrap(self.source).unwrap_or_else(|arc| (*arc).clone());
        let doc = Document::new(self.path, text, self.pins);
        (doc, self.diagnostics)
    }
}

/// Drives inspection passes over files.
///
/// The engine owns the parser and settings; dispatcher and inspector
/// instances are constructed fresh for every file so that a pass never
/// shares mutable state across worker threads.
pub struct Engine {
    parser: Box<dyn parser::PhpParser>,
    settings: InspectionSettings,
}

impl Engine {
    pub fn new(settings: Option<InspectionSettings>) -> Result<Self> {
        Ok(Self {
            parser: Box::new(parser::TreeSitterPhpParser::new()?),
            settings: settings.unwrap_or_default(),
        })
    }

    pub fn inspect_file(&mut self, path: &Path) -> Result<FileReport> {
        let parsed = self.parser.parse_file(path)?;
        Ok(self.inspect_parsed(vec![parsed], None).pop().expect("one report per file"))
    }

    /// Inspects already-materialized source text, e.g. after a fix pass.
    pub fn inspect_source(&mut self, path: &Path, source: &str) -> Result<FileReport> {
        let parsed = self.parser.parse_source(path, source)?;
        Ok(self.inspect_parsed(vec![parsed], None).pop().expect("one report per file"))
    }

    pub fn inspect_root(&mut self, root: &Path) -> Result<Vec<FileReport>> {
        let paths = collect_php_files(root)?;
        self.inspect_files(&paths, None)
    }

    pub fn inspect_files(
        &mut self,
        paths: &[PathBuf],
        progress: Option<&ProgressBar>,
    ) -> Result<Vec<FileReport>> {
        let mut parsed = Vec::with_capacity(paths.len());
        for path in paths {
            parsed.push(self.parser.parse_file(path)?);
        }
        Ok(self.inspect_parsed(parsed, progress))
    }

    fn inspect_parsed(
        &self,
        parsed: Vec<parser::ParsedSource>,
        progress: Option<&ProgressBar>,
    ) -> Vec<FileReport> {
        let classes = project::ClassIndex::build(&parsed);
        let settings = &self.settings;

        parsed
            .into_par_iter()
            .map(|source| {
                let dispatcher = dispatch::Dispatcher::new(inspectors::registry());
                let (diagnostics, pins) = dispatcher.run(settings, &source, &classes);
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                FileReport {
                    path: source.path.clone(),
                    source: source.source,
                    diagnostics,
                    pins,
                }
            })
            .collect()
    }
}

pub fn collect_php_files(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(if is_php_file(root) {
            vec![root.to_path_buf()]
        } else {
            vec![]
        });
    }

    let mut php_files = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if entry.file_type().is_file() && is_php_file(path) {
            php_files.push(path.to_path_buf());
        }
    }
    php_files.sort();

    Ok(php_files)
}

pub fn collect_php_files_from_roots(roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for root in roots {
        files.extend(collect_php_files(root)?);
    }
    files.sort();
    files.dedup();
    Ok(files)
}

pub fn is_php_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("php"))
}
