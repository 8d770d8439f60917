use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::to_writer_pretty;

use php_inspect::inspect::{
    self, Diagnostic, Engine, FileReport, FixOutcome, InspectionSettings, Severity,
};

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
}

/// Entry point for the PHP inspection CLI.
#[derive(Parser)]
#[command(author, version, about = "Inspection pass over PHP sources with suggested fixes.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect a PHP file, directory or glob pattern.
    Analyse {
        /// Path to a PHP file or directory containing PHP files.
        path: PathBuf,
        /// Apply available fixes when diagnostics are emitted.
        #[arg(long)]
        fix: bool,
        /// Preview the fix output without modifying files.
        #[arg(long, requires = "fix")]
        dry_run: bool,
        /// Choose the CLI output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

struct AnalysisTargets {
    canonical_targets: Vec<PathBuf>,
    analysis_root: PathBuf,
    settings: Option<InspectionSettings>,
}

impl AnalysisTargets {
    fn new(path: &Path, config_path: Option<PathBuf>) -> Result<Self> {
        let requested_targets = resolve_targets(path)?;
        let canonical_targets = canonicalize_paths(requested_targets)?;
        let analysis_root = derive_analysis_root(&canonical_targets);

        let config_file = InspectionSettings::find_config(config_path, &analysis_root);
        let settings = if let Some(path) = config_file {
            Some(InspectionSettings::load(path)?)
        } else {
            None
        };

        Ok(Self {
            canonical_targets,
            analysis_root,
            settings,
        })
    }

    fn analysis_root(&self) -> &Path {
        &self.analysis_root
    }

    fn collect_php_files(&self) -> Result<Vec<PathBuf>> {
        inspect::collect_php_files_from_roots(&self.canonical_targets)
    }
}

fn main() -> Result<()> {
    let Cli { command, config } = Cli::parse();

    match command {
        Commands::Analyse {
            path,
            fix,
            dry_run,
            format,
        } => run_analysis(path, config, fix, dry_run, format),
    }
}

fn run_analysis(
    path: PathBuf,
    config_path: Option<PathBuf>,
    fix: bool,
    dry_run: bool,
    output_format: OutputFormat,
) -> Result<()> {
    let targets = AnalysisTargets::new(&path, config_path)?;
    let php_files = targets.collect_php_files()?;
    let php_file_count = php_files.len();

    if php_file_count == 0 {
        println!(
            "No PHP files found under {}",
            targets.analysis_root().display()
        );
        return Ok(());
    }

    if matches!(output_format, OutputFormat::Text) {
        println!("Inspecting {} file(s)...", php_file_count);
    }

    let mut engine = Engine::new(targets.settings.clone())?;
    let show_progress = matches!(output_format, OutputFormat::Text);
    let (reports, duration) = collect_reports(&mut engine, &php_files, show_progress)?;

    let diagnostics: Vec<Diagnostic> = reports
        .iter()
        .flat_map(|report| report.diagnostics.iter().cloned())
        .collect();
    let fixable_count = reports.iter().map(FileReport::fixable_count).sum::<usize>();

    emit_output(
        &diagnostics,
        output_format,
        php_file_count,
        duration,
        fixable_count,
    )?;

    if fix {
        apply_fixes(reports, dry_run)?;
    }

    Ok(())
}

fn collect_reports(
    engine: &mut Engine,
    paths: &[PathBuf],
    show_progress: bool,
) -> Result<(Vec<FileReport>, Duration)> {
    let progress = if show_progress {
        let pb = ProgressBar::new(paths.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
                .expect("valid progress bar template")
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let reports = engine.inspect_files(paths, progress.as_ref())?;
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    Ok((reports, start.elapsed()))
}

fn emit_output(
    diagnostics: &[Diagnostic],
    output_format: OutputFormat,
    file_count: usize,
    duration: Duration,
    fixable_count: usize,
) -> Result<()> {
    let count_of = |severity: Severity| {
        diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    };
    let error_count = count_of(Severity::Error);
    let warning_count = count_of(Severity::Warning);
    let info_count = count_of(Severity::Info);

    match output_format {
        OutputFormat::Text => {
            for diag in diagnostics {
                println!("{diag}");
            }

            println!(
                "Stats ▸ {} file(s) | {} error(s), {} warning(s), {} note(s) | {:.2}s ({} potentially fixable with --fix)",
                file_count,
                error_count,
                warning_count,
                info_count,
                duration.as_secs_f64(),
                fixable_count
            );
        }
        OutputFormat::Json => {
            let stats = JsonStats {
                files: file_count,
                errors: error_count,
                warnings: warning_count,
                infos: info_count,
                fixable: fixable_count,
                duration_seconds: duration.as_secs_f64(),
            };
            let output = JsonOutput {
                diagnostics: diagnostics.iter().map(|diag| diag.to_json()).collect(),
                stats,
            };

            let stdout = io::stdout();
            let mut handle = stdout.lock();
            to_writer_pretty(&mut handle, &output)?;
            handle.write_all(b"\n")?;
        }
    }

    Ok(())
}

/// Applies every suggested fix file by file. Each file's fixes land on one
/// document, so a fix whose target was swallowed by an earlier edit drops
/// out on its own.
fn apply_fixes(reports: Vec<FileReport>, dry_run: bool) -> Result<()> {
    let mut any_applied = false;

    for report in reports {
        if report.fixable_count() == 0 {
            continue;
        }

        let (mut doc, diagnostics) = report.into_document();
        let mut applied = 0usize;
        for diagnostic in &diagnostics {
            if let Some(fix) = &diagnostic.fix {
                if fix.apply(&mut doc) == FixOutcome::Applied {
                    applied += 1;
                }
            }
        }
        if applied == 0 {
            continue;
        }
        any_applied = true;

        if dry_run {
            println!("--- {} ---", doc.path().display());
            print!("{}", doc.text());
            if !doc.text().ends_with('\n') {
                println!();
            }
        } else {
            fs::write(doc.path(), doc.text())
                .with_context(|| format!("failed to write {}", doc.path().display()))?;
            println!("Fixed {} issue(s) in {}", applied, doc.path().display());
        }
    }

    if !any_applied {
        println!("No fixable diagnostics were detected.");
    }

    Ok(())
}

fn resolve_targets(path: &Path) -> Result<Vec<PathBuf>> {
    if path_contains_glob(path) {
        let pattern = path.as_os_str().to_string_lossy().into_owned();
        let matches = glob(&pattern)
            .with_context(|| format!("invalid glob pattern \"{pattern}\""))?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("failed to read entries for pattern \"{pattern}\""))?;

        if matches.is_empty() {
            bail!("no files matched \"{pattern}\"");
        }

        Ok(matches)
    } else {
        Ok(vec![path.to_path_buf()])
    }
}

fn canonicalize_paths(paths: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    let mut canonical_paths = Vec::new();
    for path in paths {
        let canonical_path = path
            .canonicalize()
            .with_context(|| format!("failed to access {}", path.display()))?;
        canonical_paths.push(canonical_path);
    }
    canonical_paths.sort();
    canonical_paths.dedup();
    Ok(canonical_paths)
}

fn derive_analysis_root(targets: &[PathBuf]) -> PathBuf {
    let directories: Vec<PathBuf> = targets
        .iter()
        .map(|target| {
            if target.is_file() {
                target
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| target.clone())
            } else {
                target.clone()
            }
        })
        .collect();

    longest_common_directory(&directories).unwrap_or_else(|| directories[0].clone())
}

fn longest_common_directory(paths: &[PathBuf]) -> Option<PathBuf> {
    if paths.is_empty() {
        return None;
    }

    let mut common = ancestors_from_root(&paths[0]);
    for path in paths.iter().skip(1) {
        let next = ancestors_from_root(path);
        let mut idx = 0;
        while idx < common.len() && idx < next.len() && common[idx] == next[idx] {
            idx += 1;
        }
        common.truncate(idx);
        if common.is_empty() {
            break;
        }
    }

    common.last().cloned()
}

fn ancestors_from_root(path: &Path) -> Vec<PathBuf> {
    let mut ancestors: Vec<PathBuf> = path.ancestors().map(PathBuf::from).collect();
    ancestors.reverse();
    ancestors
}

fn path_contains_glob(path: &Path) -> bool {
    path.as_os_str()
        .to_string_lossy()
        .chars()
        .any(|c| matches!(c, '*' | '?' | '[' | ']' | '{' | '}'))
}

#[derive(Serialize)]
struct JsonStats {
    files: usize,
    errors: usize,
    warnings: usize,
    infos: usize,
    fixable: usize,
    duration_seconds: f64,
}

#[derive(Serialize)]
struct JsonOutput {
    diagnostics: Vec<php_inspect::inspect::DiagnosticJson>,
    stats: JsonStats,
}
