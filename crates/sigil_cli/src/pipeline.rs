//! Shared helpers for CLI commands.
//!
//! Project root resolution, tracing setup, per-library strategy resolution
//! and diagnostic rendering.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sigil_archive::Archive;
use sigil_config::{LibraryConfig, StrategyName, CONFIG_FILE_NAME};
use sigil_diagnostics::{Diagnostic, DiagnosticRenderer, JsonRenderer, TerminalRenderer};
use sigil_link::{DeserializationStrategy, StrategyResolver};
use tracing::Level;

use crate::ReportFormat;

/// Walks up from `start` looking for the nearest directory containing `sigil.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE_NAME).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE_NAME} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project root from `--config`.
///
/// A file path yields its parent directory, a directory yields itself, and
/// no path walks up from the current directory.
pub fn resolve_project_root(config: Option<&str>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match config {
        Some(path) => {
            let p = PathBuf::from(path);
            if p.is_file() {
                Ok(p.parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")))
            } else {
                Ok(p)
            }
        }
        None => find_project_root(&std::env::current_dir()?),
    }
}

/// Log level for the given flags.
pub fn level_for(quiet: bool, verbose: u8) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs the stderr fmt subscriber.
pub fn init_tracing(quiet: bool, verbose: u8) {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level_for(quiet, verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: a tracing subscriber is already installed");
    }
}

/// Reads an archive, naming the path on failure.
pub fn read_archive(path: &Path) -> Result<Archive, Box<dyn std::error::Error>> {
    Archive::read_from(path).map_err(|e| format!("{}: {e}", path.display()).into())
}

/// Strategy resolver for one configured library: per-file overrides, then
/// the library's strategy, then the project default.
pub fn library_resolver(
    library: &LibraryConfig,
    archive: &Archive,
    default: StrategyName,
) -> StrategyResolver {
    let per_file: HashMap<String, DeserializationStrategy> = archive
        .files
        .iter()
        .map(|f| (f.name.clone(), library.strategy_for(&f.name, default).into()))
        .collect();
    let fallback: DeserializationStrategy = library.strategy.unwrap_or(default).into();
    Box::new(move |file| per_file.get(file).copied().unwrap_or(fallback))
}

/// Prints diagnostics to stderr (terminal) or stdout (JSON).
pub fn render_diagnostics(diagnostics: &[Diagnostic], format: ReportFormat, color: bool) {
    match format {
        ReportFormat::Terminal => {
            let renderer = TerminalRenderer::new(color);
            for diag in diagnostics {
                eprint!("{}", renderer.render(diag));
            }
        }
        ReportFormat::Json => {
            for diag in diagnostics {
                print!("{}", JsonRenderer.render(diag));
            }
        }
    }
}
