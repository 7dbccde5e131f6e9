//! Formula recalculation.
//!
//! The service never evaluates formulas itself. An external engine is located once
//! at startup and bound behind [`Recalculator`]; the rest of the code only sees that
//! trait.

pub mod diagnostics;
pub mod error;
pub mod libreoffice;

use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use umya_spreadsheet::Spreadsheet;

pub use diagnostics::{collect_diagnostics, RecalcDiagnostics};
pub use error::RecalcError;
pub use libreoffice::LibreOfficeRecalculator;

/// Something that can recompute every formula of a workbook in place
pub trait Recalculator: Send + Sync {
    /// Short label used in logs
    fn name(&self) -> &str;

    /// Recalculate `book`. On success the cached values of formula cells are current.
    fn recalculate(&self, book: &mut Spreadsheet) -> Result<(), RecalcError>;
}

/// Configuration for locating and running the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path to the `soffice` executable. If None, searches PATH.
    pub soffice_path: Option<PathBuf>,
    /// How long a single recalculation may take before the process is killed
    pub timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            soffice_path: None,
            timeout: Duration::from_secs(60),
        }
    }
}

/// One attempt made while resolving the engine
#[derive(Debug, Clone, Serialize)]
pub struct CandidateReport {
    pub shape: &'static str,
    pub target: String,
    pub outcome: String,
}

/// Why no engine could be bound. Returned to callers as `meta`.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    pub candidates: Vec<CandidateReport>,
}

/// The engine bound at startup, or the report explaining why there is none
#[derive(Clone)]
pub enum EngineSlot {
    Ready(Arc<dyn Recalculator>),
    Unavailable(ResolutionReport),
}

impl EngineSlot {
    pub fn resolve(config: &EngineConfig) -> Self {
        match resolve(config) {
            Ok(engine) => EngineSlot::Ready(engine),
            Err(report) => EngineSlot::Unavailable(report),
        }
    }
}

const PATH_CANDIDATES: [(&str, &str); 2] = [
    ("soffice-on-path", "soffice"),
    ("libreoffice-on-path", "libreoffice"),
];

/// Locate the recalculation engine.
///
/// Tried in order: the configured executable, `soffice` on PATH, `libreoffice` on PATH.
pub fn resolve(config: &EngineConfig) -> Result<Arc<dyn Recalculator>, ResolutionReport> {
    resolve_with_search_path(config, std::env::var_os("PATH"))
}

fn resolve_with_search_path(
    config: &EngineConfig,
    search_path: Option<OsString>,
) -> Result<Arc<dyn Recalculator>, ResolutionReport> {
    let mut candidates = Vec::new();

    match &config.soffice_path {
        Some(path) if path.is_file() => {
            return Ok(bind(path.clone(), config));
        }
        Some(path) => candidates.push(CandidateReport {
            shape: "configured",
            target: path.display().to_string(),
            outcome: "not a file".to_string(),
        }),
        None => candidates.push(CandidateReport {
            shape: "configured",
            target: String::new(),
            outcome: "not configured".to_string(),
        }),
    }

    for (shape, program) in PATH_CANDIDATES {
        match find_on_path(program, search_path.as_deref()) {
            Some(found) => return Ok(bind(found, config)),
            None => candidates.push(CandidateReport {
                shape,
                target: program.to_string(),
                outcome: "not found on PATH".to_string(),
            }),
        }
    }

    tracing::warn!(?candidates, "no recalculation engine found");
    Err(ResolutionReport { candidates })
}

fn bind(program: PathBuf, config: &EngineConfig) -> Arc<dyn Recalculator> {
    tracing::info!(program = %program.display(), "bound recalculation engine");
    Arc::new(LibreOfficeRecalculator::new(program, config.timeout))
}

fn find_on_path(program: &str, search_path: Option<&std::ffi::OsStr>) -> Option<PathBuf> {
    let search_path = search_path?;
    std::env::split_paths(search_path)
        .map(|dir| dir.join(program))
        .find(|candidate| is_program(candidate))
}

fn is_program(path: &Path) -> bool {
    path.is_file() || (cfg!(windows) && path.with_extension("exe").is_file())
}
