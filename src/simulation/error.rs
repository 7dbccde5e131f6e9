//! Failures of the simulation pipeline, and the JSON body each one turns into.

use serde::Serialize;
use thiserror::Error;

use crate::engine::{RecalcDiagnostics, ResolutionReport};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("{0}")]
    InvalidParameters(String),

    #[error("Workbook not found")]
    WorkbookNotFound { path: String },

    #[error("Workbook could not be opened")]
    WorkbookUnreadable { path: String, detail: String },

    #[error("No usable sheet in workbook")]
    SheetNotFound { sheet_names: Vec<String> },

    #[error("Formula engine is not available")]
    EngineUnavailable { meta: ResolutionReport },

    #[error("Recalculation failed: {}", .0.detail)]
    Recalculation(Box<RecalcDiagnostics>),

    #[error("{0}")]
    Unexpected(String),
}

impl SimulationError {
    /// Caller mistakes are 400; everything else is on our side of the wire.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SimulationError::InvalidParameters(_))
    }

    pub fn to_body(&self) -> ErrorBody {
        let mut body = ErrorBody::new(self.to_string());
        match self {
            SimulationError::InvalidParameters(_) | SimulationError::Unexpected(_) => {}
            SimulationError::WorkbookNotFound { path } => {
                body.path = Some(path.clone());
            }
            SimulationError::WorkbookUnreadable { path, detail } => {
                body.path = Some(path.clone());
                body.detail = Some(detail.clone());
            }
            SimulationError::SheetNotFound { sheet_names } => {
                body.sheet_names = Some(sheet_names.clone());
            }
            SimulationError::EngineUnavailable { meta } => {
                body.meta = Some(meta.clone());
            }
            SimulationError::Recalculation(diagnostics) => {
                body.sheet_name = Some(diagnostics.sheet_name.clone());
                body.detail = Some(diagnostics.detail.clone());
                body.debug_cells = Some(diagnostics.debug_cells.clone());
                body.defined_names = Some(diagnostics.defined_names.clone());
                body.created_refs = Some(diagnostics.created_refs.clone());
            }
        }
        body
    }
}

/// Error envelope: `error` always, the rest only when relevant
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_names: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResolutionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_cells: Option<Vec<crate::excel::DebugCell>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defined_names: Option<Vec<crate::excel::DefinedNameEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_refs: Option<Vec<crate::excel::CreatedRef>>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        ErrorBody {
            error: error.into(),
            path: None,
            sheet_name: None,
            sheet_names: None,
            meta: None,
            detail: None,
            debug_cells: None,
            defined_names: None,
            created_refs: None,
        }
    }
}
