//! Error types for the recalculation engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecalcError {
    #[error("Failed to stage workbook for recalculation: {0}")]
    Stage(String),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {output}")]
    Failed {
        program: String,
        status: String,
        output: String,
    },

    #[error("Recalculation did not finish within {0} seconds")]
    Timeout(u64),

    #[error("Recalculated workbook was not produced at {path}. Engine output: {output}")]
    MissingOutput { path: String, output: String },

    #[error("Failed to reload recalculated workbook: {0}")]
    Reload(String),
}

impl RecalcError {
    /// What the engine itself reported, without our program or scratch paths.
    ///
    /// Install paths such as `/opt/LO7/program/soffice` look like cell references,
    /// so only this part is searched for cells to describe.
    pub fn engine_message(&self) -> String {
        match self {
            RecalcError::Stage(message) | RecalcError::Reload(message) => message.clone(),
            RecalcError::Spawn { source, .. } => source.to_string(),
            RecalcError::Failed { output, .. } | RecalcError::MissingOutput { output, .. } => {
                output.clone()
            }
            RecalcError::Timeout(_) => self.to_string(),
        }
    }
}
