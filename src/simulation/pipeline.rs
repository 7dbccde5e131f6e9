//! Request pipeline: locate → load → select sheet → generate → write → harden →
//! recalculate → extract → persist.
//!
//! Runs synchronously; callers move it onto a blocking thread and make sure only
//! one pipeline touches the workbook file at a time.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

use super::error::SimulationError;
use super::layout::{read_outputs, write_inputs};
use super::movements::{generate, generate_with_rng, MovementPlan};
use super::types::{SimulationRequest, SimulationResult};
use crate::engine::{collect_diagnostics, EngineSlot};
use crate::excel::{
    self, active_sheet_name, ensure_referenced_cells_exist, ExcelErrorType,
};

/// What happens to the workbook file after a successful recalculation
#[derive(Debug, Clone, Default)]
pub struct PersistOptions {
    /// Skip writing the workbook back
    pub disabled: bool,
    /// Copy the file aside before overwriting it
    pub backup: bool,
}

pub struct Simulator {
    workbook_path: PathBuf,
    preferred_sheet: String,
    engine: EngineSlot,
    seed: Option<u64>,
    persist: PersistOptions,
}

impl Simulator {
    pub fn new(workbook_path: PathBuf, preferred_sheet: impl Into<String>, engine: EngineSlot) -> Self {
        Self {
            workbook_path,
            preferred_sheet: preferred_sheet.into(),
            engine,
            seed: None,
            persist: PersistOptions::default(),
        }
    }

    /// Draw every request's movements from a fresh generator seeded with `seed`
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_persist(mut self, persist: PersistOptions) -> Self {
        self.persist = persist;
        self
    }

    pub fn workbook_path(&self) -> &Path {
        &self.workbook_path
    }

    fn plan_movements(&self, request: &SimulationRequest) -> MovementPlan {
        match self.seed {
            Some(seed) => generate_with_rng(
                request.pallet_count,
                request.months,
                &mut StdRng::seed_from_u64(seed),
            ),
            None => generate(request.pallet_count, request.months),
        }
    }

    /// Run one simulation against the workbook on disk.
    pub fn run(&self, request: &SimulationRequest) -> Result<SimulationResult, SimulationError> {
        let path = &self.workbook_path;
        let path_display = path.display().to_string();

        if !path.exists() {
            return Err(SimulationError::WorkbookNotFound { path: path_display });
        }

        let loaded_checksum = match excel::compute_checksum(path) {
            Ok(checksum) => Some(checksum),
            Err(e) => {
                tracing::warn!(error = %e, "could not checksum workbook");
                None
            }
        };

        let mut book = excel::load_workbook(path).map_err(|e| match e.error_type {
            ExcelErrorType::FileNotFound => SimulationError::WorkbookNotFound {
                path: path_display.clone(),
            },
            _ => SimulationError::WorkbookUnreadable {
                path: path_display.clone(),
                detail: e.message,
            },
        })?;

        let sheet_name = active_sheet_name(&book, &self.preferred_sheet).ok_or_else(|| {
            SimulationError::SheetNotFound {
                sheet_names: excel::sheet_names(&book),
            }
        })?;
        if sheet_name != self.preferred_sheet {
            tracing::info!(
                preferred = %self.preferred_sheet,
                using = %sheet_name,
                "preferred sheet missing, using first sheet"
            );
        }

        let plan = self.plan_movements(request);
        tracing::debug!(inbound = ?plan.inbound, outbound = ?plan.outbound, "generated movements");

        {
            let sheet = book.get_sheet_by_name_mut(&sheet_name).ok_or_else(|| {
                SimulationError::Unexpected(format!("Sheet '{}' vanished while writing", sheet_name))
            })?;
            write_inputs(sheet, request, &plan);
        }

        let created_refs = ensure_referenced_cells_exist(&mut book);

        let engine = match &self.engine {
            EngineSlot::Ready(engine) => engine,
            EngineSlot::Unavailable(report) => {
                return Err(SimulationError::EngineUnavailable {
                    meta: report.clone(),
                })
            }
        };

        if let Err(error) = engine.recalculate(&mut book) {
            tracing::error!(engine = engine.name(), error = %error, "recalculation failed");
            let diagnostics = collect_diagnostics(&book, &sheet_name, &error, created_refs);
            return Err(SimulationError::Recalculation(Box::new(diagnostics)));
        }

        let result = {
            let sheet = book.get_sheet_by_name(&sheet_name).ok_or_else(|| {
                SimulationError::Unexpected(format!(
                    "Sheet '{}' missing after recalculation",
                    sheet_name
                ))
            })?;
            read_outputs(sheet, &plan)
        };
        tracing::debug!(
            workbook_stock = ?result.monthly_table.iter().map(|row| row.stock).collect::<Vec<_>>(),
            planned_stock = ?plan.stock_after(),
            "extracted outputs"
        );

        self.persist_best_effort(&book, loaded_checksum.as_deref());

        Ok(result)
    }

    /// Write the recalculated workbook back. Failures are logged, never returned:
    /// the response is already computed from the in-memory copy.
    fn persist_best_effort(&self, book: &umya_spreadsheet::Spreadsheet, loaded_checksum: Option<&str>) {
        if self.persist.disabled {
            return;
        }
        let path = &self.workbook_path;

        if let Some(expected) = loaded_checksum {
            if let Err(e) = excel::ensure_unchanged(path, expected) {
                tracing::warn!(error = %e, "workbook changed on disk during simulation, overwriting");
            }
        }

        if self.persist.backup {
            match excel::create_backup(path) {
                Ok(backup) => tracing::info!(%backup, "workbook backed up"),
                Err(e) => tracing::warn!(error = %e, "workbook backup failed"),
            }
        }

        match excel::save_workbook(book, path) {
            Ok(checksum) => tracing::debug!(%checksum, "workbook persisted"),
            Err(e) => tracing::warn!(error = %e, "could not persist workbook, response unaffected"),
        }
    }
}
