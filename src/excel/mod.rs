//! Excel module for loading, editing, hardening, and saving the simulation workbook.
//!
//! This module provides:
//! - Loading workbooks and picking the active sheet
//! - Typed numeric cell reads and writes
//! - Formula reference hardening before recalculation
//! - Saving with checksum guard and optional backup

pub mod types;
pub mod reader;
pub mod references;
pub mod writer;

// Re-export commonly used types and functions
pub use types::*;
pub use reader::{
    active_sheet_name, compute_checksum, defined_names, load_workbook, read_number, sheet_names,
    snapshot_cell,
};
pub use references::{ensure_referenced_cells_exist, extract_references, CellAddr, CellReference};
pub use writer::{create_backup, ensure_unchanged, save_workbook, write_number};
