use serde::Serialize;
use std::collections::HashSet;
use umya_spreadsheet::Spreadsheet;

use super::error::RecalcError;
use crate::excel::{
    defined_names, extract_references, snapshot_cell, CreatedRef, DebugCell, DefinedNameEntry,
};

/// Everything we know about a failed recalculation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalcDiagnostics {
    pub sheet_name: String,
    pub detail: String,
    pub debug_cells: Vec<DebugCell>,
    pub defined_names: Vec<DefinedNameEntry>,
    pub created_refs: Vec<CreatedRef>,
}

/// Cell addresses mentioned in an error message, deduplicated, in order of first mention.
///
/// Range endpoints count as two cells. Sheet prefixes are dropped since the
/// lookup happens on the active sheet.
pub fn cell_tokens(message: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();

    for reference in extract_references(message) {
        let cells = std::iter::once(reference.start).chain(reference.end);
        for cell in cells {
            let address = cell.to_string();
            if seen.insert(address.clone()) {
                tokens.push(address);
            }
        }
    }

    tokens
}

/// Build the diagnostic bundle for a failed recalculation on `sheet_name`.
pub fn collect_diagnostics(
    book: &Spreadsheet,
    sheet_name: &str,
    error: &RecalcError,
    created_refs: Vec<CreatedRef>,
) -> RecalcDiagnostics {
    let detail = error.to_string();

    let debug_cells = match book.get_sheet_by_name(sheet_name) {
        Some(sheet) => cell_tokens(&error.engine_message())
            .iter()
            .map(|address| snapshot_cell(sheet, address))
            .collect(),
        None => Vec::new(),
    };

    RecalcDiagnostics {
        sheet_name: sheet_name.to_string(),
        detail,
        debug_cells,
        defined_names: defined_names(book),
        created_refs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umya_spreadsheet::new_file;

    #[test]
    fn test_tokens_are_deduplicated_in_order() {
        let tokens = cell_tokens("Cannot read 'W57' (W57 from B2:B4), also $C$1");
        assert_eq!(tokens, vec!["W57", "B2", "B4", "C1"]);
    }

    #[test]
    fn test_bundle_describes_mentioned_cells() {
        let mut book = new_file();
        book.get_sheet_mut(&0)
            .unwrap()
            .get_cell_mut("W57")
            .set_value_number(9);

        let error = RecalcError::Failed {
            program: "soffice".to_string(),
            status: "exit status: 1".to_string(),
            output: "undefined value at W57 and X1".to_string(),
        };
        let bundle = collect_diagnostics(&book, "Sheet1", &error, Vec::new());

        assert_eq!(bundle.sheet_name, "Sheet1");
        assert!(bundle.detail.contains("W57"));
        assert_eq!(bundle.debug_cells.len(), 2);

        let w57 = &bundle.debug_cells[0];
        assert_eq!(w57.cell, "W57");
        assert!(w57.exists);
        assert_eq!(w57.value.as_deref(), Some("9"));
        assert_eq!(w57.data_type.as_deref(), Some("n"));

        let x1 = &bundle.debug_cells[1];
        assert_eq!(x1.cell, "X1");
        assert!(!x1.exists);
    }

    #[test]
    fn test_program_path_is_not_treated_as_a_cell() {
        let book = new_file();
        let error = RecalcError::Failed {
            program: "/opt/LO7/program/soffice".to_string(),
            status: "exit status: 1".to_string(),
            output: "Err:502 in B9".to_string(),
        };
        let bundle = collect_diagnostics(&book, "Sheet1", &error, Vec::new());

        assert!(bundle.detail.contains("/opt/LO7/program/soffice"));
        let cells: Vec<&str> = bundle.debug_cells.iter().map(|c| c.cell.as_str()).collect();
        assert_eq!(cells, vec!["B9"]);
    }
}
