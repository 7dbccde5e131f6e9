//! Formula reference hardening.
//!
//! The recalculation engine treats a lookup of a cell that was never written
//! as an error in some templates, so before recalculating we walk every formula,
//! pull out the `[Sheet!]A1[:B2]` references it mentions, and materialize any
//! referenced cell that is missing as a numeric zero.
//!
//! This is pattern matching, not a formula parser. Known gaps:
//! - interior cells of multi-column ranges are not created, only the corners;
//! - references into sheets that do not exist cannot be repaired and are only logged;
//! - references inside string literals are treated like any other reference.

use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;
use umya_spreadsheet::Spreadsheet;

use super::reader::{column_index_to_letter, column_letter_to_index};
use super::types::{CreatedRef, RefNote};

/// Largest same-column range that gets filled cell by cell
pub const MAX_COLUMN_FILL: u32 = 5000;

const MAX_COLUMN: u32 = 16_384;
const MAX_ROW: u32 = 1_048_576;

/// A single cell position (1-based column and row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddr {
    pub col: u32,
    pub row: u32,
}

impl CellAddr {
    pub fn new(col: u32, row: u32) -> Self {
        CellAddr { col, row }
    }

    fn parse_parts(letters: &str, digits: &str) -> Option<CellAddr> {
        let col = column_letter_to_index(letters)?;
        let row = digits.parse::<u32>().ok()?;
        if col == 0 || col > MAX_COLUMN || row == 0 || row > MAX_ROW {
            return None;
        }
        Some(CellAddr { col, row })
    }
}

impl fmt::Display for CellAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_index_to_letter(self.col), self.row)
    }
}

/// A reference found in formula text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellReference {
    /// Explicit sheet prefix, unquoted
    pub sheet: Option<String>,
    pub start: CellAddr,
    pub end: Option<CellAddr>,
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?:(?:'(?<quoted>(?:[^']|'')+)'|(?<bare>[A-Za-z_][A-Za-z0-9_.]*))!)?\$?(?<c1>[A-Z]{1,3})\$?(?<r1>[0-9]+)(?::\$?(?<c2>[A-Z]{1,3})\$?(?<r2>[0-9]+))?",
        )
        .expect("reference pattern is valid")
    })
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

/// Extract every cell/range reference mentioned in a formula.
pub fn extract_references(formula: &str) -> Vec<CellReference> {
    let bytes = formula.as_bytes();
    let mut refs = Vec::new();

    for caps in reference_pattern().captures_iter(formula) {
        let whole = caps.get(0).expect("group 0 always matches");

        // Part of a longer identifier or a function name such as LOG10(
        if whole.start() > 0 && is_identifier_byte(bytes[whole.start() - 1]) {
            continue;
        }
        if let Some(&next) = bytes.get(whole.end()) {
            if is_identifier_byte(next) || next == b'(' {
                continue;
            }
        }

        let Some(start) = CellAddr::parse_parts(&caps["c1"], &caps["r1"]) else {
            continue;
        };
        let end = match (caps.name("c2"), caps.name("r2")) {
            (Some(c2), Some(r2)) => match CellAddr::parse_parts(c2.as_str(), r2.as_str()) {
                Some(addr) => Some(addr),
                None => continue,
            },
            _ => None,
        };

        let sheet = caps
            .name("quoted")
            .map(|m| m.as_str().replace("''", "'"))
            .or_else(|| caps.name("bare").map(|m| m.as_str().to_string()));

        refs.push(CellReference { sheet, start, end });
    }

    refs
}

/// Make sure every cell referenced by a formula exists before recalculation.
///
/// Returns the creation log. Running it again on the same workbook yields an empty
/// log unless some references point into missing sheets.
pub fn ensure_referenced_cells_exist(book: &mut Spreadsheet) -> Vec<CreatedRef> {
    // Collect first: cells are created while iterating sheets by name below.
    let mut pending: Vec<(String, CellReference)> = Vec::new();
    for sheet in book.get_sheet_collection() {
        for cell in sheet.get_cell_collection() {
            let formula = cell.get_formula();
            if formula.is_empty() {
                continue;
            }
            for reference in extract_references(formula) {
                pending.push((sheet.get_name().to_string(), reference));
            }
        }
    }

    let mut log = Vec::new();
    let mut missing_sheets_seen: HashSet<String> = HashSet::new();

    for (own_sheet, reference) in pending {
        let target = reference.sheet.clone().unwrap_or(own_sheet);

        let Some(sheet) = book.get_sheet_by_name_mut(&target) else {
            if missing_sheets_seen.insert(format!("{}!{}", target, reference.start)) {
                tracing::debug!(sheet = %target, cell = %reference.start, "reference into missing sheet");
                log.push(CreatedRef {
                    sheet: target,
                    cell: reference.start.to_string(),
                    note: RefNote::SheetNotFound,
                });
            }
            continue;
        };

        let mut create = |addr: CellAddr, note: RefNote| {
            let address = addr.to_string();
            if sheet.get_cell(address.as_str()).is_none() {
                sheet.get_cell_mut(address.as_str()).set_value_number(0);
                log.push(CreatedRef {
                    sheet: target.clone(),
                    cell: address,
                    note,
                });
            }
        };

        match reference.end {
            None => create(reference.start, RefNote::MissingCell),
            Some(end) if end.col == reference.start.col => {
                let (low, high) = if reference.start.row <= end.row {
                    (reference.start.row, end.row)
                } else {
                    (end.row, reference.start.row)
                };
                if high - low >= MAX_COLUMN_FILL {
                    create(reference.start, RefNote::RangeCorner);
                    create(end, RefNote::RangeCorner);
                } else {
                    for row in low..=high {
                        create(CellAddr::new(end.col, row), RefNote::RangeFill);
                    }
                }
            }
            Some(end) => {
                create(reference.start, RefNote::RangeCorner);
                create(end, RefNote::RangeCorner);
            }
        }
    }

    if !log.is_empty() {
        tracing::info!(created = log.len(), "materialized referenced cells");
    }

    log
}
