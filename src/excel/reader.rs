use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use umya_spreadsheet::{reader, Spreadsheet, Worksheet};

use super::types::*;

/// Load a workbook from disk, keeping formulas and formatting intact
pub fn load_workbook(path: &Path) -> Result<Spreadsheet, ExcelError> {
    if !path.exists() {
        return Err(ExcelError::file_not_found(&path.display().to_string()));
    }

    reader::xlsx::read(path)
        .map_err(|e| ExcelError::invalid_format(format!("Failed to open workbook: {}", e)))
}

/// Names of every sheet, in workbook order
pub fn sheet_names(book: &Spreadsheet) -> Vec<String> {
    book.get_sheet_collection()
        .iter()
        .map(|sheet| sheet.get_name().to_string())
        .collect()
}

/// Pick the sheet to work on: `preferred` if the workbook has it, else the first one.
pub fn active_sheet_name(book: &Spreadsheet, preferred: &str) -> Option<String> {
    if book.get_sheet_by_name(preferred).is_some() {
        return Some(preferred.to_string());
    }
    book.get_sheet_collection()
        .first()
        .map(|sheet| sheet.get_name().to_string())
}

/// Numeric value of a cell, if the cell exists and holds something that parses as a number.
///
/// For formula cells this is the cached result written by the last recalculation.
pub fn read_number(sheet: &Worksheet, address: &str) -> Option<f64> {
    let cell = sheet.get_cell(address)?;
    let raw = cell.get_value();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Describe a cell for diagnostics without creating it
pub fn snapshot_cell(sheet: &Worksheet, address: &str) -> DebugCell {
    match sheet.get_cell(address) {
        Some(cell) => {
            let formula = cell.get_formula();
            DebugCell {
                cell: address.to_string(),
                exists: true,
                value: Some(cell.get_value().to_string()),
                data_type: Some(cell.get_data_type().to_string()),
                formula: if formula.is_empty() {
                    None
                } else {
                    Some(formula.to_string())
                },
            }
        }
        None => DebugCell {
            cell: address.to_string(),
            exists: false,
            value: None,
            data_type: None,
            formula: None,
        },
    }
}

/// Workbook-level defined names
pub fn defined_names(book: &Spreadsheet) -> Vec<DefinedNameEntry> {
    book.get_defined_names()
        .iter()
        .map(|defined| DefinedNameEntry {
            name: defined.get_name().to_string(),
            address: defined.get_address(),
        })
        .collect()
}

/// Convert column index (1-based) to Excel column letter (A, B, ..., Z, AA, AB, ...)
pub fn column_index_to_letter(index: u32) -> String {
    let mut result = String::new();
    let mut n = index;

    while n > 0 {
        n -= 1;
        let c = (b'A' + (n % 26) as u8) as char;
        result.insert(0, c);
        n /= 26;
    }

    result
}

/// Convert Excel column letters to a 1-based index. Returns None for empty or non-letter input.
pub fn column_letter_to_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }

    let mut acc: u32 = 0;
    for c in letters.bytes() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() - b'A') as u32 + 1;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
    }

    Some(acc)
}

/// Compute SHA-256 checksum of a file
pub fn compute_checksum(path: &Path) -> Result<String, ExcelError> {
    let mut file = File::open(path)
        .map_err(|e| ExcelError::read_error(format!("Failed to open file for checksum: {}", e)))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)
            .map_err(|e| ExcelError::read_error(format!("Failed to read file for checksum: {}", e)))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    let result = hasher.finalize();
    Ok(format!("{:x}", result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use umya_spreadsheet::new_file;

    #[test]
    fn test_column_index_to_letter() {
        assert_eq!(column_index_to_letter(1), "A");
        assert_eq!(column_index_to_letter(2), "B");
        assert_eq!(column_index_to_letter(26), "Z");
        assert_eq!(column_index_to_letter(27), "AA");
        assert_eq!(column_index_to_letter(28), "AB");
        assert_eq!(column_index_to_letter(52), "AZ");
        assert_eq!(column_index_to_letter(53), "BA");
    }

    #[test]
    fn test_column_letter_round_trip() {
        for index in [1, 7, 26, 27, 703, 16384] {
            let letters = column_index_to_letter(index);
            assert_eq!(column_letter_to_index(&letters), Some(index));
        }
        assert_eq!(column_letter_to_index("xfd"), Some(16384));
        assert_eq!(column_letter_to_index(""), None);
        assert_eq!(column_letter_to_index("A1"), None);
    }

    #[test]
    fn test_active_sheet_prefers_named_sheet() {
        let mut book = new_file();
        book.new_sheet("cliente").unwrap();
        assert_eq!(active_sheet_name(&book, "cliente").as_deref(), Some("cliente"));
        assert_eq!(active_sheet_name(&book, "resumen").as_deref(), Some("Sheet1"));
    }

    #[test]
    fn test_read_number_and_snapshot() {
        let mut book = new_file();
        let sheet = book.get_sheet_mut(&0).unwrap();
        sheet.get_cell_mut("B2").set_value_number(42.5);
        sheet.get_cell_mut("B3").set_value("not a number");

        let sheet = book.get_sheet(&0).unwrap();
        assert_eq!(read_number(sheet, "B2"), Some(42.5));
        assert_eq!(read_number(sheet, "B3"), None);
        assert_eq!(read_number(sheet, "Z99"), None);

        let present = snapshot_cell(sheet, "B2");
        assert!(present.exists);
        assert_eq!(present.value.as_deref(), Some("42.5"));
        assert!(present.formula.is_none());

        let absent = snapshot_cell(sheet, "W57");
        assert!(!absent.exists);
        assert!(absent.value.is_none());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = load_workbook(Path::new("/definitely/not/here.xlsx")).unwrap_err();
        assert_eq!(err.error_type, ExcelErrorType::FileNotFound);
    }

    #[test]
    fn test_non_workbook_is_invalid_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simulacion.xlsx");
        std::fs::write(&path, b"not a zip archive").unwrap();

        let err = load_workbook(&path).unwrap_err();
        assert_eq!(err.error_type, ExcelErrorType::InvalidFormat);
    }
}
