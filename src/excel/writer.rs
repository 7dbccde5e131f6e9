use std::path::Path;
use umya_spreadsheet::{writer, Spreadsheet, Worksheet};

use super::reader::compute_checksum;
use super::types::{ExcelError, ExcelErrorType};

/// Store a number in a cell, creating the cell if needed.
///
/// The cell always ends up with a numeric type tag, even if it previously held text.
pub fn write_number(sheet: &mut Worksheet, address: &str, value: f64) {
    sheet.get_cell_mut(address).set_value_number(value);
}

/// Fail if the file on disk no longer matches the checksum taken when it was loaded
pub fn ensure_unchanged(path: &Path, expected_checksum: &str) -> Result<(), ExcelError> {
    let current_checksum = compute_checksum(path)?;
    if current_checksum != expected_checksum {
        return Err(ExcelError::new(
            format!(
                "File has been modified. Expected checksum: {}, current: {}",
                expected_checksum, current_checksum
            ),
            ExcelErrorType::ChecksumMismatch,
        ));
    }
    Ok(())
}

/// Save the workbook over `path` and return the new checksum
pub fn save_workbook(book: &Spreadsheet, path: &Path) -> Result<String, ExcelError> {
    writer::xlsx::write(book, path)
        .map_err(|e| ExcelError::write_error(format!("Failed to save workbook: {}", e)))?;

    compute_checksum(path)
}

/// Create a backup of the file before overwriting it
pub fn create_backup(path: &Path) -> Result<String, ExcelError> {
    if !path.exists() {
        return Err(ExcelError::file_not_found(&path.display().to_string()));
    }

    let backup_name = format!(
        "{}.backup.{}",
        path.display(),
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    );

    std::fs::copy(path, &backup_name)
        .map_err(|e| ExcelError::write_error(format!("Failed to create backup: {}", e)))?;

    Ok(backup_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::reader::{load_workbook, read_number};
    use umya_spreadsheet::new_file;

    #[test]
    fn test_write_number_replaces_text() {
        let mut book = new_file();
        let sheet = book.get_sheet_mut(&0).unwrap();
        sheet.get_cell_mut("D9").set_value("texto");

        write_number(sheet, "D9", 7.0);
        write_number(sheet, "E9", 0.0);

        assert_eq!(read_number(sheet, "D9"), Some(7.0));
        assert_eq!(read_number(sheet, "E9"), Some(0.0));
        assert_eq!(sheet.get_cell("D9").unwrap().get_data_type(), "n");
    }

    #[test]
    fn test_save_backup_and_checksum_guard() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simulacion.xlsx");

        let mut book = new_file();
        write_number(book.get_sheet_mut(&0).unwrap(), "B2", 100.0);
        let first = save_workbook(&book, &path).unwrap();
        assert!(ensure_unchanged(&path, &first).is_ok());

        let backup = create_backup(&path).unwrap();
        assert!(Path::new(&backup).exists());

        write_number(book.get_sheet_mut(&0).unwrap(), "B2", 200.0);
        let second = save_workbook(&book, &path).unwrap();
        assert_ne!(first, second);

        let err = ensure_unchanged(&path, &first).unwrap_err();
        assert_eq!(err.error_type, ExcelErrorType::ChecksumMismatch);

        let reloaded = load_workbook(&path).unwrap();
        assert_eq!(read_number(reloaded.get_sheet(&0).unwrap(), "B2"), Some(200.0));
    }
}
