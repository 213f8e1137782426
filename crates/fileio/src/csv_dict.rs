//! Header-keyed CSV row reading and writing.
//!
//! Rows are exposed as column-name to value maps, so callers never deal
//! with positional fields. Reading is lenient: rows that do not fit the
//! header are skipped with a logged warning instead of aborting the load,
//! because cache files are often appended to by interrupted runs.

use std::collections::HashMap;
use std::path::Path;

use crate::error::FileIoError;

/// A CSV file loaded as header-keyed rows.
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    /// Column names from the header row, in file order.
    pub columns: Vec<String>,
    /// One map per data row, keyed by column name.
    pub rows: Vec<HashMap<String, String>>,
}

/// Load a CSV file into header-keyed rows.
///
/// Rows wider than the header and rows that fail to parse are skipped
/// with a warning. Rows narrower than the header yield only the columns
/// present.
///
/// # Arguments
/// * `path` - CSV file to read
///
/// # Errors
/// Returns error if the file cannot be opened or the header cannot be read.
pub fn load_csv_dict(path: &Path) -> Result<CsvTable, FileIoError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows: Vec<HashMap<String, String>> = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                log::warn!(
                    "Skipping unparseable row {} in {}: {}",
                    index + 1,
                    path.display(),
                    e
                );
                continue;
            }
        };
        if record.len() > columns.len() {
            log::warn!(
                "Skipping row {} in {}: {} fields for {} columns",
                index + 1,
                path.display(),
                record.len(),
                columns.len()
            );
            continue;
        }
        let mut row: HashMap<String, String> = HashMap::with_capacity(record.len());
        for (column, field) in columns.iter().zip(record.iter()) {
            row.insert(column.clone(), field.to_string());
        }
        rows.push(row);
    }

    Ok(CsvTable { columns, rows })
}

/// Write header-keyed rows to a CSV file, overwriting any existing file.
///
/// Values are quoted only when they contain the delimiter, quotes or
/// newlines, so single-valued fields round-trip bytewise through
/// `load_csv_dict`. Missing columns are written as empty strings; row
/// keys not present in `columns` are ignored.
///
/// # Arguments
/// * `path` - Destination file
/// * `columns` - Column order for the header and every row
/// * `rows` - Rows to write
///
/// # Errors
/// Returns error if the file cannot be created or a row cannot be written.
pub fn write_csv_dict(
    path: &Path,
    columns: &[String],
    rows: &[HashMap<String, String>],
) -> Result<(), FileIoError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    writer
        .write_record(columns)
        .map_err(|e| csv_error(path, e))?;
    for row in rows {
        let record: Vec<&str> = columns
            .iter()
            .map(|column| row.get(column).map(String::as_str).unwrap_or(""))
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| csv_error(path, e))?;
    }
    writer
        .flush()
        .map_err(|e| FileIoError::from_io(path.display().to_string(), e))?;
    Ok(())
}

/// Wrap a csv crate error with the file path for context.
fn csv_error(path: &Path, err: csv::Error) -> FileIoError {
    FileIoError::Csv {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}
