//! CSV boundary for the observation table.
//!
//! Every downstream training service consumes comma-separated text with a
//! header row; sentinel entries cross the boundary as empty fields.
use std::path::Path;

use ndarray::Array2;
use tracing::info;

use crate::core::processing::table::Table;
use crate::error::{Error, Result};
use crate::types::SENTINEL;

/// Write the table as CSV with a header row. Sentinel values become empty
/// fields so external readers see them as NA.
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&table.names)?;
    let mut record = Vec::with_capacity(table.names.len());
    for row in table.data.rows() {
        record.clear();
        for &v in row {
            if v == SENTINEL {
                record.push(String::new());
            } else {
                record.push(v.to_string());
            }
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    info!(rows = table.nrows(), path = %path.display(), "table exported");
    Ok(())
}

/// Read a CSV table back; empty fields become the sentinel.
pub fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path)?;
    let names: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut values = Vec::new();
    let mut rows = 0usize;
    for result in reader.records() {
        let record = result?;
        if record.len() != names.len() {
            return Err(Error::ColumnMismatch {
                names: names.len(),
                columns: record.len(),
            });
        }
        for field in record.iter() {
            if field.is_empty() {
                values.push(SENTINEL);
            } else {
                values.push(field.parse::<f64>().map_err(|_| Error::InvalidArgument {
                    arg: "csv",
                    value: field.to_string(),
                })?);
            }
        }
        rows += 1;
    }

    let data = Array2::from_shape_vec((rows, names.len()), values).map_err(|_| {
        Error::ShapeMismatch {
            context: format!("csv {}", path.display()),
            expected: rows * names.len(),
            got: 0,
        }
    })?;
    Table::new(names, data)
}
