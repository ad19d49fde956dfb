//! On-disk matrix store.
//!
//! Matrices are flat little-endian `f64` dumps with a structured JSON
//! record alongside holding everything needed to recover the shape —
//! the raw dump alone cannot be re-read without it. Column names are also
//! written as plain-text headers (one name per line) for consumers that
//! only want the manifest.
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::types::SENTINEL;

/// Shape and provenance record persisted next to every matrix dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixRecord {
    pub dataset: String,
    pub projection: String,
    pub resolution: f64,
    /// Reference grid rows.
    pub rows: usize,
    /// Reference grid columns.
    pub columns: usize,
    pub observations: usize,
    pub tiles: Vec<String>,
    /// Column names of the stored matrix, in storage order.
    pub names: Vec<String>,
}

impl MatrixRecord {
    pub fn expected_rows(&self) -> usize {
        self.rows * self.columns * self.observations
    }
}

fn bin_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.bin"))
}

fn record_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.json"))
}

fn names_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.txt"))
}

/// Persist a matrix dump with its record and plain-text header.
pub fn write_matrix(
    dir: &Path,
    stem: &str,
    data: &Array2<f64>,
    record: &MatrixRecord,
) -> Result<()> {
    if record.names.len() != data.ncols() {
        return Err(Error::ColumnMismatch {
            names: record.names.len(),
            columns: data.ncols(),
        });
    }
    if record.expected_rows() != data.nrows() {
        return Err(Error::ShapeMismatch {
            context: format!("matrix {stem}"),
            expected: record.expected_rows(),
            got: data.nrows(),
        });
    }
    fs::create_dir_all(dir)?;

    let mut out = BufWriter::new(File::create(bin_path(dir, stem))?);
    for &v in data.iter() {
        out.write_all(&v.to_le_bytes())?;
    }
    out.flush()?;

    let json = serde_json::to_string_pretty(record)?;
    fs::write(record_path(dir, stem), json)?;
    write_names(&names_path(dir, stem), &record.names)?;

    info!(
        stem,
        rows = data.nrows(),
        columns = data.ncols(),
        "matrix persisted"
    );
    Ok(())
}

/// Load a matrix dump back through its record.
pub fn read_matrix(dir: &Path, stem: &str) -> Result<(Array2<f64>, MatrixRecord)> {
    let record: MatrixRecord = serde_json::from_str(&fs::read_to_string(record_path(dir, stem))?)?;
    let bytes = fs::read(bin_path(dir, stem))?;

    let ncols = record.names.len();
    let expected = record.expected_rows() * ncols * 8;
    if bytes.len() != expected {
        return Err(Error::ShapeMismatch {
            context: format!("matrix dump {stem}"),
            expected,
            got: bytes.len(),
        });
    }

    let values: Vec<f64> = bytes
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes(c.try_into().expect("chunked to eight bytes")))
        .collect();
    let data = Array2::from_shape_vec((record.expected_rows(), ncols), values).map_err(|_| {
        Error::ShapeMismatch {
            context: format!("matrix dump {stem}"),
            expected: record.expected_rows(),
            got: 0,
        }
    })?;
    Ok((data, record))
}

/// Persist a single metadata column as a flat dump with a one-line
/// header file naming it.
pub fn write_column(dir: &Path, stem: &str, values: &[f64], name: &str) -> Result<()> {
    fs::create_dir_all(dir)?;
    let mut out = BufWriter::new(File::create(bin_path(dir, stem))?);
    for &v in values {
        out.write_all(&v.to_le_bytes())?;
    }
    out.flush()?;
    write_names(&names_path(dir, stem), &[name.to_string()])?;
    Ok(())
}

/// Read a headerless flat `f64` column dump (auxiliary covariates).
pub fn read_column(path: &Path) -> Result<Vec<f64>> {
    let bytes = fs::read(path)?;
    if bytes.len() % 8 != 0 {
        return Err(Error::ShapeMismatch {
            context: format!("column dump {}", path.display()),
            expected: bytes.len() / 8 * 8,
            got: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes(c.try_into().expect("chunked to eight bytes")))
        .collect())
}

/// One column name per line, trailing newline included.
pub fn write_names(path: &Path, names: &[String]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for name in names {
        writeln!(out, "{name}")?;
    }
    out.flush()?;
    Ok(())
}

/// The combined column-name manifest of the final matrix.
pub fn write_manifest(dir: &Path, names: &[String]) -> Result<PathBuf> {
    let path = dir.join("columnNames.txt");
    write_names(&path, names)?;
    Ok(path)
}

pub fn read_names(path: &Path) -> Result<Vec<String>> {
    Ok(fs::read_to_string(path)?
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}

/// Sentinel-aware summary of a stored matrix, one paragraph per column.
pub fn summary_report(data: &Array2<f64>, names: &[String]) -> String {
    use std::fmt::Write as _;

    let mut report = String::new();
    let _ = writeln!(report, "shape: {} x {}", data.nrows(), data.ncols());
    for (j, name) in names.iter().enumerate() {
        let valid: Vec<f64> = data
            .column(j)
            .iter()
            .copied()
            .filter(|&v| v != SENTINEL)
            .collect();
        let _ = writeln!(report, "column {j} ({name}):");
        if valid.is_empty() {
            let _ = writeln!(report, "  all values missing");
            continue;
        }
        let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
        let mean = valid.iter().sum::<f64>() / valid.len() as f64;
        let _ = writeln!(report, "  max: {max}");
        let _ = writeln!(report, "  min: {min}");
        let _ = writeln!(report, "  mean: {mean}");
        let _ = writeln!(
            report,
            "  missing: {}",
            data.nrows() - valid.len()
        );
    }
    report
}
