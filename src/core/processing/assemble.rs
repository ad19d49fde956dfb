//! Final-matrix assembly.
//!
//! Concatenates per-product matrices and single-column metadata arrays
//! into one observation table. Column order is the order of the blocks
//! handed in — an explicit, in-code contract; nothing here globs the
//! filesystem or relies on file-name sort order.
use ndarray::{Array2, s};
use tracing::info;

use crate::error::{Error, Result};

/// A named group of columns destined for the final matrix.
#[derive(Debug, Clone)]
pub struct ColumnBlock {
    pub names: Vec<String>,
    pub data: Array2<f64>,
}

impl ColumnBlock {
    /// Wrap a flat array as a single named column.
    pub fn column(name: impl Into<String>, values: Vec<f64>) -> Self {
        let rows = values.len();
        ColumnBlock {
            names: vec![name.into()],
            data: Array2::from_shape_vec((rows, 1), values)
                .expect("length times one always reshapes"),
        }
    }

    pub fn new(names: Vec<String>, data: Array2<f64>) -> Result<Self> {
        if names.len() != data.ncols() {
            return Err(Error::ColumnMismatch {
                names: names.len(),
                columns: data.ncols(),
            });
        }
        Ok(ColumnBlock { names, data })
    }
}

/// The assembled observation table and its column-name manifest.
#[derive(Debug, Clone)]
pub struct FinalMatrix {
    pub data: Array2<f64>,
    pub names: Vec<String>,
}

/// Horizontally concatenate the blocks in the given order.
///
/// Every block must carry exactly `expected_rows` rows; the output manifest
/// always matches the output column count.
pub fn assemble(blocks: &[ColumnBlock], expected_rows: usize) -> Result<FinalMatrix> {
    let total_cols: usize = blocks.iter().map(|b| b.data.ncols()).sum();
    let mut data = Array2::<f64>::zeros((expected_rows, total_cols));
    let mut names = Vec::with_capacity(total_cols);

    let mut at = 0usize;
    for block in blocks {
        if block.data.nrows() != expected_rows {
            return Err(Error::ShapeMismatch {
                context: format!("block [{}]", block.names.join(", ")),
                expected: expected_rows,
                got: block.data.nrows(),
            });
        }
        let width = block.data.ncols();
        data.slice_mut(s![.., at..at + width]).assign(&block.data);
        names.extend(block.names.iter().cloned());
        at += width;
    }

    if names.len() != data.ncols() {
        return Err(Error::ColumnMismatch {
            names: names.len(),
            columns: data.ncols(),
        });
    }

    info!(
        rows = expected_rows,
        columns = total_cols,
        "final matrix assembled"
    );
    Ok(FinalMatrix { data, names })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn manifest_always_matches_column_count() {
        let blocks = vec![
            ColumnBlock::new(
                vec!["EVI".into(), "NDVI".into()],
                array![[1.0, 2.0], [3.0, 4.0]],
            )
            .unwrap(),
            ColumnBlock::column("latitude", vec![10.0, 11.0]),
            ColumnBlock::column("timeID", vec![1.0, 2.0]),
        ];
        let out = assemble(&blocks, 2).unwrap();
        assert_eq!(out.names.len(), out.data.ncols());
        assert_eq!(out.names, vec!["EVI", "NDVI", "latitude", "timeID"]);
        assert_eq!(out.data[[1, 2]], 11.0);
    }

    #[test]
    fn short_block_is_rejected() {
        let blocks = vec![
            ColumnBlock::column("latitude", vec![10.0, 11.0]),
            ColumnBlock::column("timeID", vec![1.0]),
        ];
        assert!(matches!(
            assemble(&blocks, 2),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn name_count_is_checked_at_block_construction() {
        assert!(ColumnBlock::new(vec!["a".into()], array![[1.0, 2.0]]).is_err());
    }
}
