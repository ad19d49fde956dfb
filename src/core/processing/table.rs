//! In-memory observation table and the downstream frame operations:
//! covariate joins, pixel ids, (pixel, time) ordering, within-pixel
//! lagging, and first-period dropping. The heavy model training happens
//! outside this crate; everything here just shapes the table that crosses
//! that boundary.
use ndarray::{Array2, ArrayView1};
use tracing::info;

use crate::error::{Error, Result};
use crate::types::SENTINEL;

/// A column-named numeric table. Missing data is the sentinel in memory
/// and becomes an empty CSV field at the interchange boundary.
#[derive(Debug, Clone)]
pub struct Table {
    pub names: Vec<String>,
    pub data: Array2<f64>,
}

impl Table {
    pub fn new(names: Vec<String>, data: Array2<f64>) -> Result<Self> {
        if names.len() != data.ncols() {
            return Err(Error::ColumnMismatch {
                names: names.len(),
                columns: data.ncols(),
            });
        }
        Ok(Table { names, data })
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| Error::MissingColumn {
                name: name.to_string(),
            })
    }

    pub fn column(&self, name: &str) -> Result<ArrayView1<'_, f64>> {
        Ok(self.data.column(self.column_index(name)?))
    }

    /// Join an auxiliary covariate as a new rightmost column. Row counts
    /// must agree exactly; a covariate of the wrong length is fatal.
    pub fn append_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.nrows() {
            return Err(Error::ShapeMismatch {
                context: format!("covariate {name}"),
                expected: self.nrows(),
                got: values.len(),
            });
        }
        let mut data = Array2::<f64>::zeros((self.nrows(), self.data.ncols() + 1));
        data.slice_mut(ndarray::s![.., ..self.data.ncols()])
            .assign(&self.data);
        for (i, v) in values.into_iter().enumerate() {
            data[[i, self.data.ncols()]] = v;
        }
        self.data = data;
        self.names.push(name);
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        let j = self.column_index(name)?;
        let kept: Vec<usize> = (0..self.data.ncols()).filter(|&k| k != j).collect();
        self.data = self.data.select(ndarray::Axis(1), &kept);
        self.names.remove(j);
        Ok(())
    }

    /// Stable lexicographic row sort by the named key columns.
    pub fn sort_by(&mut self, keys: &[&str]) -> Result<()> {
        let key_idx: Vec<usize> = keys
            .iter()
            .map(|k| self.column_index(k))
            .collect::<Result<_>>()?;
        let mut order: Vec<usize> = (0..self.nrows()).collect();
        order.sort_by(|&a, &b| {
            for &j in &key_idx {
                match self.data[[a, j]].partial_cmp(&self.data[[b, j]]) {
                    Some(std::cmp::Ordering::Equal) | None => continue,
                    Some(other) => return other,
                }
            }
            std::cmp::Ordering::Equal
        });
        self.data = self.data.select(ndarray::Axis(0), &order);
        Ok(())
    }

    /// Keep only the rows the predicate accepts.
    pub fn retain_rows<F: FnMut(ArrayView1<'_, f64>) -> bool>(&mut self, mut keep: F) {
        let kept: Vec<usize> = self
            .data
            .rows()
            .into_iter()
            .enumerate()
            .filter_map(|(i, row)| keep(row).then_some(i))
            .collect();
        self.data = self.data.select(ndarray::Axis(0), &kept);
    }
}

/// Pixel ids `1..=pixels`, tiled across every time period in matrix row
/// order (time-major).
pub fn unique_pixel_ids(pixels: usize, observations: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(pixels * observations);
    for _ in 0..observations {
        out.extend((1..=pixels).map(|p| p as f64));
    }
    out
}

/// Within-year period factor derived from the absolute time index:
/// `((timeID - 1) % periods_per_year) + 1`.
pub fn time_period_factor(time_ids: ArrayView1<'_, f64>, periods_per_year: usize) -> Vec<f64> {
    time_ids
        .iter()
        .map(|&t| (((t as usize).saturating_sub(1)) % periods_per_year + 1) as f64)
        .collect()
}

/// Lag the named columns by one time step within each pixel's series and
/// rename them `<name>_lag`. The table must already be sorted by
/// (pixel id, time); each pixel's first observation has no defined lag and
/// receives the sentinel.
pub fn lag_columns(table: &mut Table, pixel_col: &str, columns: &[String]) -> Result<()> {
    let pixel_j = table.column_index(pixel_col)?;
    for name in columns {
        let j = table.column_index(name)?;
        let mut lagged = vec![SENTINEL; table.nrows()];
        for i in 1..table.nrows() {
            if table.data[[i, pixel_j]] == table.data[[i - 1, pixel_j]] {
                lagged[i] = table.data[[i - 1, j]];
            }
        }
        for (i, v) in lagged.into_iter().enumerate() {
            table.data[[i, j]] = v;
        }
        table.names[j] = format!("{name}_lag");
    }
    info!(lagged = columns.len(), "predictor columns lagged by one period");
    Ok(())
}

/// Lag one column while keeping the original: appends `<name>_lag` as a
/// new column. Used for the outcome variable, which must survive as the
/// modelling target alongside its own lag.
pub fn append_lag_column(table: &mut Table, pixel_col: &str, name: &str) -> Result<()> {
    let pixel_j = table.column_index(pixel_col)?;
    let j = table.column_index(name)?;
    let mut lagged = vec![SENTINEL; table.nrows()];
    for i in 1..table.nrows() {
        if table.data[[i, pixel_j]] == table.data[[i - 1, pixel_j]] {
            lagged[i] = table.data[[i - 1, j]];
        }
    }
    table.append_column(format!("{name}_lag"), lagged)
}

/// Drop the rows of the first time period; their lags are undefined.
pub fn drop_first_period(table: &mut Table, time_col: &str) -> Result<()> {
    let j = table.column_index(time_col)?;
    let before = table.nrows();
    table.retain_rows(|row| row[j] != 1.0);
    info!(dropped = before - table.nrows(), "first time period removed");
    Ok(())
}
