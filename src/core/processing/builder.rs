//! Observation-matrix construction.
//!
//! Stacks per-band, per-date rasters (already warped onto the reference
//! grid) into one flat `(rows * cols * observations, bands)` matrix,
//! normalises product fill values to the universal sentinel, and applies
//! the per-band scale factors from the product table.
use ndarray::Array2;
use tracing::info;

use crate::core::product::ProductSpec;
use crate::error::{Error, Result};
use crate::types::{BandSubset, SENTINEL};

/// One selected band's rasters across the acquisition dates, oldest first.
#[derive(Debug, Clone)]
pub struct BandStack {
    /// Archive index of the band within the product (drives fill/scale lookup).
    pub band: usize,
    pub name: String,
    pub rasters: Vec<Array2<f64>>,
}

/// Flat pixel-by-observation matrix with its column manifest.
#[derive(Debug, Clone)]
pub struct ObservationMatrix {
    /// Shape `(rows * cols * observations, names.len())`; row index is
    /// `t * rows * cols + pixel`, pixels in row-major raster order.
    pub data: Array2<f64>,
    pub names: Vec<String>,
    pub rows: usize,
    pub cols: usize,
    pub observations: usize,
}

impl ObservationMatrix {
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| Error::MissingColumn {
                name: name.to_string(),
            })
    }
}

/// Build the raw observation matrix for one product.
///
/// `stacks` must hold the selected bands in archive order; every stack must
/// carry the same number of dates and every raster must match the reference
/// grid dimensions.
pub fn build_matrix(
    spec: &ProductSpec,
    subset: &BandSubset,
    stacks: &[BandStack],
    rows: usize,
    cols: usize,
) -> Result<ObservationMatrix> {
    spec.check_subset(subset)?;
    if stacks.len() != subset.selected_count() {
        return Err(Error::ShapeMismatch {
            context: format!("band stacks for {}", spec.product),
            expected: subset.selected_count(),
            got: stacks.len(),
        });
    }

    let observations = stacks.first().map(|s| s.rasters.len()).unwrap_or(0);
    if observations == 0 {
        return Err(Error::ShapeMismatch {
            context: format!("acquisition dates for {}", spec.product),
            expected: 1,
            got: 0,
        });
    }
    for stack in stacks {
        if stack.rasters.len() != observations {
            return Err(Error::ShapeMismatch {
                context: format!("dates in band {}", stack.name),
                expected: observations,
                got: stack.rasters.len(),
            });
        }
        for raster in &stack.rasters {
            if raster.dim() != (rows, cols) {
                return Err(Error::ShapeMismatch {
                    context: format!("raster pixels in band {}", stack.name),
                    expected: rows * cols,
                    got: raster.len(),
                });
            }
        }
    }

    let pixels = rows * cols;
    let total_rows = pixels * observations;
    let mut data = Array2::<f64>::zeros((total_rows, stacks.len()));
    let mut names = Vec::with_capacity(stacks.len());

    for (j, stack) in stacks.iter().enumerate() {
        let scale = spec.scale[stack.band];
        for (t, raster) in stack.rasters.iter().enumerate() {
            let offset = t * pixels;
            // Row-major flattening keeps pixel order identical to the raster.
            for (p, &raw) in raster.iter().enumerate() {
                let value = if raw == SENTINEL || spec.fill.is_fill(stack.band, raw) {
                    SENTINEL
                } else {
                    raw * scale
                };
                data[[offset + p, j]] = value;
            }
        }
        names.push(stack.name.clone());
    }

    info!(
        dataset = %spec.product,
        rows = total_rows,
        columns = stacks.len(),
        "observation matrix built, missing data normalised to {SENTINEL}"
    );

    Ok(ObservationMatrix {
        data,
        names,
        rows,
        cols,
        observations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::product::{MOD13Q1, MOD15A2};
    use ndarray::array;

    fn stack(band: usize, name: &str, rasters: Vec<Array2<f64>>) -> BandStack {
        BandStack {
            band,
            name: name.to_string(),
            rasters,
        }
    }

    #[test]
    fn single_band_stack_preserves_row_major_order() {
        let subset = BandSubset::parse("0 1 0 0 0 0 0 0 0 0 0 0").unwrap();
        let t0 = array![[1.0, 2.0], [3.0, 4.0]];
        let t1 = array![[5.0, 6.0], [7.0, 8.0]];
        let m = build_matrix(&MOD13Q1, &subset, &[stack(1, "EVI", vec![t0, t1])], 2, 2).unwrap();

        assert_eq!(m.data.dim(), (8, 1));
        // EVI scale is 0.0001; pixel order within each date is row-major.
        let got: Vec<f64> = m.data.column(0).to_vec();
        let want: Vec<f64> = (1..=8).map(|v| v as f64 * 0.0001).collect();
        for (g, w) in got.iter().zip(&want) {
            assert!((g - w).abs() < 1e-12);
        }
    }

    #[test]
    fn fill_values_become_sentinel_before_scaling() {
        let subset = BandSubset::parse("0 1 0 0 0 0 0 0 0 0 0 0").unwrap();
        let t0 = array![[-3000.0, 100.0]];
        let m = build_matrix(&MOD13Q1, &subset, &[stack(1, "EVI", vec![t0])], 1, 2).unwrap();
        assert_eq!(m.data[[0, 0]], SENTINEL);
        assert!((m.data[[1, 0]] - 0.01).abs() < 1e-12);
    }

    #[test]
    fn threshold_fill_rule_catches_saturated_values() {
        let subset = BandSubset::parse("0 1 0 0 0 0").unwrap();
        let t0 = array![[249.0, 250.0, 10.0]];
        let m = build_matrix(&MOD15A2, &subset, &[stack(1, "FPAR", vec![t0])], 1, 3).unwrap();
        assert_eq!(m.data[[0, 0]], SENTINEL);
        assert_eq!(m.data[[1, 0]], SENTINEL);
        assert!((m.data[[2, 0]] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn mismatched_raster_shape_is_rejected() {
        let subset = BandSubset::parse("0 1 0 0 0 0 0 0 0 0 0 0").unwrap();
        let bad = array![[1.0, 2.0, 3.0]];
        let err = build_matrix(&MOD13Q1, &subset, &[stack(1, "EVI", vec![bad])], 2, 2);
        assert!(matches!(err, Err(Error::ShapeMismatch { .. })));
    }
}
