//! Quality masking and temporal aggregation.
//!
//! Bit 0 of a product's bit-packed quality code marks an unreliable pixel.
//! Masked entries (and entries already at the sentinel) are excluded from
//! the 16-day aggregation; a run whose members are all masked stays at the
//! sentinel rather than averaging to garbage.
use ndarray::Array2;
use tracing::info;

use crate::core::processing::builder::ObservationMatrix;
use crate::core::product::ProductSpec;
use crate::error::{Error, Result};
use crate::types::{QualityBits, SENTINEL};

/// Name the quality band carries in every product table.
pub const QUALITY_COLUMN: &str = "Quality";

fn unreliable(code: f64, bits: QualityBits) -> bool {
    match bits {
        QualityBits::U8 => (code as u8) & 1 == 1,
        QualityBits::U16 => (code as u16) & 1 == 1,
    }
}

/// Masking-aware mean of one aggregation run; sentinel entries are excluded
/// and an all-sentinel run stays sentinel.
fn masked_mean(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in values {
        if v != SENTINEL {
            sum += v;
            count += 1;
        }
    }
    if count == 0 { SENTINEL } else { sum / count as f64 }
}

/// Apply the product's quality mask and aggregate to the canonical 16-day
/// interval. The quality column itself is consumed and dropped.
///
/// When the subset never selected the quality band the mask step is skipped
/// and only the sentinel-aware aggregation runs.
pub fn apply_quality(spec: &ProductSpec, matrix: &ObservationMatrix) -> Result<ObservationMatrix> {
    let quality = matrix
        .names
        .iter()
        .position(|n| n == QUALITY_COLUMN);

    let factor = spec.periods_per_aggregate;
    if factor > 1 && matrix.observations % factor != 0 {
        return Err(Error::OddObservations {
            dataset: spec.product.dataset_id().to_string(),
            observations: matrix.observations,
        });
    }

    let pixels = matrix.rows * matrix.cols;
    let out_observations = matrix.observations / factor.max(1);
    let kept: Vec<usize> = (0..matrix.names.len())
        .filter(|&j| Some(j) != quality)
        .collect();

    let mut data = Array2::<f64>::zeros((pixels * out_observations, kept.len()));
    let mut run = vec![0.0f64; factor];

    for (out_j, &j) in kept.iter().enumerate() {
        for g in 0..out_observations {
            for p in 0..pixels {
                for (slot, r) in run.iter_mut().enumerate() {
                    let t = g * factor + slot;
                    let row = t * pixels + p;
                    let mut v = matrix.data[[row, j]];
                    if let Some(q) = quality {
                        if unreliable(matrix.data[[row, q]], spec.quality_bits) {
                            v = SENTINEL;
                        }
                    }
                    *r = v;
                }
                data[[g * pixels + p, out_j]] = masked_mean(&run);
            }
        }
    }

    let names: Vec<String> = kept.iter().map(|&j| matrix.names[j].clone()).collect();
    info!(
        dataset = %spec.product,
        masked = quality.is_some(),
        observations = out_observations,
        columns = names.len(),
        "quality-adjusted matrix ready"
    );

    Ok(ObservationMatrix {
        data,
        names,
        rows: matrix.rows,
        cols: matrix.cols,
        observations: out_observations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::product::{MOD11A2, MOD13Q1};
    use ndarray::array;

    fn matrix(names: &[&str], data: Array2<f64>, rows: usize, cols: usize, obs: usize) -> ObservationMatrix {
        ObservationMatrix {
            data,
            names: names.iter().map(|s| s.to_string()).collect(),
            rows,
            cols,
            observations: obs,
        }
    }

    #[test]
    fn bit_zero_masks_every_other_column() {
        // One pixel, one observation: quality code 3 has bit 0 set.
        let m = matrix(
            &["NDVI", "EVI", "Quality"],
            array![[0.5, 0.7, 3.0]],
            1,
            1,
            1,
        );
        let out = apply_quality(&MOD13Q1, &m).unwrap();
        assert_eq!(out.names, vec!["NDVI", "EVI"]);
        assert_eq!(out.data[[0, 0]], SENTINEL);
        assert_eq!(out.data[[0, 1]], SENTINEL);
    }

    #[test]
    fn even_quality_codes_pass_through() {
        let m = matrix(
            &["NDVI", "EVI", "Quality"],
            array![[0.5, 0.7, 2.0]],
            1,
            1,
            1,
        );
        let out = apply_quality(&MOD13Q1, &m).unwrap();
        assert!((out.data[[0, 1]] - 0.7).abs() < 1e-12);
    }

    #[test]
    fn pair_mean_ignores_the_masked_member() {
        // One pixel, two observations at 8-day cadence. The second slice is
        // flagged unreliable, so the 16-day value must equal the first
        // slice exactly.
        let m = matrix(
            &["LST", "Quality"],
            array![[290.0, 0.0], [400.0, 1.0]],
            1,
            1,
            2,
        );
        let out = apply_quality(&MOD11A2, &m).unwrap();
        assert_eq!(out.observations, 1);
        assert_eq!(out.data.dim(), (1, 1));
        assert!((out.data[[0, 0]] - 290.0).abs() < 1e-12);
    }

    #[test]
    fn all_masked_run_stays_sentinel() {
        let m = matrix(
            &["LST", "Quality"],
            array![[290.0, 1.0], [300.0, 1.0]],
            1,
            1,
            2,
        );
        let out = apply_quality(&MOD11A2, &m).unwrap();
        assert_eq!(out.data[[0, 0]], SENTINEL);
    }

    #[test]
    fn unmasked_pair_averages() {
        let m = matrix(
            &["LST", "Quality"],
            array![[290.0, 0.0], [294.0, 0.0]],
            1,
            1,
            2,
        );
        let out = apply_quality(&MOD11A2, &m).unwrap();
        assert!((out.data[[0, 0]] - 292.0).abs() < 1e-12);
    }

    #[test]
    fn missing_quality_column_still_aggregates() {
        let m = matrix(&["LST"], array![[290.0], [SENTINEL]], 1, 1, 2);
        let out = apply_quality(&MOD11A2, &m).unwrap();
        assert!((out.data[[0, 0]] - 290.0).abs() < 1e-12);
    }

    #[test]
    fn odd_observation_count_is_fatal_for_eight_day_products() {
        let m = matrix(
            &["LST", "Quality"],
            array![[290.0, 0.0], [294.0, 0.0], [296.0, 0.0]],
            1,
            1,
            3,
        );
        assert!(matches!(
            apply_quality(&MOD11A2, &m),
            Err(Error::OddObservations { .. })
        ));
    }
}
