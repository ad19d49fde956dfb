//! Spatial train/holdout partitioning.
//!
//! Whole autocorrelation cells are drawn into the training side so that
//! spatially adjacent pixels never straddle the split. The achieved row
//! proportion must land inside a tolerance band around the target or the
//! split is rejected outright.
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::info;

use crate::core::params::SplitParams;
use crate::error::{Error, Result};

/// Assign every row to training (`true`) or holdout (`false`) by drawing
/// whole grid cells. Deterministic for a given seed.
pub fn spatial_split(grid_ids: &[f64], params: &SplitParams) -> Result<Vec<bool>> {
    if grid_ids.is_empty() {
        return Err(Error::ShapeMismatch {
            context: "autocorrelation grid column".to_string(),
            expected: 1,
            got: 0,
        });
    }
    if !(0.0..=1.0).contains(&params.proportion) {
        return Err(Error::InvalidArgument {
            arg: "proportion",
            value: params.proportion.to_string(),
        });
    }

    let mut cells: Vec<u64> = grid_ids.iter().map(|&g| g as u64).collect();
    cells.sort_unstable();
    cells.dedup();

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut drawn = cells.clone();
    drawn.shuffle(&mut rng);
    let take = (cells.len() as f64 * params.proportion).round() as usize;
    let training_cells: std::collections::HashSet<u64> =
        drawn.into_iter().take(take).collect();

    let assignment: Vec<bool> = grid_ids
        .iter()
        .map(|&g| training_cells.contains(&(g as u64)))
        .collect();

    let achieved =
        assignment.iter().filter(|&&t| t).count() as f64 / assignment.len() as f64;
    if (achieved - params.proportion).abs() > params.tolerance {
        return Err(Error::SplitOutOfTolerance {
            target: params.proportion,
            achieved,
            tolerance: params.tolerance,
        });
    }

    info!(
        cells = cells.len(),
        training_cells = take,
        achieved = format!("{achieved:.3}"),
        "spatial split drawn"
    );
    Ok(assignment)
}
