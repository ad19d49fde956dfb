use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{BandSubset, Product};

/// Parameters for one product's prepare run, suitable for config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareParams {
    /// Working directory all intermediates and matrices land in.
    pub directory: PathBuf,
    pub product: Product,
    pub subset: BandSubset,
    /// MODIS tile ids, e.g. `h25v08`; at most two adjacent tiles.
    pub tiles: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Georeferencing template every granule is warped onto.
    pub reference_image: PathBuf,
    /// Reuse granules already on disk instead of downloading.
    pub skip_download: bool,
}

/// Parameters for final-matrix assembly across prepared products.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembleParams {
    pub directory: PathBuf,
    pub products: Vec<Product>,
    pub reference_image: PathBuf,
    /// Autocorrelation lattice cell size in pixels.
    pub grid_lag: usize,
}

impl AssembleParams {
    pub const DEFAULT_GRID_LAG: usize = 150;
}

/// Parameters for the spatial train/holdout split.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SplitParams {
    pub proportion: f64,
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self {
            proportion: 0.8,
            tolerance: 0.01,
            seed: 0,
        }
    }
}
