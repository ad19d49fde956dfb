use clap::{Parser, Subcommand};
use std::path::PathBuf;

use chrono::NaiveDate;
use modpro::types::Product;

#[derive(Parser)]
#[command(name = "modpro", version, about = "MODPRO CLI")]
pub struct CliArgs {
    /// Enable logging
    #[arg(long, default_value_t = false, global = true)]
    pub log: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Download granules and build one product's quality-adjusted matrix
    Prepare {
        /// Working directory for granules, intermediates, and matrices
        #[arg(short, long)]
        directory: PathBuf,

        /// MODIS product to process
        #[arg(short, long, value_enum)]
        product: Product,

        /// Band selector bit-string, archive order (e.g. "1 1 1 0 0 0 0 0 0 0 0 1")
        #[arg(short, long)]
        subset: String,

        /// MODIS tile ids (max two adjacent tiles)
        #[arg(short, long, num_args = 1..)]
        tiles: Vec<String>,

        /// First acquisition date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last acquisition date (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Reference image every granule is warped onto
        #[arg(short, long)]
        reference: PathBuf,

        /// EarthData login user name
        #[arg(long)]
        username: Option<String>,

        /// EarthData login password
        #[arg(long)]
        password: Option<String>,

        /// Reuse granules already on disk instead of downloading
        #[arg(long, default_value_t = false)]
        skip_download: bool,
    },

    /// Assemble prepared products and metadata columns into the final matrix
    Assemble {
        #[arg(short, long)]
        directory: PathBuf,

        /// Prepared products, in final-matrix column order
        #[arg(short, long, value_enum, num_args = 1..)]
        products: Vec<Product>,

        #[arg(short, long)]
        reference: PathBuf,

        /// Autocorrelation lattice cell size in pixels
        #[arg(long, default_value_t = 150)]
        grid_lag: usize,
    },

    /// Print a sentinel-aware summary of a persisted matrix
    Check {
        #[arg(short, long)]
        directory: PathBuf,

        /// Matrix stem, e.g. "MOD13Q1.005" or "finalMatrix"
        #[arg(short, long, default_value = "finalMatrix")]
        matrix: String,
    },

    /// Join covariates, lag predictors, and export the modelling CSV
    Preprocess {
        #[arg(short, long)]
        directory: PathBuf,

        /// Output CSV path
        #[arg(short, long)]
        output: PathBuf,

        /// Predictor columns to lag by one period
        #[arg(short, long, num_args = 0..)]
        lag: Vec<String>,

        /// Outcome column; kept and joined by its own lag
        #[arg(long)]
        target: Option<String>,

        /// Auxiliary covariates to join, as name=path of a flat f64 dump
        #[arg(short, long, num_args = 0..)]
        covariate: Vec<String>,

        /// Columns to drop before export
        #[arg(long, num_args = 0..)]
        drop: Vec<String>,

        /// Time periods per year for the within-year period factor
        #[arg(long, default_value_t = 23)]
        periods_per_year: usize,
    },

    /// Split the exported table into training and holdout CSVs
    Split {
        /// Input CSV (preprocess output)
        #[arg(short, long)]
        input: PathBuf,

        /// Training-set CSV path
        #[arg(long)]
        training: PathBuf,

        /// Holdout-set CSV path
        #[arg(long)]
        holdout: PathBuf,

        /// Target training proportion
        #[arg(long, default_value_t = 0.8)]
        proportion: f64,

        /// Allowed deviation of the achieved proportion
        #[arg(long, default_value_t = 0.01)]
        tolerance: f64,

        /// Seed for the grid-cell draw
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}
