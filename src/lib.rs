#![doc = r#"
MODPRO — a MODIS land-product download and matrix-construction toolkit.

This crate turns MODIS Terra granules into the flat pixel-by-time
observation matrices used by vegetation-index prediction pipelines:
granules are fetched from the LP DAAC archive, mosaicked/reprojected/
clipped onto a reference grid via GDAL, stacked into a
`(pixels x observations, bands)` matrix with fill values normalised to a
universal sentinel, quality-masked through each product's bit-packed
quality band, aggregated to the canonical 16-day interval, and joined
with spatial/temporal metadata columns into one final observation table.
It powers the MODPRO CLI and can be embedded in your own Rust
applications.

Stability
---------
The public library API is experimental in initial releases. It is built
around a working end-to-end pipeline used by the CLI, but may evolve as
the crate stabilizes. Breaking changes can occur.

Requirements
------------
- GDAL development headers and runtime available on your system
  (with the HDF4 driver for MODIS granules).
- Rust 2024 edition toolchain.

Add dependency
--------------
```toml
[dependencies]
modpro = "0.1"
```

Quick start: prepare one product
--------------------------------
```rust,no_run
use std::path::PathBuf;
use modpro::{
    api::prepare_product,
    core::params::PrepareParams,
    types::{BandSubset, Product},
};

fn main() -> modpro::Result<()> {
    let params = PrepareParams {
        directory: PathBuf::from("/data/srilanka"),
        product: Product::Mod13Q1,
        subset: BandSubset::parse("1 1 1 0 0 0 0 0 0 0 0 1")?,
        tiles: vec!["h25v08".to_string()],
        start: "2001-01-01".parse().unwrap(),
        end: "2011-12-31".parse().unwrap(),
        reference_image: PathBuf::from("/data/srilanka/reference.tif"),
        skip_download: false,
    };

    let report = prepare_product(&params, Some(("user", "password")))?;
    println!(
        "{}: {} rows x {} columns",
        report.dataset,
        report.matrix_rows,
        report.columns.len()
    );
    Ok(())
}
```

Assemble the final observation table
------------------------------------
```rust,no_run
use std::path::PathBuf;
use modpro::{
    api::assemble_dataset,
    core::params::AssembleParams,
    types::Product,
};

fn main() -> modpro::Result<()> {
    let report = assemble_dataset(&AssembleParams {
        directory: PathBuf::from("/data/srilanka"),
        products: vec![
            Product::Mod11A2,
            Product::Mod13Q1,
            Product::Mod15A2,
            Product::Mod17A2,
        ],
        reference_image: PathBuf::from("/data/srilanka/reference.tif"),
        grid_lag: AssembleParams::DEFAULT_GRID_LAG,
    })?;
    println!("final matrix: {} x {}", report.rows, report.columns);
    Ok(())
}
```

Black-box model seams
---------------------
External training engines and the approximate nearest-neighbour index
are driven through the `core::model::Regressor` and
`core::model::NeighborIndex` traits; the crate itself only orchestrates
candidate hyperparameter searches (with per-trial failure isolation),
the geographic baseline, and holdout scoring.

Error handling
--------------
All public functions return `modpro::Result<T>`; match on
`modpro::Error` to handle specific cases, e.g. GDAL or download errors.

Useful modules
--------------
- [`api`] — high-level, ergonomic entry points.
- [`types`] — `Product`, `BandSubset`, and the universal sentinel.
- [`core`] — product tables and the processing stages.
- [`io`] — archive client, reference image, warp, stores.
- [`error`] — crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use error::{Error, Result};
pub use types::{BandSubset, Product, QualityBits, SENTINEL};

// Product tables
pub use core::product::{FillRule, ProductSpec};

// Readers and stores
pub use io::earthdata::EarthDataClient;
pub use io::reference::ReferenceImage;
pub use io::store::MatrixRecord;

// High-level API re-exports
pub use api::{
    AssembleReport, PrepareReport, PreprocessParams, SplitReport, assemble_dataset, check_matrix,
    prepare_product, preprocess_table, split_table,
};
