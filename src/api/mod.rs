//! High-level, ergonomic library API: prepare a product into its
//! quality-adjusted matrix, assemble the final observation table, and run
//! the downstream preprocessing and spatial split. Prefer these
//! entrypoints over the low-level processing modules when embedding
//! MODPRO.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::core::params::{AssembleParams, PrepareParams, SplitParams};
use crate::core::processing::assemble::{ColumnBlock, assemble};
use crate::core::processing::builder::BandStack;
use crate::core::processing::metadata::{autocorrelation_grid, coordinate_columns, period_index};
use crate::core::processing::pipeline::product_matrix;
use crate::core::processing::split::spatial_split;
use crate::core::processing::table::{
    Table, append_lag_column, drop_first_period, lag_columns, time_period_factor,
    unique_pixel_ids,
};
use crate::core::product::ProductSpec;
use crate::error::{Error, Result};
use crate::io::earthdata::{EarthDataClient, check_observation_count, check_tile_limit};
use crate::io::reference::{ReferenceImage, read_raster};
use crate::io::store::{self, MatrixRecord};
use crate::io::table::{read_csv, write_csv};
use crate::io::warp::{band_raster_stem, selected_subdatasets, warp_band_to_reference};

/// Outcome of one product's prepare run.
#[derive(Debug, Clone)]
pub struct PrepareReport {
    pub dataset: String,
    /// Acquisition dates processed.
    pub downloaded_observations: usize,
    /// Time periods after 16-day aggregation.
    pub observations: usize,
    pub matrix_rows: usize,
    pub columns: Vec<String>,
}

/// Outcome of final-matrix assembly.
#[derive(Debug, Clone)]
pub struct AssembleReport {
    pub rows: usize,
    pub columns: usize,
    pub manifest: PathBuf,
}

/// Outcome of the spatial split.
#[derive(Debug, Clone)]
pub struct SplitReport {
    pub training_rows: usize,
    pub holdout_rows: usize,
    pub achieved_proportion: f64,
}

/// Acquisition date encoded in a granule file name (`A%Y%j` segment).
fn granule_date(name: &str) -> Option<NaiveDate> {
    let segment = name.split('.').find(|s| {
        s.len() == 8 && s.starts_with('A') && s[1..].chars().all(|c| c.is_ascii_digit())
    })?;
    let year: i32 = segment[1..5].parse().ok()?;
    let doy: u32 = segment[5..8].parse().ok()?;
    NaiveDate::from_yo_opt(year, doy)
}

/// Granules already on disk, grouped by acquisition date.
fn granules_on_disk(dir: &Path) -> Result<BTreeMap<NaiveDate, Vec<PathBuf>>> {
    let mut by_date: BTreeMap<NaiveDate, Vec<PathBuf>> = BTreeMap::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) if n.ends_with(".hdf") => n.to_string(),
            _ => continue,
        };
        match granule_date(&name) {
            Some(date) => by_date.entry(date).or_default().push(path),
            None => warn!(granule = name.as_str(), "skipping file without a date segment"),
        }
    }
    for paths in by_date.values_mut() {
        paths.sort();
    }
    Ok(by_date)
}

/// Download (or rediscover), warp, and reduce one product to its
/// quality-adjusted observation matrix, persisted under the working
/// directory as `<dataset>.bin/.json/.txt`.
pub fn prepare_product(
    params: &PrepareParams,
    credentials: Option<(&str, &str)>,
) -> Result<PrepareReport> {
    check_tile_limit(&params.tiles)?;
    let spec = ProductSpec::for_product(params.product);
    spec.check_subset(&params.subset)?;

    let reference = ReferenceImage::open(&params.reference_image)?;
    let dataset = spec.product.dataset_id();
    let product_dir = params.directory.join(dataset);
    fs::create_dir_all(&product_dir)?;

    // Acquire granules, grouped by acquisition date.
    let mut by_date = if params.skip_download {
        granules_on_disk(&product_dir)?
    } else {
        let (username, password) = credentials.ok_or(Error::InvalidArgument {
            arg: "credentials",
            value: "EarthData username and password are required for download".to_string(),
        })?;
        let client = EarthDataClient::new(username, password)?;
        let dates = client.list_dates(dataset, params.start, params.end)?;
        let mut by_date = BTreeMap::new();
        for date in dates {
            let granules = client.download_day(dataset, date, &params.tiles, &product_dir)?;
            by_date.insert(date, granules);
        }
        by_date
    };
    by_date.retain(|date, _| *date >= params.start && *date <= params.end);

    let observations = by_date.len();
    check_observation_count(spec, observations)?;
    info!(dataset, observations, "granules ready");

    // Warp every (band, date) onto the reference grid.
    let selected = params.subset.selected_indices();
    let names = spec.selected_names(&params.subset);
    let mut rasters: Vec<Vec<PathBuf>> = vec![Vec::with_capacity(observations); selected.len()];
    for (date, granules) in &by_date {
        let day = date.format("%Y.%m.%d").to_string();
        if granules.len() != params.tiles.len() {
            return Err(Error::ShapeMismatch {
                context: format!("granules for {day}"),
                expected: params.tiles.len(),
                got: granules.len(),
            });
        }
        let per_tile: Vec<Vec<String>> = granules
            .iter()
            .map(|g| selected_subdatasets(g, &params.subset))
            .collect::<Result<_>>()?;
        for (slot, name) in names.iter().enumerate() {
            let sources: Vec<String> = per_tile.iter().map(|t| t[slot].clone()).collect();
            let out = product_dir.join(format!("{}.tif", band_raster_stem(dataset, name, &day)));
            warp_band_to_reference(&sources, &reference, &out)?;
            rasters[slot].push(out);
        }
    }

    // Stack, normalise, scale, mask, aggregate.
    let mut stacks = Vec::with_capacity(selected.len());
    for (slot, &band) in selected.iter().enumerate() {
        let mut loaded = Vec::with_capacity(observations);
        for path in &rasters[slot] {
            loaded.push(read_raster(path)?);
        }
        stacks.push(BandStack {
            band,
            name: names[slot].clone(),
            rasters: loaded,
        });
    }
    let matrix = product_matrix(spec, &params.subset, &stacks, reference.rows, reference.cols)?;

    let record = MatrixRecord {
        dataset: dataset.to_string(),
        projection: reference.projection.clone(),
        resolution: reference.resolution,
        rows: reference.rows,
        columns: reference.cols,
        observations: matrix.observations,
        tiles: params.tiles.clone(),
        names: matrix.names.clone(),
    };
    store::write_matrix(&params.directory, dataset, &matrix.data, &record)?;

    // The warped intermediates are no longer needed once the matrix exists.
    for paths in &rasters {
        for path in paths {
            fs::remove_file(path)?;
        }
    }

    Ok(PrepareReport {
        dataset: dataset.to_string(),
        downloaded_observations: observations,
        observations: matrix.observations,
        matrix_rows: matrix.data.nrows(),
        columns: matrix.names,
    })
}

/// Concatenate every prepared product with the spatial/temporal metadata
/// columns into the final observation table, in an explicit in-code order:
/// products as given, then latitude, longitude, timeID, and the
/// autocorrelation grid.
pub fn assemble_dataset(params: &AssembleParams) -> Result<AssembleReport> {
    let reference = ReferenceImage::open(&params.reference_image)?;

    let mut blocks = Vec::new();
    let mut observations: Option<usize> = None;
    for product in &params.products {
        let dataset = product.dataset_id();
        let (data, record) = store::read_matrix(&params.directory, dataset)?;
        if record.rows != reference.rows || record.columns != reference.cols {
            return Err(Error::ShapeMismatch {
                context: format!("{dataset} grid vs reference"),
                expected: reference.pixels(),
                got: record.rows * record.columns,
            });
        }
        match observations {
            None => observations = Some(record.observations),
            Some(obs) if obs != record.observations => {
                return Err(Error::ShapeMismatch {
                    context: format!("{dataset} observations"),
                    expected: obs,
                    got: record.observations,
                });
            }
            Some(_) => {}
        }
        blocks.push(ColumnBlock::new(record.names.clone(), data)?);
    }
    let observations = observations.ok_or(Error::InvalidArgument {
        arg: "products",
        value: "at least one prepared product is required".to_string(),
    })?;

    let (lat, lon) = coordinate_columns(
        &reference.geotransform,
        reference.rows,
        reference.cols,
        observations,
    );
    let time = period_index(reference.rows, reference.cols, observations);
    let grid =
        autocorrelation_grid(reference.rows, reference.cols, params.grid_lag, observations);

    // Each metadata column also lands on disk as a flat dump with its
    // one-line header, for consumers that read columns individually.
    store::write_column(&params.directory, "latitude", &lat, "latitude")?;
    store::write_column(&params.directory, "longitude", &lon, "longitude")?;
    store::write_column(&params.directory, "time", &time, "timeID")?;
    store::write_column(
        &params.directory,
        "autocorrelationGrid",
        &grid,
        "autocorrelationGrid",
    )?;

    blocks.push(ColumnBlock::column("latitude", lat));
    blocks.push(ColumnBlock::column("longitude", lon));
    blocks.push(ColumnBlock::column("timeID", time));
    blocks.push(ColumnBlock::column("autocorrelationGrid", grid));

    let expected_rows = reference.pixels() * observations;
    let final_matrix = assemble(&blocks, expected_rows)?;

    let record = MatrixRecord {
        dataset: "finalMatrix".to_string(),
        projection: reference.projection.clone(),
        resolution: reference.resolution,
        rows: reference.rows,
        columns: reference.cols,
        observations,
        tiles: Vec::new(),
        names: final_matrix.names.clone(),
    };
    store::write_matrix(&params.directory, "finalMatrix", &final_matrix.data, &record)?;
    let manifest = store::write_manifest(&params.directory, &final_matrix.names)?;

    Ok(AssembleReport {
        rows: final_matrix.data.nrows(),
        columns: final_matrix.names.len(),
        manifest,
    })
}

/// Sentinel-aware summary of a persisted matrix, also written next to the
/// dump as `qualityCheck<stem>.txt`.
pub fn check_matrix(directory: &Path, stem: &str) -> Result<String> {
    let (data, record) = store::read_matrix(directory, stem)?;
    let report = store::summary_report(&data, &record.names);
    fs::write(directory.join(format!("qualityCheck{stem}.txt")), &report)?;
    Ok(report)
}

/// Downstream preprocessing over the assembled table.
#[derive(Debug, Clone)]
pub struct PreprocessParams {
    pub directory: PathBuf,
    pub output: PathBuf,
    /// Predictor columns to lag by one period (renamed `<name>_lag`).
    pub lag: Vec<String>,
    /// Outcome column; kept as-is and joined by its own `<name>_lag`.
    pub target: Option<String>,
    /// Auxiliary covariates to join, as (column name, flat f64 dump path).
    pub covariates: Vec<(String, PathBuf)>,
    /// Columns dropped before export.
    pub drop: Vec<String>,
    pub periods_per_year: usize,
}

/// Join covariates, derive pixel ids and the within-year period factor,
/// sort into (pixel, time) order, lag the predictors, drop the first
/// period, and export the modelling CSV.
pub fn preprocess_table(params: &PreprocessParams) -> Result<Table> {
    let (data, record) = store::read_matrix(&params.directory, "finalMatrix")?;
    let mut table = Table::new(record.names.clone(), data)?;

    for (name, path) in &params.covariates {
        let values = store::read_column(path)?;
        table.append_column(name.clone(), values)?;
    }

    let pixels = record.rows * record.columns;
    table.append_column(
        "uniq_id",
        unique_pixel_ids(pixels, record.observations),
    )?;
    table.sort_by(&["uniq_id", "timeID"])?;

    let period = time_period_factor(table.column("timeID")?, params.periods_per_year);
    table.append_column("time_period", period)?;

    if let Some(target) = &params.target {
        append_lag_column(&mut table, "uniq_id", target)?;
    }
    lag_columns(&mut table, "uniq_id", &params.lag)?;
    for name in &params.drop {
        table.drop_column(name)?;
    }
    drop_first_period(&mut table, "timeID")?;

    write_csv(&table, &params.output)?;
    Ok(table)
}

/// Split the exported table into training and holdout CSVs by whole
/// autocorrelation cells.
pub fn split_table(
    input: &Path,
    training_output: &Path,
    holdout_output: &Path,
    params: &SplitParams,
) -> Result<SplitReport> {
    let table = read_csv(input)?;
    let grid = table.column("autocorrelationGrid")?.to_vec();
    let assignment = spatial_split(&grid, params)?;

    let mut training = table.clone();
    let mut index = 0usize;
    training.retain_rows(|_| {
        let keep = assignment[index];
        index += 1;
        keep
    });

    let mut holdout = table.clone();
    let mut index = 0usize;
    holdout.retain_rows(|_| {
        let keep = !assignment[index];
        index += 1;
        keep
    });

    write_csv(&training, training_output)?;
    write_csv(&holdout, holdout_output)?;

    Ok(SplitReport {
        training_rows: training.nrows(),
        holdout_rows: holdout.nrows(),
        achieved_proportion: training.nrows() as f64 / table.nrows() as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granule_dates_parse_the_julian_segment() {
        let date = granule_date("MOD13Q1.A2010017.h25v08.005.2010034.hdf").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2010, 1, 17).unwrap());
        assert!(granule_date("notagranule.hdf").is_none());
    }
}
