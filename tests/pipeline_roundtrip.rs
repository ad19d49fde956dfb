//! Disk round-trips of the downstream stages: the matrix store, the
//! preprocessing into a modelling CSV, and the spatial split.
use std::fs::File;
use std::io::Write;

use ndarray::Array2;
use tempfile::tempdir;

use modpro::api::{PreprocessParams, preprocess_table, split_table};
use modpro::core::params::SplitParams;
use modpro::core::processing::table::Table;
use modpro::io::store::{self, MatrixRecord};
use modpro::io::table::{read_csv, write_csv};
use modpro::SENTINEL;

/// A synthetic final matrix on a 2x2 grid over 3 periods, in matrix row
/// order (`t * pixels + p`).
fn write_final_matrix(dir: &std::path::Path) -> (usize, usize) {
    let (pixels, observations) = (4usize, 3usize);
    let rows = pixels * observations;
    let names = vec![
        "EVI".to_string(),
        "latitude".to_string(),
        "longitude".to_string(),
        "timeID".to_string(),
        "autocorrelationGrid".to_string(),
    ];
    let mut data = Array2::<f64>::zeros((rows, names.len()));
    for t in 0..observations {
        for p in 0..pixels {
            let i = t * pixels + p;
            data[[i, 0]] = (t * 10 + p) as f64; // EVI
            data[[i, 1]] = p as f64; // latitude
            data[[i, 2]] = -(p as f64); // longitude
            data[[i, 3]] = (t + 1) as f64; // timeID
            data[[i, 4]] = (p % 2 + 1) as f64; // two grid cells
        }
    }
    let record = MatrixRecord {
        dataset: "finalMatrix".to_string(),
        projection: "PROJCS[\"unnamed\"]".to_string(),
        resolution: 250.0,
        rows: 2,
        columns: 2,
        observations,
        tiles: vec![],
        names,
    };
    store::write_matrix(dir, "finalMatrix", &data, &record).unwrap();
    (pixels, observations)
}

#[test]
fn preprocess_joins_lags_and_drops_the_first_period() {
    let dir = tempdir().unwrap();
    let (pixels, observations) = write_final_matrix(dir.path());

    // Flat f64 covariate dump, one value per matrix row.
    let covariate_path = dir.path().join("landuse.bin");
    {
        let mut f = File::create(&covariate_path).unwrap();
        for i in 0..pixels * observations {
            f.write_all(&((i % 3) as f64).to_le_bytes()).unwrap();
        }
    }

    let output = dir.path().join("model_input.csv");
    let table = preprocess_table(&PreprocessParams {
        directory: dir.path().to_path_buf(),
        output: output.clone(),
        lag: vec![],
        target: Some("EVI".to_string()),
        covariates: vec![("landuse".to_string(), covariate_path)],
        drop: vec![],
        periods_per_year: 3,
    })
    .unwrap();

    // First period dropped: 12 rows -> 8.
    assert_eq!(table.nrows(), pixels * (observations - 1));
    // The outcome survives next to its own lag.
    assert!(table.names.contains(&"EVI".to_string()));
    assert!(table.names.contains(&"EVI_lag".to_string()));
    assert!(table.names.contains(&"landuse".to_string()));
    assert!(table.names.contains(&"uniq_id".to_string()));
    assert!(table.names.contains(&"time_period".to_string()));

    // Rows are (pixel, time) sorted; each pixel's period-2 lag equals its
    // period-1 EVI.
    let lag = table.column("EVI_lag").unwrap().to_vec();
    let id = table.column("uniq_id").unwrap().to_vec();
    let time = table.column("timeID").unwrap().to_vec();
    for i in 0..table.nrows() {
        if time[i] == 2.0 {
            let pixel = id[i] as usize - 1;
            assert_eq!(lag[i], pixel as f64);
        }
    }

    // The export round-trips.
    let back = read_csv(&output).unwrap();
    assert_eq!(back.names, table.names);
    assert_eq!(back.nrows(), table.nrows());
}

#[test]
fn export_has_no_sentinel_once_the_first_period_is_gone() {
    let dir = tempdir().unwrap();
    write_final_matrix(dir.path());

    // Dropping period 1 removes every undefined lag, so nothing in the
    // exported file should be the sentinel.
    let output = dir.path().join("clean.csv");
    let table = preprocess_table(&PreprocessParams {
        directory: dir.path().to_path_buf(),
        output: output.clone(),
        lag: vec!["EVI".to_string()],
        target: None,
        covariates: vec![],
        drop: vec![],
        periods_per_year: 3,
    })
    .unwrap();
    assert!(table.column("EVI_lag").unwrap().iter().all(|&v| v != SENTINEL));

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(!text.contains("9999"));
}

#[test]
fn split_respects_cells_and_reports_the_proportion() {
    let dir = tempdir().unwrap();

    // 10 cells x 20 rows each.
    let rows = 200usize;
    let names = vec!["EVI".to_string(), "autocorrelationGrid".to_string()];
    let mut data = Array2::<f64>::zeros((rows, 2));
    for i in 0..rows {
        data[[i, 0]] = i as f64;
        data[[i, 1]] = (i / 20 + 1) as f64;
    }
    let input = dir.path().join("table.csv");
    write_csv(&Table::new(names, data).unwrap(), &input).unwrap();

    let training = dir.path().join("training.csv");
    let holdout = dir.path().join("holdout.csv");
    let report = split_table(
        &input,
        &training,
        &holdout,
        &SplitParams {
            proportion: 0.8,
            tolerance: 0.01,
            seed: 42,
        },
    )
    .unwrap();

    assert_eq!(report.training_rows + report.holdout_rows, rows);
    assert!((report.achieved_proportion - 0.8).abs() <= 0.01);

    // No cell straddles the boundary.
    let train = read_csv(&training).unwrap();
    let hold = read_csv(&holdout).unwrap();
    let train_cells: std::collections::HashSet<u64> = train
        .column("autocorrelationGrid")
        .unwrap()
        .iter()
        .map(|&g| g as u64)
        .collect();
    let hold_cells: std::collections::HashSet<u64> = hold
        .column("autocorrelationGrid")
        .unwrap()
        .iter()
        .map(|&g| g as u64)
        .collect();
    assert!(train_cells.is_disjoint(&hold_cells));
}
