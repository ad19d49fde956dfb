//! Black-box model collaborators and the orchestration around them.
//!
//! Training engines (gradient boosting, deep nets) and the approximate
//! nearest-neighbour index are external services; this module owns only
//! the seams: the `Regressor` and `NeighborIndex` traits, a candidate
//! hyperparameter search with per-trial failure isolation, the geographic
//! baseline orchestration, and holdout scoring.
use std::path::Path;

use chrono::Local;
use ndarray::{ArrayView1, ArrayView2};
use tracing::{info, warn};

use crate::core::processing::table::Table;
use crate::error::{Error, Result};
use crate::types::SENTINEL;

/// Interface every external regression engine is driven through:
/// tabular features/target/weights in, a prediction vector out.
pub trait Regressor {
    fn fit(
        &mut self,
        features: ArrayView2<'_, f64>,
        target: ArrayView1<'_, f64>,
        weights: Option<ArrayView1<'_, f64>>,
    ) -> Result<()>;

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>>;
}

/// Interface to an external approximate nearest-neighbour index over
/// (latitude, longitude, time-period) points.
pub trait NeighborIndex {
    fn add(&mut self, id: usize, point: [f64; 3]);
    fn build(&mut self, trees: usize) -> Result<()>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Ids of the `count` nearest items, best first. `search_budget` caps
    /// the index-side node inspections.
    fn nearest(&self, point: [f64; 3], count: usize, search_budget: usize) -> Vec<usize>;
}

/// One point of the hyperparameter space, as named values.
pub type Candidate = Vec<(String, f64)>;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TrialStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Trial {
    pub candidate: Candidate,
    pub loss: Option<f64>,
    pub status: TrialStatus,
    pub elapsed_secs: f64,
    pub datetime: String,
}

#[derive(Debug, Default)]
pub struct SearchReport {
    pub trials: Vec<Trial>,
}

impl SearchReport {
    /// The lowest-loss successful trial, if any trial succeeded.
    pub fn best(&self) -> Option<&Trial> {
        self.trials
            .iter()
            .filter(|t| t.status == TrialStatus::Ok)
            .min_by(|a, b| {
                a.loss
                    .unwrap_or(f64::INFINITY)
                    .total_cmp(&b.loss.unwrap_or(f64::INFINITY))
            })
    }
}

/// Drive a black-box objective over the candidate list.
///
/// A failing fit is the one recoverable error in the pipeline: the trial
/// is recorded with no loss and the search moves on. Every trial is
/// appended to the CSV log as it finishes so a crashed search keeps its
/// completed rows.
pub fn search_candidates<F>(
    candidates: &[Candidate],
    mut objective: F,
    log_path: Option<&Path>,
) -> Result<SearchReport>
where
    F: FnMut(&Candidate) -> Result<f64>,
{
    let mut writer = match log_path {
        Some(path) => {
            let mut w = csv::Writer::from_path(path)?;
            let mut header = vec!["loss".to_string()];
            if let Some(first) = candidates.first() {
                header.extend(first.iter().map(|(k, _)| k.clone()));
            }
            header.push("elapsed_secs".to_string());
            header.push("datetime".to_string());
            w.write_record(&header)?;
            Some(w)
        }
        None => None,
    };

    let mut report = SearchReport::default();
    for candidate in candidates {
        let started = std::time::Instant::now();
        let outcome = objective(candidate);
        let elapsed_secs = started.elapsed().as_secs_f64();
        let datetime = Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();

        let trial = match outcome {
            Ok(loss) => Trial {
                candidate: candidate.clone(),
                loss: Some(loss),
                status: TrialStatus::Ok,
                elapsed_secs,
                datetime,
            },
            Err(e) => {
                warn!(error = %e, "trial failed, continuing search");
                Trial {
                    candidate: candidate.clone(),
                    loss: None,
                    status: TrialStatus::Failed,
                    elapsed_secs,
                    datetime,
                }
            }
        };

        if let Some(w) = writer.as_mut() {
            let mut record = vec![
                trial.loss.map(|l| l.to_string()).unwrap_or_default(),
            ];
            record.extend(trial.candidate.iter().map(|(_, v)| v.to_string()));
            record.push(trial.elapsed_secs.to_string());
            record.push(trial.datetime.clone());
            w.write_record(&record)?;
            w.flush()?;
        }
        report.trials.push(trial);
    }

    info!(
        trials = report.trials.len(),
        failed = report
            .trials
            .iter()
            .filter(|t| t.status == TrialStatus::Failed)
            .count(),
        "hyperparameter search finished"
    );
    Ok(report)
}

/// Geographic nearest-neighbour baseline configuration.
#[derive(Debug, Clone)]
pub struct BaselineConfig {
    /// Trees to build in the external index.
    pub trees: usize,
    /// Neighbor budget for the earliest predictable time step; the budget
    /// descends linearly to `neighbors_floor` at the last step.
    pub neighbors_start: usize,
    pub neighbors_floor: usize,
    /// Index-side search budget per query.
    pub search_budget: usize,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            trees: 50,
            neighbors_start: 30,
            neighbors_floor: 10,
            search_budget: 100,
        }
    }
}

/// Linearly descending per-time-step neighbor budgets.
pub fn neighbor_schedule(steps: usize, start: usize, floor: usize) -> Vec<usize> {
    if steps <= 1 {
        return vec![start; steps];
    }
    (0..steps)
        .map(|i| {
            let frac = i as f64 / (steps - 1) as f64;
            (start as f64 + (floor as f64 - start as f64) * frac).round() as usize
        })
        .collect()
}

/// Predict the target for every table row from the mean of its nearest
/// geographic neighbors at strictly earlier time steps.
///
/// Rows whose neighbor set is empty after the time filter fall back to the
/// historical mean of the target over all strictly earlier time steps.
pub fn baseline_predict<I: NeighborIndex>(
    index: &mut I,
    table: &Table,
    target: &str,
    cfg: &BaselineConfig,
) -> Result<Vec<f64>> {
    let lat = table.column("latitude")?.to_vec();
    let lon = table.column("longitude")?.to_vec();
    let period = table.column("time_period")?.to_vec();
    let time = table.column("timeID")?.to_vec();
    let y = table.column(target)?.to_vec();

    for i in 0..table.nrows() {
        index.add(i, [lat[i], lon[i], period[i]]);
    }
    index.build(cfg.trees)?;
    if index.len() != table.nrows() {
        return Err(Error::ShapeMismatch {
            context: "neighbor index items".to_string(),
            expected: table.nrows(),
            got: index.len(),
        });
    }

    let mut steps: Vec<u64> = time.iter().map(|&t| t as u64).collect();
    steps.sort_unstable();
    steps.dedup();
    let schedule = neighbor_schedule(steps.len(), cfg.neighbors_start, cfg.neighbors_floor);

    // Historical target mean per time step, over strictly earlier steps.
    let historical: Vec<f64> = steps
        .iter()
        .map(|&s| {
            let earlier: Vec<f64> = time
                .iter()
                .zip(&y)
                .filter(|&(&t, &v)| (t as u64) < s && v != SENTINEL)
                .map(|(_, &v)| v)
                .collect();
            if earlier.is_empty() {
                SENTINEL
            } else {
                earlier.iter().sum::<f64>() / earlier.len() as f64
            }
        })
        .collect();

    let step_of = |t: f64| steps.binary_search(&(t as u64)).unwrap_or(0);

    let mut predictions = Vec::with_capacity(table.nrows());
    for i in 0..table.nrows() {
        let s = step_of(time[i]);
        let budget = schedule[s];
        let ids = index.nearest([lat[i], lon[i], period[i]], budget, cfg.search_budget);
        let values: Vec<f64> = ids
            .into_iter()
            .filter(|&j| time[j] < time[i] && y[j] != SENTINEL)
            .map(|j| y[j])
            .collect();
        let prediction = if values.is_empty() {
            historical[s]
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        };
        predictions.push(prediction);
    }

    info!(rows = predictions.len(), "baseline predictions computed");
    Ok(predictions)
}

/// Fit an external engine on the training slice and score it on the
/// holdout slice. The engine is the black box; this is the whole contract
/// the pipeline holds it to.
pub fn holdout_score<R: Regressor>(
    model: &mut R,
    train_features: ArrayView2<'_, f64>,
    train_target: ArrayView1<'_, f64>,
    weights: Option<ArrayView1<'_, f64>>,
    holdout_features: ArrayView2<'_, f64>,
    holdout_target: ArrayView1<'_, f64>,
) -> Result<f64> {
    model.fit(train_features, train_target, weights)?;
    let predicted = model.predict(holdout_features)?;
    let truth = holdout_target.to_vec();
    mean_squared_error(&truth, &predicted)
}

/// Mean squared error over rows where the truth is not the sentinel.
pub fn mean_squared_error(truth: &[f64], predicted: &[f64]) -> Result<f64> {
    if truth.len() != predicted.len() {
        return Err(Error::ShapeMismatch {
            context: "prediction vector".to_string(),
            expected: truth.len(),
            got: predicted.len(),
        });
    }
    let mut sum = 0.0;
    let mut n = 0usize;
    for (&t, &p) in truth.iter().zip(predicted) {
        if t != SENTINEL {
            sum += (t - p) * (t - p);
            n += 1;
        }
    }
    if n == 0 {
        return Err(Error::ShapeMismatch {
            context: "scored rows".to_string(),
            expected: 1,
            got: 0,
        });
    }
    Ok(sum / n as f64)
}

pub fn root_mean_squared_error(truth: &[f64], predicted: &[f64]) -> Result<f64> {
    Ok(mean_squared_error(truth, predicted)?.sqrt())
}
