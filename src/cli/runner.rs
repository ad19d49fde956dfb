use std::path::PathBuf;

use tracing::info;

use modpro::api::{
    PreprocessParams, assemble_dataset, check_matrix, prepare_product, preprocess_table,
    split_table,
};
use modpro::core::params::{AssembleParams, PrepareParams, SplitParams};
use modpro::types::BandSubset;

use super::args::{CliArgs, Command};
use super::errors::AppError;

fn parse_covariates(raw: &[String]) -> Result<Vec<(String, PathBuf)>, AppError> {
    raw.iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(name, path)| (name.to_string(), PathBuf::from(path)))
                .ok_or_else(|| AppError::InvalidCovariate {
                    value: entry.clone(),
                })
        })
        .collect()
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.log {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    }

    match args.command {
        Command::Prepare {
            directory,
            product,
            subset,
            tiles,
            start,
            end,
            reference,
            username,
            password,
            skip_download,
        } => {
            let params = PrepareParams {
                directory,
                product,
                subset: BandSubset::parse(&subset)?,
                tiles,
                start,
                end,
                reference_image: reference,
                skip_download,
            };
            let credentials = match (&username, &password) {
                (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
                (None, None) if skip_download => None,
                _ => {
                    return Err(AppError::MissingArgument {
                        arg: "--username/--password".to_string(),
                    }
                    .into());
                }
            };
            let report = prepare_product(&params, credentials)?;
            info!(
                dataset = report.dataset.as_str(),
                observations = report.observations,
                rows = report.matrix_rows,
                columns = report.columns.len(),
                "prepare complete"
            );
        }

        Command::Assemble {
            directory,
            products,
            reference,
            grid_lag,
        } => {
            let report = assemble_dataset(&AssembleParams {
                directory,
                products,
                reference_image: reference,
                grid_lag,
            })?;
            info!(
                rows = report.rows,
                columns = report.columns,
                manifest = %report.manifest.display(),
                "assemble complete"
            );
        }

        Command::Check { directory, matrix } => {
            let report = check_matrix(&directory, &matrix)?;
            print!("{report}");
        }

        Command::Preprocess {
            directory,
            output,
            lag,
            target,
            covariate,
            drop,
            periods_per_year,
        } => {
            let covariates = parse_covariates(&covariate)?;
            let table = preprocess_table(&PreprocessParams {
                directory,
                output,
                lag,
                target,
                covariates,
                drop,
                periods_per_year,
            })?;
            info!(
                rows = table.nrows(),
                columns = table.names.len(),
                "preprocess complete"
            );
        }

        Command::Split {
            input,
            training,
            holdout,
            proportion,
            tolerance,
            seed,
        } => {
            let report = split_table(
                &input,
                &training,
                &holdout,
                &SplitParams {
                    proportion,
                    tolerance,
                    seed,
                },
            )?;
            info!(
                training_rows = report.training_rows,
                holdout_rows = report.holdout_rows,
                achieved = format!("{:.3}", report.achieved_proportion),
                "split complete"
            );
        }
    }

    Ok(())
}
