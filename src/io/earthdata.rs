//! LP DAAC archive client.
//!
//! Discovers acquisition dates by parsing the archive's HTML directory
//! listings and downloads the per-tile HDF granules with EarthData basic
//! auth. There is no retry policy: a failed transfer is fatal to the run.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::core::product::ProductSpec;
use crate::error::{Error, Result};

pub const ARCHIVE_URL: &str = "https://e4ftl01.cr.usgs.gov";
/// MODIS Terra branch of the archive.
pub const ARCHIVE_PATH: &str = "MOLT";

pub struct EarthDataClient {
    client: reqwest::blocking::Client,
    username: String,
    password: String,
    base_url: String,
}

impl EarthDataClient {
    pub fn new(username: &str, password: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(EarthDataClient {
            client,
            username: username.to_string(),
            password: password.to_string(),
            base_url: ARCHIVE_URL.to_string(),
        })
    }

    fn fetch_listing(&self, url: &str) -> Result<String> {
        debug!(url, "fetching directory listing");
        let response = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()?;
        if !response.status().is_success() {
            return Err(Error::External(format!(
                "directory listing failed: {} ({url})",
                response.status()
            )));
        }
        Ok(response.text()?)
    }

    /// Acquisition dates available for a dataset within the range,
    /// oldest first.
    pub fn list_dates(
        &self,
        dataset: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>> {
        let url = format!("{}/{}/{}/", self.base_url, ARCHIVE_PATH, dataset);
        let html = self.fetch_listing(&url)?;
        let mut dates = parse_date_listing(&html);
        dates.retain(|d| *d >= start && *d <= end);
        dates.sort_unstable();
        dates.dedup();
        info!(dataset, observations = dates.len(), "acquisition dates listed");
        Ok(dates)
    }

    /// Download the granules of one acquisition date for the requested
    /// tiles into `dest`, returning the written paths in tile order.
    pub fn download_day(
        &self,
        dataset: &str,
        date: NaiveDate,
        tiles: &[String],
        dest: &Path,
    ) -> Result<Vec<PathBuf>> {
        let day = date.format("%Y.%m.%d").to_string();
        let url = format!("{}/{}/{}/{}/", self.base_url, ARCHIVE_PATH, dataset, day);
        let html = self.fetch_listing(&url)?;
        let names = parse_granule_listing(&html);

        let mut written = Vec::with_capacity(tiles.len());
        for tile in tiles {
            let needle = format!(".{tile}.");
            let name = names
                .iter()
                .find(|n| n.contains(&needle))
                .ok_or_else(|| {
                    Error::External(format!("no {dataset} granule for tile {tile} on {day}"))
                })?;
            let target = dest.join(name);
            if !target.exists() {
                let response = self
                    .client
                    .get(format!("{url}{name}"))
                    .basic_auth(&self.username, Some(&self.password))
                    .send()?;
                if !response.status().is_success() {
                    return Err(Error::External(format!(
                        "granule download failed: {} ({name})",
                        response.status()
                    )));
                }
                fs::write(&target, response.bytes()?)?;
                debug!(granule = name.as_str(), "granule downloaded");
            }
            written.push(target);
        }
        Ok(written)
    }
}

/// At most two adjacent tiles per run.
pub fn check_tile_limit(tiles: &[String]) -> Result<()> {
    if tiles.is_empty() || tiles.len() > 2 {
        return Err(Error::TooManyTiles { count: tiles.len() });
    }
    Ok(())
}

/// Products finer than the 16-day canonical interval need an even number
/// of observations to aggregate into pairs.
pub fn check_observation_count(spec: &ProductSpec, observations: usize) -> Result<()> {
    if spec.periods_per_aggregate > 1 && observations % spec.periods_per_aggregate != 0 {
        return Err(Error::OddObservations {
            dataset: spec.product.dataset_id().to_string(),
            observations,
        });
    }
    Ok(())
}

fn extract_href(line: &str) -> Option<&str> {
    let start = line.find("href=\"")? + 6;
    let end = line[start..].find('"')?;
    Some(&line[start..start + end])
}

/// `YYYY.MM.DD/` directory entries of the dataset listing.
fn parse_date_listing(html: &str) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    for line in html.lines() {
        if let Some(href) = extract_href(line) {
            let name = href.trim_end_matches('/');
            if let Ok(date) = NaiveDate::parse_from_str(name, "%Y.%m.%d") {
                dates.push(date);
            }
        }
    }
    dates
}

/// `.hdf` granule entries of a date listing.
fn parse_granule_listing(html: &str) -> Vec<String> {
    let mut names = Vec::new();
    for line in html.lines() {
        if let Some(href) = extract_href(line) {
            if href.ends_with(".hdf") && !href.contains('/') {
                names.push(href.to_string());
            }
        }
    }
    names
}
