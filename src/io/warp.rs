//! Mosaic, reprojection, and clipping of MODIS granules.
//!
//! All the geodesy is GDAL's: granule subdatasets are opened through the
//! HDF driver and warped straight into a destination raster that already
//! carries the reference image's grid, which collapses mosaicking,
//! reprojection, and clipping into one step per band and date. Tiles of
//! the same date are warped into the same destination.
use std::path::Path;

use gdal::{Dataset, DriverManager, Metadata};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::io::reference::ReferenceImage;
use crate::types::{BandSubset, SENTINEL};

/// Resolve the science subdataset names of an HDF granule, archive order.
pub fn science_subdatasets(granule: &Path) -> Result<Vec<String>> {
    let dataset = Dataset::open(granule)?;
    let mut names = Vec::new();
    if let Some(entries) = dataset.metadata_domain("SUBDATASETS") {
        for entry in entries {
            if let Some((key, value)) = entry.split_once('=') {
                if key.starts_with("SUBDATASET_") && key.ends_with("_NAME") {
                    names.push(value.to_string());
                }
            }
        }
    }
    if names.is_empty() {
        return Err(Error::InvalidArgument {
            arg: "granule",
            value: format!("{}: no subdatasets", granule.display()),
        });
    }
    Ok(names)
}

/// The selected subdataset names of a granule, subset order.
pub fn selected_subdatasets(granule: &Path, subset: &BandSubset) -> Result<Vec<String>> {
    let all = science_subdatasets(granule)?;
    let mut selected = Vec::with_capacity(subset.selected_count());
    for index in subset.selected_indices() {
        let name = all.get(index).ok_or_else(|| Error::InvalidSubset {
            dataset: granule.display().to_string(),
            got: subset.len(),
            expected: all.len(),
        })?;
        selected.push(name.clone());
    }
    Ok(selected)
}

/// Warp one band's tiles onto the reference grid and write the clipped
/// mosaic as a single-band GeoTIFF. `sources` are GDAL-openable names
/// (subdataset strings), one per tile of the same date.
pub fn warp_band_to_reference(
    sources: &[String],
    reference: &ReferenceImage,
    output: &Path,
) -> Result<()> {
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut dst =
        driver.create_with_band_type::<f64, _>(output, reference.cols, reference.rows, 1)?;
    dst.set_geo_transform(&reference.geotransform)?;
    dst.set_projection(&reference.projection)?;
    {
        let mut band = dst.rasterband(1)?;
        band.set_no_data_value(Some(SENTINEL))?;
        band.fill(SENTINEL, None)?;
    }

    for source in sources {
        debug!(source = %source, output = %output.display(), "warping tile");
        let src = Dataset::open(source)?;
        gdal::raster::reproject(&src, &dst)?;
    }

    info!(
        tiles = sources.len(),
        output = %output.display(),
        "band mosaicked onto the reference grid"
    );
    Ok(())
}

/// File stem for one (band, date) intermediate; sorts band-major then
/// date within band.
pub fn band_raster_stem(dataset: &str, band_name: &str, date: &str) -> String {
    format!("{dataset}_{band_name}_{date}")
}
