use std::path::{Path, PathBuf};

use gdal::Dataset;
use ndarray::Array2;

use crate::error::{Error, Result};

/// The georeferencing template every granule is resampled onto.
///
/// Read once at the start of a run and never mutated; all shape and
/// projection questions downstream are answered from this record.
#[derive(Debug)]
pub struct ReferenceImage {
    pub path: PathBuf,
    /// Projection in WKT format.
    pub projection: String,
    /// Affine geotransform coefficients
    /// ([origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height]).
    pub geotransform: [f64; 6],
    pub rows: usize,
    pub cols: usize,
    /// Pixel size taken from the transform's row-step coefficient.
    pub resolution: f64,
    /// Driver short name (e.g. `GTiff`), reused for every intermediate.
    pub driver: String,
}

impl ReferenceImage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let dataset = Dataset::open(path.as_ref())?;
        let (cols, rows) = dataset.raster_size();
        if dataset.raster_count() == 0 {
            return Err(Error::InvalidArgument {
                arg: "reference",
                value: format!("{}: no raster bands", path.as_ref().display()),
            });
        }
        let geotransform = dataset.geo_transform()?;
        let projection = dataset.projection();
        let driver = dataset.driver().short_name();

        Ok(ReferenceImage {
            path: path.as_ref().to_path_buf(),
            projection,
            geotransform,
            rows,
            cols,
            resolution: geotransform[1],
            driver,
        })
    }

    pub fn pixels(&self) -> usize {
        self.rows * self.cols
    }
}

/// Read a single-band raster into an f64 array of shape (rows, cols).
pub fn read_raster<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    let dataset = Dataset::open(path.as_ref())?;
    let (cols, rows) = dataset.raster_size();
    let band = dataset.rasterband(1)?;
    let buf = band.read_as::<f64>((0, 0), (cols, rows), (cols, rows), None)?;
    let data = buf.data().to_vec();
    Array2::from_shape_vec((rows, cols), data).map_err(|_| Error::ShapeMismatch {
        context: format!("raster {}", path.as_ref().display()),
        expected: rows * cols,
        got: 0,
    })
}
