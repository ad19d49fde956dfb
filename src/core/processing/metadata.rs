//! Spatial and temporal metadata columns.
//!
//! Derives per-pixel projected coordinates from the reference affine
//! transform, the repeating time-period index, and the coarse
//! autocorrelation lattice used to keep spatially adjacent pixels on the
//! same side of the train/holdout split.
use tracing::info;

/// Default autocorrelation lattice cell size in pixels.
pub const DEFAULT_GRID_LAG: usize = 150;

/// Projected coordinate of a pixel, GDAL geotransform convention
/// (`[x_off, a, b, y_off, d, e]`):
/// `x' = a*row + b*col + x_off`, `y' = d*row + e*col + y_off`.
pub fn pixel_to_coord(gt: &[f64; 6], row: usize, col: usize) -> (f64, f64) {
    let (x_off, a, b) = (gt[0], gt[1], gt[2]);
    let (y_off, d, e) = (gt[3], gt[4], gt[5]);
    let x = a * row as f64 + b * col as f64 + x_off;
    let y = d * row as f64 + e * col as f64 + y_off;
    (x, y)
}

/// Per-pixel coordinate columns replicated across every time period, in
/// the matrix row order (`t * rows * cols + pixel`).
pub fn coordinate_columns(
    gt: &[f64; 6],
    rows: usize,
    cols: usize,
    observations: usize,
) -> (Vec<f64>, Vec<f64>) {
    let pixels = rows * cols;
    let mut lat = Vec::with_capacity(pixels);
    let mut lon = Vec::with_capacity(pixels);
    for row in 0..rows {
        for col in 0..cols {
            let (x, y) = pixel_to_coord(gt, row, col);
            lat.push(x);
            lon.push(y);
        }
    }

    let mut lat_full = Vec::with_capacity(pixels * observations);
    let mut lon_full = Vec::with_capacity(pixels * observations);
    for _ in 0..observations {
        lat_full.extend_from_slice(&lat);
        lon_full.extend_from_slice(&lon);
    }
    info!(pixels, observations, "coordinate columns generated");
    (lat_full, lon_full)
}

/// Repeating time-period index `1..=observations`, one block of
/// `rows * cols` entries per period.
pub fn period_index(rows: usize, cols: usize, observations: usize) -> Vec<f64> {
    let pixels = rows * cols;
    let mut out = Vec::with_capacity(pixels * observations);
    for t in 1..=observations {
        out.extend(std::iter::repeat(t as f64).take(pixels));
    }
    out
}

/// Autocorrelation grid id for a single pixel; ids are 1-based and laid
/// out row-major over the `(rows/lag + 1) x (cols/lag + 1)` lattice.
pub fn grid_id(row: usize, col: usize, cols: usize, lag: usize) -> u64 {
    let lattice_cols = cols / lag + 1;
    (row / lag) as u64 * lattice_cols as u64 + (col / lag) as u64 + 1
}

/// Per-pixel autocorrelation grid ids replicated across every time period.
pub fn autocorrelation_grid(
    rows: usize,
    cols: usize,
    lag: usize,
    observations: usize,
) -> Vec<f64> {
    let pixels = rows * cols;
    let mut cell = Vec::with_capacity(pixels);
    for row in 0..rows {
        for col in 0..cols {
            cell.push(grid_id(row, col, cols, lag) as f64);
        }
    }
    let mut out = Vec::with_capacity(pixels * observations);
    for _ in 0..observations {
        out.extend_from_slice(&cell);
    }
    info!(lag, cells = (rows / lag + 1) * (cols / lag + 1), "autocorrelation grid generated");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const GT: [f64; 6] = [500_000.0, 250.0, 0.0, 8_000_000.0, 0.0, -250.0];

    #[test]
    fn origin_pixel_maps_to_origin_offsets() {
        assert_eq!(pixel_to_coord(&GT, 0, 0), (500_000.0, 8_000_000.0));
    }

    #[test]
    fn row_step_moves_by_the_row_coefficient() {
        let (x0, _) = pixel_to_coord(&GT, 0, 0);
        let (x1, _) = pixel_to_coord(&GT, 1, 0);
        assert_eq!(x1 - x0, GT[1]);
    }

    #[test]
    fn coordinates_replicate_across_periods() {
        let (lat, lon) = coordinate_columns(&GT, 2, 3, 4);
        assert_eq!(lat.len(), 2 * 3 * 4);
        assert_eq!(lon.len(), 2 * 3 * 4);
        // Same pixel, different periods.
        assert_eq!(lat[0], lat[6]);
        assert_eq!(lon[5], lon[11]);
    }

    #[test]
    fn period_index_cycles_one_to_observations() {
        let t = period_index(1, 2, 3);
        assert_eq!(t, vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
    }

    #[test]
    fn pixels_in_one_block_share_an_id() {
        let lag = 150;
        let a = grid_id(0, 0, 400, lag);
        let b = grid_id(lag - 1, lag - 1, 400, lag);
        assert_eq!(a, b);
    }

    #[test]
    fn block_boundary_changes_the_id() {
        let lag = 150;
        assert_ne!(grid_id(0, 0, 400, lag), grid_id(lag, lag, 400, lag));
    }

    #[test]
    fn grid_ids_are_one_based_and_tile_the_extent() {
        let grid = autocorrelation_grid(4, 4, 2, 1);
        assert_eq!(grid.len(), 16);
        assert_eq!(grid[0], 1.0);
        // 4/2 + 1 = 3 lattice columns; pixel (2,2) sits in lattice cell (1,1).
        assert_eq!(grid[2 * 4 + 2], (3 + 1 + 1) as f64);
    }
}
