//! Properties of the matrix-construction core: flattening order, fill
//! normalisation, quality masking, masking-aware aggregation, the affine
//! transform, and the autocorrelation lattice.
use approx::assert_abs_diff_eq;
use ndarray::{Array2, array};

use modpro::SENTINEL;
use modpro::core::processing::assemble::{ColumnBlock, assemble};
use modpro::core::processing::builder::{BandStack, ObservationMatrix, build_matrix};
use modpro::core::processing::metadata::{autocorrelation_grid, grid_id, pixel_to_coord};
use modpro::core::processing::quality::apply_quality;
use modpro::core::product::{MOD09A1, MOD11A2, MOD13Q1, MOD15A2, MOD17A2, ProductSpec};
use modpro::types::{BandSubset, Product};

fn single_band_subset(spec: &ProductSpec, band: usize) -> BandSubset {
    let bits: String = (0..spec.band_count())
        .map(|i| if i == band { '1' } else { '0' })
        .collect();
    BandSubset::parse(&bits).unwrap()
}

#[test]
fn builder_output_shape_and_order_for_synthetic_stack() {
    // 3 rows x 2 cols x 4 timesteps, one band.
    let (rows, cols, steps) = (3usize, 2usize, 4usize);
    let rasters: Vec<Array2<f64>> = (0..steps)
        .map(|t| {
            Array2::from_shape_fn((rows, cols), |(r, c)| {
                (t * rows * cols + r * cols + c) as f64
            })
        })
        .collect();
    let subset = single_band_subset(&MOD13Q1, 10); // DOY band, scale 1.0
    let stacks = [BandStack {
        band: 10,
        name: "DOY".to_string(),
        rasters,
    }];
    let matrix = build_matrix(&MOD13Q1, &subset, &stacks, rows, cols).unwrap();

    assert_eq!(matrix.data.dim(), (rows * cols * steps, 1));
    // Row-major flattening preserved: the column is exactly 0..N.
    for (i, &v) in matrix.data.column(0).iter().enumerate() {
        assert_eq!(v, i as f64);
    }
}

#[test]
fn every_product_fill_value_maps_to_the_sentinel() {
    let cases: &[(&ProductSpec, usize, f64)] = &[
        (&MOD09A1, 0, -28672.0),
        (&MOD11A2, 0, 0.0),
        (&MOD13Q1, 1, -3000.0),
        (&MOD15A2, 1, 249.0),
        (&MOD17A2, 0, 30001.0),
    ];
    for &(spec, band, fill) in cases {
        let subset = single_band_subset(spec, band);
        let stacks = [BandStack {
            band,
            name: spec.band_names[band].to_string(),
            rasters: vec![array![[fill]]],
        }];
        let matrix = build_matrix(spec, &subset, &stacks, 1, 1).unwrap();
        assert_eq!(
            matrix.data[[0, 0]],
            SENTINEL,
            "fill not normalised for {}",
            spec.product
        );
    }
}

#[test]
fn quality_bit_zero_masks_all_other_columns() {
    let matrix = ObservationMatrix {
        data: array![
            [0.41, 0.52, 2.0, 14.0],
            [0.43, 0.54, 3.0, 15.0],
        ],
        names: vec![
            "NDVI".to_string(),
            "EVI".to_string(),
            "Quality".to_string(),
            "PixelReliability".to_string(),
        ],
        rows: 1,
        cols: 2,
        observations: 1,
    };
    let masked = apply_quality(&MOD13Q1, &matrix).unwrap();

    assert_eq!(masked.names, vec!["NDVI", "EVI", "PixelReliability"]);
    // Pixel 0: quality code 2, bit 0 clear, values survive.
    assert_abs_diff_eq!(masked.data[[0, 0]], 0.41);
    // Pixel 1: quality code 3, bit 0 set, every retained column sentineled.
    for j in 0..3 {
        assert_eq!(masked.data[[1, j]], SENTINEL);
    }
}

#[test]
fn pair_average_with_one_masked_member_equals_the_unmasked_value() {
    let matrix = ObservationMatrix {
        data: array![[302.5, 0.0], [311.5, 1.0]],
        names: vec!["LST".to_string(), "Quality".to_string()],
        rows: 1,
        cols: 1,
        observations: 2,
    };
    let out = apply_quality(&MOD11A2, &matrix).unwrap();
    assert_eq!(out.observations, 1);
    // Not NaN, not (302.5 + 0)/2 — exactly the unmasked member.
    assert_abs_diff_eq!(out.data[[0, 0]], 302.5);
}

#[test]
fn affine_transform_matches_the_reference_origin_and_step() {
    let gt = [500_000.0, 231.656, 0.0, 900_000.0, 0.0, -231.656];
    assert_eq!(pixel_to_coord(&gt, 0, 0), (gt[0], gt[3]));
    let (x0, _) = pixel_to_coord(&gt, 0, 0);
    let (x1, _) = pixel_to_coord(&gt, 1, 0);
    assert_abs_diff_eq!(x1 - x0, gt[1]);
}

#[test]
fn autocorrelation_blocks_share_one_id_and_split_at_the_boundary() {
    let (rows, cols, lag) = (310usize, 460usize, 150usize);
    for r in 0..lag {
        for c in 0..lag {
            assert_eq!(grid_id(r, c, cols, lag), grid_id(0, 0, cols, lag));
        }
    }
    assert_ne!(grid_id(0, 0, cols, lag), grid_id(lag, lag, cols, lag));

    // The full column tiles every pixel and period.
    let grid = autocorrelation_grid(rows, cols, lag, 2);
    assert_eq!(grid.len(), rows * cols * 2);
    assert_eq!(grid[0], 1.0);
}

#[test]
fn manifest_matches_column_count_for_any_block_set() {
    for n in 1..6usize {
        let blocks: Vec<ColumnBlock> = (0..n)
            .map(|i| ColumnBlock::column(format!("var{i}"), vec![i as f64; 10]))
            .collect();
        let out = assemble(&blocks, 10).unwrap();
        assert_eq!(out.names.len(), n);
        assert_eq!(out.data.ncols(), n);
    }
}

#[test]
fn dataset_ids_follow_the_archive_naming() {
    assert_eq!(Product::Mod13Q1.dataset_id(), "MOD13Q1.005");
    assert_eq!(ProductSpec::for_product(Product::Mod15A2).quality_band, 0);
}
