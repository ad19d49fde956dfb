use crate::core::processing::builder::{BandStack, ObservationMatrix, build_matrix};
use crate::core::processing::quality::apply_quality;
use crate::core::product::ProductSpec;
use crate::error::Result;
use crate::types::BandSubset;

/// Full numeric pipeline for one product: raw matrix construction followed
/// by quality masking and 16-day aggregation.
pub fn product_matrix(
    spec: &ProductSpec,
    subset: &BandSubset,
    stacks: &[BandStack],
    rows: usize,
    cols: usize,
) -> Result<ObservationMatrix> {
    let raw = build_matrix(spec, subset, stacks, rows, cols)?;
    apply_quality(spec, &raw)
}
