//! Core processing building blocks: product constant tables, matrix
//! construction, quality masking, metadata columns, assembly, and the
//! downstream table/split/model orchestration. These are internal
//! primitives consumed by the high-level `api` module.
pub mod model;
pub mod params;
pub mod processing;
pub mod product;
