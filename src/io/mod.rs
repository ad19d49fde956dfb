//! I/O layer: the LP DAAC download client, the reference-image reader,
//! GDAL-backed warping of granules onto the reference grid, the binary
//! matrix store with its JSON shape records, and the CSV table boundary.
pub mod earthdata;
pub use earthdata::EarthDataClient;

pub mod reference;
pub use reference::ReferenceImage;

pub mod warp;

pub mod store;
pub use store::MatrixRecord;

pub mod table;
