//! Common types shared across the VIIRS NDVI pipeline crates.

pub mod error;
pub mod geotransform;
pub mod io;
pub mod nodata;
pub mod period;
pub mod raster;

pub use error::{Result, ViirsError};
pub use geotransform::GeoTransform;
pub use io::{RasterStore, SwathReader};
pub use period::Period;
pub use raster::{trimming_offsets, Raster, RasterBand, TrimOffsets};
