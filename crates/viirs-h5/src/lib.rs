//! HDF5 access to VIIRS SDR granules.
//!
//! Granules keep their arrays under `All_Data/<product>_All/`, e.g.
//!
//! ```text
//! /All_Data/VIIRS-IMG-GEO_All/Latitude
//! /All_Data/VIIRS-IMG-GEO_All/Longitude
//! /All_Data/VIIRS-I1-SDR_All/Reflectance
//! /All_Data/VIIRS-I1-SDR_All/ReflectanceFactors
//! ```
//!
//! [`H5SwathReader`] finds datasets by full path or by their last path
//! component, so callers only need to know `Latitude` or `Reflectance`.

mod reader;

pub use reader::{silence_hdf5_errors, H5SwathReader};
