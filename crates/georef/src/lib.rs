//! Georeferencing and raster products for VIIRS swaths.
//!
//! # Architecture
//!
//! ```text
//! Fileset (GIMGO + SVI01..SVI05)
//!      │
//!      ▼
//! FilesetProcessor
//!      │
//!      ├─► ResolvedGeolocation::resolve   lat/lon ─► grid indices (once)
//!      │
//!      └─► BandRasterizer::rasterize      per band: scatter, flip, fill, calibrate
//!               │
//!               ▼
//!          calibrated swath raster ─► NdviComputer ─► (cloud mask) ─► NDVI raster
//!                                                                        │
//!                            CompositeBuilder::build (max over a period) ◄┘
//!                                        │
//!                                        ▼
//!                            DynamicsComputer::compute (b1 vs b2)
//! ```

pub mod align;
pub mod cloud_mask;
pub mod composite;
pub mod dynamics;
pub mod fill;
pub mod geolocation;
pub mod ndvi;
pub mod processor;
pub mod rasterize;

pub use align::{common_windows, crop_to_common, Window};
pub use cloud_mask::CloudMaskReprojector;
pub use composite::{merge_max, CompositeBuilder, CompositeResult, TaggedNdvi};
pub use dynamics::{DynamicsComputer, DynamicsResult, DYNAMICS_BAND};
pub use fill::{fill_nodata_holes, FillParams};
pub use geolocation::ResolvedGeolocation;
pub use ndvi::{compute_ndvi, NdviComputer, NDVI_BAND};
pub use processor::{BandFailure, FilesetProcessor, ProcessedFileset};
pub use rasterize::BandRasterizer;
