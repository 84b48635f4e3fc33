//! Interfaces to the file formats the pipeline reads and writes.
//!
//! Implementations are blocking. Each worker owns its own instances; no
//! handle is shared between workers.

use std::path::Path;

use ndarray::Array2;

use crate::error::Result;
use crate::raster::Raster;

/// Reads arrays out of swath granule files.
pub trait SwathReader: Send {
    /// Read a 2-D numeric dataset located by exact path or by its last path
    /// component. A missing dataset is `ViirsError::SubDatasetNotFound`.
    fn read_array(&self, file: &Path, dataset: &str) -> Result<Array2<f32>>;

    /// Radiometric `(scale, offset)` stored in `<dataset>Factors`, or `None`
    /// when the granule carries no factors for this dataset.
    fn read_factors(&self, file: &Path, dataset: &str) -> Result<Option<(f32, f32)>>;
}

/// Reads and writes georeferenced rasters.
pub trait RasterStore: Send {
    /// Write (or overwrite) a raster. Nodata is NaN.
    fn write(&self, path: &Path, raster: &Raster) -> Result<()>;

    /// Read every band, mapping the file's nodata value to NaN.
    fn read(&self, path: &Path) -> Result<Raster>;
}
