//! Test data generators and in-memory collaborators.
//!
//! These let georeferencing and pipeline tests run against synthetic swaths
//! without HDF5 granules or GDAL on the machine.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use viirs_common::{GeoTransform, Raster, RasterBand, RasterStore, Result, SwathReader, ViirsError};

use crate::fixtures::granules;

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`, so a value read
/// back at `[row, col]` tells where it came from.
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(5, 10);
/// assert_eq!(grid.dim(), (5, 10));
/// assert_eq!(grid[[0, 1]], 1000.0);
/// assert_eq!(grid[[1, 0]], 1.0);
/// ```
pub fn create_test_grid(rows: usize, cols: usize) -> Array2<f32> {
    Array2::from_shape_fn((rows, cols), |(row, col)| (col * 1000 + row) as f32)
}

/// Creates a regular lat/lon geolocation pair.
///
/// Latitude grows with the row index and longitude with the column index,
/// starting at `(lat0, lon0)` and stepping `step` degrees.
pub fn create_geolocation(
    rows: usize,
    cols: usize,
    lat0: f32,
    lon0: f32,
    step: f32,
) -> (Array2<f32>, Array2<f32>) {
    let lat = Array2::from_shape_fn((rows, cols), |(row, _)| lat0 + row as f32 * step);
    let lon = Array2::from_shape_fn((rows, cols), |(_, col)| lon0 + col as f32 * step);
    (lat, lon)
}

/// Radiometric factors used by synthetic reflectance bands.
pub const REFLECTANCE_FACTORS: (f32, f32) = (0.0001, 0.0);

/// A synthetic I-band swath with constant red and near-infrared reflectance.
#[derive(Debug, Clone)]
pub struct SyntheticSwath {
    pub latitude: Array2<f32>,
    pub longitude: Array2<f32>,
    /// Raw SVI01 counts
    pub red: Array2<f32>,
    /// Raw SVI02 counts
    pub nir: Array2<f32>,
}

impl SyntheticSwath {
    /// A swath over Western Siberia, roughly 0.004 degrees between samples
    /// (finer than the 375 m working grid, so the grid has no holes).
    ///
    /// With the default counts red is 0.1, NIR is 0.3 and NDVI is 0.5.
    pub fn siberia(rows: usize, cols: usize) -> Self {
        Self::with_counts(rows, cols, 1000.0, 3000.0)
    }

    pub fn with_counts(rows: usize, cols: usize, red: f32, nir: f32) -> Self {
        let (latitude, longitude) = create_geolocation(rows, cols, 55.0, 82.0, 0.002);
        Self {
            latitude,
            longitude,
            red: Array2::from_elem((rows, cols), red),
            nir: Array2::from_elem((rows, cols), nir),
        }
    }

    /// Register the swath's arrays with `reader` under the default granule
    /// names inside `level1`, and return the three granule paths
    /// (GIMGO, SVI01, SVI02).
    pub fn register(&self, reader: &mut MemorySwathReader, level1: &Path) -> [PathBuf; 3] {
        self.register_as(
            reader,
            level1,
            granules::DATE,
            granules::T_START,
            granules::ORBIT,
        )
    }

    /// Like [`SyntheticSwath::register`] with explicit granule identity.
    pub fn register_as(
        &self,
        reader: &mut MemorySwathReader,
        level1: &Path,
        date: &str,
        t_start: &str,
        orbit: &str,
    ) -> [PathBuf; 3] {
        let geoloc = level1.join(granules::name("GIMGO", date, t_start, orbit));
        let red = level1.join(granules::name("SVI01", date, t_start, orbit));
        let nir = level1.join(granules::name("SVI02", date, t_start, orbit));

        reader.insert_array(&geoloc, "Latitude", self.latitude.clone());
        reader.insert_array(&geoloc, "Longitude", self.longitude.clone());
        reader.insert_array(&red, "Reflectance", self.red.clone());
        reader.insert_factors(&red, "Reflectance", REFLECTANCE_FACTORS);
        reader.insert_array(&nir, "Reflectance", self.nir.clone());
        reader.insert_factors(&nir, "Reflectance", REFLECTANCE_FACTORS);

        [geoloc, red, nir]
    }

    /// Granule file names of this swath, for creating an on-disk layout.
    pub fn granule_names(date: &str, t_start: &str, orbit: &str) -> Vec<String> {
        ["GIMGO", "SVI01", "SVI02"]
            .iter()
            .map(|kind| granules::name(kind, date, t_start, orbit))
            .collect()
    }
}

/// [`SwathReader`] serving arrays from memory.
///
/// Datasets are keyed by granule path and short dataset name.
#[derive(Debug, Clone, Default)]
pub struct MemorySwathReader {
    arrays: HashMap<(PathBuf, String), Array2<f32>>,
    factors: HashMap<(PathBuf, String), (f32, f32)>,
}

impl MemorySwathReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_array(&mut self, file: &Path, dataset: &str, data: Array2<f32>) {
        self.arrays
            .insert((file.to_path_buf(), dataset.to_string()), data);
    }

    pub fn insert_factors(&mut self, file: &Path, dataset: &str, factors: (f32, f32)) {
        self.factors
            .insert((file.to_path_buf(), dataset.to_string()), factors);
    }

    pub fn with_array(mut self, file: &Path, dataset: &str, data: Array2<f32>) -> Self {
        self.insert_array(file, dataset, data);
        self
    }

    pub fn with_factors(mut self, file: &Path, dataset: &str, factors: (f32, f32)) -> Self {
        self.insert_factors(file, dataset, factors);
        self
    }

    fn short_name(dataset: &str) -> &str {
        dataset.rsplit('/').next().unwrap_or(dataset)
    }
}

impl SwathReader for MemorySwathReader {
    fn read_array(&self, file: &Path, dataset: &str) -> Result<Array2<f32>> {
        self.arrays
            .get(&(file.to_path_buf(), Self::short_name(dataset).to_string()))
            .cloned()
            .ok_or_else(|| ViirsError::sub_dataset(file, dataset))
    }

    fn read_factors(&self, file: &Path, dataset: &str) -> Result<Option<(f32, f32)>> {
        Ok(self
            .factors
            .get(&(file.to_path_buf(), Self::short_name(dataset).to_string()))
            .copied())
    }
}

#[derive(Serialize, Deserialize)]
struct JsonBand {
    name: Option<String>,
    rows: usize,
    cols: usize,
    /// Row-major; `None` is nodata.
    values: Vec<Option<f32>>,
}

#[derive(Serialize, Deserialize)]
struct JsonRaster {
    transform: [f64; 6],
    crs: String,
    bands: Vec<JsonBand>,
}

/// [`RasterStore`] writing rasters as JSON documents.
///
/// Lets tests exercise real file existence checks without GDAL.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRasterStore;

impl RasterStore for JsonRasterStore {
    fn write(&self, path: &Path, raster: &Raster) -> Result<()> {
        let doc = JsonRaster {
            transform: raster.transform.to_gdal(),
            crs: raster.crs.clone(),
            bands: raster
                .bands
                .iter()
                .map(|band| {
                    let (rows, cols) = band.data.dim();
                    JsonBand {
                        name: band.name.clone(),
                        rows,
                        cols,
                        values: band
                            .data
                            .iter()
                            .map(|v| if v.is_nan() { None } else { Some(*v) })
                            .collect(),
                    }
                })
                .collect(),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec(&doc)?)?;
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Raster> {
        let bytes = fs::read(path)?;
        let doc: JsonRaster = serde_json::from_slice(&bytes)?;
        let bands = doc
            .bands
            .into_iter()
            .map(|band| {
                let values: Vec<f32> = band
                    .values
                    .into_iter()
                    .map(|v| v.unwrap_or(f32::NAN))
                    .collect();
                let data = Array2::from_shape_vec((band.rows, band.cols), values)
                    .map_err(ViirsError::raster)?;
                Ok(RasterBand {
                    name: band.name,
                    data,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Raster::from_bands(bands, GeoTransform::from_gdal(doc.transform), doc.crs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid_values() {
        let grid = create_test_grid(3, 4);
        assert_eq!(grid[[2, 3]], 3002.0);
    }

    #[test]
    fn test_memory_reader_missing_dataset() {
        let reader = MemorySwathReader::new();
        let err = reader
            .read_array(Path::new("/x/GIMGO.h5"), "Latitude")
            .unwrap_err();
        assert!(matches!(err, ViirsError::SubDatasetNotFound { .. }));
        assert_eq!(
            reader
                .read_factors(Path::new("/x/GIMGO.h5"), "Reflectance")
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_memory_reader_accepts_full_dataset_path() {
        let path = Path::new("/x/SVI01.h5");
        let reader = MemorySwathReader::new().with_array(path, "Reflectance", create_test_grid(2, 2));
        assert!(reader
            .read_array(path, "All_Data/VIIRS-I1-SDR_All/Reflectance")
            .is_ok());
    }

    #[test]
    fn test_json_store_keeps_nan() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sub/raster.json");
        let mut data = create_test_grid(2, 3);
        data[[1, 1]] = f32::NAN;
        let raster = Raster::single(data, GeoTransform::north_up(100.0, 200.0, 10.0), "EPSG:4326");

        JsonRasterStore.write(&path, &raster).unwrap();
        let back = JsonRasterStore.read(&path).unwrap();

        assert_eq!(back.transform, raster.transform);
        let band = back.first_band().unwrap();
        assert!(band[[1, 1]].is_nan());
        assert_eq!(band[[0, 2]], 2000.0);
    }
}
