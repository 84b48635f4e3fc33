//! [`SwathReader`] over HDF5 files.

use std::path::Path;
use std::sync::Once;

use hdf5::types::{FloatSize, IntSize, TypeDescriptor};
use hdf5::{Dataset, File, Group};
use ndarray::Array2;
use tracing::{debug, trace};
use viirs_common::{Result, SwathReader, ViirsError};

/// Silence HDF5's automatic error printing to stderr.
///
/// Probing groups for a dataset fails on purpose for every non-matching
/// member, and the C library would print a diagnostic stack for each one.
/// Safe to call more than once.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and null handlers are a
        // documented way to disable automatic error printing.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Reads granule arrays with the HDF5 library.
///
/// Every call opens the file anew; the reader holds no handles between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct H5SwathReader;

impl H5SwathReader {
    pub fn new() -> Self {
        silence_hdf5_errors();
        Self
    }

    fn open(file: &Path) -> Result<File> {
        File::open(file).map_err(|e| ViirsError::raster(format!("{}: {}", file.display(), e)))
    }

    /// Locate `name` by exact path, then by last path component anywhere
    /// below the root group.
    fn locate(file: &File, name: &str) -> Option<Dataset> {
        if name.contains('/') {
            if let Ok(ds) = file.dataset(name) {
                return Some(ds);
            }
        }
        let short = name.rsplit('/').next().unwrap_or(name);
        find_dataset(file, short)
    }
}

fn find_dataset(group: &Group, name: &str) -> Option<Dataset> {
    let members = group.member_names().ok()?;
    if members.iter().any(|m| m == name) {
        if let Ok(ds) = group.dataset(name) {
            return Some(ds);
        }
    }
    members
        .iter()
        .filter_map(|m| group.group(m).ok())
        .find_map(|child| find_dataset(&child, name))
}

/// Read any integer or float dataset as `f32`.
fn read_as_f32(ds: &Dataset) -> hdf5::Result<Vec<f32>> {
    let descriptor = ds.dtype()?.to_descriptor()?;
    let values = match descriptor {
        TypeDescriptor::Unsigned(IntSize::U1) => to_f32(ds.read_raw::<u8>()?),
        TypeDescriptor::Unsigned(IntSize::U2) => to_f32(ds.read_raw::<u16>()?),
        TypeDescriptor::Unsigned(IntSize::U4) => ds.read_raw::<u32>()?.into_iter().map(|v| v as f32).collect(),
        TypeDescriptor::Integer(IntSize::U1) => to_f32(ds.read_raw::<i8>()?),
        TypeDescriptor::Integer(IntSize::U2) => to_f32(ds.read_raw::<i16>()?),
        TypeDescriptor::Integer(IntSize::U4) => ds.read_raw::<i32>()?.into_iter().map(|v| v as f32).collect(),
        TypeDescriptor::Float(FloatSize::U8) => ds.read_raw::<f64>()?.into_iter().map(|v| v as f32).collect(),
        _ => ds.read_raw::<f32>()?,
    };
    Ok(values)
}

fn to_f32<T: Into<f32>>(values: Vec<T>) -> Vec<f32> {
    values.into_iter().map(Into::into).collect()
}

impl SwathReader for H5SwathReader {
    fn read_array(&self, file: &Path, dataset: &str) -> Result<Array2<f32>> {
        let h5 = Self::open(file)?;
        let ds = Self::locate(&h5, dataset).ok_or_else(|| ViirsError::sub_dataset(file, dataset))?;

        let shape = ds.shape();
        let &[rows, cols] = shape.as_slice() else {
            return Err(ViirsError::invalid(format!(
                "{} in {} has shape {:?}, expected 2-D",
                dataset,
                file.display(),
                shape
            )));
        };

        let values = read_as_f32(&ds).map_err(|e| ViirsError::raster(format!("{}: {}", ds.name(), e)))?;
        debug!(file = %file.display(), dataset = %ds.name(), rows, cols, "Read dataset");
        Array2::from_shape_vec((rows, cols), values).map_err(ViirsError::raster)
    }

    fn read_factors(&self, file: &Path, dataset: &str) -> Result<Option<(f32, f32)>> {
        let h5 = Self::open(file)?;
        let name = format!("{}Factors", dataset.rsplit('/').next().unwrap_or(dataset));
        let Some(ds) = Self::locate(&h5, &name) else {
            trace!(file = %file.display(), dataset = %name, "No factors dataset");
            return Ok(None);
        };

        let values = read_as_f32(&ds).map_err(|e| ViirsError::raster(format!("{}: {}", ds.name(), e)))?;
        match values.as_slice() {
            &[scale, offset, ..] => Ok(Some((scale, offset))),
            _ => Err(ViirsError::invalid(format!(
                "{} in {} holds {} values, expected a (scale, offset) pair",
                name,
                file.display(),
                values.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::require_test_file;

    #[test]
    fn test_missing_file_is_raster_error() {
        let err = H5SwathReader::new()
            .read_array(Path::new("/nonexistent/GIMGO.h5"), "Latitude")
            .unwrap_err();
        assert!(matches!(err, ViirsError::Raster(_)));
    }

    #[test]
    fn test_synthetic_granule_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("SVI01_test.h5");
        {
            let file = File::create(&path).unwrap();
            let group = file.create_group("All_Data").unwrap().create_group("VIIRS-I1-SDR_All").unwrap();
            let raw: Vec<u16> = vec![1, 2, 3, 65533, 5, 6];
            group
                .new_dataset::<u16>()
                .shape((2, 3))
                .create("Reflectance")
                .unwrap()
                .write_raw(&raw)
                .unwrap();
            group
                .new_dataset::<f32>()
                .shape(4)
                .create("ReflectanceFactors")
                .unwrap()
                .write_raw(&[0.0002f32, -0.01, 1.0, 0.0])
                .unwrap();
        }

        let reader = H5SwathReader::new();
        let data = reader.read_array(&path, "Reflectance").unwrap();
        assert_eq!(data.dim(), (2, 3));
        assert_eq!(data[[1, 0]], 65533.0);
        assert_eq!(reader.read_factors(&path, "Reflectance").unwrap(), Some((0.0002, -0.01)));

        let full = reader
            .read_array(&path, "All_Data/VIIRS-I1-SDR_All/Reflectance")
            .unwrap();
        assert_eq!(full, data);

        assert!(matches!(
            reader.read_array(&path, "BrightnessTemperature").unwrap_err(),
            ViirsError::SubDatasetNotFound { .. }
        ));
        assert_eq!(reader.read_factors(&path, "BrightnessTemperature").unwrap(), None);
    }

    #[test]
    fn test_real_geolocation_granule() {
        let path = require_test_file!(
            "GIMGO_npp_d20210221_t0821238_e0832466_b48293_c20210221100336573000_noaa_ops.h5"
        );
        let reader = H5SwathReader::new();
        let lat = reader.read_array(&path, "Latitude").unwrap();
        let lon = reader.read_array(&path, "Longitude").unwrap();
        assert_eq!(lat.dim(), lon.dim());
    }
}
