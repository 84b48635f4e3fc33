//! Whole-fileset processing: one geolocation, many bands, one raster.

use projection::Crs;
use swath_catalog::{Fileset, RecordType};
use tracing::{debug, warn};
use viirs_common::{Raster, RasterBand, Result, SwathReader, ViirsError};

use crate::fill::FillParams;
use crate::geolocation::ResolvedGeolocation;
use crate::rasterize::BandRasterizer;

/// A band that could not be rasterized.
#[derive(Debug)]
pub struct BandFailure {
    pub record_type: RecordType,
    pub error: ViirsError,
}

/// Output of [`FilesetProcessor::process`].
#[derive(Debug)]
pub struct ProcessedFileset {
    /// One band per successfully processed band file, named by record type.
    pub raster: Raster,
    pub failures: Vec<BandFailure>,
}

/// Turns a [`Fileset`] into a calibrated multi-band raster.
pub struct FilesetProcessor<'a> {
    reader: &'a dyn SwathReader,
    crs: &'a Crs,
    fill: FillParams,
}

impl<'a> FilesetProcessor<'a> {
    pub fn new(reader: &'a dyn SwathReader, crs: &'a Crs, fill: FillParams) -> Self {
        Self { reader, crs, fill }
    }

    /// Resolve the fileset's geolocation once, then rasterize every band
    /// against it. Band failures are collected; the fileset only fails when
    /// no band survives.
    pub fn process(&self, fileset: &Fileset, scale: f64) -> Result<ProcessedFileset> {
        if fileset.bands.is_empty() {
            return Err(ViirsError::invalid(format!(
                "fileset {} has no band files",
                fileset.geoloc.name
            )));
        }

        let geoloc_path = &fileset.geoloc.path;
        let lat = self.reader.read_array(geoloc_path, "Latitude")?;
        let lon = self.reader.read_array(geoloc_path, "Longitude")?;
        let projection = self.crs.projection();
        let geoloc = ResolvedGeolocation::resolve(lat.view(), lon.view(), projection.as_ref(), scale)?;
        drop((lat, lon));

        debug!(
            fileset = %fileset.geoloc.name,
            valid = geoloc.valid_count(),
            shape = ?geoloc.shape(),
            "Resolved geolocation"
        );

        let rasterizer = BandRasterizer::new(&geoloc, self.fill);
        let mut bands = Vec::with_capacity(fileset.bands.len());
        let mut failures = Vec::new();

        for band_file in &fileset.bands {
            match self.process_band(&rasterizer, band_file) {
                Ok(data) => bands.push(RasterBand::named(band_file.record_type.code(), data)),
                Err(e @ ViirsError::InvalidData(_)) => return Err(e),
                Err(error) => {
                    warn!(band = %band_file.name, error = %error, "Band skipped");
                    failures.push(BandFailure {
                        record_type: band_file.record_type,
                        error,
                    });
                }
            }
        }

        if bands.is_empty() {
            return Err(ViirsError::invalid(format!(
                "no band of fileset {} could be processed ({} failed)",
                fileset.geoloc.name,
                failures.len()
            )));
        }

        let raster = Raster::from_bands(bands, geoloc.transform(), self.crs.to_wkt())?;
        Ok(ProcessedFileset { raster, failures })
    }

    fn process_band(
        &self,
        rasterizer: &BandRasterizer<'_>,
        band_file: &swath_catalog::SwathFile,
    ) -> Result<ndarray::Array2<f32>> {
        let dataset = band_file.record_type.band_dataset().ok_or_else(|| {
            ViirsError::sub_dataset(&band_file.path, format!("{} sensor values", band_file.record_type))
        })?;
        let raw = self.reader.read_array(&band_file.path, dataset)?;

        let factors = match self.reader.read_factors(&band_file.path, dataset) {
            Ok(Some(f)) => Some(f),
            Ok(None) => {
                debug!(band = %band_file.name, "No calibration factors, keeping raw units");
                None
            }
            Err(e) => {
                debug!(band = %band_file.name, error = %e, "Calibration factors unreadable, keeping raw units");
                None
            }
        };

        rasterizer.rasterize(raw.view(), factors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use swath_catalog::{group_filesets, GeolocPreference, SwathFile};
    use test_utils::{MemorySwathReader, SyntheticSwath};

    fn fileset_for(paths: &[std::path::PathBuf]) -> Fileset {
        let files: Vec<SwathFile> = paths.iter().map(|p| SwathFile::parse(p).unwrap()).collect();
        group_filesets(&files, GeolocPreference::Ellipsoid).remove(0)
    }

    #[test]
    fn test_bands_share_shape_and_transform() {
        let mut reader = MemorySwathReader::new();
        let paths = SyntheticSwath::siberia(30, 20).register(&mut reader, Path::new("/data/l1"));
        let fileset = fileset_for(&paths);
        let crs = Crs::working();

        let out = FilesetProcessor::new(&reader, &crs, FillParams::default())
            .process(&fileset, 375.0)
            .unwrap();

        assert!(out.failures.is_empty());
        assert_eq!(out.raster.band_count(), 2);
        assert_eq!(out.raster.transform.pixel_width, 375.0);
        assert_eq!(out.raster.transform.pixel_height, -375.0);
        let red = out.raster.band_named("SVI01").unwrap();
        let nir = out.raster.band_named("SVI02").unwrap();
        assert_eq!(red.dim(), nir.dim());
        assert!(red.iter().filter(|v| !v.is_nan()).all(|v| (v - 0.1).abs() < 1e-4));
    }

    #[test]
    fn test_missing_band_dataset_keeps_other_bands() {
        let mut reader = MemorySwathReader::new();
        let [geoloc, red, nir] = SyntheticSwath::siberia(10, 10).register(&mut reader, Path::new("/l1"));
        let mut stripped = MemorySwathReader::new();
        for (path, name) in [(&geoloc, "Latitude"), (&geoloc, "Longitude"), (&nir, "Reflectance")] {
            stripped.insert_array(path, name, reader.read_array(path, name).unwrap());
        }
        let fileset = fileset_for(&[geoloc, red, nir]);
        let crs = Crs::working();

        let out = FilesetProcessor::new(&stripped, &crs, FillParams::default())
            .process(&fileset, 375.0)
            .unwrap();
        assert_eq!(out.raster.band_count(), 1);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].record_type, RecordType::IBandSdr(1));
        assert!(matches!(out.failures[0].error, ViirsError::SubDatasetNotFound { .. }));
    }

    #[test]
    fn test_all_bands_failing_fails_fileset() {
        let mut reader = MemorySwathReader::new();
        let [geoloc, red, nir] = SyntheticSwath::siberia(10, 10).register(&mut reader, Path::new("/l1"));
        let mut only_geoloc = MemorySwathReader::new();
        for name in ["Latitude", "Longitude"] {
            only_geoloc.insert_array(&geoloc, name, reader.read_array(&geoloc, name).unwrap());
        }
        let fileset = fileset_for(&[geoloc, red, nir]);
        let crs = Crs::working();

        let err = FilesetProcessor::new(&only_geoloc, &crs, FillParams::default())
            .process(&fileset, 375.0)
            .unwrap_err();
        assert!(matches!(err, ViirsError::InvalidData(_)));
    }

    #[test]
    fn test_zero_bands_and_missing_geolocation() {
        let reader = MemorySwathReader::new();
        let crs = Crs::working();
        let processor = FilesetProcessor::new(&reader, &crs, FillParams::default());

        let lonely = fileset_for(&[Path::new("/l1").join(test_utils::granules::GIMGO)]);
        assert!(matches!(
            processor.process(&lonely, 375.0).unwrap_err(),
            ViirsError::InvalidData(_)
        ));

        let fileset = fileset_for(&[
            Path::new("/l1").join(test_utils::granules::GIMGO),
            Path::new("/l1").join(test_utils::granules::SVI01),
        ]);
        assert!(matches!(
            processor.process(&fileset, 375.0).unwrap_err(),
            ViirsError::SubDatasetNotFound { .. }
        ));
    }
}
