//! GeoTIFF storage for pipeline rasters.
//!
//! Every raster the pipeline produces is written as a float32 GeoTIFF with
//! NaN as the nodata value, the geotransform, the CRS WKT and one band
//! description per band (`SVI01`, `NDVI`, ...).

use std::fs;
use std::path::Path;

use gdal::raster::Buffer;
use gdal::{Dataset, DriverManager, Metadata};
use ndarray::Array2;
use tracing::debug;
use viirs_common::{GeoTransform, Raster, RasterBand, RasterStore, Result, ViirsError};

/// [`RasterStore`] writing GeoTIFFs through GDAL.
///
/// Stateless: datasets are opened and closed inside each call, so every
/// worker can own its own store.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffStore;

impl GeoTiffStore {
    pub fn new() -> Self {
        Self
    }
}

fn gdal_err(path: &Path) -> impl Fn(gdal::errors::GdalError) -> ViirsError + '_ {
    move |e| ViirsError::raster(format!("{}: {}", path.display(), e))
}

impl RasterStore for GeoTiffStore {
    fn write(&self, path: &Path, raster: &Raster) -> Result<()> {
        let (height, width) = raster.shape();
        if raster.bands.is_empty() || height == 0 || width == 0 {
            return Err(ViirsError::invalid(format!(
                "refusing to write empty raster to {}",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let err = gdal_err(path);
        let driver = DriverManager::get_driver_by_name("GTiff").map_err(&err)?;
        let mut dataset = driver
            .create_with_band_type::<f32, _>(
                path,
                width as isize,
                height as isize,
                raster.bands.len() as isize,
            )
            .map_err(&err)?;

        dataset
            .set_geo_transform(&raster.transform.to_gdal())
            .map_err(&err)?;
        if !raster.crs.is_empty() {
            dataset.set_projection(&raster.crs).map_err(&err)?;
        }

        for (i, band) in raster.bands.iter().enumerate() {
            let mut rasterband = dataset.rasterband(i as isize + 1).map_err(&err)?;
            let flat_data: Vec<f32> = band.data.iter().copied().collect();
            let buffer = Buffer::new((width, height), flat_data);
            rasterband.write((0, 0), (width, height), &buffer).map_err(&err)?;
            rasterband.set_no_data_value(Some(f64::NAN)).map_err(&err)?;
            if let Some(name) = &band.name {
                rasterband.set_description(name).map_err(&err)?;
            }
        }

        debug!(path = %path.display(), bands = raster.bands.len(), width, height, "Wrote GeoTIFF");
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Raster> {
        let err = gdal_err(path);
        let dataset = Dataset::open(path).map_err(&err)?;
        let geo_transform = dataset.geo_transform().map_err(&err)?;
        let (width, height) = dataset.raster_size();

        let mut bands = Vec::new();
        for i in 1..=dataset.raster_count() {
            let rasterband = dataset.rasterband(i).map_err(&err)?;
            let nodata = rasterband.no_data_value();
            let band_data = rasterband
                .read_as::<f32>((0, 0), (width, height), (width, height), None)
                .map_err(&err)?;

            let mut data = Array2::from_shape_vec((height, width), band_data.data)
                .map_err(ViirsError::raster)?;
            if let Some(nd) = nodata.filter(|nd| !nd.is_nan()) {
                let nd = nd as f32;
                data.mapv_inplace(|v| if v == nd { f32::NAN } else { v });
            }

            let name = rasterband.description().ok().filter(|d| !d.is_empty());
            bands.push(RasterBand { name, data });
        }

        Raster::from_bands(bands, GeoTransform::from_gdal(geo_transform), dataset.projection())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use projection::Crs;

    #[test]
    fn test_geotiff_keeps_bands_transform_and_crs() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out/NPP_48293.GIMGO.tiff");
        let raster = Raster::from_bands(
            vec![
                RasterBand::named("SVI01", array![[0.1f32, f32::NAN], [0.3, 0.4]]),
                RasterBand::named("SVI02", array![[0.5f32, 0.6], [0.7, 0.8]]),
            ],
            GeoTransform::north_up(-12000.0, 340000.0, 375.0),
            Crs::working().to_wkt(),
        )
        .unwrap();

        GeoTiffStore.write(&path, &raster).unwrap();
        let back = GeoTiffStore.read(&path).unwrap();

        assert_eq!(back.transform, raster.transform);
        assert_eq!(back.band_count(), 2);
        assert_eq!(back.bands[1].name.as_deref(), Some("SVI02"));
        assert!(back.band_named("SVI01").unwrap()[[0, 1]].is_nan());
        assert_eq!(back.band_named("SVI02").unwrap(), &array![[0.5f32, 0.6], [0.7, 0.8]]);
        assert!(matches!(Crs::from_wkt(&back.crs).unwrap(), Crs::Lambert(_)));
    }

    #[test]
    fn test_overwrite_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ndvi.tiff");
        let gt = GeoTransform::north_up(0.0, 0.0, 375.0);

        GeoTiffStore
            .write(&path, &Raster::single(array![[1.0f32, 2.0]], gt, ""))
            .unwrap();
        GeoTiffStore
            .write(&path, &Raster::single(array![[3.0f32, 4.0, 5.0]], gt, ""))
            .unwrap();
        assert_eq!(GeoTiffStore.read(&path).unwrap().shape(), (1, 3));
    }

    #[test]
    fn test_missing_file_is_raster_error() {
        let err = GeoTiffStore.read(Path::new("/nonexistent/x.tiff")).unwrap_err();
        assert!(matches!(err, ViirsError::Raster(_)));
    }
}
