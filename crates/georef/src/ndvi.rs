//! NDVI from calibrated red/NIR bands, with optional cloud masking.

use ndarray::{s, Array2, ArrayView2, Zip};
use swath_catalog::RecordType;
use tracing::{debug, warn};
use viirs_common::nodata::NDVI_CLOUD;
use viirs_common::{Raster, RasterBand, Result, ViirsError};

use crate::align::common_windows;

/// Band name of NDVI rasters.
pub const NDVI_BAND: &str = "NDVI";

/// `(nir - red) / (nir + red)`, NaN where either input is NaN or the sum is zero.
pub fn compute_ndvi(red: ArrayView2<f32>, nir: ArrayView2<f32>) -> Result<Array2<f32>> {
    if red.dim() != nir.dim() {
        return Err(ViirsError::invalid(format!(
            "red {:?} and NIR {:?} shapes differ",
            red.dim(),
            nir.dim()
        )));
    }
    Ok(Zip::from(&red).and(&nir).map_collect(|&r, &n| {
        let sum = n + r;
        if r.is_nan() || n.is_nan() || sum == 0.0 {
            f32::NAN
        } else {
            (n - r) / sum
        }
    }))
}

/// Derives NDVI rasters from calibrated I-band swath rasters.
#[derive(Debug, Clone)]
pub struct NdviComputer {
    red: RecordType,
    nir: RecordType,
    cloudy_values: Vec<f32>,
}

impl Default for NdviComputer {
    fn default() -> Self {
        Self::new(RecordType::IBandSdr(1), RecordType::IBandSdr(2))
    }
}

impl NdviComputer {
    pub fn new(red: RecordType, nir: RecordType) -> Self {
        Self {
            red,
            nir,
            cloudy_values: vec![0.0, 1.0],
        }
    }

    /// Cloud mask values that mark a pixel as cloudy.
    pub fn with_cloudy_values(mut self, values: Vec<f32>) -> Self {
        self.cloudy_values = values;
        self
    }

    /// Single-band NDVI raster sharing the swath raster's grid.
    pub fn compute(&self, swath: &Raster) -> Result<Raster> {
        let band = |record_type: RecordType| {
            swath.band_named(&record_type.code()).ok_or_else(|| {
                ViirsError::invalid(format!("swath raster has no {} band", record_type))
            })
        };
        let ndvi = compute_ndvi(band(self.red)?.view(), band(self.nir)?.view())?;
        Raster::from_bands(
            vec![RasterBand::named(NDVI_BAND, ndvi)],
            swath.transform,
            swath.crs.clone(),
        )
    }

    /// Flag cloudy pixels with the cloud sentinel where `mask` overlaps
    /// `ndvi`. The NDVI keeps its shape and transform; NDVI nodata stays
    /// nodata. A mask that does not overlap leaves the NDVI untouched.
    pub fn apply_cloud_mask(&self, ndvi: &Raster, mask: &Raster) -> Result<Raster> {
        let mask_band = mask
            .first_band()
            .ok_or_else(|| ViirsError::invalid("cloud mask has no band"))?;
        let mut ndvi = ndvi.clone();
        let Some((wn, wm)) = common_windows(&ndvi, mask)? else {
            warn!("Cloud mask does not overlap NDVI, leaving it unmasked");
            return Ok(ndvi);
        };

        let mask_window = mask_band.slice(s![wm.row..wm.row + wm.rows, wm.col..wm.col + wm.cols]);
        let mut flagged = 0usize;
        for band in &mut ndvi.bands {
            let mut window = band
                .data
                .slice_mut(s![wn.row..wn.row + wn.rows, wn.col..wn.col + wn.cols]);
            Zip::from(&mut window).and(&mask_window).for_each(|v, &m| {
                if !v.is_nan() && self.cloudy_values.contains(&m) {
                    *v = NDVI_CLOUD;
                    flagged += 1;
                }
            });
        }
        debug!(flagged, "Applied cloud mask");
        Ok(ndvi)
    }
}
