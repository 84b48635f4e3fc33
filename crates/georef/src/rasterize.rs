//! Scatter rasterization of one band onto a resolved grid.

use ndarray::{s, Array2, ArrayView2};
use tracing::debug;
use viirs_common::nodata::{ND_NA, NODATA_THRESHOLD};
use viirs_common::{Result, ViirsError};

use crate::fill::{fill_nodata_holes, FillParams};
use crate::geolocation::ResolvedGeolocation;

/// Rasterizes bands against one fileset's [`ResolvedGeolocation`].
#[derive(Debug, Clone, Copy)]
pub struct BandRasterizer<'a> {
    geoloc: &'a ResolvedGeolocation,
    fill: FillParams,
    nodata_threshold: f32,
}

impl<'a> BandRasterizer<'a> {
    pub fn new(geoloc: &'a ResolvedGeolocation, fill: FillParams) -> Self {
        Self {
            geoloc,
            fill,
            nodata_threshold: NODATA_THRESHOLD,
        }
    }

    /// Raw values at or above `threshold` are treated as nodata.
    pub fn with_nodata_threshold(mut self, threshold: f32) -> Self {
        self.nodata_threshold = threshold;
        self
    }

    /// Produce a north-up band of physical values, NaN where there is no data.
    ///
    /// `factors` is the `(scale, offset)` calibration pair; without it the
    /// values stay in raw sensor units.
    pub fn rasterize(&self, raw: ArrayView2<f32>, factors: Option<(f32, f32)>) -> Result<Array2<f32>> {
        let mask = self.geoloc.mask();
        if raw.dim() != mask.dim() {
            return Err(ViirsError::invalid(format!(
                "band shape {:?} does not match geolocation shape {:?}",
                raw.dim(),
                mask.dim()
            )));
        }

        let values: Vec<f32> = raw
            .iter()
            .zip(mask.iter())
            .filter_map(|(&v, &valid)| valid.then_some(v))
            .collect();
        let (x_index, y_index) = (self.geoloc.x_index(), self.geoloc.y_index());
        if values.len() != x_index.len() {
            return Err(ViirsError::invalid(format!(
                "{} masked samples for {} grid indices",
                values.len(),
                x_index.len()
            )));
        }

        let sentinel = f32::from(ND_NA);
        let mut grid = Array2::from_elem(self.geoloc.shape(), sentinel);
        for ((&v, &x), &y) in values.iter().zip(x_index).zip(y_index) {
            grid[[y, x]] = v;
        }

        // Indices grow northwards, raster rows grow southwards.
        let mut grid = grid.slice(s![..;-1, ..]).to_owned();

        let threshold = self.nodata_threshold;
        let filled = fill_nodata_holes(&mut grid, sentinel, |v| v < threshold, self.fill);
        debug!(filled, "Filled scatter holes");

        grid.mapv_inplace(|v| if v >= threshold || v == sentinel { f32::NAN } else { v });

        if let Some((scale, offset)) = factors {
            grid.mapv_inplace(|v| if v.is_nan() { v } else { v * scale + offset });
        }
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use projection::Geographic;

    fn geoloc() -> ResolvedGeolocation {
        let lat = array![[10.0f32, 10.0, 10.0], [11.0, 11.0, 11.0], [12.0, 12.0, 12.0]];
        let lon = array![[20.0f32, 21.0, 22.0], [20.0, 21.0, 22.0], [20.0, 21.0, 22.0]];
        ResolvedGeolocation::resolve(lat.view(), lon.view(), &Geographic, 1.0).unwrap()
    }

    #[test]
    fn test_scatter_flips_to_north_up() {
        let geo = geoloc();
        let raw = array![[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let band = BandRasterizer::new(&geo, FillParams::default())
            .rasterize(raw.view(), None)
            .unwrap();
        // Latitude 12 (the last scan row) is the northern edge.
        assert_eq!(band, array![[7.0f32, 8.0, 9.0], [4.0, 5.0, 6.0], [1.0, 2.0, 3.0]]);
    }

    #[test]
    fn test_calibration_is_invertible_on_valid_pixels() {
        let geo = geoloc();
        let raw = array![[100.0f32, 200.0, 300.0], [400.0, 500.0, 600.0], [700.0, 800.0, 900.0]];
        let (scale, offset) = (0.002f32, -0.5f32);
        let band = BandRasterizer::new(&geo, FillParams::default())
            .rasterize(raw.view(), Some((scale, offset)))
            .unwrap();

        let flipped = raw.slice(s![..;-1, ..]);
        for (calibrated, source) in band.iter().zip(flipped.iter()) {
            let back = (calibrated - offset) / scale;
            assert!((back - source).abs() < 1e-2, "{} vs {}", back, source);
        }
    }

    #[test]
    fn test_fill_codes_become_nan_and_are_not_calibrated() {
        let geo = geoloc();
        let raw = array![[100.0f32, 65533.0, 300.0], [400.0, 500.0, 600.0], [700.0, 800.0, 65535.0]];
        let band = BandRasterizer::new(&geo, FillParams::default())
            .rasterize(raw.view(), Some((2.0, 1.0)))
            .unwrap();
        assert!(band[[2, 1]].is_nan());
        assert!(band[[0, 2]].is_nan());
        assert_eq!(band[[1, 1]], 1001.0);
    }

    #[test]
    fn test_scatter_hole_is_filled() {
        // Pixel (1, 1) of the swath has no geolocation, leaving a hole.
        let lat = array![[10.0f32, 10.0, 10.0], [11.0, -999.0, 11.0], [12.0, 12.0, 12.0]];
        let lon = array![[20.0f32, 21.0, 22.0], [20.0, -999.0, 22.0], [20.0, 21.0, 22.0]];
        let geo = ResolvedGeolocation::resolve(lat.view(), lon.view(), &Geographic, 1.0).unwrap();
        let raw = Array2::from_elem((3, 3), 50.0f32);
        let band = BandRasterizer::new(&geo, FillParams::default())
            .rasterize(raw.view(), None)
            .unwrap();
        assert!((band[[1, 1]] - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_shape_mismatch_is_invalid_data() {
        let geo = geoloc();
        let raw = Array2::zeros((2, 3));
        let err = BandRasterizer::new(&geo, FillParams::default())
            .rasterize(raw.view(), None)
            .unwrap_err();
        assert!(matches!(err, ViirsError::InvalidData(_)));
    }
}
