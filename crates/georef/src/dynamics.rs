//! Percent change between two composites.

use ndarray::Zip;
use tracing::warn;
use viirs_common::{Period, Raster, RasterBand, Result, ViirsError};

use crate::align::crop_to_common;

/// Band name of dynamics rasters.
pub const DYNAMICS_BAND: &str = "DYNAMICS";

/// Output of [`DynamicsComputer::compute`].
#[derive(Debug, Clone)]
pub struct DynamicsResult {
    pub raster: Raster,
    /// Set when the two periods are further than one day apart.
    pub gap_days: Option<i64>,
}

/// Computes `100 * (b2 - b1) / b1` over the common extent of two composites.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicsComputer;

impl DynamicsComputer {
    /// `b1` covers the earlier period and `b2` the later one.
    ///
    /// A pixel is NaN unless both inputs are valid and positive there.
    /// Periods further apart than one day still produce a result; the gap
    /// is logged and reported in [`DynamicsResult::gap_days`].
    pub fn compute(
        &self,
        b1: &Raster,
        b1_period: &Period,
        b2: &Raster,
        b2_period: &Period,
    ) -> Result<DynamicsResult> {
        if b1_period.starts_at > b2_period.starts_at {
            return Err(ViirsError::invalid(format!(
                "dynamics base period {} starts after {}",
                b1_period, b2_period
            )));
        }

        let gap = b1_period.gap_days(b2_period);
        let gap_days = if b1_period.is_adjacent_to(b2_period) {
            None
        } else {
            warn!(
                b1 = %b1_period,
                b2 = %b2_period,
                gap_days = gap,
                "Composite periods are not adjacent"
            );
            Some(gap)
        };

        let (b1, b2) = crop_to_common(b1, b2)?;
        let (Some(v1), Some(v2)) = (b1.first_band(), b2.first_band()) else {
            return Err(ViirsError::invalid("composite has no band"));
        };

        let change = Zip::from(v1).and(v2).map_collect(|&a, &b| {
            if a.is_nan() || b.is_nan() || a <= 0.0 || b <= 0.0 {
                f32::NAN
            } else {
                (100.0 * (f64::from(b) - f64::from(a)) / f64::from(a)) as f32
            }
        });

        let raster = Raster::from_bands(
            vec![RasterBand::named(DYNAMICS_BAND, change)],
            b1.transform,
            b1.crs.clone(),
        )?;
        Ok(DynamicsResult { raster, gap_days })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ndarray::array;
    use viirs_common::nodata::NDVI_CLOUD;
    use viirs_common::GeoTransform;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 2, d).unwrap()
    }

    fn composite(x: f64, y: f64, data: ndarray::Array2<f32>) -> Raster {
        Raster::single(data, GeoTransform::north_up(x, y, 10.0), "")
    }

    #[test]
    fn test_percent_change() {
        let b1 = composite(0.0, 0.0, array![[50.0, 0.0, -1.0, f32::NAN, 0.5]]);
        let b2 = composite(0.0, 0.0, array![[60.0, 0.3, 0.3, 0.3, NDVI_CLOUD]]);
        let p1 = Period::new(date(17), date(20)).unwrap();
        let p2 = Period::new(date(21), date(24)).unwrap();

        let out = DynamicsComputer.compute(&b1, &p1, &b2, &p2).unwrap();
        let band = out.raster.first_band().unwrap();
        assert_eq!(band[[0, 0]], 20.0);
        assert!(band[[0, 1]].is_nan());
        assert!(band[[0, 2]].is_nan());
        assert!(band[[0, 3]].is_nan());
        assert!(band[[0, 4]].is_nan());
        assert_eq!(out.gap_days, None);
    }

    #[test]
    fn test_independent_trims_are_aligned() {
        let b1 = composite(0.0, 20.0, array![[1.0, 1.0], [1.0, 2.0]]);
        let b2 = composite(10.0, 10.0, array![[3.0, 9.0], [9.0, 9.0]]);
        let p1 = Period::new(date(17), date(20)).unwrap();
        let p2 = Period::new(date(21), date(24)).unwrap();

        let out = DynamicsComputer.compute(&b1, &p1, &b2, &p2).unwrap();
        assert_eq!(out.raster.shape(), (1, 1));
        assert_eq!(out.raster.first_band().unwrap()[[0, 0]], 50.0);
        assert_eq!(out.raster.transform, GeoTransform::north_up(10.0, 10.0, 10.0));
    }

    #[test]
    fn test_large_gap_is_reported_not_fatal() {
        let b1 = composite(0.0, 0.0, array![[0.4]]);
        let b2 = composite(0.0, 0.0, array![[0.5]]);
        let p1 = Period::new(date(5), date(8)).unwrap();
        let p2 = Period::new(date(21), date(24)).unwrap();

        let out = DynamicsComputer.compute(&b1, &p1, &b2, &p2).unwrap();
        assert_eq!(out.gap_days, Some(13));
        assert!((out.raster.first_band().unwrap()[[0, 0]] - 25.0).abs() < 1e-4);
    }

    #[test]
    fn test_reversed_periods_rejected() {
        let r = composite(0.0, 0.0, array![[0.4]]);
        let p1 = Period::new(date(21), date(24)).unwrap();
        let p2 = Period::new(date(17), date(20)).unwrap();
        assert!(DynamicsComputer.compute(&r, &p1, &r, &p2).is_err());
    }
}
