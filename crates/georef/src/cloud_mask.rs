//! Reprojection of externally produced cloud masks onto the working grid.

use ndarray::Array2;
use projection::Crs;
use tracing::debug;
use viirs_common::{GeoTransform, Raster, Result, ViirsError};

/// Upper bound on either dimension of a reprojected mask.
const MAX_DIMENSION: usize = 50_000;

/// Samples per raster edge when estimating the reprojected extent.
const EDGE_SAMPLES: usize = 32;

/// Nearest-neighbour reprojection into a fixed CRS and scale.
#[derive(Debug, Clone)]
pub struct CloudMaskReprojector {
    target: Crs,
    scale: f64,
}

impl CloudMaskReprojector {
    pub fn new(target: Crs, scale: f64) -> Self {
        Self { target, scale }
    }

    /// Reproject the first band of `mask` onto the lattice through the
    /// target CRS origin and trim its all-nodata borders.
    pub fn reproject(&self, mask: &Raster) -> Result<Raster> {
        self.reproject_onto(mask, &GeoTransform::north_up(0.0, 0.0, self.scale))
    }

    /// Reproject the first band of `mask` onto the pixel lattice of `anchor`
    /// (usually the swath raster the mask will be applied to) and trim its
    /// all-nodata borders.
    ///
    /// The source CRS is read from the raster's WKT. A mask without a single
    /// valid cell after reprojection is `InvalidData`.
    pub fn reproject_onto(&self, mask: &Raster, anchor: &GeoTransform) -> Result<Raster> {
        if anchor.pixel_width != self.scale || anchor.pixel_height != -self.scale {
            return Err(ViirsError::invalid(format!(
                "anchor grid scale {} does not match {}",
                anchor.pixel_width, self.scale
            )));
        }
        let source_crs = Crs::from_wkt(&mask.crs)?;
        let band = mask
            .first_band()
            .ok_or_else(|| ViirsError::invalid("cloud mask has no band"))?;
        let (src_rows, src_cols) = band.dim();
        if src_rows == 0 || src_cols == 0 {
            return Err(ViirsError::invalid("cloud mask is empty"));
        }

        let src_proj = source_crs.projection();
        let dst_proj = self.target.projection();
        let src_gt = mask.transform;

        // Target extent from the projected outline of the source raster.
        let mut x_min = f64::INFINITY;
        let mut x_max = f64::NEG_INFINITY;
        let mut y_min = f64::INFINITY;
        let mut y_max = f64::NEG_INFINITY;
        for (col, row) in outline(src_rows, src_cols) {
            let (sx, sy) = src_gt.pixel_to_geo(col, row);
            let (lon, lat) = src_proj.inverse(sx, sy);
            let (x, y) = dst_proj.forward(lon, lat);
            if !x.is_finite() || !y.is_finite() {
                return Err(ViirsError::projection(format!(
                    "cloud mask corner ({}, {}) does not project into {}",
                    sx, sy, self.target
                )));
            }
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }

        let (ax, ay) = (anchor.origin_x, anchor.origin_y);
        let x0 = ax + ((x_min - ax) / self.scale).floor() * self.scale;
        let y0 = ay + ((y_max - ay) / self.scale).ceil() * self.scale;
        let cols = ((x_max - x0) / self.scale).ceil() as usize;
        let rows = ((y0 - y_min) / self.scale).ceil() as usize;
        if rows == 0 || cols == 0 || rows > MAX_DIMENSION || cols > MAX_DIMENSION {
            return Err(ViirsError::invalid(format!(
                "reprojected cloud mask would be {}x{}",
                rows, cols
            )));
        }

        let dst_gt = GeoTransform::north_up(x0, y0, self.scale);
        let data = Array2::from_shape_fn((rows, cols), |(row, col)| {
            let (x, y) = dst_gt.pixel_to_geo(col as f64 + 0.5, row as f64 + 0.5);
            let (lon, lat) = dst_proj.inverse(x, y);
            let (sx, sy) = src_proj.forward(lon, lat);
            let (pc, pr) = src_gt.geo_to_pixel(sx, sy);
            if !(pc.is_finite() && pr.is_finite()) || pc < 0.0 || pr < 0.0 {
                return f32::NAN;
            }
            let (c, r) = (pc.floor() as usize, pr.floor() as usize);
            if r >= src_rows || c >= src_cols {
                f32::NAN
            } else {
                band[[r, c]]
            }
        });

        let reprojected = Raster::single(data, dst_gt, self.target.to_wkt());
        let trimmed = reprojected
            .trim_nodata(f32::is_nan)
            .ok_or_else(|| ViirsError::invalid("cloud mask has no valid cells"))?;
        debug!(
            from = %source_crs,
            shape = ?trimmed.shape(),
            "Reprojected cloud mask"
        );
        Ok(trimmed)
    }
}

/// Pixel-corner positions along the four edges of a `rows x cols` raster.
fn outline(rows: usize, cols: usize) -> Vec<(f64, f64)> {
    let (h, w) = (rows as f64, cols as f64);
    let mut points = Vec::with_capacity(EDGE_SAMPLES * 4 + 4);
    for i in 0..=EDGE_SAMPLES {
        let t = i as f64 / EDGE_SAMPLES as f64;
        points.push((t * w, 0.0));
        points.push((t * w, h));
        points.push((0.0, t * h));
        points.push((w, t * h));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_identity_reprojection_trims_borders() {
        let nan = f32::NAN;
        let mask = Raster::single(
            array![[nan, nan, nan], [nan, 1.0f32, 2.0], [nan, 3.0, 4.0]],
            GeoTransform::north_up(0.0, 3.0, 1.0),
            Crs::Geographic.to_wkt(),
        );
        let out = CloudMaskReprojector::new(Crs::Geographic, 1.0)
            .reproject(&mask)
            .unwrap();
        assert_eq!(out.shape(), (2, 2));
        assert_eq!(out.transform, GeoTransform::north_up(1.0, 2.0, 1.0));
        assert_eq!(out.first_band().unwrap(), &array![[1.0f32, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn test_reprojection_follows_anchor_lattice() {
        let mask = Raster::single(
            array![[1.0f32, 2.0], [3.0, 4.0]],
            GeoTransform::north_up(0.0, 2.0, 1.0),
            Crs::Geographic.to_wkt(),
        );
        let anchor = GeoTransform::north_up(0.5, 2.5, 1.0);
        let out = CloudMaskReprojector::new(Crs::Geographic, 1.0)
            .reproject_onto(&mask, &anchor)
            .unwrap();
        assert!(anchor.is_pixel_aligned(&out.transform));
        assert_eq!(out.transform, GeoTransform::north_up(-0.5, 2.5, 1.0));
        assert_eq!(out.first_band().unwrap(), &array![[1.0f32, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn test_anchor_scale_mismatch() {
        let mask = Raster::single(
            Array2::zeros((2, 2)),
            GeoTransform::north_up(0.0, 2.0, 1.0),
            Crs::Geographic.to_wkt(),
        );
        let err = CloudMaskReprojector::new(Crs::Geographic, 1.0)
            .reproject_onto(&mask, &GeoTransform::north_up(0.0, 0.0, 2.0))
            .unwrap_err();
        assert!(matches!(err, ViirsError::InvalidData(_)));
    }

    #[test]
    fn test_geographic_mask_into_working_grid() {
        let mask = Raster::single(
            Array2::from_shape_fn((50, 80), |(r, _)| if r < 25 { 0.0 } else { 3.0 }),
            GeoTransform::north_up(80.0, 56.0, 0.025),
            Crs::Geographic.to_wkt(),
        );
        let working = Crs::working();
        let out = CloudMaskReprojector::new(working.clone(), 750.0)
            .reproject(&mask)
            .unwrap();
        assert_eq!(Crs::from_wkt(&out.crs).unwrap(), working);
        assert_eq!(out.transform.pixel_width, 750.0);
        // The northern half is cloudy, the southern half clear.
        let band = out.first_band().unwrap();
        assert!(band.iter().any(|&v| v == 0.0));
        assert!(band.iter().any(|&v| v == 3.0));
        assert!(band.iter().all(|v| v.is_nan() || *v == 0.0 || *v == 3.0));
    }

    #[test]
    fn test_unsupported_source_crs() {
        let mask = Raster::single(
            Array2::zeros((2, 2)),
            GeoTransform::north_up(0.0, 0.0, 1.0),
            r#"PROJCS["UTM",PROJECTION["Transverse_Mercator"]]"#,
        );
        let err = CloudMaskReprojector::new(Crs::working(), 750.0)
            .reproject(&mask)
            .unwrap_err();
        assert!(matches!(err, ViirsError::ProjectionFailure(_)));
    }
}
