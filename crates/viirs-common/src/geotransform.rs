//! Affine geotransform in GDAL coefficient order.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViirsError};

/// `x = origin_x + col * pixel_width + row * rotation_x`,
/// `y = origin_y + col * rotation_y + row * pixel_height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub origin_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform with square pixels: `(x_min, scale, 0, y_max, 0, -scale)`.
    pub fn north_up(x_min: f64, y_max: f64, scale: f64) -> Self {
        Self {
            origin_x: x_min,
            pixel_width: scale,
            rotation_x: 0.0,
            origin_y: y_max,
            rotation_y: 0.0,
            pixel_height: -scale,
        }
    }

    pub fn from_gdal(c: [f64; 6]) -> Self {
        Self {
            origin_x: c[0],
            pixel_width: c[1],
            rotation_x: c[2],
            origin_y: c[3],
            rotation_y: c[4],
            pixel_height: c[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.rotation_x,
            self.origin_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// Shift the origin by whole pixels, as when rows/columns are cut from
    /// the top/left of a raster.
    pub fn translated(&self, cols: usize, rows: usize) -> Self {
        let (c, r) = (cols as f64, rows as f64);
        Self {
            origin_x: self.origin_x + c * self.pixel_width + r * self.rotation_x,
            origin_y: self.origin_y + c * self.rotation_y + r * self.pixel_height,
            ..*self
        }
    }

    /// Map coordinates of the upper-left corner of a pixel.
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.rotation_x,
            self.origin_y + col * self.rotation_y + row * self.pixel_height,
        )
    }

    /// Fractional pixel position of a map coordinate. Only valid without rotation.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    /// Check that `other` can be aligned with `self` by pure pixel offsets.
    pub fn ensure_same_grid(&self, other: &GeoTransform) -> Result<()> {
        if self.pixel_width != other.pixel_width || self.pixel_height != other.pixel_height {
            return Err(ViirsError::invalid(format!(
                "cannot align rasters with different scale ({}, {}) vs ({}, {})",
                self.pixel_width, self.pixel_height, other.pixel_width, other.pixel_height
            )));
        }
        if self.rotation_x != other.rotation_x || self.rotation_y != other.rotation_y {
            return Err(ViirsError::invalid(
                "cannot align rasters with different rotation",
            ));
        }
        Ok(())
    }

    /// Offset of `other`'s origin in `self`'s pixel space, rounded to whole pixels.
    ///
    /// Positive values mean `other` starts right of / below `self`.
    pub fn pixel_offset_of(&self, other: &GeoTransform) -> (i64, i64) {
        let col = ((other.origin_x - self.origin_x) / self.pixel_width).round() as i64;
        let row = ((other.origin_y - self.origin_y) / self.pixel_height).round() as i64;
        (col, row)
    }

    /// Whether `other` lies on `self`'s pixel lattice, so that pixel offsets
    /// between the two are whole numbers.
    pub fn is_pixel_aligned(&self, other: &GeoTransform) -> bool {
        if self.ensure_same_grid(other).is_err() {
            return false;
        }
        let (col, row) = self.geo_to_pixel(other.origin_x, other.origin_y);
        (col - col.round()).abs() < 1e-6 && (row - row.round()).abs() < 1e-6
    }
}
