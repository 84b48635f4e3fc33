//! Geolocation resolution: per-pixel lat/lon to integer grid indices.

use ndarray::{Array2, ArrayView2, Zip};
use projection::Projection;
use viirs_common::nodata::GEOLOCATION_FILL_BOUND;
use viirs_common::{GeoTransform, Result, ViirsError};

/// Grid placement of every valid swath pixel at one scale.
///
/// Built once per fileset and shared read-only by all of its bands.
#[derive(Debug, Clone)]
pub struct ResolvedGeolocation {
    mask: Array2<bool>,
    x_index: Vec<usize>,
    y_index: Vec<usize>,
    x_min: f64,
    y_max: f64,
    scale: f64,
    shape: (usize, usize),
}

impl ResolvedGeolocation {
    /// Project `lat`/`lon` (degrees, equal shape) and index them on a grid
    /// of `scale` projection units.
    pub fn resolve(
        lat: ArrayView2<f32>,
        lon: ArrayView2<f32>,
        projection: &dyn Projection,
        scale: f64,
    ) -> Result<Self> {
        if lat.dim() != lon.dim() {
            return Err(ViirsError::invalid(format!(
                "latitude {:?} and longitude {:?} shapes differ",
                lat.dim(),
                lon.dim()
            )));
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(ViirsError::invalid(format!("invalid scale {}", scale)));
        }

        let mut mask = Array2::from_elem(lat.dim(), false);
        Zip::from(&mut mask)
            .and(&lat)
            .and(&lon)
            .for_each(|m, &la, &lo| *m = la > GEOLOCATION_FILL_BOUND && lo > GEOLOCATION_FILL_BOUND);

        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for ((&valid, &la), &lo) in mask.iter().zip(lat.iter()).zip(lon.iter()) {
            if !valid {
                continue;
            }
            let (x, y) = projection.forward(f64::from(lo), f64::from(la));
            if !x.is_finite() || !y.is_finite() {
                return Err(ViirsError::projection(format!(
                    "non-finite projected coordinate for lat={} lon={}",
                    la, lo
                )));
            }
            xs.push(x);
            ys.push(y);
        }

        if xs.is_empty() {
            return Err(ViirsError::invalid("geolocation has no valid pixels"));
        }

        let x_min = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let y_max = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let x_index = zero_based_indices(&xs, scale);
        let y_index = zero_based_indices(&ys, scale);

        let cols = x_index.iter().max().map_or(0, |m| m + 1);
        let rows = y_index.iter().max().map_or(0, |m| m + 1);
        if rows <= 1 || cols <= 1 {
            return Err(ViirsError::invalid(format!(
                "resolved raster shape {}x{} is degenerate",
                rows, cols
            )));
        }

        Ok(Self {
            mask,
            x_index,
            y_index,
            x_min,
            y_max,
            scale,
            shape: (rows, cols),
        })
    }

    /// Validity mask in swath (scan) space.
    pub fn mask(&self) -> ArrayView2<'_, bool> {
        self.mask.view()
    }

    /// Column index of each valid pixel, in mask row-major order.
    pub fn x_index(&self) -> &[usize] {
        &self.x_index
    }

    /// Row index of each valid pixel counted from the southern edge.
    pub fn y_index(&self) -> &[usize] {
        &self.y_index
    }

    /// `(rows, cols)` of the output raster.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn valid_count(&self) -> usize {
        self.x_index.len()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// `(x_min, scale, 0, y_max, 0, -scale)`
    pub fn transform(&self) -> GeoTransform {
        GeoTransform::north_up(self.x_min, self.y_max, self.scale)
    }
}

fn zero_based_indices(coords: &[f64], scale: f64) -> Vec<usize> {
    let scaled: Vec<i64> = coords.iter().map(|c| (c / scale).round() as i64).collect();
    let min = scaled.iter().copied().min().unwrap_or(0);
    scaled.into_iter().map(|v| (v - min) as usize).collect()
}
