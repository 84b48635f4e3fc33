//! Plate carrée pass-through: planar coordinates are degrees.

use crate::Projection;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Geographic;

impl Projection for Geographic {
    fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        (lon, lat)
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        (x, y)
    }
}
