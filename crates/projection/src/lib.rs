//! Coordinate reference systems for gridding swaths.
//!
//! Implements the projections the pipeline needs from scratch: the working
//! Lambert Conformal Conic grid and geographic lat/lon for external inputs.

pub mod crs;
pub mod geographic;
pub mod lambert;

pub use crs::Crs;
pub use geographic::Geographic;
pub use lambert::LambertConformal;

/// Forward and inverse mapping between lon/lat degrees and planar coordinates.
pub trait Projection: Send + Sync {
    /// `(lon, lat)` degrees to `(x, y)`. Non-finite output means the point
    /// cannot be projected.
    fn forward(&self, lon: f64, lat: f64) -> (f64, f64);

    /// `(x, y)` to `(lon, lat)` degrees.
    fn inverse(&self, x: f64, y: f64) -> (f64, f64);
}
