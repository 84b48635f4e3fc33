//! Sensor fill codes used by VIIRS SDR granules.
//!
//! Unsigned 16-bit band arrays reserve the top of the range for fill values.
//! Anything at or above [`ND_SOUB`] is not an observation.

/// Not applicable. Also used as the scatter buffer's initial value.
pub const ND_NA: u16 = 65535;
/// Missing.
pub const ND_MISS: u16 = 65534;
/// Onboard pixel trim.
pub const ND_OBPT: u16 = 65533;
/// On-ground pixel trim.
pub const ND_OGPT: u16 = 65532;
/// Error.
pub const ND_ERR: u16 = 65531;
/// Ellipsoid intersect failed.
pub const ND_ELINT: u16 = 65530;
/// Value does not exist.
pub const ND_VDNE: u16 = 65529;
/// Scaled out of bounds.
pub const ND_SOUB: u16 = 65528;

/// Lowest value treated as nodata in raw band space.
pub const NODATA_THRESHOLD: f32 = ND_SOUB as f32;

/// Latitude/longitude fill values sit below this bound.
pub const GEOLOCATION_FILL_BOUND: f32 = -200.0;

/// NDVI value written where the cloud mask flags a pixel.
pub const NDVI_CLOUD: f32 = -2.0;

/// Whether a raw band value is one of the fill codes.
pub fn is_nodata(value: f32) -> bool {
    value.is_nan() || value >= NODATA_THRESHOLD
}
