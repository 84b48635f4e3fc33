//! Lambert Conformal Conic projection on an ellipsoid.
//!
//! Two-standard-parallel form (Snyder, "Map Projections: A Working Manual",
//! eq. 15-1 to 15-11). Coordinates are in metres from the projection origin
//! plus false easting/northing.
//!
//! The projection parameters include:
//! - Latitude of origin (lat0)
//! - Central meridian (lon0)
//! - Standard parallels latin1 and latin2 (equal for a tangent cone)
//! - Ellipsoid semi-major axis and inverse flattening

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use crate::Projection;

/// WGS84 semi-major axis (metres).
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 inverse flattening.
pub const WGS84_RF: f64 = 298.257_223_563;

/// Lambert Conformal Conic projection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LambertConformal {
    /// Latitude of origin (degrees)
    pub lat0: f64,
    /// Central meridian (degrees)
    pub lon0: f64,
    /// First standard parallel (degrees)
    pub latin1: f64,
    /// Second standard parallel (degrees)
    pub latin2: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    /// Semi-major axis (metres)
    pub a: f64,
    /// Inverse flattening
    pub rf: f64,
    /// First eccentricity
    e: f64,
    /// Cone constant
    n: f64,
    /// F constant
    f: f64,
    /// Rho at the latitude of origin
    rho0: f64,
}

impl LambertConformal {
    /// Create a projection on the WGS84 ellipsoid.
    pub fn wgs84(lat0: f64, lon0: f64, latin1: f64, latin2: f64) -> Self {
        Self::new(lat0, lon0, latin1, latin2, 0.0, 0.0, WGS84_A, WGS84_RF)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lat0: f64,
        lon0: f64,
        latin1: f64,
        latin2: f64,
        false_easting: f64,
        false_northing: f64,
        a: f64,
        rf: f64,
    ) -> Self {
        let flattening = 1.0 / rf;
        let e = (2.0 * flattening - flattening * flattening).sqrt();

        let phi1 = latin1.to_radians();
        let phi2 = latin2.to_radians();
        let m1 = msfn(phi1, e);
        let t1 = tsfn(phi1, e);

        // Tangent cone when both parallels coincide
        let n = if (phi1 - phi2).abs() < 1e-10 {
            phi1.sin()
        } else {
            let m2 = msfn(phi2, e);
            let t2 = tsfn(phi2, e);
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };

        let f = m1 / (n * t1.powf(n));
        let rho0 = a * f * tsfn(lat0.to_radians(), e).powf(n);

        Self {
            lat0,
            lon0,
            latin1,
            latin2,
            false_easting,
            false_northing,
            a,
            rf,
            e,
            n,
            f,
            rho0,
        }
    }

    /// Working projection for the West Siberian processing region.
    pub fn siberia() -> Self {
        Self::wgs84(55.4962675, 80.0, 67.41206675, 43.58046825)
    }

    /// Cone constant.
    pub fn cone_constant(&self) -> f64 {
        self.n
    }
}

impl Projection for LambertConformal {
    fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let phi = lat.to_radians();

        // Normalize longitude difference to [-180, 180]
        let mut dlon = lon - self.lon0;
        while dlon > 180.0 {
            dlon -= 360.0;
        }
        while dlon < -180.0 {
            dlon += 360.0;
        }

        let rho = if (phi.abs() - FRAC_PI_2).abs() < 1e-12 {
            if phi * self.n <= 0.0 {
                return (f64::NAN, f64::NAN);
            }
            0.0
        } else {
            self.a * self.f * tsfn(phi, self.e).powf(self.n)
        };
        let theta = self.n * dlon.to_radians();

        (
            self.false_easting + rho * theta.sin(),
            self.false_northing + self.rho0 - rho * theta.cos(),
        )
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let x = x - self.false_easting;
        let y = self.rho0 - (y - self.false_northing);
        let sign = self.n.signum();

        let rho = sign * (x * x + y * y).sqrt();
        let theta = (sign * x).atan2(sign * y);
        let lon = self.lon0 + (theta / self.n).to_degrees();

        if rho == 0.0 {
            return (lon, sign * 90.0);
        }

        let t = (rho / (self.a * self.f)).powf(1.0 / self.n);
        (lon, phi_from_t(t, self.e).to_degrees())
    }
}

/// Snyder eq. 14-15.
fn msfn(phi: f64, e: f64) -> f64 {
    let s = phi.sin();
    phi.cos() / (1.0 - e * e * s * s).sqrt()
}

/// Snyder eq. 15-9.
fn tsfn(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

/// Snyder eq. 7-9, solved by fixed-point iteration.
fn phi_from_t(t: f64, e: f64) -> f64 {
    let mut phi = FRAC_PI_2 - 2.0 * t.atan();
    for _ in 0..15 {
        let es = e * phi.sin();
        let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(e / 2.0)).atan();
        if (next - phi).abs() < 1e-12 {
            return next;
        }
        phi = next;
    }
    phi
}
