//! Coordinate reference systems the pipeline reads and writes.

use std::fmt;

use viirs_common::{Result, ViirsError};

use crate::geographic::Geographic;
use crate::lambert::{LambertConformal, WGS84_A, WGS84_RF};
use crate::Projection;

/// A CRS understood by the gridding and reprojection code.
#[derive(Debug, Clone, PartialEq)]
pub enum Crs {
    /// WGS84 lat/lon in degrees
    Geographic,
    /// Lambert Conformal Conic in metres
    Lambert(LambertConformal),
}

impl Crs {
    /// The pipeline's working CRS.
    pub fn working() -> Self {
        Crs::Lambert(LambertConformal::siberia())
    }

    pub fn projection(&self) -> Box<dyn Projection> {
        match self {
            Crs::Geographic => Box::new(Geographic),
            Crs::Lambert(lcc) => Box::new(lcc.clone()),
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Geographic)
    }

    /// WKT1 representation, as stored in GeoTIFF headers.
    pub fn to_wkt(&self) -> String {
        const GEOGCS: &str = concat!(
            r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]],"#,
            r#"PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]]"#
        );
        match self {
            Crs::Geographic => GEOGCS.to_string(),
            Crs::Lambert(p) => format!(
                concat!(
                    r#"PROJCS["Lambert_Conformal_Conic",{geog},"#,
                    r#"PROJECTION["Lambert_Conformal_Conic_2SP"],"#,
                    r#"PARAMETER["standard_parallel_1",{lat1}],"#,
                    r#"PARAMETER["standard_parallel_2",{lat2}],"#,
                    r#"PARAMETER["latitude_of_origin",{lat0}],"#,
                    r#"PARAMETER["central_meridian",{lon0}],"#,
                    r#"PARAMETER["false_easting",{fe}],"#,
                    r#"PARAMETER["false_northing",{fn_}],"#,
                    r#"UNIT["metre",1]]"#
                ),
                geog = GEOGCS,
                lat1 = p.latin1,
                lat2 = p.latin2,
                lat0 = p.lat0,
                lon0 = p.lon0,
                fe = p.false_easting,
                fn_ = p.false_northing,
            ),
        }
    }

    /// Recognize a CRS from WKT1, WKT2 or an `EPSG:4326` code.
    pub fn from_wkt(wkt: &str) -> Result<Self> {
        let trimmed = wkt.trim_start();
        let upper = trimmed.to_ascii_uppercase();

        if upper == "EPSG:4326"
            || upper.starts_with("GEOGCS[")
            || upper.starts_with("GEOGCRS[")
            || upper.starts_with("GEODCRS[")
        {
            return Ok(Crs::Geographic);
        }

        let is_lcc = upper.contains("LAMBERT_CONFORMAL_CONIC")
            || upper.contains("LAMBERT CONIC CONFORMAL");
        if !is_lcc {
            return Err(ViirsError::projection(format!(
                "unsupported CRS: {}",
                trimmed.chars().take(60).collect::<String>()
            )));
        }

        let lat1 = parameter(trimmed, &["standard_parallel_1", "Latitude of 1st standard parallel"])
            .ok_or_else(|| ViirsError::projection("LCC WKT without standard_parallel_1"))?;
        let lat2 = parameter(trimmed, &["standard_parallel_2", "Latitude of 2nd standard parallel"])
            .unwrap_or(lat1);
        let lat0 = parameter(trimmed, &["latitude_of_origin", "Latitude of false origin"])
            .unwrap_or(lat1);
        let lon0 = parameter(trimmed, &["central_meridian", "Longitude of false origin"])
            .unwrap_or(0.0);
        let fe = parameter(trimmed, &["false_easting", "Easting at false origin"]).unwrap_or(0.0);
        let fn_ = parameter(trimmed, &["false_northing", "Northing at false origin"]).unwrap_or(0.0);

        Ok(Crs::Lambert(LambertConformal::new(
            lat0, lon0, lat1, lat2, fe, fn_, WGS84_A, WGS84_RF,
        )))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Geographic => write!(f, "EPSG:4326"),
            Crs::Lambert(p) => write!(
                f,
                "LCC(lat0={}, lon0={}, lat1={}, lat2={})",
                p.lat0, p.lon0, p.latin1, p.latin2
            ),
        }
    }
}

/// Value of `PARAMETER["<name>",<value>...]`, matching names case-insensitively.
fn parameter(wkt: &str, names: &[&str]) -> Option<f64> {
    let lower = wkt.to_ascii_lowercase();
    names.iter().find_map(|name| {
        let needle = format!("\"{}\"", name.to_ascii_lowercase());
        let start = lower.find(&needle)? + needle.len();
        let rest = wkt[start..].trim_start().strip_prefix(',')?;
        let end = rest.find([',', ']'])?;
        rest[..end].trim().parse().ok()
    })
}
