//! Common test fixtures for the VIIRS pipeline tests.
//!
//! Granule names, swath directory names and on-disk layouts that show up in
//! most catalog and pipeline tests.

use std::fs;
use std::path::{Path, PathBuf};

/// Granule filename fixtures.
pub mod granules {
    /// Start time token shared by the default granule.
    pub const T_START: &str = "0821238";
    /// End time token shared by the default granule.
    pub const T_END: &str = "0832466";
    /// Orbit token of the default granule.
    pub const ORBIT: &str = "48293";
    /// Acquisition date of the default granule.
    pub const DATE: &str = "20210221";

    /// I-band ellipsoid geolocation of the default granule.
    pub const GIMGO: &str =
        "GIMGO_npp_d20210221_t0821238_e0832466_b48293_c20210221100336573000_noaa_ops.h5";
    /// Red band of the default granule.
    pub const SVI01: &str =
        "SVI01_npp_d20210221_t0821238_e0832466_b48293_c20210221100336573000_noaa_ops.h5";
    /// Near-infrared band of the default granule.
    pub const SVI02: &str =
        "SVI02_npp_d20210221_t0821238_e0832466_b48293_c20210221100336573000_noaa_ops.h5";

    /// Build a granule name with the given record type, date (`YYYYMMDD`),
    /// start time (`HHMMSSf`) and orbit.
    pub fn name(kind: &str, date: &str, t_start: &str, orbit: &str) -> String {
        format!(
            "{}_npp_d{}_t{}_e{}_b{}_c{}100336573000_noaa_ops.h5",
            kind, date, t_start, T_END, orbit, date
        )
    }
}

/// Swath directory name fixtures.
pub mod swaths {
    /// A directory name carrying swath id `48293`.
    pub const DIR_NAME: &str = "NPP_48293_21-FEB-2021_082144";

    /// Directory name for a swath with the given orbit number.
    pub fn dir_name(orbit: &str) -> String {
        format!("NPP_{}_21-FEB-2021_082144", orbit)
    }
}

/// Working-grid pixel sizes in metres.
pub mod scales {
    pub const BAND_I: f64 = 375.0;
    pub const BAND_M: f64 = 750.0;
}

/// Create an NPP swath directory `<root>/<dir_name>` with empty granule
/// files in `viirs/level1` and, optionally, an empty cloud mask source in
/// `viirs/level2`.
///
/// Returns the swath directory path.
pub fn create_swath_layout(
    root: &Path,
    dir_name: &str,
    granules: &[&str],
    with_cloud_mask: bool,
) -> std::io::Result<PathBuf> {
    let swath_dir = root.join(dir_name);
    let level1 = swath_dir.join("viirs").join("level1");
    let level2 = swath_dir.join("viirs").join("level2");
    fs::create_dir_all(&level1)?;
    fs::create_dir_all(&level2)?;

    for name in granules {
        fs::write(level1.join(name), b"")?;
    }
    if with_cloud_mask {
        fs::write(level2.join(format!("{}_CLOUDMASK.tif", dir_name)), b"")?;
    }
    Ok(swath_dir)
}
