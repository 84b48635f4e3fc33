//! Grouping of a geolocation file with its band files.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::record_type::{RecordType, Resolution};
use crate::swath_file::SwathFile;

/// One geolocation file plus the band files of the same granule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fileset {
    pub geoloc: SwathFile,
    /// Sorted by record type.
    pub bands: Vec<SwathFile>,
}

impl Fileset {
    pub fn resolution(&self) -> Resolution {
        self.geoloc.resolution()
    }

    /// Whether every band of the resolution family is present.
    pub fn is_complete(&self) -> bool {
        self.bands.len() == self.resolution().expected_band_count()
    }

    pub fn band(&self, record_type: RecordType) -> Option<&SwathFile> {
        self.bands.iter().find(|b| b.record_type == record_type)
    }
}

/// Which terrain-correction flavour of geolocation to keep when both exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeolocPreference {
    /// GIMGO/GMODO
    #[default]
    Ellipsoid,
    /// GITCO/GMTCO
    Parallax,
    /// Keep both.
    Both,
}

impl GeolocPreference {
    pub fn accepts(&self, record_type: RecordType) -> bool {
        match self {
            GeolocPreference::Ellipsoid => !record_type.is_parallax_corrected(),
            GeolocPreference::Parallax => !record_type.is_smooth_ellipsoid(),
            GeolocPreference::Both => true,
        }
    }
}

impl FromStr for GeolocPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "e" | "ellipsoid" => Ok(GeolocPreference::Ellipsoid),
            "p" | "parallax" => Ok(GeolocPreference::Parallax),
            "b" | "both" => Ok(GeolocPreference::Both),
            other => Err(format!("unknown geolocation preference '{}'", other)),
        }
    }
}

/// Build SDR filesets out of a flat list of granule files.
///
/// Every accepted SDR geolocation file yields one fileset, even if it has no
/// band files. Result is ordered by geolocation file name.
pub fn group_filesets(files: &[SwathFile], preference: GeolocPreference) -> Vec<Fileset> {
    let mut filesets: Vec<Fileset> = files
        .iter()
        .filter(|f| RecordType::GEOLOCATION_SDR.contains(&f.record_type))
        .filter(|f| preference.accepts(f.record_type))
        .map(|geoloc| {
            let wanted = geoloc.record_type.band_types();
            let mut bands: Vec<SwathFile> = files
                .iter()
                .filter(|f| wanted.contains(&f.record_type) && f.same_granule(geoloc))
                .cloned()
                .collect();
            bands.sort_by(|a, b| a.record_type.cmp(&b.record_type));
            Fileset {
                geoloc: geoloc.clone(),
                bands,
            }
        })
        .collect();
    filesets.sort_by(|a, b| a.geoloc.name.cmp(&b.geoloc.name));
    filesets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(kind: &str, t: &str, orbit: &str) -> SwathFile {
        SwathFile::parse(format!(
            "{}_npp_d20210221_t{}_e0832466_b{}_c20210221100336573000_noaa_ops.h5",
            kind, t, orbit
        ))
        .unwrap()
    }

    #[test]
    fn test_grouping_by_granule() {
        let files = vec![
            file("GIMGO", "0821238", "48293"),
            file("SVI02", "0821238", "48293"),
            file("SVI01", "0821238", "48293"),
            file("SVI01", "0833000", "48293"),
            file("SVM01", "0821238", "48293"),
        ];
        let sets = group_filesets(&files, GeolocPreference::Ellipsoid);
        assert_eq!(sets.len(), 1);
        let bands: Vec<_> = sets[0].bands.iter().map(|b| b.record_type).collect();
        assert_eq!(bands, vec![RecordType::IBandSdr(1), RecordType::IBandSdr(2)]);
        assert!(!sets[0].is_complete());
    }

    #[test]
    fn test_preference_filters_geolocation() {
        let files = vec![
            file("GIMGO", "0821238", "48293"),
            file("GITCO", "0821238", "48293"),
            file("SVI01", "0821238", "48293"),
        ];
        let ellipsoid = group_filesets(&files, GeolocPreference::Ellipsoid);
        assert_eq!(ellipsoid.len(), 1);
        assert_eq!(ellipsoid[0].geoloc.record_type, RecordType::Gimgo);

        let parallax = group_filesets(&files, GeolocPreference::Parallax);
        assert_eq!(parallax.len(), 1);
        assert_eq!(parallax[0].geoloc.record_type, RecordType::Gitco);

        let both = group_filesets(&files, GeolocPreference::Both);
        assert_eq!(both.len(), 2);
        assert!(both.iter().all(|fs| fs.bands.len() == 1));
    }

    #[test]
    fn test_complete_dnb_fileset() {
        let files = vec![
            file("GDNBO", "0821238", "48293"),
            file("SVDNB", "0821238", "48293"),
        ];
        let sets = group_filesets(&files, GeolocPreference::default());
        assert_eq!(sets.len(), 1);
        assert!(sets[0].is_complete());
        assert_eq!(sets[0].resolution(), Resolution::DayNight);
    }

    #[test]
    fn test_preference_from_str() {
        assert_eq!("p".parse::<GeolocPreference>().unwrap(), GeolocPreference::Parallax);
        assert_eq!("Both".parse::<GeolocPreference>().unwrap(), GeolocPreference::Both);
        assert!("x".parse::<GeolocPreference>().is_err());
    }
}
