//! The closed set of VIIRS record types recognized by the catalog.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Resolution family shared by a geolocation file and its band files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    /// Imagery bands, 375 m at nadir
    I,
    /// Moderate-resolution bands, 750 m at nadir
    M,
    /// Day/night band
    DayNight,
}

impl Resolution {
    /// Number of band files in a complete SDR fileset.
    pub fn expected_band_count(&self) -> usize {
        match self {
            Resolution::I => 5,
            Resolution::M => 16,
            Resolution::DayNight => 1,
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            Resolution::I => "I",
            Resolution::M => "M",
            Resolution::DayNight => "DN",
        }
    }

    pub fn verbose_name(&self) -> &'static str {
        match self {
            Resolution::I => "I-band",
            Resolution::M => "M-band",
            Resolution::DayNight => "Day/Night",
        }
    }
}

/// Granule record type, the first token of a granule filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    // Geolocation, SDR
    /// I-band terrain-corrected (parallax-corrected)
    Gitco,
    /// M-band terrain-corrected (parallax-corrected)
    Gmtco,
    /// I-band smooth ellipsoid
    Gimgo,
    /// M-band smooth ellipsoid
    Gmodo,
    /// Day/night band
    Gdnbo,

    // Geolocation, EDR
    Gigto,
    Gmgto,
    Gncco,

    // Bands
    /// SVI01..SVI05
    IBandSdr(u8),
    /// SVM01..SVM16
    MBandSdr(u8),
    /// VI1BO..VI5BO
    IBandEdr(u8),
    /// VM01O..VM06O
    MBandEdr(u8),
    /// SVDNB
    DayNightSdr,
    /// VNCCO
    NccEdr,
}

impl RecordType {
    pub const GEOLOCATION_SDR: [RecordType; 5] = [
        RecordType::Gitco,
        RecordType::Gmtco,
        RecordType::Gimgo,
        RecordType::Gmodo,
        RecordType::Gdnbo,
    ];

    pub fn is_geolocation(&self) -> bool {
        matches!(
            self,
            RecordType::Gitco
                | RecordType::Gmtco
                | RecordType::Gimgo
                | RecordType::Gmodo
                | RecordType::Gdnbo
                | RecordType::Gigto
                | RecordType::Gmgto
                | RecordType::Gncco
        )
    }

    pub fn is_band(&self) -> bool {
        !self.is_geolocation()
    }

    pub fn is_edr(&self) -> bool {
        matches!(
            self,
            RecordType::Gigto
                | RecordType::Gmgto
                | RecordType::Gncco
                | RecordType::IBandEdr(_)
                | RecordType::MBandEdr(_)
                | RecordType::NccEdr
        )
    }

    /// `SDR` or `EDR`.
    pub fn product_level(&self) -> &'static str {
        if self.is_edr() {
            "EDR"
        } else {
            "SDR"
        }
    }

    pub fn is_parallax_corrected(&self) -> bool {
        matches!(self, RecordType::Gitco | RecordType::Gmtco)
    }

    pub fn is_smooth_ellipsoid(&self) -> bool {
        matches!(self, RecordType::Gimgo | RecordType::Gmodo)
    }

    pub fn resolution(&self) -> Resolution {
        match self {
            RecordType::Gitco
            | RecordType::Gimgo
            | RecordType::Gigto
            | RecordType::IBandSdr(_)
            | RecordType::IBandEdr(_) => Resolution::I,
            RecordType::Gmtco
            | RecordType::Gmodo
            | RecordType::Gmgto
            | RecordType::MBandSdr(_)
            | RecordType::MBandEdr(_) => Resolution::M,
            RecordType::Gdnbo | RecordType::Gncco | RecordType::DayNightSdr | RecordType::NccEdr => {
                Resolution::DayNight
            }
        }
    }

    /// Band types that belong with this geolocation type. Empty for band types.
    pub fn band_types(&self) -> Vec<RecordType> {
        match self {
            RecordType::Gitco | RecordType::Gimgo => (1..=5).map(RecordType::IBandSdr).collect(),
            RecordType::Gmtco | RecordType::Gmodo => (1..=16).map(RecordType::MBandSdr).collect(),
            RecordType::Gdnbo => vec![RecordType::DayNightSdr],
            RecordType::Gigto => (1..=5).map(RecordType::IBandEdr).collect(),
            RecordType::Gmgto => (1..=6).map(RecordType::MBandEdr).collect(),
            RecordType::Gncco => vec![RecordType::NccEdr],
            _ => Vec::new(),
        }
    }

    /// Name of the array holding this band's sensor values. `None` for
    /// geolocation types and EDR imagery.
    pub fn band_dataset(&self) -> Option<&'static str> {
        match self {
            RecordType::IBandSdr(n) if *n < 4 => Some("Reflectance"),
            RecordType::IBandSdr(_) => Some("BrightnessTemperature"),
            RecordType::MBandSdr(n) if *n < 12 => Some("Reflectance"),
            RecordType::MBandSdr(_) => Some("BrightnessTemperature"),
            RecordType::DayNightSdr | RecordType::NccEdr => Some("Radiance"),
            _ => None,
        }
    }

    pub fn code(&self) -> String {
        match self {
            RecordType::Gitco => "GITCO".to_string(),
            RecordType::Gmtco => "GMTCO".to_string(),
            RecordType::Gimgo => "GIMGO".to_string(),
            RecordType::Gmodo => "GMODO".to_string(),
            RecordType::Gdnbo => "GDNBO".to_string(),
            RecordType::Gigto => "GIGTO".to_string(),
            RecordType::Gmgto => "GMGTO".to_string(),
            RecordType::Gncco => "GNCCO".to_string(),
            RecordType::IBandSdr(n) => format!("SVI{:02}", n),
            RecordType::MBandSdr(n) => format!("SVM{:02}", n),
            RecordType::IBandEdr(n) => format!("VI{}BO", n),
            RecordType::MBandEdr(n) => format!("VM{:02}O", n),
            RecordType::DayNightSdr => "SVDNB".to_string(),
            RecordType::NccEdr => "VNCCO".to_string(),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// Error for an unrecognized record type token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRecordType(pub String);

impl fmt::Display for UnknownRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown record type '{}'", self.0)
    }
}

impl FromStr for RecordType {
    type Err = UnknownRecordType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        let numbered = |prefix: &str, suffix: &str, max: u8| -> Option<u8> {
            let n: u8 = upper.strip_prefix(prefix)?.strip_suffix(suffix)?.parse().ok()?;
            (1..=max).contains(&n).then_some(n)
        };

        let parsed = match upper.as_str() {
            "GITCO" => Some(RecordType::Gitco),
            "GMTCO" => Some(RecordType::Gmtco),
            "GIMGO" => Some(RecordType::Gimgo),
            "GMODO" => Some(RecordType::Gmodo),
            "GDNBO" => Some(RecordType::Gdnbo),
            "GIGTO" => Some(RecordType::Gigto),
            "GMGTO" => Some(RecordType::Gmgto),
            "GNCCO" => Some(RecordType::Gncco),
            "SVDNB" => Some(RecordType::DayNightSdr),
            "VNCCO" => Some(RecordType::NccEdr),
            _ if upper.len() == 5 && upper.starts_with("SVI") => {
                numbered("SVI", "", 5).map(RecordType::IBandSdr)
            }
            _ if upper.len() == 5 && upper.starts_with("SVM") => {
                numbered("SVM", "", 16).map(RecordType::MBandSdr)
            }
            _ if upper.len() == 5 && upper.starts_with("VM") => {
                numbered("VM", "O", 6).map(RecordType::MBandEdr)
            }
            _ if upper.len() == 5 && upper.starts_with("VI") => {
                numbered("VI", "BO", 5).map(RecordType::IBandEdr)
            }
            _ => None,
        };
        parsed.ok_or_else(|| UnknownRecordType(s.to_string()))
    }
}
