//! Granule filename parsing.
//!
//! `{TYPE}_{SAT}_d{YYYYMMDD}_t{HHMMSSf}_e{HHMMSSf}_b{ORBIT}_c{CREATED}_{SOURCE}.h5`

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use viirs_common::{Result, ViirsError};

use crate::record_type::{RecordType, Resolution};

/// Metadata of one granule file, parsed from its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwathFile {
    pub path: PathBuf,
    pub name: String,
    pub record_type: RecordType,
    /// Satellite id (`npp`, `j01`, ...)
    pub sat_id: String,
    pub date: NaiveDate,
    pub t_start: NaiveTime,
    pub t_end: NaiveTime,
    pub orbit: String,
    /// Creation timestamp token, without the `c` prefix
    pub created: String,
    /// Data source tag (`noaa_ops`, `ipop_dev`, ...)
    pub source: String,
}

impl SwathFile {
    /// Parse the file name of `path`. The file does not need to exist.
    pub fn parse(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ViirsError::parse(path.display().to_string(), "not a file name"))?
            .to_string();

        let stem = name
            .strip_suffix(".h5")
            .ok_or_else(|| ViirsError::parse(&name, "expected .h5 extension"))?;

        let parts: Vec<&str> = stem.splitn(8, '_').collect();
        if parts.len() != 8 {
            return Err(ViirsError::parse(
                &name,
                format!("expected 8 '_'-separated fields, got {}", parts.len()),
            ));
        }

        let record_type: RecordType = parts[0]
            .parse()
            .map_err(|e: crate::record_type::UnknownRecordType| ViirsError::parse(&name, e.to_string()))?;

        let field = |idx: usize, prefix: char| -> Result<&str> {
            parts[idx]
                .strip_prefix(prefix)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ViirsError::parse(&name, format!("field {} must start with '{}'", idx, prefix)))
        };

        let date = NaiveDate::parse_from_str(field(2, 'd')?, "%Y%m%d")
            .map_err(|e| ViirsError::parse(&name, format!("bad date: {}", e)))?;
        let t_start = parse_time_of_day(field(3, 't')?).ok_or_else(|| ViirsError::parse(&name, "bad start time"))?;
        let t_end = parse_time_of_day(field(4, 'e')?).ok_or_else(|| ViirsError::parse(&name, "bad end time"))?;

        let orbit = field(5, 'b')?;
        if !orbit.chars().all(|c| c.is_ascii_digit()) {
            return Err(ViirsError::parse(&name, "orbit number must be numeric"));
        }
        let created = field(6, 'c')?;
        if !created.chars().all(|c| c.is_ascii_digit()) {
            return Err(ViirsError::parse(&name, "creation timestamp must be numeric"));
        }

        Ok(Self {
            path: path.to_path_buf(),
            record_type,
            sat_id: parts[1].to_string(),
            date,
            t_start,
            t_end,
            orbit: orbit.to_string(),
            created: created.to_string(),
            source: parts[7].to_string(),
            name,
        })
    }

    pub fn is_geolocation(&self) -> bool {
        self.record_type.is_geolocation()
    }

    pub fn resolution(&self) -> Resolution {
        self.record_type.resolution()
    }

    /// Acquisition start as a UTC instant.
    pub fn acquired_at(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&NaiveDateTime::new(self.date, self.t_start))
    }

    pub fn name_without_extension(&self) -> &str {
        self.name.strip_suffix(".h5").unwrap_or(&self.name)
    }

    /// Whether `other` was acquired in the same granule window.
    pub fn same_granule(&self, other: &SwathFile) -> bool {
        self.t_start == other.t_start && self.t_end == other.t_end && self.orbit == other.orbit
    }
}

/// `HHMMSSf`, the last digit being tenths of a second.
fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    if s.len() != 7 || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let h: u32 = s[0..2].parse().ok()?;
    let m: u32 = s[2..4].parse().ok()?;
    let sec: u32 = s[4..6].parse().ok()?;
    let tenths: u32 = s[6..7].parse().ok()?;
    NaiveTime::from_hms_milli_opt(h, m, sec, tenths * 100)
}
