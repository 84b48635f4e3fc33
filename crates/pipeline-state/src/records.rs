//! Plain records for persisted artifacts.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use viirs_common::Period;

/// Closed set of artifacts the pipeline persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    SwathRaster,
    CloudMask,
    Ndvi,
    Composite,
    Dynamics,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        Self::SwathRaster,
        Self::CloudMask,
        Self::Ndvi,
        Self::Composite,
        Self::Dynamics,
    ];

    pub(crate) fn table(&self) -> &'static str {
        match self {
            Self::SwathRaster => "swath_rasters",
            Self::CloudMask => "cloud_masks",
            Self::Ndvi => "ndvi",
            Self::Composite => "composites",
            Self::Dynamics => "dynamics",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SwathRaster => "swath_raster",
            Self::CloudMask => "cloud_mask",
            Self::Ndvi => "ndvi",
            Self::Composite => "composite",
            Self::Dynamics => "dynamics",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields every persisted artifact carries.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactMeta {
    pub output_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl ArtifactMeta {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            created_at: Utc::now(),
        }
    }

    pub fn exists(&self) -> bool {
        self.output_path.exists()
    }
}

/// Calibrated multi-band raster of one fileset.
#[derive(Debug, Clone, PartialEq)]
pub struct SwathRasterRecord {
    pub meta: ArtifactMeta,
    /// Geolocation granule name, the dedup key.
    pub source: String,
    pub record_type: String,
    pub swath_dir: String,
    pub acquired_at: DateTime<Utc>,
}

/// Cloud mask reprojected onto the working grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudMaskRecord {
    pub meta: ArtifactMeta,
    pub swath_dir: String,
    pub source_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NdviRecord {
    pub meta: ArtifactMeta,
    /// Geolocation granule name of the swath raster it was computed from.
    pub based_on: String,
    pub acquired_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeRecord {
    pub meta: ArtifactMeta,
    pub period: Period,
    /// Output paths of the contributing NDVI rasters, sorted.
    pub components: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DynamicsRecord {
    pub meta: ArtifactMeta,
    pub b1: PathBuf,
    pub b2: PathBuf,
    /// Set when the composites were not adjacent.
    pub gap_days: Option<i64>,
}

/// Record counts per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateCounts {
    pub swath_rasters: u64,
    pub cloud_masks: u64,
    pub ndvi: u64,
    pub composites: u64,
    pub dynamics: u64,
}
