//! Resolved pipeline configuration.
//!
//! Built by the binary from its config file and flags; nothing in here
//! reads the environment.

use std::path::PathBuf;

use georef::FillParams;
use swath_catalog::{GeolocPreference, Resolution};
use viirs_common::{Result, ViirsError};

/// Output pixel size per resolution family, in projection units.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleConfig {
    pub band_i: f64,
    pub band_m: f64,
    pub band_dn: f64,
    /// Applied to every base scale. Must be >= 1.
    pub multiplier: u32,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            band_i: 375.0,
            band_m: 750.0,
            band_dn: 750.0,
            multiplier: 1,
        }
    }
}

impl ScaleConfig {
    pub fn scale_for(&self, resolution: Resolution) -> f64 {
        let base = match resolution {
            Resolution::I => self.band_i,
            Resolution::M => self.band_m,
            Resolution::DayNight => self.band_dn,
        };
        base * f64::from(self.multiplier)
    }
}

/// Reprocess artifacts even when a valid record exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForceFlags {
    pub swath: bool,
    pub cloud_mask: bool,
    pub ndvi: bool,
    pub composite: bool,
    pub dynamics: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloudMaskConfig {
    /// Reproject into one scratch file per swath instead of keeping a
    /// recorded projected mask per directory.
    pub single_file: bool,
    /// Without a mask, defer NDVI (true) or compute it unmasked (false).
    pub required: bool,
    pub cloudy_values: Vec<f32>,
}

impl Default for CloudMaskConfig {
    fn default() -> Self {
        Self {
            single_file: false,
            required: true,
            cloudy_values: vec![0.0, 1.0],
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub merge_days: u32,
    /// Distance in days from the start of the older composite to the end
    /// of the newer one.
    pub dynamics_days: u32,
    pub scale: ScaleConfig,
    pub force: ForceFlags,
    pub cloud_mask: CloudMaskConfig,
    pub geoloc_preference: GeolocPreference,
    pub workers: usize,
    pub fill: FillParams,
    /// Skip directories untouched since the last completed run.
    pub scan_recent_only: bool,
}

impl PipelineConfig {
    pub fn new(data_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let merge_days = 4;
        Self {
            data_dir: data_dir.into(),
            output_dir: output_dir.into(),
            merge_days,
            dynamics_days: 2 * merge_days,
            scale: ScaleConfig::default(),
            force: ForceFlags::default(),
            cloud_mask: CloudMaskConfig::default(),
            geoloc_preference: GeolocPreference::default(),
            workers: default_workers(),
            fill: FillParams::default(),
            scan_recent_only: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.scale.multiplier < 1 {
            return Err(ViirsError::invalid("scale multiplier must be at least 1"));
        }
        if self.merge_days == 0 {
            return Err(ViirsError::invalid("merge_days must be at least 1"));
        }
        if self.dynamics_days < self.merge_days {
            return Err(ViirsError::invalid(format!(
                "dynamics_days ({}) must not be shorter than merge_days ({})",
                self.dynamics_days, self.merge_days
            )));
        }
        if self.workers == 0 {
            return Err(ViirsError::invalid("workers must be at least 1"));
        }
        Ok(())
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
