//! Processor configuration file.
//!
//! A single YAML document; every key is optional. `${VAR}` and
//! `${VAR:-default}` are expanded from the environment before parsing.
//!
//! ```yaml
//! data_dir: ${VIIRS_DATA_DIR:-/data/viirs}
//! output_dir: /data/ndvi
//! merge_days: 4
//! scale:
//!   multiplier: 2
//! cloud_mask:
//!   required: false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use georef::FillParams;
use pipeline::{CloudMaskConfig, ForceFlags, PipelineConfig, ScaleConfig};
use serde::{Deserialize, Serialize};
use swath_catalog::GeolocPreference;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// SQLite file; defaults to `state.db` inside the output directory.
    pub state_db: Option<PathBuf>,
    pub merge_days: u32,
    /// Defaults to twice `merge_days`.
    pub dynamics_days: Option<u32>,
    pub scale: ScaleSection,
    pub force: ForceSection,
    pub cloud_mask: CloudMaskSection,
    pub geoloc_preference: GeolocPreference,
    /// Defaults to the available parallelism.
    pub workers: Option<usize>,
    pub fill: FillSection,
    pub scan_recent_only: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/data/viirs"),
            output_dir: PathBuf::from("/data/ndvi"),
            state_db: None,
            merge_days: 4,
            dynamics_days: None,
            scale: ScaleSection::default(),
            force: ForceSection::default(),
            cloud_mask: CloudMaskSection::default(),
            geoloc_preference: GeolocPreference::default(),
            workers: None,
            fill: FillSection::default(),
            scan_recent_only: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleSection {
    pub band_i: f64,
    pub band_m: f64,
    pub band_dn: f64,
    pub multiplier: u32,
}

impl Default for ScaleSection {
    fn default() -> Self {
        let scale = ScaleConfig::default();
        Self {
            band_i: scale.band_i,
            band_m: scale.band_m,
            band_dn: scale.band_dn,
            multiplier: scale.multiplier,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceSection {
    pub swath: bool,
    pub cloud_mask: bool,
    pub ndvi: bool,
    pub composite: bool,
    pub dynamics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudMaskSection {
    pub single_file: bool,
    pub required: bool,
    pub cloudy_values: Vec<f32>,
}

impl Default for CloudMaskSection {
    fn default() -> Self {
        let mask = CloudMaskConfig::default();
        Self {
            single_file: mask.single_file,
            required: mask.required,
            cloudy_values: mask.cloudy_values,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FillSection {
    pub max_distance: usize,
    pub smoothing_iterations: usize,
}

impl Default for FillSection {
    fn default() -> Self {
        let fill = FillParams::default();
        Self {
            max_distance: fill.max_distance,
            smoothing_iterations: fill.smoothing_iterations,
        }
    }
}

impl ProcessorConfig {
    /// Load and validate a config file with environment variable substitution.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid config in {:?}", path.as_ref()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let expanded = shellexpand::env(content).context("Failed to expand environment variables")?;
        let config: ProcessorConfig =
            serde_yaml::from_str(&expanded).context("Failed to parse config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.scale.multiplier >= 1,
            "scale.multiplier must be at least 1, got {}",
            self.scale.multiplier
        );
        anyhow::ensure!(self.merge_days >= 1, "merge_days must be at least 1");
        if let Some(dynamics_days) = self.dynamics_days {
            anyhow::ensure!(
                dynamics_days >= self.merge_days,
                "dynamics_days ({}) must not be shorter than merge_days ({})",
                dynamics_days,
                self.merge_days
            );
        }
        anyhow::ensure!(self.workers != Some(0), "workers must be at least 1");
        Ok(())
    }

    pub fn state_db_path(&self) -> PathBuf {
        self.state_db
            .clone()
            .unwrap_or_else(|| self.output_dir.join("state.db"))
    }

    pub fn to_pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(&self.data_dir, &self.output_dir);
        config.merge_days = self.merge_days;
        config.dynamics_days = self.dynamics_days.unwrap_or(2 * self.merge_days);
        config.scale = ScaleConfig {
            band_i: self.scale.band_i,
            band_m: self.scale.band_m,
            band_dn: self.scale.band_dn,
            multiplier: self.scale.multiplier,
        };
        config.force = ForceFlags {
            swath: self.force.swath,
            cloud_mask: self.force.cloud_mask,
            ndvi: self.force.ndvi,
            composite: self.force.composite,
            dynamics: self.force.dynamics,
        };
        config.cloud_mask = CloudMaskConfig {
            single_file: self.cloud_mask.single_file,
            required: self.cloud_mask.required,
            cloudy_values: self.cloud_mask.cloudy_values.clone(),
        };
        config.geoloc_preference = self.geoloc_preference;
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        config.fill = FillParams {
            max_distance: self.fill.max_distance,
            smoothing_iterations: self.fill.smoothing_iterations,
        };
        config.scan_recent_only = self.scan_recent_only;
        config
    }
}
