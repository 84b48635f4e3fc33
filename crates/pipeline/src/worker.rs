//! Blocking per-swath work.
//!
//! A [`SwathJob`] is planned by the orchestrator from persisted state and
//! executed here on a blocking thread with that worker's own reader and
//! store. Nothing in this module touches the state store; results travel
//! back as a [`SwathResult`].

use std::path::{Path, PathBuf};

use georef::{BandFailure, CloudMaskReprojector, FillParams, FilesetProcessor, NdviComputer};
use projection::Crs;
use swath_catalog::Fileset;
use tracing::{debug, error, info};
use viirs_common::{Raster, RasterStore, Result, SwathReader};

use crate::handler::SwathHandler;
use crate::outcome::Outcome;

/// Swath raster step of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterStep {
    Produce(PathBuf),
    /// Already produced; read back only if NDVI needs it.
    Reuse(PathBuf),
}

impl RasterStep {
    pub fn path(&self) -> &Path {
        match self {
            RasterStep::Produce(p) | RasterStep::Reuse(p) => p,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CloudMaskStep {
    /// No mask available and none required.
    Skip,
    Reuse(PathBuf),
    /// Reproject `source` into `output` and record it.
    Produce { source: PathBuf, output: PathBuf },
    /// Reproject `source` in memory; nothing is written or recorded.
    Scratch { source: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NdviStep {
    pub output: PathBuf,
    pub cloud_mask: CloudMaskStep,
}

/// Work for one fileset.
#[derive(Debug, Clone)]
pub struct SwathJob {
    pub swath_dir: String,
    pub fileset: Fileset,
    pub handler: SwathHandler,
    pub scale: f64,
    pub raster: RasterStep,
    pub ndvi: Option<NdviStep>,
}

/// Settings every worker needs, cloned into each task.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub crs: Crs,
    pub fill: FillParams,
    pub cloudy_values: Vec<f32>,
}

/// What a job produced. `None` steps were not attempted.
#[derive(Debug)]
pub struct SwathResult {
    pub job: SwathJob,
    pub raster: Option<Outcome<PathBuf>>,
    pub band_failures: Vec<BandFailure>,
    /// Only set for recorded (non-scratch) masks.
    pub cloud_mask: Option<Outcome<PathBuf>>,
    pub ndvi: Option<Outcome<PathBuf>>,
}

impl SwathResult {
    pub fn has_failure(&self) -> bool {
        [&self.raster, &self.cloud_mask, &self.ndvi]
            .into_iter()
            .flatten()
            .any(Outcome::is_failed)
    }

    pub fn has_product(&self) -> bool {
        [&self.raster, &self.cloud_mask, &self.ndvi]
            .into_iter()
            .flatten()
            .any(Outcome::is_produced)
    }
}

/// Execute one job. Never panics on bad input; every error ends up in the
/// returned outcomes.
pub fn run_job(
    job: SwathJob,
    reader: &dyn SwathReader,
    store: &dyn RasterStore,
    settings: &WorkerSettings,
) -> SwathResult {
    let name = job.fileset.geoloc.name.clone();
    let mut band_failures = Vec::new();
    let mut swath_raster = None;

    let raster = match &job.raster {
        RasterStep::Produce(path) => {
            let processor = FilesetProcessor::new(reader, &settings.crs, settings.fill);
            let produced = processor.process(&job.fileset, job.scale).and_then(|processed| {
                store.write(path, &processed.raster)?;
                Ok(processed)
            });
            match produced {
                Ok(processed) => {
                    info!(
                        fileset = %name,
                        path = %path.display(),
                        bands = processed.raster.band_count(),
                        failed_bands = processed.failures.len(),
                        "Swath raster produced"
                    );
                    band_failures = processed.failures;
                    swath_raster = Some(processed.raster);
                    Some(Outcome::Produced(path.clone()))
                }
                Err(e) => {
                    error!(fileset = %name, error = %e, "Swath raster failed");
                    return SwathResult {
                        job,
                        raster: Some(Outcome::Failed(e)),
                        band_failures,
                        cloud_mask: None,
                        ndvi: None,
                    };
                }
            }
        }
        RasterStep::Reuse(_) => None,
    };

    let (cloud_mask, ndvi) = match &job.ndvi {
        Some(step) => {
            let mut cloud_mask = None;
            let ndvi = Outcome::from_result(produce_ndvi(
                &job,
                step,
                swath_raster,
                store,
                settings,
                &mut cloud_mask,
            ));
            match &ndvi {
                Outcome::Produced(path) => {
                    info!(fileset = %name, path = %path.display(), "NDVI produced")
                }
                Outcome::Failed(e) => error!(fileset = %name, error = %e, "NDVI failed"),
                Outcome::Deferred(reason) => info!(fileset = %name, reason = %reason, "NDVI deferred"),
            }
            (cloud_mask, Some(ndvi))
        }
        None => (None, None),
    };

    SwathResult {
        job,
        raster,
        band_failures,
        cloud_mask,
        ndvi,
    }
}

fn produce_ndvi(
    job: &SwathJob,
    step: &NdviStep,
    swath_raster: Option<Raster>,
    store: &dyn RasterStore,
    settings: &WorkerSettings,
    cloud_mask_outcome: &mut Option<Outcome<PathBuf>>,
) -> Result<PathBuf> {
    let swath = match swath_raster {
        Some(raster) => raster,
        None => store.read(job.raster.path())?,
    };

    let computer = NdviComputer::default().with_cloudy_values(settings.cloudy_values.clone());
    let mut ndvi = computer.compute(&swath)?;
    let anchor = swath.transform;
    drop(swath);

    let reprojector = CloudMaskReprojector::new(settings.crs.clone(), job.scale);
    let mask = match &step.cloud_mask {
        CloudMaskStep::Skip => {
            debug!(fileset = %job.fileset.geoloc.name, "NDVI without cloud mask");
            None
        }
        CloudMaskStep::Reuse(path) => {
            let stored = store.read(path)?;
            if anchor.is_pixel_aligned(&stored.transform) {
                Some(stored)
            } else {
                debug!(
                    fileset = %job.fileset.geoloc.name,
                    path = %path.display(),
                    "Realigning stored cloud mask to swath grid"
                );
                Some(reprojector.reproject_onto(&stored, &anchor)?)
            }
        }
        CloudMaskStep::Produce { source, output } => {
            let projected = reprojector.reproject_onto(&store.read(source)?, &anchor)?;
            store.write(output, &projected)?;
            *cloud_mask_outcome = Some(Outcome::Produced(output.clone()));
            Some(projected)
        }
        CloudMaskStep::Scratch { source } => {
            Some(reprojector.reproject_onto(&store.read(source)?, &anchor)?)
        }
    };

    if let Some(mask) = mask {
        ndvi = computer.apply_cloud_mask(&ndvi, &mask)?;
    }

    store.write(&step.output, &ndvi)?;
    Ok(step.output.clone())
}
