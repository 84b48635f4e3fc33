//! One pipeline pass: discover, plan, dispatch, record, composite, dynamics.
//!
//! The orchestrator is the only writer of [`PipelineState`]. Workers get a
//! fully planned [`SwathJob`] and hand back a [`SwathResult`], which is
//! recorded here one at a time as results arrive.
//!
//! [`PipelineState`]: pipeline_state::PipelineState

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use georef::{CompositeBuilder, DynamicsComputer, TaggedNdvi};
use pipeline_state::{
    ArtifactMeta, CloudMaskRecord, CompositeRecord, DynamicsRecord, NdviRecord, SwathRasterRecord,
};
use swath_catalog::{list_swath_directories, Fileset, RecordType, SwathDirectory};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};
use viirs_common::{Period, Result, ViirsError};

use crate::context::PipelineContext;
use crate::handler::SwathHandler;
use crate::layout::swath_stem;
use crate::metrics;
use crate::outcome::Outcome;
use crate::report::{DeferredFileset, FailedFileset, RunReport, StageStatus};
use crate::shutdown::Shutdown;
use crate::worker::{
    run_job, CloudMaskStep, NdviStep, RasterStep, SwathJob, SwathResult, WorkerSettings,
};

/// The older composite window for dynamics: `merge_days` long, starting
/// `dynamics_days - 1` days before the newer window ends.
pub fn older_period(newer: &Period, merge_days: u32, dynamics_days: u32) -> Period {
    let shift = i64::from(dynamics_days) - i64::from(merge_days);
    Period::ending_at(newer.ends_at - ChronoDuration::days(shift), merge_days)
}

/// Outcome of planning one fileset.
struct FilesetPlan {
    job: Option<SwathJob>,
    deferred: Option<String>,
}

pub struct Pipeline {
    ctx: PipelineContext,
}

impl Pipeline {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Run one full pass with composite windows ending at `reference_date`.
    ///
    /// Fileset failures are reported, never returned; an `Err` means the
    /// data directory or the state store is unusable.
    #[instrument(skip(self, shutdown), fields(data_dir = %self.ctx.config.data_dir.display()))]
    pub async fn run_once(
        &self,
        reference_date: NaiveDate,
        shutdown: &mut Shutdown,
    ) -> Result<RunReport> {
        let started = Instant::now();
        let started_at = Utc::now();
        let mut report = RunReport::new(reference_date);

        let directories = self.discover().await?;
        report.directories = directories.len();

        let jobs = self.plan(&directories, &mut report).await?;
        info!(
            directories = report.directories,
            jobs = jobs.len(),
            skipped = report.skipped,
            deferred = report.deferred.len(),
            "Planned swath work"
        );

        if self.dispatch(jobs, shutdown, &mut report).await? {
            report.interrupted = true;
            report.duration = started.elapsed();
            warn!("Run interrupted, composites and dynamics left for the next run");
            return Ok(report);
        }

        self.composite_stage(reference_date, &mut report).await;

        self.record_pending(&directories, &report).await?;
        self.ctx.state.set_last_check_time(started_at).await?;
        report.duration = started.elapsed();
        metrics::run_finished(report.duration);

        info!(
            processed = report.processed,
            skipped = report.skipped,
            deferred = report.deferred.len(),
            failed = report.failed.len(),
            duration_secs = report.duration.as_secs_f64(),
            "Run complete"
        );
        Ok(report)
    }

    async fn discover(&self) -> Result<Vec<SwathDirectory>> {
        let mut directories = list_swath_directories(&self.ctx.config.data_dir)?;

        if self.ctx.config.scan_recent_only {
            if let Some(last) = self.ctx.state.last_check_time().await? {
                let last = SystemTime::from(last);
                let pending: HashSet<String> =
                    self.ctx.state.pending_directories().await?.into_iter().collect();
                let before = directories.len();
                directories.retain(|d| {
                    pending.contains(&d.name) || d.modified().map_or(true, |m| m >= last)
                });
                debug!(
                    kept = directories.len(),
                    skipped = before - directories.len(),
                    "Skipped directories untouched since last run"
                );
            }
        }
        Ok(directories)
    }

    /// Remember directories left with deferred or failed filesets so that
    /// `scan_recent_only` runs keep retrying them.
    async fn record_pending(&self, directories: &[SwathDirectory], report: &RunReport) -> Result<()> {
        let scanned: Vec<String> = directories.iter().map(|d| d.name.clone()).collect();
        let pending: Vec<(String, String)> = report
            .deferred
            .iter()
            .map(|d| (d.swath_dir.clone(), d.reason.clone()))
            .chain(report.failed.iter().map(|f| (f.swath_dir.clone(), f.error.clone())))
            .collect();
        self.ctx.state.update_pending(&scanned, &pending).await?;
        Ok(())
    }

    // ========================================================================
    // Planning
    // ========================================================================

    async fn plan(
        &self,
        directories: &[SwathDirectory],
        report: &mut RunReport,
    ) -> Result<Vec<SwathJob>> {
        let mut jobs = Vec::new();

        for dir in directories {
            let filesets = dir.filesets(self.ctx.config.geoloc_preference);
            if filesets.is_empty() {
                debug!(dir = %dir.name, "No filesets found");
                continue;
            }

            let mut per_type: HashMap<RecordType, usize> = HashMap::new();
            for fileset in &filesets {
                *per_type.entry(fileset.geoloc.record_type).or_default() += 1;
            }
            let mut mask_claimed = false;

            for fileset in filesets {
                let name = fileset.geoloc.name.clone();
                let handler = SwathHandler::for_geolocation(fileset.geoloc.record_type);
                if !handler.produces_raster() {
                    debug!(fileset = %name, "Record type not processed, skipping");
                    report.skipped += 1;
                    metrics::swath_skipped();
                    continue;
                }
                if !fileset.is_complete() {
                    debug!(
                        fileset = %name,
                        bands = fileset.bands.len(),
                        expected = fileset.resolution().expected_band_count(),
                        "Incomplete fileset"
                    );
                }

                let shared = per_type
                    .get(&fileset.geoloc.record_type)
                    .is_some_and(|&n| n > 1);
                let stem = swath_stem(&dir.name, &fileset, shared);
                let plan = self
                    .plan_fileset(dir, fileset, handler, &stem, &mut mask_claimed)
                    .await?;

                if let Some(reason) = &plan.deferred {
                    info!(fileset = %name, reason = %reason, "NDVI deferred");
                    report.deferred.push(DeferredFileset {
                        swath_dir: dir.name.clone(),
                        fileset: name.clone(),
                        reason: reason.clone(),
                    });
                }
                match plan.job {
                    Some(job) => jobs.push(job),
                    None if plan.deferred.is_none() => {
                        debug!(fileset = %name, "Up to date");
                        report.skipped += 1;
                        metrics::swath_skipped();
                    }
                    None => {}
                }
            }
        }
        Ok(jobs)
    }

    async fn plan_fileset(
        &self,
        dir: &SwathDirectory,
        fileset: Fileset,
        handler: SwathHandler,
        stem: &str,
        mask_claimed: &mut bool,
    ) -> Result<FilesetPlan> {
        let config = &self.ctx.config;
        let state = &self.ctx.state;
        let layout = &self.ctx.layout;
        let geoloc_name = fileset.geoloc.name.clone();

        let raster = match state.swath_raster(&geoloc_name).await? {
            Some(record) if !config.force.swath => RasterStep::Reuse(record.meta.output_path),
            _ => RasterStep::Produce(layout.swath_raster(stem, fileset.geoloc.record_type)),
        };
        let raster_rebuilt = matches!(raster, RasterStep::Produce(_));

        let mut deferred = None;
        let mut ndvi = None;
        if handler.produces_ndvi() {
            let needs_ndvi = raster_rebuilt
                || config.force.ndvi
                || state.ndvi(&geoloc_name).await?.is_none();
            if needs_ndvi {
                match self.plan_cloud_mask(dir, mask_claimed).await? {
                    Some(cloud_mask) => {
                        ndvi = Some(NdviStep {
                            output: layout.ndvi(stem),
                            cloud_mask,
                        })
                    }
                    None => {
                        deferred = Some(format!(
                            "cloud mask not found in {}",
                            dir.level2_dir().display()
                        ))
                    }
                }
            }
        }

        if !raster_rebuilt && ndvi.is_none() {
            return Ok(FilesetPlan {
                job: None,
                deferred,
            });
        }

        let scale = config.scale.scale_for(fileset.resolution());
        Ok(FilesetPlan {
            job: Some(SwathJob {
                swath_dir: dir.name.clone(),
                fileset,
                handler,
                scale,
                raster,
                ndvi,
            }),
            deferred,
        })
    }

    /// `None` means NDVI has to wait for the mask.
    ///
    /// Only the first fileset of a directory produces the recorded mask;
    /// others in the same run reproject into scratch files so two workers
    /// never write the same path.
    async fn plan_cloud_mask(
        &self,
        dir: &SwathDirectory,
        mask_claimed: &mut bool,
    ) -> Result<Option<CloudMaskStep>> {
        let config = &self.ctx.config;
        let source = dir.cloud_mask_source();
        let missing = if config.cloud_mask.required {
            None
        } else {
            Some(CloudMaskStep::Skip)
        };

        if config.cloud_mask.single_file {
            return Ok(source.map(|source| CloudMaskStep::Scratch { source }).or(missing));
        }

        if !config.force.cloud_mask {
            if let Some(record) = self.ctx.state.cloud_mask(&dir.name).await? {
                return Ok(Some(CloudMaskStep::Reuse(record.meta.output_path)));
            }
        }

        Ok(match source {
            Some(source) if !*mask_claimed => {
                *mask_claimed = true;
                Some(CloudMaskStep::Produce {
                    source,
                    output: self.ctx.layout.cloud_mask(&dir.name),
                })
            }
            Some(source) => Some(CloudMaskStep::Scratch { source }),
            None => missing,
        })
    }

    // ========================================================================
    // Dispatch and recording
    // ========================================================================

    /// Run jobs on blocking workers, at most `workers` at a time, recording
    /// each result as it arrives. Returns `true` when interrupted.
    async fn dispatch(
        &self,
        jobs: Vec<SwathJob>,
        shutdown: &mut Shutdown,
        report: &mut RunReport,
    ) -> Result<bool> {
        if jobs.is_empty() {
            return Ok(false);
        }

        let semaphore = Arc::new(Semaphore::new(self.ctx.config.workers));
        let settings = WorkerSettings {
            crs: self.ctx.crs.clone(),
            fill: self.ctx.config.fill,
            cloudy_values: self.ctx.config.cloud_mask.cloudy_values.clone(),
        };
        let mut tasks = JoinSet::new();
        let mut interrupted = false;

        for job in jobs {
            let permit = tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    interrupted = true;
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => {
                    permit.map_err(|e| ViirsError::Io(std::io::Error::other(e)))?
                }
            };

            let collaborators = Arc::clone(&self.ctx.collaborators);
            let settings = settings.clone();
            tasks.spawn_blocking(move || {
                let _permit = permit;
                let reader = collaborators.swath_reader();
                let store = collaborators.raster_store();
                run_job(job, reader.as_ref(), store.as_ref(), &settings)
            });
        }

        while !interrupted {
            tokio::select! {
                biased;
                _ = shutdown.triggered() => interrupted = true,
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok(result)) => self.record(result, report).await?,
                    Some(Err(e)) => {
                        error!(error = %e, "Swath worker panicked");
                        metrics::swath_failed("panic");
                        report.failed.push(FailedFileset {
                            swath_dir: String::new(),
                            fileset: "<unknown>".to_string(),
                            kind: "panic",
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        if interrupted {
            warn!(
                in_flight = tasks.len(),
                "Shutdown requested, in-flight swath results will not be recorded"
            );
            tasks.detach_all();
        }
        Ok(interrupted)
    }

    async fn record(&self, result: SwathResult, report: &mut RunReport) -> Result<()> {
        let state = &self.ctx.state;
        let job = &result.job;
        let geoloc = &job.fileset.geoloc;
        report.band_failures += result.band_failures.len();

        if let Some(Outcome::Produced(path)) = &result.raster {
            state
                .record_swath_raster(&SwathRasterRecord {
                    meta: ArtifactMeta::new(path),
                    source: geoloc.name.clone(),
                    record_type: geoloc.record_type.code(),
                    swath_dir: job.swath_dir.clone(),
                    acquired_at: geoloc.acquired_at(),
                })
                .await?;
        }

        if let (
            Some(Outcome::Produced(path)),
            Some(NdviStep {
                cloud_mask: CloudMaskStep::Produce { source, .. },
                ..
            }),
        ) = (&result.cloud_mask, &job.ndvi)
        {
            state
                .record_cloud_mask(&CloudMaskRecord {
                    meta: ArtifactMeta::new(path),
                    swath_dir: job.swath_dir.clone(),
                    source_path: source.clone(),
                })
                .await?;
        }

        if let Some(Outcome::Produced(path)) = &result.ndvi {
            state
                .record_ndvi(&NdviRecord {
                    meta: ArtifactMeta::new(path),
                    based_on: geoloc.name.clone(),
                    acquired_at: geoloc.acquired_at(),
                })
                .await?;
        }

        for outcome in [&result.raster, &result.cloud_mask, &result.ndvi]
            .into_iter()
            .flatten()
        {
            match outcome {
                Outcome::Failed(e) => {
                    metrics::swath_failed(e.kind());
                    report.failed.push(FailedFileset {
                        swath_dir: job.swath_dir.clone(),
                        fileset: geoloc.name.clone(),
                        kind: e.kind(),
                        error: e.to_string(),
                    });
                }
                Outcome::Deferred(reason) => report.deferred.push(DeferredFileset {
                    swath_dir: job.swath_dir.clone(),
                    fileset: geoloc.name.clone(),
                    reason: reason.clone(),
                }),
                Outcome::Produced(_) => {}
            }
        }

        if result.has_product() && !result.has_failure() {
            report.processed += 1;
            metrics::swath_processed();
        }
        Ok(())
    }

    // ========================================================================
    // Composites and dynamics
    // ========================================================================

    async fn composite_stage(&self, reference_date: NaiveDate, report: &mut RunReport) {
        let config = &self.ctx.config;
        let b2_period = Period::ending_at(reference_date, config.merge_days);
        let b1_period = older_period(&b2_period, config.merge_days, config.dynamics_days);
        report.composite_period = Some(b2_period);

        let b2 = self.ensure_composite(&b2_period).await;
        let b1 = self.ensure_composite(&b1_period).await;

        let dynamics = match (b1.path(), b2.path()) {
            (Some(b1_path), Some(b2_path)) => {
                let rebuild = b1.is_produced() || b2.is_produced();
                match self
                    .try_dynamics((&b1_period, b1_path), (&b2_period, b2_path), rebuild)
                    .await
                {
                    Ok((status, gap_days)) => {
                        report.dynamics_gap_days = gap_days;
                        status
                    }
                    Err(e) => {
                        warn!(error = %e, "Dynamics not available");
                        StageStatus::NotAvailable(e.to_string())
                    }
                }
            }
            _ => StageStatus::NotAvailable(format!(
                "composites for {} and {} are not both available",
                b1_period, b2_period
            )),
        };

        report.composite = Some(b2);
        report.older_composite = Some(b1);
        report.dynamics = Some(dynamics);
    }

    /// Build or reuse the composite for `period`. Errors become
    /// `NotAvailable` so the next run retries.
    async fn ensure_composite(&self, period: &Period) -> StageStatus {
        match self.try_composite(period).await {
            Ok(status) => status,
            Err(e) => {
                warn!(period = %period, error = %e, "Composite not available");
                StageStatus::NotAvailable(e.to_string())
            }
        }
    }

    async fn try_composite(&self, period: &Period) -> Result<StageStatus> {
        let state = &self.ctx.state;
        let candidates = state.ndvi_in_period(period).await?;
        if candidates.is_empty() {
            debug!(period = %period, "No NDVI rasters for composite");
            return Ok(StageStatus::NotAvailable(format!(
                "no NDVI rasters in {}",
                period
            )));
        }

        let mut wanted: Vec<PathBuf> = candidates
            .iter()
            .map(|r| r.meta.output_path.clone())
            .collect();
        wanted.sort();

        if let Some(existing) = state.composite(period).await? {
            if !self.ctx.config.force.composite && existing.components == wanted {
                debug!(period = %period, "Composite up to date");
                return Ok(StageStatus::UpToDate(existing.meta.output_path));
            }
            info!(
                period = %period,
                recorded = existing.components.len(),
                eligible = wanted.len(),
                "Rebuilding composite"
            );
        }

        let output = self.ctx.layout.composite(period);
        let inputs: Vec<(PathBuf, DateTime<Utc>)> = candidates
            .into_iter()
            .map(|r| (r.meta.output_path, r.acquired_at))
            .collect();
        let collaborators = Arc::clone(&self.ctx.collaborators);
        let window = *period;
        let target = output.clone();

        let components = blocking(move || {
            let store = collaborators.raster_store();
            let tagged = inputs
                .iter()
                .map(|(path, acquired_at)| {
                    Ok(TaggedNdvi {
                        acquired_at: *acquired_at,
                        raster: store.read(path)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let Some(built) = CompositeBuilder.build(&window, &tagged)? else {
                return Ok(None);
            };
            store.write(&target, &built.raster)?;

            let mut components: Vec<PathBuf> = built
                .components
                .iter()
                .map(|&i| inputs[i].0.clone())
                .collect();
            components.sort();
            Ok(Some(components))
        })
        .await?;

        let Some(components) = components else {
            return Ok(StageStatus::NotAvailable(format!(
                "no valid NDVI pixels in {}",
                period
            )));
        };

        state
            .record_composite(&CompositeRecord {
                meta: ArtifactMeta::new(&output),
                period: *period,
                components,
            })
            .await?;
        metrics::composite_produced();
        info!(period = %period, path = %output.display(), "Composite produced");
        Ok(StageStatus::Produced(output))
    }

    async fn try_dynamics(
        &self,
        (b1_period, b1_path): (&Period, &PathBuf),
        (b2_period, b2_path): (&Period, &PathBuf),
        rebuild: bool,
    ) -> Result<(StageStatus, Option<i64>)> {
        let state = &self.ctx.state;
        if !self.ctx.config.force.dynamics && !rebuild {
            if let Some(existing) = state.dynamics(b1_path, b2_path).await? {
                debug!("Dynamics up to date");
                return Ok((
                    StageStatus::UpToDate(existing.meta.output_path),
                    existing.gap_days,
                ));
            }
        }

        let output = self.ctx.layout.dynamics(b1_period, b2_period);
        let collaborators = Arc::clone(&self.ctx.collaborators);
        let (p1, p2) = (*b1_period, *b2_period);
        let (src1, src2, target) = (b1_path.clone(), b2_path.clone(), output.clone());

        let gap_days = blocking(move || {
            let store = collaborators.raster_store();
            let b1 = store.read(&src1)?;
            let b2 = store.read(&src2)?;
            let result = DynamicsComputer.compute(&b1, &p1, &b2, &p2)?;
            store.write(&target, &result.raster)?;
            Ok(result.gap_days)
        })
        .await?;

        state
            .record_dynamics(&DynamicsRecord {
                meta: ArtifactMeta::new(&output),
                b1: b1_path.clone(),
                b2: b2_path.clone(),
                gap_days,
            })
            .await?;
        metrics::dynamics_produced();
        info!(b1 = %b1_period, b2 = %b2_period, path = %output.display(), "Dynamics produced");
        Ok((StageStatus::Produced(output), gap_days))
    }
}

/// Run raster work off the async threads.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ViirsError::Io(std::io::Error::other(e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 2, d).unwrap()
    }

    #[test]
    fn test_older_period_is_adjacent_by_default() {
        let b2 = Period::ending_at(date(24), 4);
        let b1 = older_period(&b2, 4, 8);
        assert_eq!(b1, Period::new(date(17), date(20)).unwrap());
        assert!(b1.is_adjacent_to(&b2));
    }

    #[test]
    fn test_longer_dynamics_window_leaves_gap() {
        let b2 = Period::ending_at(date(24), 4);
        let b1 = older_period(&b2, 4, 12);
        assert_eq!(b1.ends_at, date(16));
        assert_eq!(b1.gap_days(&b2), 5);
    }
}
