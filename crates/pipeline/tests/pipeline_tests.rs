//! End-to-end pipeline runs over synthetic swaths.
//!
//! Granules are served from memory and rasters are stored as JSON, so the
//! runs exercise discovery, planning, workers, state and compositing
//! without HDF5 or GDAL.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use ndarray::Array2;
use pipeline::{
    Collaborators, Pipeline, PipelineConfig, PipelineContext, Shutdown, StageStatus,
};
use pipeline_state::PipelineState;
use projection::Crs;
use test_utils::{
    assert_approx_eq, create_swath_layout, granules, swaths, JsonRasterStore, MemorySwathReader,
    SyntheticSwath,
};
use viirs_common::nodata::NDVI_CLOUD;
use viirs_common::{GeoTransform, Raster, RasterStore, SwathReader};

struct TestCollaborators {
    reader: MemorySwathReader,
}

impl Collaborators for TestCollaborators {
    fn swath_reader(&self) -> Box<dyn SwathReader> {
        Box::new(self.reader.clone())
    }

    fn raster_store(&self) -> Box<dyn RasterStore> {
        Box::new(JsonRasterStore)
    }
}

struct Harness {
    _tmp: tempfile::TempDir,
    data: PathBuf,
    out: PathBuf,
    reader: MemorySwathReader,
}

impl Harness {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        let out = tmp.path().join("out");
        std::fs::create_dir_all(&data).unwrap();
        Self {
            _tmp: tmp,
            data,
            out,
            reader: MemorySwathReader::new(),
        }
    }

    /// Lay out a swath directory for `orbit` acquired on `date` (YYYYMMDD)
    /// and register its arrays. Returns the directory name.
    fn add_swath(&mut self, swath: &SyntheticSwath, date: &str, orbit: &str) -> String {
        let dir_name = swaths::dir_name(orbit);
        let names = SyntheticSwath::granule_names(date, granules::T_START, orbit);
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let dir = create_swath_layout(&self.data, &dir_name, &refs, false).unwrap();
        swath.register_as(
            &mut self.reader,
            &dir.join("viirs").join("level1"),
            date,
            granules::T_START,
            orbit,
        );
        dir_name
    }

    /// Register only the granule files, without arrays: every read fails.
    fn add_unreadable_swath(&mut self, date: &str, orbit: &str) -> String {
        let dir_name = swaths::dir_name(orbit);
        let names = SyntheticSwath::granule_names(date, granules::T_START, orbit);
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        create_swath_layout(&self.data, &dir_name, &refs, false).unwrap();
        dir_name
    }

    /// Write a geographic cloud mask with one value over the whole swath.
    fn add_cloud_mask(&self, dir_name: &str, value: f32) {
        self.add_cloud_mask_columns(dir_name, value, 40);
    }

    /// Geographic cloud mask `cols` hundredths of a degree wide from 81.9E.
    /// The synthetic swaths span 82.0E to about 82.06E.
    fn add_cloud_mask_columns(&self, dir_name: &str, value: f32, cols: usize) {
        let path = self
            .data
            .join(dir_name)
            .join("viirs/level2")
            .join(format!("{}_CLOUDMASK.tif", dir_name));
        let mask = Raster::single(
            Array2::from_elem((40, cols), value),
            GeoTransform::north_up(81.9, 55.2, 0.01),
            Crs::Geographic.to_wkt(),
        );
        JsonRasterStore.write(&path, &mask).unwrap();
    }

    fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(&self.data, &self.out);
        config.workers = 2;
        config.cloud_mask.required = false;
        config
    }

    async fn pipeline(&self, config: PipelineConfig) -> Pipeline {
        let state = PipelineState::open_memory().await.unwrap();
        let collaborators = Arc::new(TestCollaborators {
            reader: self.reader.clone(),
        });
        Pipeline::new(PipelineContext::new(config, state, collaborators).unwrap())
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn valid_values(path: &Path) -> Vec<f32> {
    JsonRasterStore
        .read(path)
        .unwrap()
        .first_band()
        .unwrap()
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .collect()
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let mut h = Harness::new();
    let dir = h.add_swath(&SyntheticSwath::siberia(40, 30), granules::DATE, granules::ORBIT);
    let pipeline = h.pipeline(h.config()).await;

    let first = pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();
    assert_eq!(first.directories, 1);
    assert_eq!(first.processed, 1);
    assert!(first.failed.is_empty());
    assert!(matches!(first.composite, Some(StageStatus::Produced(_))));

    let raster = h.out.join(format!("{}.GIMGO.tiff", dir));
    let ndvi = h.out.join(format!("{}.NDVI.tiff", dir));
    let composite = h.out.join("ndvi_composite_20210221_20210224.tiff");
    assert!(raster.exists());
    assert!(ndvi.exists());
    assert!(composite.exists());
    let composite_bytes = std::fs::read(&composite).unwrap();

    let second = pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped, 1);
    assert!(matches!(second.composite, Some(StageStatus::UpToDate(_))));
    assert_eq!(std::fs::read(&composite).unwrap(), composite_bytes);

    let counts = pipeline.context().state.counts().await.unwrap();
    assert_eq!(counts.swath_rasters, 1);
    assert_eq!(counts.ndvi, 1);
    assert_eq!(counts.composites, 1);
    assert!(pipeline
        .context()
        .state
        .last_check_time()
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_ndvi_values_in_outputs() {
    let mut h = Harness::new();
    let dir = h.add_swath(&SyntheticSwath::siberia(40, 30), granules::DATE, granules::ORBIT);
    let pipeline = h.pipeline(h.config()).await;
    pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();

    let values = valid_values(&h.out.join(format!("{}.NDVI.tiff", dir)));
    assert!(!values.is_empty());
    for v in values {
        assert_approx_eq!(v, 0.5, 1e-4);
    }
}

#[tokio::test]
async fn test_deleted_ndvi_is_rebuilt() {
    let mut h = Harness::new();
    let dir = h.add_swath(&SyntheticSwath::siberia(40, 30), granules::DATE, granules::ORBIT);
    let pipeline = h.pipeline(h.config()).await;
    pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();

    let ndvi = h.out.join(format!("{}.NDVI.tiff", dir));
    std::fs::remove_file(&ndvi).unwrap();

    let report = pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();
    assert_eq!(report.processed, 1);
    assert!(ndvi.exists());
    assert_eq!(pipeline.context().state.counts().await.unwrap().ndvi, 1);
}

#[tokio::test]
async fn test_missing_cloud_mask_defers_ndvi() {
    let mut h = Harness::new();
    let dir = h.add_swath(&SyntheticSwath::siberia(40, 30), granules::DATE, granules::ORBIT);
    let mut config = h.config();
    config.cloud_mask.required = true;
    let pipeline = h.pipeline(config).await;

    let first = pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();
    assert_eq!(first.processed, 1);
    assert_eq!(first.deferred.len(), 1);
    assert!(first.failed.is_empty());
    assert!(!h.out.join(format!("{}.NDVI.tiff", dir)).exists());
    assert!(matches!(first.composite, Some(StageStatus::NotAvailable(_))));

    let second = pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(second.deferred.len(), 1);

    // Mask arrives: NDVI is produced and every valid pixel is flagged.
    h.add_cloud_mask(&dir, 0.0);
    let third = pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();
    assert_eq!(third.processed, 1);
    assert!(third.deferred.is_empty());
    assert!(h
        .out
        .join(format!("{}.PROJECTED_CLOUDMASK.tiff", dir))
        .exists());
    assert_eq!(pipeline.context().state.counts().await.unwrap().cloud_masks, 1);

    let values = valid_values(&h.out.join(format!("{}.NDVI.tiff", dir)));
    assert!(!values.is_empty());
    assert!(values.iter().all(|&v| v == NDVI_CLOUD));
}

#[tokio::test]
async fn test_partial_cloud_mask_keeps_swath_extent() {
    let mut h = Harness::new();
    let dir = h.add_swath(&SyntheticSwath::siberia(40, 30), granules::DATE, granules::ORBIT);
    // Covers 81.9E..82.03E: the western half of the swath.
    h.add_cloud_mask_columns(&dir, 0.0, 13);
    let pipeline = h.pipeline(h.config()).await;

    let report = pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();
    assert_eq!(report.processed, 1);
    assert!(report.failed.is_empty());

    let swath = JsonRasterStore
        .read(&h.out.join(format!("{}.GIMGO.tiff", dir)))
        .unwrap();
    let ndvi = JsonRasterStore
        .read(&h.out.join(format!("{}.NDVI.tiff", dir)))
        .unwrap();
    assert_eq!(ndvi.shape(), swath.shape());
    assert_eq!(ndvi.transform, swath.transform);

    let values = valid_values(&h.out.join(format!("{}.NDVI.tiff", dir)));
    assert!(values.iter().any(|&v| v == NDVI_CLOUD));
    assert!(values.iter().any(|&v| (v - 0.5).abs() < 1e-4));
}

#[tokio::test]
async fn test_recent_scan_retries_deferred_directory() {
    let mut h = Harness::new();
    let waiting = h.add_swath(&SyntheticSwath::siberia(40, 30), granules::DATE, "48293");
    let done = h.add_swath(&SyntheticSwath::siberia(40, 30), granules::DATE, "48294");
    h.add_cloud_mask(&done, 3.0);
    let mut config = h.config();
    config.cloud_mask.required = true;
    config.scan_recent_only = true;
    let pipeline = h.pipeline(config).await;
    let state = &pipeline.context().state;

    let first = pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();
    assert_eq!(first.directories, 2);
    assert_eq!(first.deferred.len(), 1);
    assert_eq!(first.deferred[0].swath_dir, waiting);
    assert_eq!(state.pending_directories().await.unwrap(), vec![waiting.clone()]);

    // Nothing on disk looks newer than the last check; only the pending
    // record keeps the waiting directory in scope.
    h.add_cloud_mask(&waiting, 0.0);
    let future = Utc::now() + Duration::days(1);
    state.set_last_check_time(future).await.unwrap();

    let second = pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();
    assert_eq!(second.directories, 1);
    assert_eq!(second.processed, 1);
    assert!(second.deferred.is_empty());
    assert!(h.out.join(format!("{}.NDVI.tiff", waiting)).exists());
    assert!(state.pending_directories().await.unwrap().is_empty());

    state.set_last_check_time(future).await.unwrap();
    let third = pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();
    assert_eq!(third.directories, 0);
}

#[tokio::test]
async fn test_failed_fileset_does_not_stop_the_scan() {
    let mut h = Harness::new();
    h.add_swath(&SyntheticSwath::siberia(40, 30), granules::DATE, "48293");
    h.add_unreadable_swath(granules::DATE, "48294");
    let pipeline = h.pipeline(h.config()).await;

    let report = pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();
    assert_eq!(report.directories, 2);
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].swath_dir, swaths::dir_name("48294"));
    assert_eq!(report.failed[0].kind, "sub_dataset_not_found");
    assert!(matches!(report.composite, Some(StageStatus::Produced(_))));
}

#[tokio::test]
async fn test_composite_covers_both_swaths_in_window() {
    let mut h = Harness::new();
    h.add_swath(&SyntheticSwath::siberia(40, 30), "20210221", "48293");
    h.add_swath(&SyntheticSwath::siberia(40, 30), "20210222", "48307");
    let pipeline = h.pipeline(h.config()).await;

    let report = pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();
    assert_eq!(report.processed, 2);

    let period = report.composite_period.unwrap();
    let composite = pipeline
        .context()
        .state
        .composite(&period)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(composite.components.len(), 2);
}

#[tokio::test]
async fn test_new_swath_makes_composite_stale() {
    let mut h = Harness::new();
    h.add_swath(&SyntheticSwath::siberia(40, 30), "20210221", "48293");
    // Arrays are registered up front; the directory appears after the first run.
    let late = SyntheticSwath::with_counts(40, 30, 1000.0, 9000.0);
    let late_level1 = h.data.join(swaths::dir_name("48321")).join("viirs/level1");
    late.register_as(&mut h.reader, &late_level1, "20210223", granules::T_START, "48321");
    let pipeline = h.pipeline(h.config()).await;

    let first = pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();
    assert!(matches!(first.composite, Some(StageStatus::Produced(_))));

    let names = SyntheticSwath::granule_names("20210223", granules::T_START, "48321");
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    create_swath_layout(&h.data, &swaths::dir_name("48321"), &refs, false).unwrap();

    let second = pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();
    assert_eq!(second.processed, 1);
    assert_eq!(second.skipped, 1);
    let Some(StageStatus::Produced(path)) = &second.composite else {
        panic!("composite not rebuilt: {:?}", second.composite);
    };

    // NIR 0.9, red 0.1: the newer swath wins the maximum everywhere.
    for v in valid_values(path) {
        assert_approx_eq!(v, 0.8, 1e-4);
    }
    let record = pipeline
        .context()
        .state
        .composite(&second.composite_period.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.components.len(), 2);
}

#[tokio::test]
async fn test_dynamics_between_adjacent_composites() {
    let mut h = Harness::new();
    // b1 = 17..20, b2 = 21..24
    h.add_swath(
        &SyntheticSwath::with_counts(40, 30, 1000.0, 3000.0),
        "20210218",
        "48250",
    );
    h.add_swath(
        &SyntheticSwath::with_counts(40, 30, 1000.0, 5000.0),
        "20210222",
        "48307",
    );
    let pipeline = h.pipeline(h.config()).await;

    let report = pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();
    assert!(matches!(report.older_composite, Some(StageStatus::Produced(_))));
    let Some(StageStatus::Produced(path)) = &report.dynamics else {
        panic!("dynamics not produced: {:?}", report.dynamics);
    };
    assert_eq!(report.dynamics_gap_days, None);
    assert_eq!(
        path.file_name().unwrap(),
        "ndvi_dynamics_20210217_20210220__20210221_20210224.tiff"
    );

    let expected = 100.0 * (4000.0 / 6000.0 - 0.5) / 0.5;
    let values = valid_values(path);
    assert!(!values.is_empty());
    for v in values {
        assert_approx_eq!(v, expected, 1e-2);
    }

    let again = pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();
    assert!(matches!(again.dynamics, Some(StageStatus::UpToDate(_))));
}

#[tokio::test]
async fn test_distant_composites_report_gap() {
    let mut h = Harness::new();
    h.add_swath(&SyntheticSwath::siberia(40, 30), "20210214", "48193");
    h.add_swath(&SyntheticSwath::siberia(40, 30), "20210221", "48293");
    let mut config = h.config();
    config.dynamics_days = 12;
    let pipeline = h.pipeline(config).await;

    let report = pipeline
        .run_once(date(2021, 2, 24), &mut Shutdown::never())
        .await
        .unwrap();
    assert!(matches!(report.dynamics, Some(StageStatus::Produced(_))));
    assert_eq!(report.dynamics_gap_days, Some(5));
}

#[tokio::test]
async fn test_interrupted_run_records_nothing() {
    let mut h = Harness::new();
    h.add_swath(&SyntheticSwath::siberia(40, 30), granules::DATE, granules::ORBIT);
    let pipeline = h.pipeline(h.config()).await;

    let (tx, rx) = tokio::sync::broadcast::channel(1);
    let mut shutdown = Shutdown::new(rx);
    tx.send(()).unwrap();

    let report = pipeline
        .run_once(date(2021, 2, 24), &mut shutdown)
        .await
        .unwrap();
    assert!(report.interrupted);
    assert_eq!(report.processed, 0);
    assert!(report.composite.is_none());

    let state = &pipeline.context().state;
    assert_eq!(state.counts().await.unwrap().swath_rasters, 0);
    assert!(state.last_check_time().await.unwrap().is_none());
}
