//! SQLite-backed record of produced artifacts.
//!
//! Every lookup re-checks the recorded file on disk. A record whose file
//! is gone is deleted and reported as never produced, so out-of-band
//! deletions and crashes between writing a file and recording it both
//! heal on the next run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info, warn};
use viirs_common::Period;

use crate::error::{Result, StateError};
use crate::records::{
    ArtifactKind, ArtifactMeta, CloudMaskRecord, CompositeRecord, DynamicsRecord, NdviRecord,
    StateCounts, SwathRasterRecord,
};

const LAST_CHECK_TIME: &str = "last_check_time";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS swath_rasters (
        output_path TEXT PRIMARY KEY,
        source TEXT NOT NULL UNIQUE,
        record_type TEXT NOT NULL,
        swath_dir TEXT NOT NULL,
        acquired_at TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cloud_masks (
        output_path TEXT PRIMARY KEY,
        swath_dir TEXT NOT NULL UNIQUE,
        source_path TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ndvi (
        output_path TEXT PRIMARY KEY,
        based_on TEXT NOT NULL UNIQUE,
        acquired_at TEXT NOT NULL,
        acquired_date TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_ndvi_acquired_date ON ndvi(acquired_date)",
    r#"
    CREATE TABLE IF NOT EXISTS composites (
        output_path TEXT PRIMARY KEY,
        starts_at TEXT NOT NULL,
        ends_at TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (starts_at, ends_at)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS composite_components (
        composite_path TEXT NOT NULL,
        ndvi_path TEXT NOT NULL,
        PRIMARY KEY (composite_path, ndvi_path)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS dynamics (
        output_path TEXT PRIMARY KEY,
        b1_path TEXT NOT NULL,
        b2_path TEXT NOT NULL,
        gap_days INTEGER,
        created_at TEXT NOT NULL,
        UNIQUE (b1_path, b2_path)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pending_dirs (
        swath_dir TEXT PRIMARY KEY,
        reason TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
];

type SwathRow = (String, String, String, String, String, String);
type CloudMaskRow = (String, String, String, String);
type NdviRow = (String, String, String, String);
type CompositeRow = (String, String, String, String);
type DynamicsRow = (String, String, String, Option<i64>, String);

/// Persisted pipeline state.
///
/// Owned by the orchestrator alone; workers never write to it.
pub struct PipelineState {
    pool: SqlitePool,
}

impl PipelineState {
    /// Open or create the state database at the given path.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let state = Self { pool };
        state.init_schema().await?;

        info!(path = %path.display(), "Opened pipeline state database");
        Ok(state)
    }

    /// Open an in-memory database (for testing).
    pub async fn open_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .create_if_missing(true);

        // One connection that never expires, or the database goes with it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let state = Self { pool };
        state.init_schema().await?;
        Ok(state)
    }

    async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    // ========================================================================
    // Produced-or-not queries
    // ========================================================================

    /// Whether an artifact of `kind` is recorded at `output_path` and the
    /// file still exists.
    pub async fn has_produced(&self, kind: ArtifactKind, output_path: &Path) -> Result<bool> {
        let sql = format!("SELECT 1 FROM {} WHERE output_path = ?", kind.table());
        let row: Option<(i64,)> = sqlx::query_as(&sql)
            .bind(path_text(output_path))
            .fetch_optional(&self.pool)
            .await?;

        if row.is_none() {
            return Ok(false);
        }
        self.heal(kind, output_path).await
    }

    /// Keep the record if its file exists, otherwise delete it.
    async fn heal(&self, kind: ArtifactKind, output_path: &Path) -> Result<bool> {
        if output_path.exists() {
            return Ok(true);
        }
        warn!(
            kind = %kind,
            path = %output_path.display(),
            "State record points at missing file, dropping record"
        );
        self.delete_artifact(kind, output_path).await?;
        Ok(false)
    }

    /// Delete the record of one artifact. The file is left alone.
    pub async fn delete_artifact(&self, kind: ArtifactKind, output_path: &Path) -> Result<()> {
        let path = path_text(output_path);
        let mut tx = self.pool.begin().await?;

        let sql = format!("DELETE FROM {} WHERE output_path = ?", kind.table());
        sqlx::query(&sql).bind(&path).execute(&mut *tx).await?;

        if kind == ArtifactKind::Composite {
            sqlx::query("DELETE FROM composite_components WHERE composite_path = ?")
                .bind(&path)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(kind = %kind, path = %path, "Deleted state record");
        Ok(())
    }

    // ========================================================================
    // Swath rasters
    // ========================================================================

    /// Swath raster produced from the geolocation granule `source`.
    pub async fn swath_raster(&self, source: &str) -> Result<Option<SwathRasterRecord>> {
        let row: Option<SwathRow> = sqlx::query_as(
            r#"
            SELECT output_path, source, record_type, swath_dir, acquired_at, created_at
            FROM swath_rasters WHERE source = ?
            "#,
        )
        .bind(source)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let record = swath_from_row(row)?;
                self.keep_if_present(ArtifactKind::SwathRaster, record, |r| &r.meta)
                    .await
            }
            None => Ok(None),
        }
    }

    pub async fn record_swath_raster(&self, record: &SwathRasterRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO swath_rasters
                (output_path, source, record_type, swath_dir, acquired_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(path_text(&record.meta.output_path))
        .bind(&record.source)
        .bind(&record.record_type)
        .bind(&record.swath_dir)
        .bind(record.acquired_at.to_rfc3339())
        .bind(record.meta.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(source = %record.source, path = %record.meta.output_path.display(), "Recorded swath raster");
        Ok(())
    }

    pub async fn swath_rasters(&self) -> Result<Vec<SwathRasterRecord>> {
        let rows: Vec<SwathRow> = sqlx::query_as(
            r#"
            SELECT output_path, source, record_type, swath_dir, acquired_at, created_at
            FROM swath_rasters ORDER BY acquired_at, source
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(swath_from_row).collect()
    }

    // ========================================================================
    // Cloud masks
    // ========================================================================

    pub async fn cloud_mask(&self, swath_dir: &str) -> Result<Option<CloudMaskRecord>> {
        let row: Option<CloudMaskRow> = sqlx::query_as(
            "SELECT output_path, swath_dir, source_path, created_at FROM cloud_masks WHERE swath_dir = ?",
        )
        .bind(swath_dir)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let record = cloud_mask_from_row(row)?;
                self.keep_if_present(ArtifactKind::CloudMask, record, |r| &r.meta)
                    .await
            }
            None => Ok(None),
        }
    }

    pub async fn record_cloud_mask(&self, record: &CloudMaskRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO cloud_masks (output_path, swath_dir, source_path, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(path_text(&record.meta.output_path))
        .bind(&record.swath_dir)
        .bind(path_text(&record.source_path))
        .bind(record.meta.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn cloud_masks(&self) -> Result<Vec<CloudMaskRecord>> {
        let rows: Vec<CloudMaskRow> = sqlx::query_as(
            "SELECT output_path, swath_dir, source_path, created_at FROM cloud_masks ORDER BY swath_dir",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(cloud_mask_from_row).collect()
    }

    // ========================================================================
    // NDVI
    // ========================================================================

    /// NDVI raster computed from the swath whose geolocation granule is `based_on`.
    pub async fn ndvi(&self, based_on: &str) -> Result<Option<NdviRecord>> {
        let row: Option<NdviRow> = sqlx::query_as(
            "SELECT output_path, based_on, acquired_at, created_at FROM ndvi WHERE based_on = ?",
        )
        .bind(based_on)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let record = ndvi_from_row(row)?;
                self.keep_if_present(ArtifactKind::Ndvi, record, |r| &r.meta)
                    .await
            }
            None => Ok(None),
        }
    }

    pub async fn record_ndvi(&self, record: &NdviRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO ndvi (output_path, based_on, acquired_at, acquired_date, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(path_text(&record.meta.output_path))
        .bind(&record.based_on)
        .bind(record.acquired_at.to_rfc3339())
        .bind(record.acquired_at.date_naive().to_string())
        .bind(record.meta.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// NDVI rasters acquired on any day of `period`, oldest first.
    /// Records whose files are gone are dropped on the way.
    pub async fn ndvi_in_period(&self, period: &Period) -> Result<Vec<NdviRecord>> {
        let rows: Vec<NdviRow> = sqlx::query_as(
            r#"
            SELECT output_path, based_on, acquired_at, created_at
            FROM ndvi
            WHERE acquired_date >= ? AND acquired_date <= ?
            ORDER BY acquired_at, output_path
            "#,
        )
        .bind(period.starts_at.to_string())
        .bind(period.ends_at.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let record = ndvi_from_row(row)?;
            if let Some(record) = self
                .keep_if_present(ArtifactKind::Ndvi, record, |r| &r.meta)
                .await?
            {
                records.push(record);
            }
        }
        Ok(records)
    }

    pub async fn ndvi_records(&self) -> Result<Vec<NdviRecord>> {
        let rows: Vec<NdviRow> = sqlx::query_as(
            "SELECT output_path, based_on, acquired_at, created_at FROM ndvi ORDER BY acquired_at",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ndvi_from_row).collect()
    }

    // ========================================================================
    // Composites
    // ========================================================================

    /// Composite with exactly these period bounds.
    pub async fn composite(&self, period: &Period) -> Result<Option<CompositeRecord>> {
        let row: Option<CompositeRow> = sqlx::query_as(
            r#"
            SELECT output_path, starts_at, ends_at, created_at
            FROM composites WHERE starts_at = ? AND ends_at = ?
            "#,
        )
        .bind(period.starts_at.to_string())
        .bind(period.ends_at.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut record = composite_from_row(row)?;
        if !self
            .heal(ArtifactKind::Composite, &record.meta.output_path)
            .await?
        {
            return Ok(None);
        }
        record.components = self.components_of(&record.meta.output_path).await?;
        Ok(Some(record))
    }

    /// Record a composite and replace its component list.
    pub async fn record_composite(&self, record: &CompositeRecord) -> Result<()> {
        let path = path_text(&record.meta.output_path);
        let starts_at = record.period.starts_at.to_string();
        let ends_at = record.period.ends_at.to_string();
        let mut tx = self.pool.begin().await?;

        // A row for the same period may sit under another path.
        sqlx::query(
            r#"
            DELETE FROM composite_components WHERE composite_path IN (
                SELECT output_path FROM composites WHERE starts_at = ? AND ends_at = ?
            )
            "#,
        )
        .bind(&starts_at)
        .bind(&ends_at)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM composites WHERE starts_at = ? AND ends_at = ?")
            .bind(&starts_at)
            .bind(&ends_at)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO composites (output_path, starts_at, ends_at, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&path)
        .bind(&starts_at)
        .bind(&ends_at)
        .bind(record.meta.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM composite_components WHERE composite_path = ?")
            .bind(&path)
            .execute(&mut *tx)
            .await?;

        for component in &record.components {
            sqlx::query(
                "INSERT OR IGNORE INTO composite_components (composite_path, ndvi_path) VALUES (?, ?)",
            )
            .bind(&path)
            .bind(path_text(component))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(
            period = %record.period,
            components = record.components.len(),
            "Recorded composite"
        );
        Ok(())
    }

    pub async fn composites(&self) -> Result<Vec<CompositeRecord>> {
        let rows: Vec<CompositeRow> = sqlx::query_as(
            "SELECT output_path, starts_at, ends_at, created_at FROM composites ORDER BY starts_at, ends_at",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let mut record = composite_from_row(row)?;
            record.components = self.components_of(&record.meta.output_path).await?;
            records.push(record);
        }
        Ok(records)
    }

    async fn components_of(&self, composite_path: &Path) -> Result<Vec<PathBuf>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT ndvi_path FROM composite_components WHERE composite_path = ? ORDER BY ndvi_path",
        )
        .bind(path_text(composite_path))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(p,)| PathBuf::from(p)).collect())
    }

    // ========================================================================
    // Dynamics
    // ========================================================================

    pub async fn dynamics(&self, b1: &Path, b2: &Path) -> Result<Option<DynamicsRecord>> {
        let row: Option<DynamicsRow> = sqlx::query_as(
            r#"
            SELECT output_path, b1_path, b2_path, gap_days, created_at
            FROM dynamics WHERE b1_path = ? AND b2_path = ?
            "#,
        )
        .bind(path_text(b1))
        .bind(path_text(b2))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let record = dynamics_from_row(row)?;
                self.keep_if_present(ArtifactKind::Dynamics, record, |r| &r.meta)
                    .await
            }
            None => Ok(None),
        }
    }

    pub async fn record_dynamics(&self, record: &DynamicsRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO dynamics (output_path, b1_path, b2_path, gap_days, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(path_text(&record.meta.output_path))
        .bind(path_text(&record.b1))
        .bind(path_text(&record.b2))
        .bind(record.gap_days)
        .bind(record.meta.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn dynamics_records(&self) -> Result<Vec<DynamicsRecord>> {
        let rows: Vec<DynamicsRow> = sqlx::query_as(
            "SELECT output_path, b1_path, b2_path, gap_days, created_at FROM dynamics ORDER BY output_path",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(dynamics_from_row).collect()
    }

    // ========================================================================
    // Meta and maintenance
    // ========================================================================

    pub async fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM meta WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(v,)| v))
    }

    pub async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO meta (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_meta(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM meta WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// End of the last completed run.
    pub async fn last_check_time(&self) -> Result<Option<DateTime<Utc>>> {
        self.get_meta(LAST_CHECK_TIME)
            .await?
            .map(|v| parse_time("meta", &v))
            .transpose()
    }

    pub async fn set_last_check_time(&self, at: DateTime<Utc>) -> Result<()> {
        self.set_meta(LAST_CHECK_TIME, &at.to_rfc3339()).await
    }

    /// Directories whose last scan left deferred or failed filesets.
    pub async fn pending_directories(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT swath_dir FROM pending_dirs ORDER BY swath_dir")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(d,)| d).collect())
    }

    /// Settle the pending flag of every directory in `scanned`: those listed
    /// in `pending` are marked with their reason, the others cleared.
    pub async fn update_pending(
        &self,
        scanned: &[String],
        pending: &[(String, String)],
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        for dir in scanned {
            sqlx::query("DELETE FROM pending_dirs WHERE swath_dir = ?")
                .bind(dir)
                .execute(&mut *tx)
                .await?;
        }
        for (dir, reason) in pending {
            sqlx::query(
                "INSERT OR REPLACE INTO pending_dirs (swath_dir, reason, updated_at) VALUES (?, ?, ?)",
            )
            .bind(dir)
            .bind(reason)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        debug!(scanned = scanned.len(), pending = pending.len(), "Updated pending directories");
        Ok(())
    }

    pub async fn counts(&self) -> Result<StateCounts> {
        let mut counts = StateCounts::default();
        for kind in ArtifactKind::ALL {
            let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
            let (n,): (i64,) = sqlx::query_as(&sql).fetch_one(&self.pool).await?;
            let n = n as u64;
            match kind {
                ArtifactKind::SwathRaster => counts.swath_rasters = n,
                ArtifactKind::CloudMask => counts.cloud_masks = n,
                ArtifactKind::Ndvi => counts.ndvi = n,
                ArtifactKind::Composite => counts.composites = n,
                ArtifactKind::Dynamics => counts.dynamics = n,
            }
        }
        Ok(counts)
    }

    /// Forget everything: all artifact records and `last_check_time`.
    /// Files on disk are not touched.
    pub async fn reset(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for kind in ArtifactKind::ALL {
            let sql = format!("DELETE FROM {}", kind.table());
            sqlx::query(&sql).execute(&mut *tx).await?;
        }
        sqlx::query("DELETE FROM composite_components")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM pending_dirs")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM meta WHERE key = ?")
            .bind(LAST_CHECK_TIME)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Pipeline state reset");
        Ok(())
    }

    async fn keep_if_present<R>(
        &self,
        kind: ArtifactKind,
        record: R,
        meta: impl Fn(&R) -> &ArtifactMeta,
    ) -> Result<Option<R>> {
        let path = meta(&record).output_path.clone();
        if self.heal(kind, &path).await? {
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn parse_time(table: &'static str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StateError::corrupt(table, format!("bad timestamp '{}': {}", value, e)))
}

fn parse_date(table: &'static str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| StateError::corrupt(table, format!("bad date '{}': {}", value, e)))
}

fn meta_from(table: &'static str, output_path: String, created_at: &str) -> Result<ArtifactMeta> {
    Ok(ArtifactMeta {
        output_path: PathBuf::from(output_path),
        created_at: parse_time(table, created_at)?,
    })
}

fn swath_from_row(row: SwathRow) -> Result<SwathRasterRecord> {
    let (output_path, source, record_type, swath_dir, acquired_at, created_at) = row;
    Ok(SwathRasterRecord {
        meta: meta_from("swath_rasters", output_path, &created_at)?,
        source,
        record_type,
        swath_dir,
        acquired_at: parse_time("swath_rasters", &acquired_at)?,
    })
}

fn cloud_mask_from_row(row: CloudMaskRow) -> Result<CloudMaskRecord> {
    let (output_path, swath_dir, source_path, created_at) = row;
    Ok(CloudMaskRecord {
        meta: meta_from("cloud_masks", output_path, &created_at)?,
        swath_dir,
        source_path: PathBuf::from(source_path),
    })
}

fn ndvi_from_row(row: NdviRow) -> Result<NdviRecord> {
    let (output_path, based_on, acquired_at, created_at) = row;
    Ok(NdviRecord {
        meta: meta_from("ndvi", output_path, &created_at)?,
        based_on,
        acquired_at: parse_time("ndvi", &acquired_at)?,
    })
}

fn composite_from_row(row: CompositeRow) -> Result<CompositeRecord> {
    let (output_path, starts_at, ends_at, created_at) = row;
    let period = Period::new(
        parse_date("composites", &starts_at)?,
        parse_date("composites", &ends_at)?,
    )
    .map_err(|e| StateError::corrupt("composites", e))?;

    Ok(CompositeRecord {
        meta: meta_from("composites", output_path, &created_at)?,
        period,
        components: Vec::new(),
    })
}

fn dynamics_from_row(row: DynamicsRow) -> Result<DynamicsRecord> {
    let (output_path, b1, b2, gap_days, created_at) = row;
    Ok(DynamicsRecord {
        meta: meta_from("dynamics", output_path, &created_at)?,
        b1: PathBuf::from(b1),
        b2: PathBuf::from(b2),
        gap_days,
    })
}
