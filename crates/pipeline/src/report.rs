//! Summary of one pipeline pass.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use viirs_common::Period;

/// A fileset whose raster or NDVI step failed.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedFileset {
    pub swath_dir: String,
    pub fileset: String,
    /// Stable error label, see `ViirsError::kind`.
    pub kind: &'static str,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeferredFileset {
    pub swath_dir: String,
    pub fileset: String,
    pub reason: String,
}

/// Result of the composite or dynamics stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageStatus {
    Produced(PathBuf),
    UpToDate(PathBuf),
    /// Not enough inputs yet, or the stage failed; retried next run.
    NotAvailable(String),
}

impl StageStatus {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            StageStatus::Produced(p) | StageStatus::UpToDate(p) => Some(p),
            StageStatus::NotAvailable(_) => None,
        }
    }

    pub fn is_produced(&self) -> bool {
        matches!(self, StageStatus::Produced(_))
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Produced(p) => write!(f, "produced {}", p.display()),
            StageStatus::UpToDate(p) => write!(f, "up to date {}", p.display()),
            StageStatus::NotAvailable(reason) => write!(f, "not available ({})", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub reference_date: NaiveDate,
    pub directories: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: Vec<FailedFileset>,
    pub deferred: Vec<DeferredFileset>,
    /// Bands dropped from otherwise successful swath rasters.
    pub band_failures: usize,
    pub composite_period: Option<Period>,
    pub composite: Option<StageStatus>,
    pub older_composite: Option<StageStatus>,
    pub dynamics: Option<StageStatus>,
    /// Set when the composite periods were not adjacent.
    pub dynamics_gap_days: Option<i64>,
    pub interrupted: bool,
    pub duration: Duration,
}

impl RunReport {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            reference_date,
            directories: 0,
            processed: 0,
            skipped: 0,
            failed: Vec::new(),
            deferred: Vec::new(),
            band_failures: 0,
            composite_period: None,
            composite: None,
            older_composite: None,
            dynamics: None,
            dynamics_gap_days: None,
            interrupted: false,
            duration: Duration::ZERO,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run for {} ({:.1}s)", self.reference_date, self.duration.as_secs_f64())?;
        writeln!(f, "  directories: {}", self.directories)?;
        writeln!(
            f,
            "  swaths: {} processed, {} skipped, {} deferred, {} failed",
            self.processed,
            self.skipped,
            self.deferred.len(),
            self.failed.len()
        )?;
        if self.band_failures > 0 {
            writeln!(f, "  bands dropped: {}", self.band_failures)?;
        }
        for failed in &self.failed {
            writeln!(
                f,
                "  FAILED {}/{} [{}]: {}",
                failed.swath_dir, failed.fileset, failed.kind, failed.error
            )?;
        }
        for deferred in &self.deferred {
            writeln!(
                f,
                "  deferred {}/{}: {}",
                deferred.swath_dir, deferred.fileset, deferred.reason
            )?;
        }
        if let (Some(period), Some(status)) = (&self.composite_period, &self.composite) {
            writeln!(f, "  composite {}: {}", period.date_text(), status)?;
        }
        if let Some(status) = &self.older_composite {
            writeln!(f, "  older composite: {}", status)?;
        }
        if let Some(status) = &self.dynamics {
            write!(f, "  dynamics: {}", status)?;
            if let Some(gap) = self.dynamics_gap_days {
                write!(f, " (periods {} days apart)", gap)?;
            }
            writeln!(f)?;
        }
        if self.interrupted {
            writeln!(f, "  interrupted before completion")?;
        }
        Ok(())
    }
}
