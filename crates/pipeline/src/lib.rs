//! Incremental VIIRS NDVI pipeline.
//!
//! Each pass walks the swath directories under the data directory and
//! brings every artifact up to date:
//!
//! ```text
//! swath dirs ─► filesets ─► plan (state) ─► workers ─► record (state)
//!                                                          │
//!                       composite b2 (merge window ending at the reference date)
//!                       composite b1 (older window, backfilled)
//!                                                          │
//!                                              dynamics b1 -> b2
//! ```
//!
//! Artifacts that are already recorded and still on disk are skipped unless
//! a force flag says otherwise. Only the orchestrator writes to the state
//! store.

pub mod config;
pub mod context;
pub mod handler;
pub mod layout;
pub mod metrics;
pub mod orchestrator;
pub mod outcome;
pub mod report;
pub mod shutdown;
pub mod worker;

pub use config::{CloudMaskConfig, ForceFlags, PipelineConfig, ScaleConfig};
pub use context::{Collaborators, PipelineContext};
pub use handler::SwathHandler;
pub use layout::OutputLayout;
pub use orchestrator::{older_period, Pipeline};
pub use outcome::Outcome;
pub use report::{DeferredFileset, FailedFileset, RunReport, StageStatus};
pub use shutdown::Shutdown;
pub use worker::{run_job, CloudMaskStep, NdviStep, RasterStep, SwathJob, SwathResult, WorkerSettings};
