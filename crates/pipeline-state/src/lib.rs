//! Persisted record of what the pipeline has already produced.
//!
//! One table per artifact kind keyed by output path, plus a join table for
//! composite components and a small key/value `meta` table.

pub mod error;
pub mod records;
pub mod store;

pub use error::{Result, StateError};
pub use records::{
    ArtifactKind, ArtifactMeta, CloudMaskRecord, CompositeRecord, DynamicsRecord, NdviRecord,
    StateCounts, SwathRasterRecord,
};
pub use store::PipelineState;
