//! Everything a pipeline run needs, passed explicitly.

use std::sync::Arc;

use pipeline_state::PipelineState;
use projection::Crs;
use viirs_common::{RasterStore, Result, SwathReader};

use crate::config::PipelineConfig;
use crate::layout::OutputLayout;

/// Builds per-worker I/O handles.
///
/// Each worker asks for its own reader and store, so no file or dataset
/// handle is shared between workers.
pub trait Collaborators: Send + Sync + 'static {
    fn swath_reader(&self) -> Box<dyn SwathReader>;
    fn raster_store(&self) -> Box<dyn RasterStore>;
}

pub struct PipelineContext {
    pub config: PipelineConfig,
    pub state: PipelineState,
    pub collaborators: Arc<dyn Collaborators>,
    pub crs: Crs,
    pub layout: OutputLayout,
}

impl PipelineContext {
    /// Validates `config`. The working CRS is the default Lambert grid.
    pub fn new(
        config: PipelineConfig,
        state: PipelineState,
        collaborators: Arc<dyn Collaborators>,
    ) -> Result<Self> {
        config.validate()?;
        let layout = OutputLayout::new(&config.output_dir);
        Ok(Self {
            config,
            state,
            collaborators,
            crs: Crs::working(),
            layout,
        })
    }
}
