//! Output file naming.

use std::path::{Path, PathBuf};

use swath_catalog::{Fileset, RecordType};
use viirs_common::Period;

pub const CLOUD_MASK_KIND: &str = "PROJECTED_CLOUDMASK";
pub const NDVI_KIND: &str = "NDVI";

/// Where every artifact lands under the output directory.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<stem>.<GEOLOC TYPE>.tiff`
    pub fn swath_raster(&self, stem: &str, geoloc: RecordType) -> PathBuf {
        self.root.join(format!("{}.{}.tiff", stem, geoloc.code()))
    }

    pub fn cloud_mask(&self, dir_name: &str) -> PathBuf {
        self.root.join(format!("{}.{}.tiff", dir_name, CLOUD_MASK_KIND))
    }

    pub fn ndvi(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{}.{}.tiff", stem, NDVI_KIND))
    }

    pub fn composite(&self, period: &Period) -> PathBuf {
        self.root
            .join(format!("ndvi_composite_{}.tiff", period.compact()))
    }

    pub fn dynamics(&self, b1: &Period, b2: &Period) -> PathBuf {
        self.root.join(format!(
            "ndvi_dynamics_{}__{}.tiff",
            b1.compact(),
            b2.compact()
        ))
    }
}

/// File stem for a fileset's outputs.
///
/// The directory name alone, unless the directory holds several filesets
/// of the same geolocation type; those get the granule start time appended.
pub fn swath_stem(dir_name: &str, fileset: &Fileset, shared_type: bool) -> String {
    if shared_type {
        format!("{}_t{}", dir_name, fileset.geoloc.t_start.format("%H%M%S"))
    } else {
        dir_name.to_string()
    }
}
