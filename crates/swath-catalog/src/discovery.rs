//! Discovery of granules and swath directories on disk.
//!
//! Expected layout of one downlinked swath:
//!
//! ```text
//! <data_dir>/NPP_48293_21-FEB-2021_082144/
//!     viirs/level1/GIMGO_npp_d20210221_t0821238_..._noaa_ops.h5
//!     viirs/level1/SVI01_npp_d20210221_t0821238_..._noaa_ops.h5
//!     viirs/level2/NPP_48293_..._CLOUDMASK.tif
//! ```

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::fileset::{group_filesets, Fileset, GeolocPreference};
use crate::swath_file::SwathFile;

fn granule_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9]+_[a-zA-Z0-9]+_d\d+_t\d+_e\d+_b\d+_c\d+_\w+\.h5$")
            .unwrap_or_else(|e| unreachable!("static regex: {e}"))
    })
}

fn swath_dir_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z]+_(\d+)_.*").unwrap_or_else(|e| unreachable!("static regex: {e}"))
    })
}

/// All parseable granule files directly inside `dir`.
///
/// Files with a malformed `.h5` name are logged and skipped; a missing
/// directory yields an empty list.
pub fn find_swath_files(dir: &Path) -> Vec<SwathFile> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if !name.ends_with(".h5") {
            continue;
        }
        if !granule_name_regex().is_match(&name) {
            warn!(file = %name, "Filename does not match the granule naming pattern, skipping");
            continue;
        }

        match SwathFile::parse(entry.path()) {
            Ok(file) => files.push(file),
            Err(e) => warn!(file = %name, error = %e, "Skipping granule"),
        }
    }

    files
}

/// SDR filesets found directly inside `dir`.
pub fn find_filesets(dir: &Path, preference: GeolocPreference) -> Vec<Fileset> {
    let files = find_swath_files(dir);
    let filesets = group_filesets(&files, preference);
    debug!(dir = %dir.display(), files = files.len(), filesets = filesets.len(), "Discovered filesets");
    filesets
}

/// One downlinked swath directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwathDirectory {
    pub path: PathBuf,
    /// Directory name, used as the prefix of every output file of the swath.
    pub name: String,
    /// Orbit (pass) number taken from the directory name.
    pub swath_id: String,
}

impl SwathDirectory {
    /// Recognize `<LETTERS>_<digits>_...` directory names.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let name = path.file_name()?.to_str()?.to_string();
        let swath_id = swath_dir_regex().captures(&name)?.get(1)?.as_str().to_string();
        Some(Self {
            path,
            name,
            swath_id,
        })
    }

    pub fn level1_dir(&self) -> PathBuf {
        self.path.join("viirs").join("level1")
    }

    pub fn level2_dir(&self) -> PathBuf {
        self.path.join("viirs").join("level2")
    }

    /// The externally produced cloud mask, if it has arrived.
    pub fn cloud_mask_source(&self) -> Option<PathBuf> {
        let pattern = self.level2_dir().join("*CLOUDMASK.tif");
        let mut matches: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
            .ok()?
            .filter_map(|entry| entry.ok())
            .filter(|p| p.is_file())
            .collect();
        matches.sort();
        matches.into_iter().next()
    }

    pub fn filesets(&self, preference: GeolocPreference) -> Vec<Fileset> {
        find_filesets(&self.level1_dir(), preference)
    }

    /// Latest modification time of the directory and its level1/level2
    /// subdirectories, where granules and cloud masks arrive.
    pub fn modified(&self) -> Option<SystemTime> {
        [self.path.clone(), self.level1_dir(), self.level2_dir()]
            .iter()
            .filter_map(|p| std::fs::metadata(p).and_then(|m| m.modified()).ok())
            .max()
    }
}

/// Swath directories directly under `data_dir`, sorted by name.
///
/// Directories whose name carries no swath id are logged and skipped.
pub fn list_swath_directories(data_dir: &Path) -> std::io::Result<Vec<SwathDirectory>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(data_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        match SwathDirectory::from_path(entry.path()) {
            Some(dir) => dirs.push(dir),
            None => warn!(
                dir = %entry.path().display(),
                "Directory name does not look like <NAME>_<orbit>_..., ignoring"
            ),
        }
    }
    dirs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(dirs)
}
