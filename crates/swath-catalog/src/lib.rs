//! VIIRS granule catalog.
//!
//! Parses granule filenames into [`SwathFile`] values, groups a geolocation
//! file with the band files of the same granule into a [`Fileset`], and
//! discovers both on disk.

pub mod discovery;
pub mod fileset;
pub mod record_type;
pub mod swath_file;

pub use discovery::{find_filesets, find_swath_files, list_swath_directories, SwathDirectory};
pub use fileset::{group_filesets, Fileset, GeolocPreference};
pub use record_type::{RecordType, Resolution, UnknownRecordType};
pub use swath_file::SwathFile;
