//! Discovery tests against a temporary NPP directory tree.

use std::fs;

use swath_catalog::{
    find_swath_files, list_swath_directories, GeolocPreference, RecordType, SwathDirectory,
};
use test_utils::fixtures::{create_swath_layout, granules, swaths};

#[test]
fn test_discovers_fileset_in_swath_directory() {
    let tmp = tempfile::tempdir().unwrap();
    create_swath_layout(
        tmp.path(),
        swaths::DIR_NAME,
        &[granules::GIMGO, granules::SVI01, granules::SVI02],
        true,
    )
    .unwrap();

    let dirs = list_swath_directories(tmp.path()).unwrap();
    assert_eq!(dirs.len(), 1);
    let dir = &dirs[0];
    assert_eq!(dir.swath_id, "48293");

    let filesets = dir.filesets(GeolocPreference::Ellipsoid);
    assert_eq!(filesets.len(), 1);
    assert_eq!(filesets[0].geoloc.record_type, RecordType::Gimgo);
    assert_eq!(filesets[0].bands.len(), 2);
    assert!(filesets[0].band(RecordType::IBandSdr(2)).is_some());

    let mask = dir.cloud_mask_source().unwrap();
    assert!(mask.to_string_lossy().ends_with("_CLOUDMASK.tif"));
}

#[test]
fn test_malformed_names_do_not_abort_scan() {
    let tmp = tempfile::tempdir().unwrap();
    let level1 = create_swath_layout(
        tmp.path(),
        swaths::DIR_NAME,
        &[
            granules::GIMGO,
            "GIMGO_npp_broken.h5",
            "XXXXX_npp_d20210221_t0821238_e0832466_b48293_c20210221100336573000_noaa_ops.h5",
            "notes.txt",
        ],
        false,
    )
    .unwrap()
    .join("viirs/level1");

    let files = find_swath_files(&level1);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, granules::GIMGO);
}

#[test]
fn test_missing_cloud_mask_and_missing_level1() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join(swaths::DIR_NAME);
    fs::create_dir_all(&path).unwrap();

    let dir = SwathDirectory::from_path(&path).unwrap();
    assert!(dir.cloud_mask_source().is_none());
    assert!(dir.filesets(GeolocPreference::Both).is_empty());
}

#[test]
fn test_non_swath_directories_are_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("lost+found")).unwrap();
    fs::create_dir_all(tmp.path().join(swaths::dir_name("48300"))).unwrap();
    fs::create_dir_all(tmp.path().join(swaths::dir_name("48299"))).unwrap();
    fs::write(tmp.path().join("NPP_1_file.txt"), b"").unwrap();

    let dirs = list_swath_directories(tmp.path()).unwrap();
    let ids: Vec<_> = dirs.iter().map(|d| d.swath_id.as_str()).collect();
    assert_eq!(ids, vec!["48299", "48300"]);
}
