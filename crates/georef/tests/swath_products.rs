//! Synthetic swath through every product: calibrated raster, NDVI,
//! composite and dynamics.

use std::path::Path;

use chrono::NaiveDate;
use georef::{
    CompositeBuilder, DynamicsComputer, FillParams, FilesetProcessor, NdviComputer, TaggedNdvi,
};
use projection::Crs;
use swath_catalog::{group_filesets, GeolocPreference, SwathFile};
use test_utils::{assert_approx_eq, MemorySwathReader, SyntheticSwath};
use viirs_common::{Period, Raster};

fn ndvi_for(swath: &SyntheticSwath) -> (Raster, chrono::DateTime<chrono::Utc>) {
    let mut reader = MemorySwathReader::new();
    let paths = swath.register(&mut reader, Path::new("/data/NPP_48293/viirs/level1"));
    let files: Vec<SwathFile> = paths.iter().map(|p| SwathFile::parse(p).unwrap()).collect();
    let fileset = group_filesets(&files, GeolocPreference::Ellipsoid).remove(0);

    let crs = Crs::working();
    let processed = FilesetProcessor::new(&reader, &crs, FillParams::default())
        .process(&fileset, 375.0)
        .unwrap();
    let ndvi = NdviComputer::default().compute(&processed.raster).unwrap();
    (ndvi, fileset.geoloc.acquired_at())
}

#[test]
fn test_ndvi_of_synthetic_swath() {
    let (ndvi, _) = ndvi_for(&SyntheticSwath::siberia(40, 30));
    let valid: Vec<f32> = ndvi
        .first_band()
        .unwrap()
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .collect();
    assert!(!valid.is_empty());
    for v in valid {
        assert_approx_eq!(v, 0.5, 1e-4);
    }
}

#[test]
fn test_composite_and_dynamics_from_swaths() {
    let (older, t) = ndvi_for(&SyntheticSwath::with_counts(40, 30, 1000.0, 3000.0));
    let (newer, _) = ndvi_for(&SyntheticSwath::with_counts(40, 30, 1000.0, 5000.0));

    let day = t.date_naive();
    let b1_period = Period::new(day, day).unwrap();
    let b2_period = Period::new(day + chrono::Duration::days(1), day + chrono::Duration::days(1)).unwrap();

    let b1 = CompositeBuilder
        .build(&b1_period, &[TaggedNdvi { acquired_at: t, raster: older }])
        .unwrap()
        .unwrap();
    let b2 = CompositeBuilder
        .build(
            &b2_period,
            &[TaggedNdvi {
                acquired_at: t + chrono::Duration::days(1),
                raster: newer,
            }],
        )
        .unwrap()
        .unwrap();

    let dynamics = DynamicsComputer
        .compute(&b1.raster, &b1_period, &b2.raster, &b2_period)
        .unwrap();
    assert_eq!(dynamics.gap_days, None);

    // NDVI 0.5 -> 2/3 is a third more.
    let band = dynamics.raster.first_band().unwrap();
    let expected = 100.0 * (4000.0 / 6000.0 - 0.5) / 0.5;
    assert!(band.iter().any(|v| !v.is_nan()));
    for v in band.iter().filter(|v| !v.is_nan()) {
        assert_approx_eq!(*v, expected, 1e-2);
    }
    assert_eq!(b1_period.ends_at, NaiveDate::from_ymd_opt(2021, 2, 21).unwrap());
}
