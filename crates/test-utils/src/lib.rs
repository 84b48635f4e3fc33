//! Test support for the viirs-ndvi workspace.
//!
//! - granule file names and NPP directory layouts ([`fixtures`])
//! - synthetic swaths, [`MemorySwathReader`] and [`JsonRasterStore`], so
//!   georeferencing and pipeline tests run without HDF5 or GDAL
//! - [`require_test_file!`] for tests against real granules
//! - [`assert_approx_eq!`]

pub mod fixtures;
pub mod generators;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Resolve a sample granule via [`find_test_file`], or return early from
/// the test with a skip message when it is absent.
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "SKIPPED: Test file '{}' not found. Put sample granules in testdata/ or set VIIRS_TEST_DATA.",
                    $name
                );
                return;
            }
        }
    }};
}

/// Compare two numbers as `f64` within `epsilon`.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}
