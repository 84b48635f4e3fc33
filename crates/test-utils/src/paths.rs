//! Locating real VIIRS granules for tests that need them.
//!
//! Sample granules are large and not checked in; tests that use them skip
//! themselves when the file cannot be found.

use std::path::PathBuf;

/// Environment variable naming an extra directory of sample granules.
pub const TEST_DATA_ENV: &str = "VIIRS_TEST_DATA";

pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Look for `name` in `$VIIRS_TEST_DATA`, then in `testdata/` at the
/// workspace root.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(dir) = std::env::var(TEST_DATA_ENV) {
        candidates.push(PathBuf::from(dir).join(name));
    }
    candidates.push(workspace_root().join("testdata").join(name));

    candidates.into_iter().find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_holds_manifest() {
        assert!(workspace_root().join("Cargo.toml").exists());
    }

    #[test]
    fn test_missing_file_is_none() {
        assert!(find_test_file("SVI01_npp_does_not_exist.h5").is_none());
    }
}
