//! In-memory georeferenced rasters.
//!
//! All pipeline rasters are `f32` with NaN as the nodata value. Bands of one
//! raster share shape, geotransform and CRS.

use ndarray::{s, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViirsError};
use crate::geotransform::GeoTransform;

/// One band, optionally tagged with the record type it was produced from.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBand {
    pub name: Option<String>,
    pub data: Array2<f32>,
}

impl RasterBand {
    pub fn new(data: Array2<f32>) -> Self {
        Self { name: None, data }
    }

    pub fn named(name: impl Into<String>, data: Array2<f32>) -> Self {
        Self {
            name: Some(name.into()),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub bands: Vec<RasterBand>,
    pub transform: GeoTransform,
    /// CRS as WKT.
    pub crs: String,
}

/// Rows/columns of all-nodata border on each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrimOffsets {
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
    pub left: usize,
}

impl Raster {
    pub fn single(data: Array2<f32>, transform: GeoTransform, crs: impl Into<String>) -> Self {
        Self {
            bands: vec![RasterBand::new(data)],
            transform,
            crs: crs.into(),
        }
    }

    /// Build a multi-band raster, rejecting bands whose shapes differ.
    pub fn from_bands(
        bands: Vec<RasterBand>,
        transform: GeoTransform,
        crs: impl Into<String>,
    ) -> Result<Self> {
        let Some(first) = bands.first() else {
            return Err(ViirsError::invalid("raster needs at least one band"));
        };
        let shape = first.data.dim();
        if let Some(bad) = bands.iter().find(|b| b.data.dim() != shape) {
            return Err(ViirsError::invalid(format!(
                "band shape {:?} differs from {:?}",
                bad.data.dim(),
                shape
            )));
        }
        Ok(Self {
            bands,
            transform,
            crs: crs.into(),
        })
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        self.bands
            .first()
            .map(|b| b.data.dim())
            .unwrap_or((0, 0))
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn first_band(&self) -> Option<&Array2<f32>> {
        self.bands.first().map(|b| &b.data)
    }

    pub fn band_named(&self, name: &str) -> Option<&Array2<f32>> {
        self.bands
            .iter()
            .find(|b| b.name.as_deref() == Some(name))
            .map(|b| &b.data)
    }

    /// Number of non-NaN cells across all bands.
    pub fn valid_count(&self) -> usize {
        self.bands
            .iter()
            .map(|b| b.data.iter().filter(|v| !v.is_nan()).count())
            .sum()
    }

    /// Sub-window `[row, row + rows) x [col, col + cols)` with the origin shifted to match.
    pub fn crop(&self, row: usize, col: usize, rows: usize, cols: usize) -> Result<Self> {
        let (h, w) = self.shape();
        if row + rows > h || col + cols > w {
            return Err(ViirsError::invalid(format!(
                "crop window {}x{} at ({}, {}) exceeds raster {}x{}",
                rows, cols, row, col, h, w
            )));
        }
        let bands = self
            .bands
            .iter()
            .map(|b| RasterBand {
                name: b.name.clone(),
                data: b.data.slice(s![row..row + rows, col..col + cols]).to_owned(),
            })
            .collect();
        Ok(Self {
            bands,
            transform: self.transform.translated(col, row),
            crs: self.crs.clone(),
        })
    }

    /// Cut all-nodata borders shared by every band. Returns `None` when no
    /// band holds a single valid cell.
    pub fn trim_nodata(&self, is_nodata: impl Fn(f32) -> bool + Copy) -> Option<Self> {
        let offsets = self
            .bands
            .iter()
            .filter_map(|b| trimming_offsets(b.data.view(), is_nodata))
            .reduce(|a, b| TrimOffsets {
                top: a.top.min(b.top),
                right: a.right.min(b.right),
                bottom: a.bottom.min(b.bottom),
                left: a.left.min(b.left),
            })?;
        let (h, w) = self.shape();
        self.crop(
            offsets.top,
            offsets.left,
            h - offsets.top - offsets.bottom,
            w - offsets.left - offsets.right,
        )
        .ok()
    }
}

/// Border widths of rows/columns that are entirely nodata.
/// Returns `None` if the whole array is nodata.
pub fn trimming_offsets(
    data: ArrayView2<f32>,
    is_nodata: impl Fn(f32) -> bool + Copy,
) -> Option<TrimOffsets> {
    let rows_with_data: Vec<bool> = data
        .axis_iter(Axis(0))
        .map(|row| row.iter().any(|&v| !is_nodata(v)))
        .collect();
    let cols_with_data: Vec<bool> = data
        .axis_iter(Axis(1))
        .map(|col| col.iter().any(|&v| !is_nodata(v)))
        .collect();

    let top = rows_with_data.iter().position(|&d| d)?;
    let bottom = rows_with_data.iter().rev().position(|&d| d)?;
    let left = cols_with_data.iter().position(|&d| d)?;
    let right = cols_with_data.iter().rev().position(|&d| d)?;
    Some(TrimOffsets {
        top,
        right,
        bottom,
        left,
    })
}
