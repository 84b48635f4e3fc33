//! Maximum-value compositing of NDVI rasters over a period.

use chrono::{DateTime, Utc};
use ndarray::{s, Array2, Zip};
use tracing::{debug, info};
use viirs_common::{GeoTransform, Period, Raster, RasterBand, Result, ViirsError};

use crate::ndvi::NDVI_BAND;

/// An NDVI raster tagged with the acquisition time of its swath.
#[derive(Debug, Clone)]
pub struct TaggedNdvi {
    pub acquired_at: DateTime<Utc>,
    pub raster: Raster,
}

/// Merge rasters on one grid into their union extent, keeping the maximum
/// valid value per pixel. Returns `None` for an empty input.
pub fn merge_max(rasters: &[&Raster]) -> Result<Option<Raster>> {
    let Some(first) = rasters.first() else {
        return Ok(None);
    };
    for r in &rasters[1..] {
        first.transform.ensure_same_grid(&r.transform)?;
    }
    if first.transform.rotation_x != 0.0 || first.transform.rotation_y != 0.0 {
        return Err(ViirsError::invalid("cannot merge rotated rasters"));
    }

    // Union extent in the first raster's pixel space.
    let mut min_col = 0i64;
    let mut min_row = 0i64;
    let mut max_col = i64::MIN;
    let mut max_row = i64::MIN;
    for r in rasters {
        let (dc, dr) = first.transform.pixel_offset_of(&r.transform);
        let (rows, cols) = r.shape();
        min_col = min_col.min(dc);
        min_row = min_row.min(dr);
        max_col = max_col.max(dc + cols as i64);
        max_row = max_row.max(dr + rows as i64);
    }
    let rows = (max_row - min_row) as usize;
    let cols = (max_col - min_col) as usize;

    let (x0, y0) = first.transform.pixel_to_geo(min_col as f64, min_row as f64);
    let transform = GeoTransform {
        origin_x: x0,
        origin_y: y0,
        ..first.transform
    };

    let mut merged = Array2::from_elem((rows, cols), f32::NAN);
    for r in rasters {
        let Some(band) = r.first_band() else {
            continue;
        };
        let (dc, dr) = first.transform.pixel_offset_of(&r.transform);
        let (row0, col0) = ((dr - min_row) as usize, (dc - min_col) as usize);
        let (h, w) = band.dim();
        let mut target = merged.slice_mut(s![row0..row0 + h, col0..col0 + w]);
        Zip::from(&mut target).and(band).for_each(|out, &v| {
            if !v.is_nan() && (out.is_nan() || v > *out) {
                *out = v;
            }
        });
    }

    Ok(Some(Raster::from_bands(
        vec![RasterBand::named(NDVI_BAND, merged)],
        transform,
        first.crs.clone(),
    )?))
}

/// A finished composite and the inputs that went into it.
#[derive(Debug, Clone)]
pub struct CompositeResult {
    pub raster: Raster,
    /// Indices into the input slice of the rasters inside the period.
    pub components: Vec<usize>,
}

/// Builds rolling-window maximum composites.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeBuilder;

impl CompositeBuilder {
    /// Merge every input acquired inside `period`, then trim all-nodata
    /// borders. `None` means there is nothing to composite yet: no input
    /// falls in the window, or none of them holds a valid pixel.
    pub fn build(&self, period: &Period, inputs: &[TaggedNdvi]) -> Result<Option<CompositeResult>> {
        let components: Vec<usize> = inputs
            .iter()
            .enumerate()
            .filter(|(_, t)| period.contains_instant(t.acquired_at))
            .map(|(i, _)| i)
            .collect();
        if components.is_empty() {
            debug!(period = %period, "No NDVI rasters in window");
            return Ok(None);
        }

        let rasters: Vec<&Raster> = components.iter().map(|&i| &inputs[i].raster).collect();
        let Some(merged) = merge_max(&rasters)? else {
            return Ok(None);
        };
        let Some(raster) = merged.trim_nodata(f32::is_nan) else {
            info!(period = %period, "Composite has no valid pixels");
            return Ok(None);
        };

        info!(
            period = %period,
            components = components.len(),
            shape = ?raster.shape(),
            "Built composite"
        );
        Ok(Some(CompositeResult { raster, components }))
    }
}
