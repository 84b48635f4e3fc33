//! Pixel-offset alignment of rasters that share one grid.

use viirs_common::{Raster, Result, ViirsError};

/// A rectangular pixel window inside one raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
}

/// Windows of `a` and `b` covering the same ground, or `None` when the two
/// rasters do not overlap.
///
/// Both rasters must have identical scale and rotation.
pub fn common_windows(a: &Raster, b: &Raster) -> Result<Option<(Window, Window)>> {
    a.transform.ensure_same_grid(&b.transform)?;

    // Position of b's origin in a's pixel space.
    let (dc, dr) = a.transform.pixel_offset_of(&b.transform);
    let (a_rows, a_cols) = a.shape();
    let (b_rows, b_cols) = b.shape();

    let Some((a_col, b_col, cols)) = overlap(dc, a_cols, b_cols) else {
        return Ok(None);
    };
    let Some((a_row, b_row, rows)) = overlap(dr, a_rows, b_rows) else {
        return Ok(None);
    };

    Ok(Some((
        Window {
            row: a_row,
            col: a_col,
            rows,
            cols,
        },
        Window {
            row: b_row,
            col: b_col,
            rows,
            cols,
        },
    )))
}

/// 1-D overlap of `[0, a_len)` and `[offset, offset + b_len)`, as start
/// positions in each range plus the common length.
fn overlap(offset: i64, a_len: usize, b_len: usize) -> Option<(usize, usize, usize)> {
    let start = offset.max(0);
    let end = (offset + b_len as i64).min(a_len as i64);
    if end <= start {
        return None;
    }
    Some((start as usize, (start - offset) as usize, (end - start) as usize))
}

/// Crop both rasters to their common extent.
///
/// Disjoint rasters are `InvalidData`.
pub fn crop_to_common(a: &Raster, b: &Raster) -> Result<(Raster, Raster)> {
    let (wa, wb) = common_windows(a, b)?
        .ok_or_else(|| ViirsError::invalid("rasters do not overlap"))?;
    Ok((
        a.crop(wa.row, wa.col, wa.rows, wa.cols)?,
        b.crop(wb.row, wb.col, wb.rows, wb.cols)?,
    ))
}
