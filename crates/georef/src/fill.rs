//! Distance-limited filling of scatter holes.
//!
//! A target cell takes the inverse-distance-weighted mean of the nearest
//! source cell along each of the eight compass directions, provided a source
//! exists within `max_distance` cells on both sides along at least one axis.
//! Cells outside the swath footprint therefore stay untouched.

use ndarray::Array2;

/// Tuning for [`fill_nodata_holes`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillParams {
    /// Search radius in cells.
    pub max_distance: usize,
    /// 3x3 mean passes applied to filled cells only.
    pub smoothing_iterations: usize,
}

impl Default for FillParams {
    fn default() -> Self {
        Self {
            max_distance: 100,
            smoothing_iterations: 5,
        }
    }
}

const DIRECTIONS: [(isize, isize); 8] = [
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
];

/// Fill cells equal to `target` from cells accepted by `is_source`.
///
/// Returns the number of filled cells.
pub fn fill_nodata_holes(
    data: &mut Array2<f32>,
    target: f32,
    is_source: impl Fn(f32) -> bool,
    params: FillParams,
) -> usize {
    let (rows, cols) = data.dim();
    if rows == 0 || cols == 0 || params.max_distance == 0 {
        return 0;
    }

    let source = data.mapv(|v| is_source(v));
    let is_target = data.mapv(|v| v == target);
    if !is_target.iter().any(|&t| t) {
        return 0;
    }

    let mut weight_sum = Array2::<f64>::zeros((rows, cols));
    let mut value_sum = Array2::<f64>::zeros((rows, cols));
    let mut found = Array2::<u8>::zeros((rows, cols));

    for (bit, &(dr, dc)) in DIRECTIONS.iter().enumerate() {
        let step_len = if dr != 0 && dc != 0 {
            std::f64::consts::SQRT_2
        } else {
            1.0
        };
        let max_steps = (params.max_distance as f64 / step_len).floor() as u32;
        if max_steps == 0 {
            continue;
        }
        let nearest = nearest_source(data, &source, dr, dc, max_steps);

        for ((r, c), hit) in nearest.indexed_iter() {
            if !is_target[[r, c]] {
                continue;
            }
            if let Some((steps, value)) = hit {
                let w = 1.0 / (f64::from(*steps) * step_len);
                weight_sum[[r, c]] += w;
                value_sum[[r, c]] += w * f64::from(*value);
                found[[r, c]] |= 1 << bit;
            }
        }
    }

    let mut filled = Array2::from_elem((rows, cols), false);
    let mut count = 0;
    for ((r, c), bits) in found.indexed_iter() {
        if is_interior(*bits) {
            data[[r, c]] = (value_sum[[r, c]] / weight_sum[[r, c]]) as f32;
            filled[[r, c]] = true;
            count += 1;
        }
    }

    for _ in 0..params.smoothing_iterations {
        smooth_filled(data, &filled, &source);
    }

    count
}

/// Sources are bracketed along at least one of the four axes.
fn is_interior(bits: u8) -> bool {
    (0..4).any(|i| bits & (1 << i) != 0 && bits & (1 << (i + 4)) != 0)
}

/// For each cell, the nearest source along `(dr, dc)` within `max_steps`.
///
/// Cells are visited so that the neighbour in the search direction is
/// already resolved, which makes each direction a single linear sweep.
fn nearest_source(
    data: &Array2<f32>,
    source: &Array2<bool>,
    dr: isize,
    dc: isize,
    max_steps: u32,
) -> Array2<Option<(u32, f32)>> {
    let (rows, cols) = data.dim();
    let mut nearest: Array2<Option<(u32, f32)>> = Array2::from_elem((rows, cols), None);

    let row_order: Vec<usize> = if dr > 0 {
        (0..rows).rev().collect()
    } else {
        (0..rows).collect()
    };
    let col_order: Vec<usize> = if dc > 0 {
        (0..cols).rev().collect()
    } else {
        (0..cols).collect()
    };

    for &r in &row_order {
        for &c in &col_order {
            let nr = r as isize + dr;
            let nc = c as isize + dc;
            if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                continue;
            }
            let (nr, nc) = (nr as usize, nc as usize);
            nearest[[r, c]] = if source[[nr, nc]] {
                Some((1, data[[nr, nc]]))
            } else {
                match nearest[[nr, nc]] {
                    Some((steps, value)) if steps < max_steps => Some((steps + 1, value)),
                    _ => None,
                }
            };
        }
    }
    nearest
}

fn smooth_filled(data: &mut Array2<f32>, filled: &Array2<bool>, source: &Array2<bool>) {
    let (rows, cols) = data.dim();
    let snapshot = data.clone();
    for ((r, c), &was_filled) in filled.indexed_iter() {
        if !was_filled {
            continue;
        }
        let mut sum = 0.0f64;
        let mut n = 0u32;
        for rr in r.saturating_sub(1)..=(r + 1).min(rows - 1) {
            for cc in c.saturating_sub(1)..=(c + 1).min(cols - 1) {
                if source[[rr, cc]] || filled[[rr, cc]] {
                    sum += f64::from(snapshot[[rr, cc]]);
                    n += 1;
                }
            }
        }
        if n > 0 {
            data[[r, c]] = (sum / f64::from(n)) as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const T: f32 = 65535.0;

    fn is_source(v: f32) -> bool {
        v < 65528.0
    }

    #[test]
    fn test_interior_hole_is_filled() {
        let mut data = array![
            [1.0, 1.0, 1.0],
            [1.0, T, 1.0],
            [1.0, 1.0, 1.0],
        ];
        let n = fill_nodata_holes(&mut data, T, is_source, FillParams::default());
        assert_eq!(n, 1);
        assert!((data[[1, 1]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_weights_favour_nearer_sources() {
        let mut data = array![[10.0, T, T, T, 20.0]];
        let params = FillParams {
            max_distance: 10,
            smoothing_iterations: 0,
        };
        fill_nodata_holes(&mut data, T, is_source, params);
        // 1 cell from 10 and 3 cells from 20: (10/1 + 20/3) / (1 + 1/3) = 12.5
        assert!((data[[0, 1]] - 12.5).abs() < 1e-4);
        assert!((data[[0, 2]] - 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_exterior_cells_are_not_filled() {
        let mut data = array![
            [T, T, T, T],
            [T, 5.0, 5.0, T],
            [T, 5.0, 5.0, T],
            [T, T, T, T],
        ];
        let n = fill_nodata_holes(&mut data, T, is_source, FillParams::default());
        assert_eq!(n, 0);
        assert_eq!(data[[0, 0]], T);
        assert_eq!(data[[3, 1]], T);
    }

    #[test]
    fn test_distance_limit() {
        let mut data = array![[1.0, T, T, T, T, T, 1.0]];
        let params = FillParams {
            max_distance: 2,
            smoothing_iterations: 0,
        };
        assert_eq!(fill_nodata_holes(&mut data, T, is_source, params), 0);
    }

    #[test]
    fn test_other_fill_codes_are_neither_target_nor_source() {
        let mut data = array![[1.0, 65533.0, T, 3.0]];
        let params = FillParams {
            max_distance: 10,
            smoothing_iterations: 0,
        };
        let n = fill_nodata_holes(&mut data, T, is_source, params);
        assert_eq!(n, 1);
        assert_eq!(data[[0, 1]], 65533.0);
        // 2 cells from 1.0 and 1 cell from 3.0
        assert!((data[[0, 2]] - (1.0 / 2.0 + 3.0) / 1.5).abs() < 1e-4);
    }
}
