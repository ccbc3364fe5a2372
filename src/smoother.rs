//! Spatial noise suppression for depth grids.

use crate::depth_frame::DepthGrid;

/// Replaces every cell with the mean of the in-bounds cells within
/// `window / 2` of it along both axes. Cells near the border average over the
/// smaller window that fits; nothing is zero padded.
///
/// `window` is expected to be odd. Uses a summed-area table, so the cost does
/// not depend on the window size.
pub fn smooth(grid: &DepthGrid, window: usize) -> DepthGrid {
    debug_assert!(window % 2 == 1, "smoothing window must be odd");
    let (w, h) = (grid.width(), grid.height());
    if grid.is_empty() || window <= 1 {
        return grid.clone();
    }
    let radius = window / 2;

    // sums[r][c] holds the sum of every cell above and left of (r, c)
    let stride = w + 1;
    let mut sums = vec![0.0f64; (h + 1) * stride];
    for r in 0..h {
        let mut row_sum = 0.0;
        for (c, &d) in grid.row(r).iter().enumerate() {
            row_sum += d as f64;
            sums[(r + 1) * stride + c + 1] = sums[r * stride + c + 1] + row_sum;
        }
    }

    DepthGrid::from_fn(w, h, |r, c| {
        let (r0, r1) = (r.saturating_sub(radius), (r + radius + 1).min(h));
        let (c0, c1) = (c.saturating_sub(radius), (c + radius + 1).min(w));
        let total = sums[r1 * stride + c1] - sums[r0 * stride + c1] - sums[r1 * stride + c0]
            + sums[r0 * stride + c0];
        let count = ((r1 - r0) * (c1 - c0)) as f64;
        (total / count) as f32
    })
}

/// Nearest-neighbour decimation to a `target × target` grid by strided
/// indexing. Coarse on purpose: there is no anti-aliasing.
pub fn downsample(grid: &DepthGrid, target: usize) -> DepthGrid {
    if grid.is_empty() || target == 0 {
        return DepthGrid::new(0, 0, Vec::new());
    }
    let (w, h) = (grid.width(), grid.height());
    let row_step = (h / target).max(1);
    let col_step = (w / target).max(1);

    DepthGrid::from_fn(target, target, |r, c| {
        grid.get((r * row_step).min(h - 1), (c * col_step).min(w - 1))
    })
}
