//! Pointer snapping.
//!
//! Converts container-relative pointer pixels into grid origins (drag) and
//! pixel offsets into grid spans (resize). All functions are total: unusable
//! geometry degrades to the smallest legal answer instead of failing.

use dashgrid_core::geometry::{GridPoint, GridSpan};

use crate::item::{LayoutItem, SizeConstraints};

/// Round a pixel quotient to a cell count, clamped to `[0, max]`.
fn round_cells(px: f64, pitch: f64, max: u32) -> u32 {
    if !(pitch.is_finite() && pitch > 0.0 && px.is_finite()) {
        return 0;
    }
    let cells = (px / pitch).round();
    if cells <= 0.0 {
        0
    } else if cells >= f64::from(max) {
        max
    } else {
        // In range, so the cast is exact.
        cells as u32
    }
}

/// Snap a drag pointer to the nearest grid origin.
///
/// `px`/`py` are the top-left of the dragged widget relative to the grid
/// container (pointer minus the grab offset). `x` is clamped so the widget
/// stays inside the grid; `y` to be non-negative and to keep `y + item_h`
/// addressable. Returns the origin when the column width is not usable.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn snap_to_grid(
    px: f64,
    py: f64,
    col_width: f64,
    row_height: f64,
    gap: f64,
    item_w: u32,
    item_h: u32,
    columns: u32,
) -> GridPoint {
    if !(col_width.is_finite() && col_width > 0.0) {
        return GridPoint::new(0, 0);
    }
    let max_x = columns.saturating_sub(item_w);
    let x = round_cells(px, col_width + gap, max_x);
    let y = round_cells(py, row_height + gap, u32::MAX - item_h);
    GridPoint::new(x, y)
}

/// Snap a resize pointer offset to a span anchored at the item's top-left.
///
/// `offset_x`/`offset_y` are pixels from the widget's top-left corner to the
/// pointer. Width is clamped to `[min_w, min(max_w, columns - origin_x)]`,
/// height to `[min_h, max_h]`.
#[must_use]
pub fn snap_to_size(
    offset_x: f64,
    offset_y: f64,
    col_width: f64,
    row_height: f64,
    origin_x: u32,
    constraints: &SizeConstraints,
    columns: u32,
) -> GridSpan {
    let raw_w = round_cells(offset_x, col_width, columns);
    let raw_h = round_cells(offset_y, row_height, u32::MAX);
    GridSpan::new(
        constraints.clamp_width(raw_w, origin_x, columns),
        constraints.clamp_height(raw_h),
    )
}

/// Cap a proposed span at the nearest neighbors to the right and below.
///
/// A neighbor counts as "right" when it starts at or past the item's current
/// right edge and shares a row with the proposed height; "below" when it
/// starts at or past the current bottom edge and shares a column with the
/// (already capped) proposed width.
#[must_use]
pub fn clamp_to_neighbors(item: &LayoutItem, w: u32, h: u32, layout: &[LayoutItem]) -> GridSpan {
    let mut w = w;
    let mut h = h;
    let right_edge = item.x.saturating_add(item.w);
    let bottom_edge = item.y.saturating_add(item.h);

    for other in layout.iter().filter(|other| other.id != item.id) {
        if other.x >= right_edge
            && other.y < item.y.saturating_add(h)
            && other.bottom() > item.y
        {
            let allowed = other.x - item.x;
            if allowed > 0 {
                w = w.min(allowed);
            }
        }
        if other.y >= bottom_edge
            && other.x < item.x.saturating_add(w)
            && other.x.saturating_add(other.w) > item.x
        {
            let allowed = other.y - item.y;
            if allowed > 0 {
                h = h.min(allowed);
            }
        }
    }
    GridSpan::new(w, h)
}
