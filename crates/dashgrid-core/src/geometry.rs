#![forbid(unsafe_code)]

//! Grid and pixel geometry.
//!
//! Grid boxes are measured in whole cells (origin at the top-left, rows grow
//! downward without bound). Pixel rectangles are what a host paints; they are
//! derived from a grid box plus the column width, row height, and gap.

use serde::{Deserialize, Serialize};

/// A box on the grid, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridRect {
    /// Left column (inclusive).
    pub x: u32,
    /// Top row (inclusive).
    pub y: u32,
    /// Column span.
    pub w: u32,
    /// Row span.
    pub h: u32,
}

impl GridRect {
    /// Create a new grid box.
    #[inline]
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }

    /// Bottom edge (exclusive). Saturates; only meaningful when
    /// [`fits_rows`](Self::fits_rows) holds.
    #[inline]
    pub const fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    /// Whether `y + h` is addressable, i.e. the bottom edge does not saturate.
    #[inline]
    pub const fn fits_rows(&self) -> bool {
        self.y.checked_add(self.h).is_some()
    }

    /// Area in cells.
    #[inline]
    pub const fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    /// Check if the box covers no cells.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Check if a cell lies inside the box.
    #[inline]
    pub const fn contains(&self, col: u32, row: u32) -> bool {
        col >= self.x && col < self.right() && row >= self.y && row < self.bottom()
    }

    /// Check whether two boxes share at least one cell.
    ///
    /// Boxes that only touch along an edge do not overlap.
    #[inline]
    pub const fn overlaps(&self, other: &GridRect) -> bool {
        !(self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y)
    }

    /// Same box moved to a new origin.
    #[inline]
    #[must_use]
    pub const fn with_origin(self, x: u32, y: u32) -> Self {
        Self { x, y, ..self }
    }

    /// Same origin with a new span.
    #[inline]
    #[must_use]
    pub const fn with_size(self, w: u32, h: u32) -> Self {
        Self { w, h, ..self }
    }

    /// Origin of the box.
    #[inline]
    pub const fn origin(&self) -> GridPoint {
        GridPoint::new(self.x, self.y)
    }

    /// Span of the box.
    #[inline]
    pub const fn span(&self) -> GridSpan {
        GridSpan::new(self.w, self.h)
    }

    /// Iterate every `(col, row)` cell covered by the box, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.bottom()).flat_map(move |row| (self.x..self.right()).map(move |col| (col, row)))
    }
}

/// A grid-cell origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: u32,
    pub y: u32,
}

impl GridPoint {
    #[inline]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A span in whole cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSpan {
    pub w: u32,
    pub h: u32,
}

impl GridSpan {
    #[inline]
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }
}

/// An absolute rectangle in pixels, relative to the grid container.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Convert a grid box to its pixel rectangle.
///
/// Gaps sit between cells only, so a span of `w` columns covers `w - 1` gaps.
#[must_use]
pub fn to_pixel_rect(
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    col_width: f64,
    row_height: f64,
    gap: f64,
) -> PixelRect {
    let span = |cells: u32, size: f64| {
        if cells == 0 {
            0.0
        } else {
            f64::from(cells) * size + f64::from(cells - 1) * gap
        }
    };
    PixelRect {
        left: f64::from(x) * (col_width + gap),
        top: f64::from(y) * (row_height + gap),
        width: span(w, col_width),
        height: span(h, row_height),
    }
}

/// Width of one column for a measured container.
///
/// Returns `None` while the container has not been measured (width 0) or is
/// too narrow to hold the gaps; callers must treat that as "no geometry".
#[must_use]
pub fn col_width(columns: u32, gap: f64, container_px_width: f64) -> Option<f64> {
    if columns == 0 || !container_px_width.is_finite() || container_px_width <= 0.0 {
        return None;
    }
    let width = (container_px_width - f64::from(columns - 1) * gap) / f64::from(columns);
    (width.is_finite() && width > 0.0).then_some(width)
}

/// Pixel height of a container tall enough to hold `rows` rows (minimum one).
#[must_use]
pub fn container_height(rows: u32, row_height: f64, gap: f64) -> f64 {
    let rows = rows.max(1);
    f64::from(rows) * row_height + f64::from(rows - 1) * gap
}

/// Pixel mapping for one grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridMetrics {
    pub columns: u32,
    pub row_height: f64,
    pub gap: f64,
}

impl GridMetrics {
    /// Create metrics for a grid.
    #[must_use]
    pub const fn new(columns: u32, row_height: f64, gap: f64) -> Self {
        Self {
            columns,
            row_height,
            gap,
        }
    }

    /// Bind the metrics to a measured container width.
    ///
    /// `None` when the width is not usable yet.
    #[must_use]
    pub fn measure(&self, container_px_width: f64) -> Option<MeasuredGrid> {
        col_width(self.columns, self.gap, container_px_width).map(|col_width| MeasuredGrid {
            metrics: *self,
            col_width,
        })
    }
}

/// Grid metrics with a known column width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasuredGrid {
    pub metrics: GridMetrics,
    pub col_width: f64,
}

impl MeasuredGrid {
    /// Pixel rectangle of a grid box.
    #[must_use]
    pub fn rect(&self, rect: GridRect) -> PixelRect {
        to_pixel_rect(
            rect.x,
            rect.y,
            rect.w,
            rect.h,
            self.col_width,
            self.metrics.row_height,
            self.metrics.gap,
        )
    }

    /// Horizontal pitch of one column including its gap.
    #[inline]
    #[must_use]
    pub fn col_pitch(&self) -> f64 {
        self.col_width + self.metrics.gap
    }

    /// Vertical pitch of one row including its gap.
    #[inline]
    #[must_use]
    pub fn row_pitch(&self) -> f64 {
        self.metrics.row_height + self.metrics.gap
    }
}
