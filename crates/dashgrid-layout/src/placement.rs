//! First-fit auto-placement.

use dashgrid_core::geometry::{GridPoint, GridRect};

use crate::collision::has_any_overlap;
use crate::item::LayoutItem;

/// Lowest row below every item (0 for an empty layout).
#[must_use]
pub fn layout_bottom(layout: &[LayoutItem]) -> u32 {
    layout.iter().map(LayoutItem::bottom).max().unwrap_or(0)
}

/// Find the first free top-left origin for a `w` x `h` box, row-major.
///
/// Equivalent to scanning rows `0..=bottom + 1` and, within each row, columns
/// `0..=columns - w`. The row at `bottom` is always empty, so a position is
/// found whenever the box fits the grid width at all. Returns `None` when
/// `w > columns` (or the span is empty); the scan also ends with `None` rather
/// than searching forever should the layout violate its own invariants.
///
/// The first free origin always lies on row 0 or some item's bottom edge, and
/// on column 0 or some item's right edge, so only those candidates are
/// tested. Cost depends on the item count, never on item area.
#[must_use]
pub fn find_first_available(
    layout: &[LayoutItem],
    w: u32,
    h: u32,
    columns: u32,
) -> Option<GridPoint> {
    if w == 0 || h == 0 || w > columns {
        return None;
    }

    let last_row = layout_bottom(layout).saturating_add(1);
    let last_col = columns - w;
    let rows = candidates(layout.iter().map(LayoutItem::bottom), last_row);
    let cols = candidates(layout.iter().map(|item| item.x.saturating_add(item.w)), last_col);

    for &y in &rows {
        if y.checked_add(h).is_none() {
            break;
        }
        for &x in &cols {
            if !has_any_overlap(&GridRect::new(x, y, w, h), layout) {
                return Some(GridPoint::new(x, y));
            }
        }
    }
    None
}

/// `0` plus every edge up to `max`, sorted and deduplicated.
fn candidates(edges: impl Iterator<Item = u32>, max: u32) -> Vec<u32> {
    let mut out: Vec<u32> = std::iter::once(0)
        .chain(edges.filter(|&edge| edge <= max))
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}
