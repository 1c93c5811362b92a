//! Collision algebra over grid cells.
//!
//! Two flavors of query are offered: the pairwise [`overlaps`] test, which
//! needs no setup and costs O(items), and the [`OccupancyMap`], which indexes
//! every occupied cell once for point lookups. Building the map costs the
//! total item area, so placement and repair use the pairwise form.

use dashgrid_core::geometry::GridRect;
use rustc_hash::FxHashMap;

use crate::item::{ItemId, LayoutItem};

/// Whether two items share at least one cell. Touching edges do not count.
#[inline]
#[must_use]
pub fn overlaps(a: &LayoutItem, b: &LayoutItem) -> bool {
    a.rect().overlaps(&b.rect())
}

/// Whether `candidate` overlaps any of `others`.
///
/// The candidate's own prior state must already be excluded by the caller.
#[must_use]
pub fn has_any_overlap<'a>(
    candidate: &GridRect,
    others: impl IntoIterator<Item = &'a LayoutItem>,
) -> bool {
    others
        .into_iter()
        .any(|other| candidate.overlaps(&other.rect()))
}

/// Ids of every item (other than `exclude`) whose footprint intersects `candidate`.
#[must_use]
pub fn colliding_ids(
    layout: &[LayoutItem],
    candidate: &GridRect,
    exclude: Option<&ItemId>,
) -> Vec<ItemId> {
    layout
        .iter()
        .filter(|item| Some(&item.id) != exclude)
        .filter(|item| candidate.overlaps(&item.rect()))
        .map(|item| item.id.clone())
        .collect()
}

/// Cell -> owner index for a layout.
#[derive(Debug, Clone, Default)]
pub struct OccupancyMap {
    owners: Vec<ItemId>,
    cells: FxHashMap<(u32, u32), usize>,
}

impl OccupancyMap {
    /// Empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every cell of `layout`, skipping the item `exclude`.
    ///
    /// If two items claim the same cell the later one in layout order wins;
    /// committed layouts never do that.
    #[must_use]
    pub fn build(layout: &[LayoutItem], exclude: Option<&ItemId>) -> Self {
        let mut map = Self::new();
        for item in layout.iter().filter(|item| Some(&item.id) != exclude) {
            map.insert(&item.rect(), &item.id);
        }
        map
    }

    /// Mark every cell of `rect` as owned by `owner`.
    pub fn insert(&mut self, rect: &GridRect, owner: &ItemId) {
        let index = self.owners.len();
        self.owners.push(owner.clone());
        for cell in rect.cells() {
            self.cells.insert(cell, index);
        }
    }

    /// Owner of a single cell.
    #[must_use]
    pub fn owner(&self, col: u32, row: u32) -> Option<&ItemId> {
        self.cells.get(&(col, row)).map(|&index| &self.owners[index])
    }

    /// True iff no cell of `rect` belongs to an item other than `exclude`.
    #[must_use]
    pub fn is_area_free(&self, rect: &GridRect, exclude: Option<&ItemId>) -> bool {
        rect.cells().all(|cell| match self.cells.get(&cell) {
            None => true,
            Some(&index) => Some(&self.owners[index]) == exclude,
        })
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Occupied cells in row-major order, for diagnostics.
    #[must_use]
    pub fn sorted_cells(&self) -> Vec<((u32, u32), &ItemId)> {
        let mut cells: Vec<_> = self
            .cells
            .iter()
            .map(|(cell, &index)| (*cell, &self.owners[index]))
            .collect();
        cells.sort_by_key(|((col, row), _)| (*row, *col));
        cells
    }
}
