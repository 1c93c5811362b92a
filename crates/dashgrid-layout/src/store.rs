//! The layout store: sole owner of committed items.
//!
//! Every mutation either leaves the layout satisfying bounds, non-overlap and
//! unique ids, or fails with a [`StoreError`] and leaves it untouched. Each
//! mutating operation comes in two halves: a `plan_*` that computes the
//! result without committing (used for ghost previews) and the committing
//! call itself, which re-plans against current state before applying.

use std::fmt;

use dashgrid_core::geometry::{GridRect, GridSpan};
use serde::{Deserialize, Serialize};

use crate::collision::{OccupancyMap, colliding_ids};
use crate::item::{ItemId, ItemLimits, LayoutItem};
use crate::placement::{find_first_available, layout_bottom};
use crate::push_down::{DEFAULT_MAX_PUSH_DEPTH, PushDownError, push_down};
use crate::reflow::{ReflowOutcome, reflow};
use crate::snap::clamp_to_neighbors;

/// How a resize that would overlap a neighbor is settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Displace overlapped neighbors downward, cascading.
    #[default]
    PushDown,
    /// Shrink the proposed span so it stops at the nearest neighbors.
    ClampToNeighbors,
    /// Refuse any overlapping span.
    RejectOverlap,
}

impl ConflictPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PushDown => "push_down",
            Self::ClampToNeighbors => "clamp_to_neighbors",
            Self::RejectOverlap => "reject_overlap",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a store operation was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    UnknownItem(ItemId),
    /// The footprint leaves the grid or covers no cells.
    OutOfBounds { id: ItemId, rect: GridRect, columns: u32 },
    /// The footprint overlaps committed items.
    Collision { id: ItemId, with: Vec<ItemId> },
    /// The span is wider than the grid, so no origin can hold it.
    TooWide { w: u32, columns: u32 },
    NotResizable(ItemId),
    PushDown(PushDownError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownItem(id) => write!(f, "no item with id '{id}'"),
            Self::OutOfBounds { id, rect, columns } => write!(
                f,
                "item '{id}' at ({}, {}) span {}x{} does not fit a {columns}-column grid",
                rect.x, rect.y, rect.w, rect.h
            ),
            Self::Collision { id, with } => {
                write!(f, "item '{id}' would overlap")?;
                for (i, other) in with.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{sep}'{other}'")?;
                }
                Ok(())
            }
            Self::TooWide { w, columns } => {
                write!(f, "width {w} does not fit a {columns}-column grid")
            }
            Self::NotResizable(id) => write!(f, "item '{id}' is not resizable"),
            Self::PushDown(err) => write!(f, "push-down failed: {err}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PushDown(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PushDownError> for StoreError {
    fn from(err: PushDownError) -> Self {
        Self::PushDown(err)
    }
}

/// A resize computed against current state but not yet committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizePlan {
    pub id: ItemId,
    /// Final footprint of the resized item (the span may be smaller than
    /// requested under [`ConflictPolicy::ClampToNeighbors`]).
    pub rect: GridRect,
    /// Neighbors that the resize moves.
    pub displaced: Vec<ItemId>,
    layout: Vec<LayoutItem>,
}

/// What a committed resize did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeOutcome {
    pub rect: GridRect,
    pub displaced: Vec<ItemId>,
}

/// Owner of the committed layout.
#[derive(Debug, Clone)]
pub struct LayoutStore {
    columns: u32,
    items: Vec<LayoutItem>,
    next_id: u64,
    max_push_depth: u32,
}

impl LayoutStore {
    /// Empty store for a grid of `columns` columns (at least one).
    #[must_use]
    pub fn new(columns: u32) -> Self {
        Self {
            columns: columns.max(1),
            items: Vec::new(),
            next_id: 1,
            max_push_depth: DEFAULT_MAX_PUSH_DEPTH,
        }
    }

    /// Store seeded from an untrusted layout, repaired by [`reflow`].
    #[must_use]
    pub fn from_initial(columns: u32, items: Vec<LayoutItem>) -> (Self, ReflowOutcome) {
        let mut store = Self::new(columns);
        let outcome = reflow(items, store.columns);
        store.items = outcome.layout.clone();
        (store, outcome)
    }

    #[must_use]
    pub fn with_max_push_depth(mut self, max_push_depth: u32) -> Self {
        self.max_push_depth = max_push_depth;
        self
    }

    #[inline]
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    #[inline]
    #[must_use]
    pub const fn max_push_depth(&self) -> u32 {
        self.max_push_depth
    }

    /// Committed items in insertion order.
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[LayoutItem] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&LayoutItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.get(id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of rows the layout currently occupies.
    #[must_use]
    pub fn rows(&self) -> u32 {
        layout_bottom(&self.items)
    }

    /// Cell ownership of the committed layout.
    #[must_use]
    pub fn occupancy(&self, exclude: Option<&ItemId>) -> OccupancyMap {
        OccupancyMap::build(&self.items, exclude)
    }

    fn index_of(&self, id: &ItemId) -> Result<usize, StoreError> {
        self.items
            .iter()
            .position(|item| &item.id == id)
            .ok_or_else(|| StoreError::UnknownItem(id.clone()))
    }

    fn check_bounds(&self, id: &ItemId, rect: GridRect) -> Result<(), StoreError> {
        let fits = !rect.is_empty()
            && rect.fits_rows()
            && rect.x.checked_add(rect.w).is_some_and(|right| right <= self.columns);
        if fits {
            Ok(())
        } else {
            Err(StoreError::OutOfBounds {
                id: id.clone(),
                rect,
                columns: self.columns,
            })
        }
    }

    fn check_free(&self, id: &ItemId, rect: GridRect) -> Result<(), StoreError> {
        let with = colliding_ids(&self.items, &rect, Some(id));
        if with.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Collision {
                id: id.clone(),
                with,
            })
        }
    }

    /// Whether `id` could occupy `rect` without breaking bounds or overlap.
    #[must_use]
    pub fn can_place(&self, id: &ItemId, rect: GridRect) -> bool {
        self.check_bounds(id, rect).is_ok() && self.check_free(id, rect).is_ok()
    }

    /// Footprint `id` would have at `(x, y)`, if the move is legal.
    pub fn plan_move(&self, id: &ItemId, x: u32, y: u32) -> Result<GridRect, StoreError> {
        let index = self.index_of(id)?;
        let rect = self.items[index].rect().with_origin(x, y);
        self.check_bounds(id, rect)?;
        self.check_free(id, rect)?;
        Ok(rect)
    }

    /// Move an item to a new origin, keeping its span.
    pub fn move_item(&mut self, id: &ItemId, x: u32, y: u32) -> Result<GridRect, StoreError> {
        let rect = match self.plan_move(id, x, y) {
            Ok(rect) => rect,
            Err(err) => {
                tracing::debug!(target: "dashgrid.store", id = %id, x, y, error = %err, "move refused");
                return Err(err);
            }
        };
        let index = self.index_of(id)?;
        self.items[index].set_rect(rect);
        tracing::debug!(target: "dashgrid.store", id = %id, x, y, "item moved");
        Ok(rect)
    }

    /// Compute a resize to `w` x `h` at the item's unchanged origin.
    ///
    /// The requested span is clamped to the item's own constraints first.
    pub fn plan_resize(
        &self,
        id: &ItemId,
        w: u32,
        h: u32,
        policy: ConflictPolicy,
    ) -> Result<ResizePlan, StoreError> {
        let index = self.index_of(id)?;
        let item = &self.items[index];
        if !item.resizable {
            return Err(StoreError::NotResizable(id.clone()));
        }

        let constraints = item.constraints(self.columns);
        let span = GridSpan::new(
            constraints.clamp_width(w, item.x, self.columns),
            constraints.clamp_height(h),
        );
        let span = match policy {
            ConflictPolicy::ClampToNeighbors => clamp_to_neighbors(item, span.w, span.h, &self.items),
            ConflictPolicy::PushDown | ConflictPolicy::RejectOverlap => span,
        };
        let rect = item.rect().with_size(span.w, span.h);
        self.check_bounds(id, rect)?;

        match policy {
            ConflictPolicy::PushDown => {
                let mut layout = self.items.clone();
                layout[index].set_rect(rect);
                let outcome = push_down(&layout, id, self.max_push_depth)?;
                Ok(ResizePlan {
                    id: id.clone(),
                    rect,
                    displaced: outcome.displaced,
                    layout: outcome.layout,
                })
            }
            ConflictPolicy::ClampToNeighbors | ConflictPolicy::RejectOverlap => {
                self.check_free(id, rect)?;
                let mut layout = self.items.clone();
                layout[index].set_rect(rect);
                Ok(ResizePlan {
                    id: id.clone(),
                    rect,
                    displaced: Vec::new(),
                    layout,
                })
            }
        }
    }

    /// Resize an item under `policy`.
    pub fn resize_item(
        &mut self,
        id: &ItemId,
        w: u32,
        h: u32,
        policy: ConflictPolicy,
    ) -> Result<ResizeOutcome, StoreError> {
        let plan = match self.plan_resize(id, w, h, policy) {
            Ok(plan) => plan,
            Err(err) => {
                tracing::debug!(
                    target: "dashgrid.store",
                    id = %id,
                    w,
                    h,
                    policy = %policy,
                    error = %err,
                    "resize refused"
                );
                return Err(err);
            }
        };
        tracing::debug!(
            target: "dashgrid.store",
            id = %id,
            w = plan.rect.w,
            h = plan.rect.h,
            displaced = plan.displaced.len(),
            "item resized"
        );
        self.items = plan.layout;
        Ok(ResizeOutcome {
            rect: plan.rect,
            displaced: plan.displaced,
        })
    }

    /// Generate an id not present in the layout.
    fn next_free_id(&mut self) -> ItemId {
        loop {
            let candidate = ItemId::new(format!("w{}", self.next_id));
            self.next_id += 1;
            if !self.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Add a new item of `kind`, auto-placed at the first free origin.
    pub fn add(&mut self, kind: impl Into<String>, span: GridSpan) -> Result<ItemId, StoreError> {
        self.add_with_limits(kind, span, &ItemLimits::default())
    }

    /// Add a new item carrying optional size limits.
    pub fn add_with_limits(
        &mut self,
        kind: impl Into<String>,
        span: GridSpan,
        limits: &ItemLimits,
    ) -> Result<ItemId, StoreError> {
        let w = span.w.max(1);
        let h = span.h.max(1);
        let too_wide = StoreError::TooWide {
            w,
            columns: self.columns,
        };
        if w > self.columns {
            tracing::debug!(target: "dashgrid.store", w, columns = self.columns, "add refused: too wide");
            return Err(too_wide);
        }
        let Some(origin) = find_first_available(&self.items, w, h, self.columns) else {
            return Err(too_wide);
        };

        let id = self.next_free_id();
        let item = LayoutItem::new(id.clone(), kind, origin.x, origin.y, w, h).with_limits(limits);
        tracing::debug!(
            target: "dashgrid.store",
            id = %id,
            kind = %item.kind,
            x = origin.x,
            y = origin.y,
            w,
            h,
            "item added"
        );
        self.items.push(item);
        Ok(id)
    }

    /// Remove an item, returning it.
    pub fn remove(&mut self, id: &ItemId) -> Result<LayoutItem, StoreError> {
        let index = self.index_of(id)?;
        let item = self.items.remove(index);
        tracing::debug!(target: "dashgrid.store", id = %id, "item removed");
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflow::invariant_report;
    use dashgrid_core::geometry::GridPoint;

    fn item(id: &str, x: u32, y: u32, w: u32, h: u32) -> LayoutItem {
        LayoutItem::new(id, "t", x, y, w, h)
    }

    fn store(items: Vec<LayoutItem>) -> LayoutStore {
        let (store, outcome) = LayoutStore::from_initial(12, items);
        assert!(outcome.is_unchanged(), "fixture must already be valid");
        store
    }

    fn id(raw: &str) -> ItemId {
        ItemId::new(raw)
    }

    #[test]
    fn move_into_free_space_commits() {
        let mut s = store(vec![item("a", 0, 0, 2, 2), item("b", 4, 0, 2, 2)]);
        let rect = s.move_item(&id("a"), 6, 3).expect("free");
        assert_eq!(rect, GridRect::new(6, 3, 2, 2));
        assert_eq!(s.get(&id("a")).map(LayoutItem::rect), Some(rect));
    }

    #[test]
    fn move_onto_neighbor_is_refused_without_change() {
        let mut s = store(vec![item("a", 0, 0, 2, 2), item("b", 4, 0, 2, 2)]);
        let before = s.items().to_vec();
        let err = s.move_item(&id("a"), 4, 0).expect_err("collides");
        assert_eq!(
            err,
            StoreError::Collision {
                id: id("a"),
                with: vec![id("b")]
            }
        );
        assert_eq!(s.items(), before.as_slice());
    }

    #[test]
    fn move_past_right_edge_is_out_of_bounds() {
        let mut s = store(vec![item("a", 0, 0, 3, 1)]);
        assert!(matches!(
            s.move_item(&id("a"), 10, 0),
            Err(StoreError::OutOfBounds { columns: 12, .. })
        ));
        assert!(s.can_place(&id("a"), GridRect::new(9, 0, 3, 1)));
        assert!(!s.can_place(&id("a"), GridRect::new(0, 0, 0, 1)));
    }

    #[test]
    fn move_past_last_row_is_out_of_bounds() {
        let mut s = store(vec![item("a", 0, 0, 2, 2), item("b", 4, 0, 2, 2)]);
        assert!(matches!(
            s.move_item(&id("a"), 0, u32::MAX),
            Err(StoreError::OutOfBounds { .. })
        ));
        let last = u32::MAX - 2;
        s.move_item(&id("a"), 0, last).expect("bottom edge is addressable");
        let err = s.move_item(&id("b"), 0, last).expect_err("same cells");
        assert!(matches!(err, StoreError::Collision { .. }));
        assert!(invariant_report(s.items(), 12).is_clean());
    }

    #[test]
    fn resize_past_last_row_is_out_of_bounds() {
        let mut s = store(vec![item("a", 0, u32::MAX - 2, 2, 2)]);
        assert!(matches!(
            s.resize_item(&id("a"), 2, 3, ConflictPolicy::RejectOverlap),
            Err(StoreError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn very_tall_item_keeps_add_and_startup_cheap() {
        let (mut s, outcome) = LayoutStore::from_initial(
            12,
            vec![item("tower", 0, 0, 12, 2_000_000), item("b", 0, 0, 4, 1)],
        );
        assert_eq!(s.get(&id("b")).map(LayoutItem::origin), Some(GridPoint::new(0, 2_000_000)));
        assert_eq!(outcome.actions.len(), 1);
        let added = s.add("note", GridSpan::new(4, 1)).expect("fits");
        assert_eq!(s.get(&added).map(LayoutItem::origin), Some(GridPoint::new(4, 2_000_000)));
    }

    #[test]
    fn moving_onto_own_footprint_is_allowed() {
        let mut s = store(vec![item("a", 0, 0, 4, 2)]);
        assert!(s.move_item(&id("a"), 1, 1).is_ok());
    }

    #[test]
    fn unknown_ids_are_reported() {
        let mut s = LayoutStore::new(12);
        assert_eq!(s.move_item(&id("x"), 0, 0), Err(StoreError::UnknownItem(id("x"))));
        assert!(matches!(s.remove(&id("x")), Err(StoreError::UnknownItem(_))));
    }

    #[test]
    fn push_down_resize_displaces_lower_neighbor() {
        let mut s = store(vec![item("a", 0, 0, 2, 1), item("b", 0, 2, 2, 2)]);
        let outcome = s
            .resize_item(&id("a"), 2, 4, ConflictPolicy::PushDown)
            .expect("push-down resolves");
        assert_eq!(outcome.rect, GridRect::new(0, 0, 2, 4));
        assert_eq!(outcome.displaced, vec![id("b")]);
        assert!(s.get(&id("b")).expect("b").y >= 4);
        assert!(invariant_report(s.items(), 12).is_clean());
    }

    #[test]
    fn reject_policy_refuses_overlap() {
        let mut s = store(vec![item("a", 0, 0, 2, 1), item("b", 0, 2, 2, 2)]);
        let err = s
            .resize_item(&id("a"), 2, 4, ConflictPolicy::RejectOverlap)
            .expect_err("overlaps b");
        assert!(matches!(err, StoreError::Collision { .. }));
        assert_eq!(s.get(&id("a")).expect("a").h, 1);
        s.resize_item(&id("a"), 2, 2, ConflictPolicy::RejectOverlap)
            .expect("fits above b");
    }

    #[test]
    fn clamp_policy_stops_at_neighbor() {
        let mut s = store(vec![item("a", 0, 0, 2, 1), item("b", 0, 2, 2, 2), item("c", 5, 0, 1, 1)]);
        let outcome = s
            .resize_item(&id("a"), 8, 4, ConflictPolicy::ClampToNeighbors)
            .expect("clamped");
        assert_eq!(outcome.rect, GridRect::new(0, 0, 5, 2));
        assert!(outcome.displaced.is_empty());
    }

    #[test]
    fn resize_respects_item_constraints() {
        let mut s = store(vec![item("a", 0, 0, 2, 2).with_min_size(2, 2).with_max_size(Some(4), Some(3))]);
        let outcome = s
            .resize_item(&id("a"), 1, 9, ConflictPolicy::PushDown)
            .expect("clamped");
        assert_eq!(outcome.rect, GridRect::new(0, 0, 2, 3));
    }

    #[test]
    fn fixed_items_cannot_resize() {
        let mut s = store(vec![item("a", 0, 0, 2, 2).with_resizable(false)]);
        assert_eq!(
            s.resize_item(&id("a"), 3, 3, ConflictPolicy::PushDown),
            Err(StoreError::NotResizable(id("a")))
        );
    }

    #[test]
    fn failed_push_down_keeps_layout() {
        let column: Vec<_> = (0..6).map(|i| item(&format!("i{i}"), 0, i, 1, 1)).collect();
        let mut s = store(column).with_max_push_depth(2);
        let before = s.items().to_vec();
        let err = s
            .resize_item(&id("i0"), 1, 2, ConflictPolicy::PushDown)
            .expect_err("too deep");
        assert!(matches!(err, StoreError::PushDown(PushDownError::DepthExceeded { .. })));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(s.items(), before.as_slice());
    }

    #[test]
    fn add_places_first_fit_with_fresh_ids() {
        let mut s = store(vec![item("a", 0, 0, 4, 2)]);
        let first = s.add("chart", GridSpan::new(2, 2)).expect("fits");
        assert_eq!(first, id("w1"));
        assert_eq!(s.get(&first).map(LayoutItem::origin), Some(dashgrid_core::GridPoint::new(4, 0)));
        assert_eq!(s.get(&first).map(|i| i.kind.as_str()), Some("chart"));
        let second = s.add("chart", GridSpan::new(2, 2)).expect("fits");
        assert_eq!(second, id("w2"));
    }

    #[test]
    fn generated_ids_skip_existing_and_are_not_reused() {
        let mut s = store(vec![item("w1", 0, 0, 1, 1)]);
        let added = s.add("k", GridSpan::new(1, 1)).expect("fits");
        assert_eq!(added, id("w2"));
        s.remove(&added).expect("present");
        assert_eq!(s.add("k", GridSpan::new(1, 1)).expect("fits"), id("w3"));
    }

    #[test]
    fn too_wide_add_fails_without_mutation() {
        let mut s = store(vec![item("a", 0, 0, 1, 1)]);
        assert_eq!(
            s.add("k", GridSpan::new(13, 1)),
            Err(StoreError::TooWide { w: 13, columns: 12 })
        );
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn add_with_limits_copies_them() {
        let mut s = LayoutStore::new(12);
        let limits = ItemLimits::default().min(2, 2).fixed_size();
        let added = s.add_with_limits("k", GridSpan::new(3, 2), &limits).expect("fits");
        let placed = s.get(&added).expect("present");
        assert_eq!(placed.min_w, Some(2));
        assert!(!placed.resizable);
    }

    #[test]
    fn remove_preserves_order_of_the_rest() {
        let mut s = store(vec![item("a", 0, 0, 1, 1), item("b", 1, 0, 1, 1), item("c", 2, 0, 1, 1)]);
        let removed = s.remove(&id("b")).expect("present");
        assert_eq!(removed.id, id("b"));
        let ids: Vec<_> = s.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn error_messages_name_the_items() {
        let err = StoreError::Collision {
            id: id("a"),
            with: vec![id("b"), id("c")],
        };
        assert_eq!(err.to_string(), "item 'a' would overlap 'b', 'c'");
        assert_eq!(
            StoreError::TooWide { w: 13, columns: 12 }.to_string(),
            "width 13 does not fit a 12-column grid"
        );
    }
}
