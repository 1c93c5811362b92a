#![forbid(unsafe_code)]

//! Layout algorithms for fixed-column dashboards.
//!
//! Everything here is pure and synchronous: collision queries, first-fit
//! placement, cascading push-down, pointer snapping, and the one-time reflow
//! that repairs an untrusted initial layout. [`LayoutStore`] wraps them into
//! the mutation API the interactive engine drives.
//!
//! # Invariants
//! A committed layout always satisfies:
//! - every item lies inside the grid (`x + w <= columns`, positive span),
//! - no two items share a cell,
//! - ids are unique.

pub mod collision;
pub mod item;
pub mod placement;
pub mod push_down;
pub mod reflow;
pub mod snap;
pub mod store;

pub use dashgrid_core::geometry::{GridPoint, GridRect, GridSpan};

pub use collision::{OccupancyMap, colliding_ids, has_any_overlap, overlaps};
pub use item::{ItemId, ItemLimits, LayoutItem, SizeConstraints};
pub use placement::{find_first_available, layout_bottom};
pub use push_down::{DEFAULT_MAX_PUSH_DEPTH, PushDownError, PushDownOutcome, push_down};
pub use reflow::{
    DropReason, LayoutInvariantReport, LayoutIssue, LayoutIssueCode, ReflowAction, ReflowOutcome,
    invariant_report, reflow,
};
pub use snap::{clamp_to_neighbors, snap_to_grid, snap_to_size};
pub use store::{ConflictPolicy, LayoutStore, ResizeOutcome, ResizePlan, StoreError};
