//! Invariant diagnostics and one-time repair for untrusted layouts.
//!
//! A host may hand the engine any layout: overlapping, out of bounds, with
//! repeated ids. [`invariant_report`] lists what is wrong without touching the
//! items; [`reflow`] produces a committed layout (bounds, non-overlap and
//! unique ids all hold) plus the deterministic actions it took to get there.
//!
//! Repair rules, applied in input order so earlier items keep priority:
//! 1. a repeated id is dropped (first occurrence wins),
//! 2. a zero span is widened to one cell,
//! 3. an item wider than the grid is dropped,
//! 4. an item overflowing the right edge is shifted left,
//! 5. an item whose bottom edge overflows the row range is shifted up,
//! 6. the item moves down past each earlier item it overlaps until it clears
//!    everything placed so far; if it would run out of rows it is dropped.

use std::fmt;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::item::{ItemId, LayoutItem};

/// Stable code for invariant findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutIssueCode {
    DuplicateId,
    ZeroSpan,
    TooWide,
    OutOfBounds,
    Overlap,
}

impl LayoutIssueCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateId => "duplicate_id",
            Self::ZeroSpan => "zero_span",
            Self::TooWide => "too_wide",
            Self::OutOfBounds => "out_of_bounds",
            Self::Overlap => "overlap",
        }
    }
}

impl fmt::Display for LayoutIssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invariant finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutIssue {
    pub code: LayoutIssueCode,
    pub item: ItemId,
    pub related: Option<ItemId>,
    pub message: String,
}

/// Structured invariant report over a layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutInvariantReport {
    pub issues: Vec<LayoutIssue>,
}

impl LayoutInvariantReport {
    /// True when the layout may be committed as-is.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Whether any finding carries `code`.
    #[must_use]
    pub fn has(&self, code: LayoutIssueCode) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }

    /// Distinct codes present, sorted.
    #[must_use]
    pub fn codes(&self) -> Vec<LayoutIssueCode> {
        let mut codes: Vec<_> = self.issues.iter().map(|issue| issue.code).collect();
        codes.sort_unstable();
        codes.dedup();
        codes
    }
}

/// Inspect a layout against the bounds, non-overlap and identity invariants.
#[must_use]
pub fn invariant_report(layout: &[LayoutItem], columns: u32) -> LayoutInvariantReport {
    let mut issues = Vec::new();
    let mut seen = FxHashSet::default();

    for (index, item) in layout.iter().enumerate() {
        if !seen.insert(&item.id) {
            issues.push(LayoutIssue {
                code: LayoutIssueCode::DuplicateId,
                item: item.id.clone(),
                related: None,
                message: format!("id '{}' appears more than once", item.id),
            });
        }
        if item.w == 0 || item.h == 0 {
            issues.push(LayoutIssue {
                code: LayoutIssueCode::ZeroSpan,
                item: item.id.clone(),
                related: None,
                message: format!("span {}x{} covers no cells", item.w, item.h),
            });
        } else if item.w > columns {
            issues.push(LayoutIssue {
                code: LayoutIssueCode::TooWide,
                item: item.id.clone(),
                related: None,
                message: format!("width {} exceeds {columns} columns", item.w),
            });
        } else if !item.rect().fits_rows() {
            issues.push(LayoutIssue {
                code: LayoutIssueCode::OutOfBounds,
                item: item.id.clone(),
                related: None,
                message: format!("y {} + h {} overflows the row range", item.y, item.h),
            });
        } else if !item.in_bounds(columns) {
            issues.push(LayoutIssue {
                code: LayoutIssueCode::OutOfBounds,
                item: item.id.clone(),
                related: None,
                message: format!("x {} + w {} exceeds {columns} columns", item.x, item.w),
            });
        }

        for other in &layout[index + 1..] {
            if item.rect().overlaps(&other.rect()) {
                issues.push(LayoutIssue {
                    code: LayoutIssueCode::Overlap,
                    item: item.id.clone(),
                    related: Some(other.id.clone()),
                    message: format!("'{}' overlaps '{}'", item.id, other.id),
                });
            }
        }
    }

    LayoutInvariantReport { issues }
}

/// Why reflow discarded an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    DuplicateId,
    TooWide,
    /// No row range below the earlier items could hold it.
    NoRoom,
}

/// One deterministic repair step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReflowAction {
    Dropped {
        id: ItemId,
        reason: DropReason,
    },
    ClampedSpan {
        id: ItemId,
        before_w: u32,
        before_h: u32,
        after_w: u32,
        after_h: u32,
    },
    ShiftedLeft {
        id: ItemId,
        before_x: u32,
        after_x: u32,
    },
    ShiftedUp {
        id: ItemId,
        before_y: u32,
        after_y: u32,
    },
    PushedDown {
        id: ItemId,
        before_y: u32,
        after_y: u32,
    },
}

/// Result of a reflow: the committed layout and what changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflowOutcome {
    pub layout: Vec<LayoutItem>,
    pub actions: Vec<ReflowAction>,
}

impl ReflowOutcome {
    /// Whether the input already satisfied every invariant.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.actions.is_empty()
    }

    /// Ids that did not survive.
    pub fn dropped(&self) -> impl Iterator<Item = &ItemId> {
        self.actions.iter().filter_map(|action| match action {
            ReflowAction::Dropped { id, .. } => Some(id),
            _ => None,
        })
    }
}

/// Repair an untrusted layout into one that satisfies every invariant.
///
/// Input order is priority: an item never moves to make room for a later one.
#[must_use]
pub fn reflow(items: Vec<LayoutItem>, columns: u32) -> ReflowOutcome {
    let columns = columns.max(1);
    let mut layout: Vec<LayoutItem> = Vec::with_capacity(items.len());
    let mut actions = Vec::new();
    let mut seen = FxHashSet::default();

    for mut item in items {
        if seen.contains(&item.id) {
            tracing::warn!(
                target: "dashgrid.store",
                id = %item.id,
                "dropping initial item with duplicate id"
            );
            actions.push(ReflowAction::Dropped {
                id: item.id,
                reason: DropReason::DuplicateId,
            });
            continue;
        }

        if item.w == 0 || item.h == 0 {
            let (before_w, before_h) = (item.w, item.h);
            item.w = item.w.max(1);
            item.h = item.h.max(1);
            actions.push(ReflowAction::ClampedSpan {
                id: item.id.clone(),
                before_w,
                before_h,
                after_w: item.w,
                after_h: item.h,
            });
        }

        if item.w > columns {
            tracing::warn!(
                target: "dashgrid.store",
                id = %item.id,
                w = item.w,
                columns,
                "dropping initial item wider than the grid"
            );
            actions.push(ReflowAction::Dropped {
                id: item.id,
                reason: DropReason::TooWide,
            });
            continue;
        }

        if !item.x.checked_add(item.w).is_some_and(|right| right <= columns) {
            let before_x = item.x;
            item.x = columns - item.w;
            actions.push(ReflowAction::ShiftedLeft {
                id: item.id.clone(),
                before_x,
                after_x: item.x,
            });
        }

        if !item.rect().fits_rows() {
            let before_y = item.y;
            item.y = u32::MAX - item.h;
            actions.push(ReflowAction::ShiftedUp {
                id: item.id.clone(),
                before_y,
                after_y: item.y,
            });
        }

        let before_y = item.y;
        let mut fits = true;
        while let Some(blocker) = layout
            .iter()
            .find(|placed| placed.rect().overlaps(&item.rect()))
        {
            match blocker.bottom().checked_add(item.h) {
                Some(_) => item.y = blocker.bottom(),
                None => {
                    fits = false;
                    break;
                }
            }
        }
        if !fits {
            tracing::warn!(
                target: "dashgrid.store",
                id = %item.id,
                "dropping initial item with no rows left below earlier items"
            );
            actions.push(ReflowAction::Dropped {
                id: item.id,
                reason: DropReason::NoRoom,
            });
            continue;
        }
        if item.y != before_y {
            actions.push(ReflowAction::PushedDown {
                id: item.id.clone(),
                before_y,
                after_y: item.y,
            });
        }

        seen.insert(item.id.clone());
        layout.push(item);
    }

    if !actions.is_empty() {
        tracing::debug!(
            target: "dashgrid.store",
            actions = actions.len(),
            kept = layout.len(),
            "reflowed initial layout"
        );
    }

    ReflowOutcome { layout, actions }
}
