//! Cascading push-down conflict resolution.
//!
//! After an item grows, every neighbor it now overlaps is moved straight down
//! by the minimum offset that clears it, and each moved neighbor becomes the
//! anchor for the next level of the cascade. The cascade is bounded: once it
//! recurses past `max_depth` the whole resolution fails and the caller keeps
//! its original layout.

use std::fmt;

use crate::item::{ItemId, LayoutItem};

/// Default cascade depth limit.
pub const DEFAULT_MAX_PUSH_DEPTH: u32 = 10;

/// Why a push-down could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushDownError {
    /// The anchor id is not in the layout.
    AnchorNotFound(ItemId),
    /// The cascade recursed deeper than allowed.
    DepthExceeded { anchor: ItemId, max_depth: u32 },
    /// A displaced item would end past the last addressable row.
    RowOverflow { anchor: ItemId, item: ItemId },
}

impl fmt::Display for PushDownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnchorNotFound(id) => write!(f, "push-down anchor '{id}' is not in the layout"),
            Self::DepthExceeded { anchor, max_depth } => write!(
                f,
                "push-down from '{anchor}' cascades deeper than {max_depth} levels"
            ),
            Self::RowOverflow { anchor, item } => write!(
                f,
                "push-down from '{anchor}' would move '{item}' past the last row"
            ),
        }
    }
}

impl std::error::Error for PushDownError {}

/// Resolved layout plus the ids that moved, in the order they were first pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushDownOutcome {
    pub layout: Vec<LayoutItem>,
    pub displaced: Vec<ItemId>,
}

impl PushDownOutcome {
    /// Whether anything had to move.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.displaced.is_empty()
    }
}

/// Push every item the anchor overlaps downward, cascading.
///
/// The anchor must already carry its new footprint. On success the returned
/// layout keeps the input order; on failure the input is untouched.
pub fn push_down(
    layout: &[LayoutItem],
    anchor: &ItemId,
    max_depth: u32,
) -> Result<PushDownOutcome, PushDownError> {
    let anchor_index = layout
        .iter()
        .position(|item| &item.id == anchor)
        .ok_or_else(|| PushDownError::AnchorNotFound(anchor.clone()))?;

    let mut cascade = Cascade {
        items: layout.to_vec(),
        displaced: Vec::new(),
        max_depth,
    };
    match cascade.push_from(anchor_index, 0) {
        Ok(()) => {}
        Err(CascadeFailure::DepthLimit) => {
            tracing::debug!(
                target: "dashgrid.store",
                anchor = %anchor,
                max_depth,
                "push-down exceeded depth limit"
            );
            return Err(PushDownError::DepthExceeded {
                anchor: anchor.clone(),
                max_depth,
            });
        }
        Err(CascadeFailure::RowOverflow(item)) => {
            tracing::debug!(
                target: "dashgrid.store",
                anchor = %anchor,
                item = %item,
                "push-down ran out of rows"
            );
            return Err(PushDownError::RowOverflow {
                anchor: anchor.clone(),
                item,
            });
        }
    }

    Ok(PushDownOutcome {
        layout: cascade.items,
        displaced: cascade.displaced,
    })
}

enum CascadeFailure {
    DepthLimit,
    RowOverflow(ItemId),
}

struct Cascade {
    items: Vec<LayoutItem>,
    displaced: Vec<ItemId>,
    max_depth: u32,
}

impl Cascade {
    fn push_from(&mut self, anchor_index: usize, depth: u32) -> Result<(), CascadeFailure> {
        if depth > self.max_depth {
            return Err(CascadeFailure::DepthLimit);
        }
        // The anchor's footprint is fixed for this level; nested levels only
        // move items below it.
        let anchor = self.items[anchor_index].rect();

        for index in 0..self.items.len() {
            if index == anchor_index {
                continue;
            }
            let current = self.items[index].rect();
            if !anchor.overlaps(&current) {
                continue;
            }
            let required = anchor.bottom().saturating_sub(current.y);
            if required == 0 {
                continue;
            }

            let item = &mut self.items[index];
            let h = item.h;
            let Some(y) = item.y.checked_add(required).filter(|y| y.checked_add(h).is_some())
            else {
                return Err(CascadeFailure::RowOverflow(item.id.clone()));
            };
            item.y = y;
            if !self.displaced.contains(&item.id) {
                self.displaced.push(item.id.clone());
            }
            self.push_from(index, depth + 1)?;
        }
        Ok(())
    }
}
