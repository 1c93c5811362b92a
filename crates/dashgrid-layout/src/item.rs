//! Layout items: the placed widgets and their size constraints.

use std::fmt;

use dashgrid_core::geometry::{GridPoint, GridRect, GridSpan};
use serde::{Deserialize, Serialize};

/// Opaque widget identifier, unique within a layout.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ItemId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

fn default_resizable() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

/// One placed widget.
///
/// `kind` is the registry key the host resolves to a renderer; it is opaque to
/// the layout algorithms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutItem {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub kind: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_h: Option<u32>,
    #[serde(default = "default_resizable", skip_serializing_if = "is_true")]
    pub resizable: bool,
}

impl LayoutItem {
    /// Create an unconstrained, resizable item.
    pub fn new(id: impl Into<ItemId>, kind: impl Into<String>, x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            x,
            y,
            w,
            h,
            min_w: None,
            min_h: None,
            max_w: None,
            max_h: None,
            resizable: true,
        }
    }

    #[must_use]
    pub fn with_min_size(mut self, min_w: u32, min_h: u32) -> Self {
        self.min_w = Some(min_w);
        self.min_h = Some(min_h);
        self
    }

    #[must_use]
    pub fn with_max_size(mut self, max_w: Option<u32>, max_h: Option<u32>) -> Self {
        self.max_w = max_w;
        self.max_h = max_h;
        self
    }

    #[must_use]
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// Copy optional limits onto the item.
    #[must_use]
    pub fn with_limits(mut self, limits: &ItemLimits) -> Self {
        self.min_w = limits.min_w;
        self.min_h = limits.min_h;
        self.max_w = limits.max_w;
        self.max_h = limits.max_h;
        self.resizable = limits.resizable;
        self
    }

    /// The item's optional limits, unresolved.
    #[must_use]
    pub fn limits(&self) -> ItemLimits {
        ItemLimits {
            min_w: self.min_w,
            min_h: self.min_h,
            max_w: self.max_w,
            max_h: self.max_h,
            resizable: self.resizable,
        }
    }

    /// Grid footprint.
    #[inline]
    #[must_use]
    pub const fn rect(&self) -> GridRect {
        GridRect::new(self.x, self.y, self.w, self.h)
    }

    #[inline]
    #[must_use]
    pub const fn origin(&self) -> GridPoint {
        GridPoint::new(self.x, self.y)
    }

    #[inline]
    #[must_use]
    pub const fn span(&self) -> GridSpan {
        GridSpan::new(self.w, self.h)
    }

    /// Exclusive bottom row.
    #[inline]
    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    pub fn set_rect(&mut self, rect: GridRect) {
        self.x = rect.x;
        self.y = rect.y;
        self.w = rect.w;
        self.h = rect.h;
    }

    /// Resolve the optional constraints against a grid width.
    #[must_use]
    pub fn constraints(&self, columns: u32) -> SizeConstraints {
        SizeConstraints::new(self.min_w, self.min_h, self.max_w, self.max_h, columns)
    }

    /// Whether the item lies fully inside a grid of `columns` columns with an
    /// addressable bottom edge.
    #[must_use]
    pub fn in_bounds(&self, columns: u32) -> bool {
        self.w > 0
            && self.h > 0
            && self.x.checked_add(self.w).is_some_and(|r| r <= columns)
            && self.rect().fits_rows()
    }
}

/// Optional per-item limits as a widget definition declares them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_h: Option<u32>,
    #[serde(default = "default_resizable", skip_serializing_if = "is_true")]
    pub resizable: bool,
}

impl Default for ItemLimits {
    fn default() -> Self {
        Self {
            min_w: None,
            min_h: None,
            max_w: None,
            max_h: None,
            resizable: true,
        }
    }
}

impl ItemLimits {
    #[must_use]
    pub fn min(mut self, w: u32, h: u32) -> Self {
        self.min_w = Some(w);
        self.min_h = Some(h);
        self
    }

    #[must_use]
    pub fn max(mut self, w: Option<u32>, h: Option<u32>) -> Self {
        self.max_w = w;
        self.max_h = h;
        self
    }

    #[must_use]
    pub fn fixed_size(mut self) -> Self {
        self.resizable = false;
        self
    }

    /// Resolve against a grid width.
    #[must_use]
    pub fn resolve(&self, columns: u32) -> SizeConstraints {
        SizeConstraints::new(self.min_w, self.min_h, self.max_w, self.max_h, columns)
    }
}

/// Resolved resize limits for one item.
///
/// `max_h` of `None` means rows are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeConstraints {
    pub min_w: u32,
    pub min_h: u32,
    pub max_w: u32,
    pub max_h: Option<u32>,
}

impl SizeConstraints {
    /// Apply defaults: minimums of 1, width capped at the grid, height open.
    #[must_use]
    pub fn new(
        min_w: Option<u32>,
        min_h: Option<u32>,
        max_w: Option<u32>,
        max_h: Option<u32>,
        columns: u32,
    ) -> Self {
        let columns = columns.max(1);
        let min_w = min_w.unwrap_or(1).max(1);
        let min_h = min_h.unwrap_or(1).max(1);
        let max_w = max_w.unwrap_or(columns).clamp(1, columns);
        let max_h = max_h.map(|h| h.max(1));
        Self {
            min_w,
            min_h,
            max_w,
            max_h,
        }
    }

    /// Unconstrained limits for a grid.
    #[must_use]
    pub fn unconstrained(columns: u32) -> Self {
        Self::new(None, None, None, None, columns)
    }

    /// Clamp a width for an item whose left edge sits at `origin_x`.
    ///
    /// The grid's right edge wins over `min_w` so the result never overflows.
    #[must_use]
    pub fn clamp_width(&self, raw: u32, origin_x: u32, columns: u32) -> u32 {
        let room = columns.saturating_sub(origin_x).max(1);
        let upper = self.max_w.min(room);
        raw.max(self.min_w).min(upper).max(1)
    }

    #[must_use]
    pub fn clamp_height(&self, raw: u32) -> u32 {
        let lower = raw.max(self.min_h);
        match self.max_h {
            Some(max_h) => lower.min(max_h.max(self.min_h)),
            None => lower,
        }
    }
}
