//! Remove-with-undo timers.
//!
//! Requesting a removal only marks the widget: it stays in the layout until
//! its deadline passes. Undo before then drops the mark without touching the
//! layout. Deadlines are checked by the caller through [`PendingRemovals::take_expired`].

use dashgrid_layout::ItemId;
use rustc_hash::FxHashMap;
use web_time::{Duration, Instant};

/// Per-widget removal deadlines.
#[derive(Debug, Clone)]
pub struct PendingRemovals {
    window: Duration,
    deadlines: FxHashMap<ItemId, Instant>,
}

impl PendingRemovals {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadlines: FxHashMap::default(),
        }
    }

    /// Start (or restart) the undo window for `id`. Returns the deadline.
    pub fn arm(&mut self, id: ItemId, now: Instant) -> Instant {
        let deadline = now + self.window;
        self.deadlines.insert(id, deadline);
        deadline
    }

    /// Cancel a pending removal. `false` when nothing was pending.
    pub fn undo(&mut self, id: &ItemId) -> bool {
        self.deadlines.remove(id).is_some()
    }

    #[must_use]
    pub fn is_pending(&self, id: &ItemId) -> bool {
        self.deadlines.contains_key(id)
    }

    /// Remove and return every entry whose deadline is at or before `now`,
    /// ordered by deadline then id.
    pub fn take_expired(&mut self, now: Instant) -> Vec<ItemId> {
        let mut expired: Vec<(Instant, ItemId)> = self
            .deadlines
            .iter()
            .filter(|&(_, deadline)| *deadline <= now)
            .map(|(id, deadline)| (*deadline, id.clone()))
            .collect();
        expired.sort();
        for (_, id) in &expired {
            self.deadlines.remove(id);
        }
        expired.into_iter().map(|(_, id)| id).collect()
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}
