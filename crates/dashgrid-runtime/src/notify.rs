//! Transient user-facing notifications.
//!
//! A rejected placement or a failed push-down leaves the layout untouched;
//! the only trace the user sees is a short-lived [`Notification`]. The queue
//! is bounded: when full, the oldest entry is evicted.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;
use web_time::{Duration, Instant};

/// Default number of notifications kept at once.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 8;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

impl NotificationLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One queued message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub message: String,
    pub expires_at: Instant,
}

impl Notification {
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Bounded queue of notifications, oldest first.
#[derive(Debug, Clone)]
pub struct Notifications {
    queue: VecDeque<Notification>,
    ttl: Duration,
    capacity: usize,
    next_id: u64,
}

impl Notifications {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_NOTIFICATION_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity.max(1)),
            ttl,
            capacity: capacity.max(1),
            next_id: 1,
        }
    }

    /// Queue a message expiring `ttl` after `now`. Returns its id.
    pub fn push(&mut self, level: NotificationLevel, message: impl Into<String>, now: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        if self.queue.len() == self.capacity {
            self.queue.pop_front();
        }
        self.queue.push_back(Notification {
            id,
            level,
            message: message.into(),
            expires_at: now + self.ttl,
        });
        id
    }

    /// Drop expired entries, returning how many were dropped.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.queue.len();
        self.queue.retain(|n| !n.is_expired(now));
        before - self.queue.len()
    }

    /// Remove one notification early.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.queue.len();
        self.queue.retain(|n| n.id != id);
        before != self.queue.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.queue.iter()
    }

    /// Earliest expiry among queued entries.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.iter().map(|n| n.expires_at).min()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
