#![forbid(unsafe_code)]

//! Grid configuration.
//!
//! A single [`GridConfig`] carries every tunable the engine reads: grid shape,
//! the resize conflict policy, and the durations of its timers. Defaults match
//! the stock dashboard (12 columns, 80px rows, 8px gaps).
//!
//! With the `config-files` feature the config can be loaded as data:
//!
//! ```toml
//! columns = 16
//! row_height = 64.0
//! conflict_policy = "clamp_to_neighbors"
//! ```
//!
//! ```rust,ignore
//! let config = GridConfig::from_toml_file("dashboard.toml")?.sanitized();
//! ```

#[cfg(feature = "config-files")]
use std::path::Path;

use dashgrid_core::geometry::GridMetrics;
use dashgrid_layout::{ConflictPolicy, DEFAULT_MAX_PUSH_DEPTH};
use serde::{Deserialize, Serialize};
use web_time::Duration;

pub const DEFAULT_COLUMNS: u32 = 12;
pub const DEFAULT_ROW_HEIGHT: f64 = 80.0;
pub const DEFAULT_GAP: f64 = 8.0;
pub const DEFAULT_REJECT_FEEDBACK_MS: u64 = 400;
pub const DEFAULT_REMOVE_UNDO_MS: u64 = 3000;
pub const DEFAULT_NOTIFICATION_MS: u64 = 3000;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Fixed number of columns.
    pub columns: u32,
    /// Row height in pixels.
    pub row_height: f64,
    /// Gap between cells in pixels.
    pub gap: f64,
    /// How resizes that overlap neighbors are settled.
    pub conflict_policy: ConflictPolicy,
    /// Push-down cascade depth limit.
    pub max_push_depth: u32,
    /// How long a rejected drop keeps its shaking ghost.
    pub reject_feedback_ms: u64,
    /// Undo window for a requested removal.
    pub remove_undo_ms: u64,
    /// Lifetime of a transient notification.
    pub notification_ms: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            row_height: DEFAULT_ROW_HEIGHT,
            gap: DEFAULT_GAP,
            conflict_policy: ConflictPolicy::default(),
            max_push_depth: DEFAULT_MAX_PUSH_DEPTH,
            reject_feedback_ms: DEFAULT_REJECT_FEEDBACK_MS,
            remove_undo_ms: DEFAULT_REMOVE_UNDO_MS,
            notification_ms: DEFAULT_NOTIFICATION_MS,
        }
    }
}

impl GridConfig {
    #[must_use]
    pub fn with_columns(mut self, columns: u32) -> Self {
        self.columns = columns;
        self
    }

    #[must_use]
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    #[must_use]
    pub fn with_max_push_depth(mut self, depth: u32) -> Self {
        self.max_push_depth = depth;
        self
    }

    /// Load from a TOML string.
    #[cfg(feature = "config-files")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-files")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-files")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config-files")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// List every out-of-range parameter. Empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.columns == 0 {
            errors.push("columns must be > 0".into());
        }
        if !(self.row_height.is_finite() && self.row_height > 0.0) {
            errors.push(format!("row_height must be > 0, got {}", self.row_height));
        }
        if !(self.gap.is_finite() && self.gap >= 0.0) {
            errors.push(format!("gap must be >= 0, got {}", self.gap));
        }

        errors
    }

    /// Same config with every invalid parameter replaced by its default.
    ///
    /// Each replacement is logged at warn level; the engine never refuses to
    /// start over a bad config.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        if self.columns == 0 {
            tracing::warn!(
                target: "dashgrid.config",
                columns = self.columns,
                fallback = DEFAULT_COLUMNS,
                "invalid column count, using default"
            );
            self.columns = DEFAULT_COLUMNS;
        }
        if !(self.row_height.is_finite() && self.row_height > 0.0) {
            tracing::warn!(
                target: "dashgrid.config",
                row_height = self.row_height,
                fallback = DEFAULT_ROW_HEIGHT,
                "invalid row height, using default"
            );
            self.row_height = DEFAULT_ROW_HEIGHT;
        }
        if !(self.gap.is_finite() && self.gap >= 0.0) {
            tracing::warn!(
                target: "dashgrid.config",
                gap = self.gap,
                fallback = DEFAULT_GAP,
                "invalid gap, using default"
            );
            self.gap = DEFAULT_GAP;
        }
        self
    }

    /// Pixel mapping for this grid.
    #[must_use]
    pub fn metrics(&self) -> GridMetrics {
        GridMetrics::new(self.columns, self.row_height, self.gap)
    }

    #[must_use]
    pub fn reject_feedback(&self) -> Duration {
        Duration::from_millis(self.reject_feedback_ms)
    }

    #[must_use]
    pub fn remove_undo(&self) -> Duration {
        Duration::from_millis(self.remove_undo_ms)
    }

    #[must_use]
    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ms)
    }
}

/// Errors that can occur when loading a grid configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config-files")]
    Toml(toml::de::Error),
    /// JSON parse error.
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config-files")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => write!(f, "validation errors: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-files")]
            Self::Toml(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

impl GridConfig {
    /// Validate, turning any finding into [`ConfigError::Validation`].
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}
