//! Widget type registry.
//!
//! Maps a type key (the `type` field of a layout item) to a
//! [`WidgetDefinition`]: display name, default size, optional size limits and
//! the renderer. The registry is a plain value owned by the engine; nothing
//! is global.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use dashgrid_core::geometry::{GridSpan, PixelRect};
use dashgrid_layout::{ItemLimits, LayoutItem};

/// Error a renderer reports for one widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetRenderError {
    message: String,
}

impl WidgetRenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for WidgetRenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WidgetRenderError {}

/// Produces the content of one widget.
///
/// A renderer may fail or even panic; the engine isolates both to the widget
/// being rendered.
pub trait WidgetRenderer: Send + Sync {
    fn render(&self, item: &LayoutItem, rect: PixelRect) -> Result<String, WidgetRenderError>;
}

impl<F> WidgetRenderer for F
where
    F: Fn(&LayoutItem, PixelRect) -> Result<String, WidgetRenderError> + Send + Sync,
{
    fn render(&self, item: &LayoutItem, rect: PixelRect) -> Result<String, WidgetRenderError> {
        self(item, rect)
    }
}

/// Everything the engine needs to know about one widget type.
#[derive(Clone)]
pub struct WidgetDefinition {
    pub display_name: String,
    pub default_size: GridSpan,
    pub limits: ItemLimits,
    renderer: Arc<dyn WidgetRenderer>,
}

impl WidgetDefinition {
    pub fn new(
        display_name: impl Into<String>,
        default_size: GridSpan,
        renderer: impl WidgetRenderer + 'static,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            default_size,
            limits: ItemLimits::default(),
            renderer: Arc::new(renderer),
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: ItemLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn renderer(&self) -> &dyn WidgetRenderer {
        self.renderer.as_ref()
    }
}

impl fmt::Debug for WidgetDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetDefinition")
            .field("display_name", &self.display_name)
            .field("default_size", &self.default_size)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

/// Why a registration was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    EmptyKey,
    EmptyDisplayName { key: String },
    InvalidDefaultSize { key: String, size: GridSpan },
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyKey => f.write_str("widget type key must be a non-empty string"),
            Self::EmptyDisplayName { key } => {
                write!(f, "display name must be non-empty for widget type '{key}'")
            }
            Self::InvalidDefaultSize { key, size } => write!(
                f,
                "default size {}x{} for widget type '{key}' must be positive",
                size.w, size.h
            ),
        }
    }
}

impl std::error::Error for RegistrationError {}

/// Keyed lookup of widget definitions.
#[derive(Debug, Clone, Default)]
pub struct WidgetRegistry {
    entries: BTreeMap<String, WidgetDefinition>,
}

impl WidgetRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `definition` under `key`.
    ///
    /// Re-registering a key replaces the previous definition (logged at warn
    /// level) and returns it.
    pub fn register(
        &mut self,
        key: impl Into<String>,
        definition: WidgetDefinition,
    ) -> Result<Option<WidgetDefinition>, RegistrationError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(RegistrationError::EmptyKey);
        }
        if definition.display_name.trim().is_empty() {
            return Err(RegistrationError::EmptyDisplayName { key });
        }
        let size = definition.default_size;
        if size.w == 0 || size.h == 0 {
            return Err(RegistrationError::InvalidDefaultSize { key, size });
        }

        let previous = self.entries.insert(key.clone(), definition);
        if previous.is_some() {
            tracing::warn!(target: "dashgrid.registry", key = %key, "widget type re-registered, replacing previous definition");
        } else {
            tracing::debug!(target: "dashgrid.registry", key = %key, "widget type registered");
        }
        Ok(previous)
    }

    #[must_use]
    pub fn resolve(&self, key: &str) -> Option<&WidgetDefinition> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn unregister(&mut self, key: &str) -> Option<WidgetDefinition> {
        self.entries.remove(key)
    }

    /// Drop every registration.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(key, display name)` pairs sorted by key, for a widget palette.
    #[must_use]
    pub fn palette(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .map(|(key, definition)| (key.as_str(), definition.display_name.as_str()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
