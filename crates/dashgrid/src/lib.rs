#![forbid(unsafe_code)]

//! dashgrid public facade crate.
//!
//! Re-exports the layout model and algorithms from `dashgrid-layout`, the
//! geometry from `dashgrid-core`, and (with the default `runtime` feature)
//! the interactive [`Engine`] with its registry, config and persistence.
//! Most hosts only need the [`prelude`].

use std::fmt;

// --- Geometry re-exports ---------------------------------------------------

pub use dashgrid_core::geometry::{
    GridMetrics, GridPoint, GridRect, GridSpan, MeasuredGrid, PixelRect, col_width,
    container_height, to_pixel_rect,
};

// --- Layout re-exports -----------------------------------------------------

pub use dashgrid_layout::{
    ConflictPolicy, ItemId, ItemLimits, LayoutItem, LayoutStore, PushDownError, ReflowAction,
    ReflowOutcome, SizeConstraints, StoreError, clamp_to_neighbors, find_first_available,
    has_any_overlap, invariant_report, push_down, reflow, snap_to_grid, snap_to_size,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use dashgrid_runtime::{
    AddError, ConfigError, Engine, GridConfig, InteractionError, Key, LayoutSnapshot,
    LayoutStorage, MemoryStorage, PersistError, Persister, PointerHandle, PointerPosition,
    RegistrationError, RemoveError, RenderPlan, RenderedWidget, RetryPolicy, TickReport,
    WidgetDefinition, WidgetRegistry, WidgetRenderError, WidgetRenderer,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for dashgrid hosts.
#[derive(Debug)]
pub enum Error {
    /// A layout mutation was refused.
    Store(StoreError),
    /// A push-down cascade could not be resolved.
    PushDown(PushDownError),
    #[cfg(feature = "runtime")]
    Add(AddError),
    #[cfg(feature = "runtime")]
    Remove(RemoveError),
    #[cfg(feature = "runtime")]
    Registration(RegistrationError),
    #[cfg(feature = "runtime")]
    Config(ConfigError),
    #[cfg(feature = "runtime")]
    Persist(PersistError),
    #[cfg(feature = "runtime")]
    Interaction(InteractionError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::PushDown(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Add(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Remove(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Registration(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Config(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Persist(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Interaction(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::PushDown(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Add(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Remove(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Registration(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Config(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Persist(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Interaction(err) => Some(err),
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<PushDownError> for Error {
    fn from(err: PushDownError) -> Self {
        Self::PushDown(err)
    }
}

#[cfg(feature = "runtime")]
impl From<AddError> for Error {
    fn from(err: AddError) -> Self {
        Self::Add(err)
    }
}

#[cfg(feature = "runtime")]
impl From<RemoveError> for Error {
    fn from(err: RemoveError) -> Self {
        Self::Remove(err)
    }
}

#[cfg(feature = "runtime")]
impl From<RegistrationError> for Error {
    fn from(err: RegistrationError) -> Self {
        Self::Registration(err)
    }
}

#[cfg(feature = "runtime")]
impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

#[cfg(feature = "runtime")]
impl From<PersistError> for Error {
    fn from(err: PersistError) -> Self {
        Self::Persist(err)
    }
}

#[cfg(feature = "runtime")]
impl From<InteractionError> for Error {
    fn from(err: InteractionError) -> Self {
        Self::Interaction(err)
    }
}

/// Standard result type for dashgrid APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        ConflictPolicy, Error, GridRect, GridSpan, ItemId, ItemLimits, LayoutItem, PixelRect,
        Result,
    };

    #[cfg(feature = "runtime")]
    pub use crate::{
        Engine, GridConfig, Key, PointerHandle, PointerPosition, RenderPlan, RenderedWidget,
        WidgetDefinition, WidgetRegistry, WidgetRenderError,
    };

    pub use crate::{core, layout};

    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use dashgrid_core as core;
pub use dashgrid_layout as layout;
#[cfg(feature = "runtime")]
pub use dashgrid_runtime as runtime;

#[cfg(all(test, feature = "runtime"))]
mod tests {
    use super::prelude::*;
    use std::error::Error as _;
    use web_time::Instant;

    fn label(item: &LayoutItem, _rect: PixelRect) -> std::result::Result<String, WidgetRenderError> {
        Ok(item.kind.clone())
    }

    fn build() -> Result<Engine> {
        let mut registry = WidgetRegistry::new();
        registry.register("chart", WidgetDefinition::new("Chart", GridSpan::new(4, 2), label))?;
        let config = GridConfig::default().validated()?;
        Ok(Engine::new(config, registry, Vec::new()))
    }

    #[test]
    fn question_mark_lifts_every_crate_error() {
        let mut engine = build().expect("valid setup");
        let add = |engine: &mut Engine, kind: &str| -> Result<ItemId> {
            Ok(engine.add_widget(kind, Instant::now())?)
        };
        assert!(add(&mut engine, "chart").is_ok());
        let err = add(&mut engine, "missing").expect_err("unknown type");
        assert!(matches!(err, Error::Add(crate::AddError::UnknownType(_))));
        assert_eq!(err.to_string(), "unknown widget type 'missing'");
        assert!(err.source().is_some());
    }

    #[test]
    fn layout_errors_convert() {
        let mut store = crate::LayoutStore::new(4);
        let err: Error = store
            .add("wide", GridSpan::new(5, 1))
            .expect_err("too wide")
            .into();
        assert!(matches!(err, Error::Store(crate::StoreError::TooWide { w: 5, columns: 4 })));
    }
}
