#![forbid(unsafe_code)]

//! Interactive runtime for dashgrid dashboards.
//!
//! [`Engine`] is the entry point: give it a [`GridConfig`], a
//! [`WidgetRegistry`] and an initial layout, then feed it pointer, keyboard
//! and timer input. The supporting modules are usable on their own:
//!
//! - [`interaction`]: drag/resize state machine with ghost previews,
//! - [`removal`]: remove-with-undo deadlines,
//! - [`notify`]: transient notifications,
//! - [`persist`] and [`retry`]: snapshot storage with retried writes.

pub mod config;
pub mod engine;
pub mod interaction;
pub mod notify;
pub mod persist;
pub mod registry;
pub mod removal;
pub mod retry;

pub use config::{ConfigError, GridConfig};
pub use engine::{
    AddError, Engine, GhostFrame, LayoutChangeCallback, RemoveError, RenderPlan, RenderedWidget,
    TickReport, WidgetFrame,
};
pub use interaction::{
    CancelReason, Ghost, InteractionContext, InteractionEffect, InteractionError,
    InteractionEvent, InteractionEventKind, InteractionMachine, InteractionPhase,
    InteractionState, InteractionTransition, Key, NoopReason, PointerHandle, PointerPosition,
};
pub use notify::{Notification, NotificationLevel, Notifications};
pub use persist::{
    LayoutSnapshot, LayoutStorage, MemoryStorage, PersistError, Persister, SaveStatus,
    SnapshotError, StorageError,
};
pub use registry::{
    RegistrationError, WidgetDefinition, WidgetRegistry, WidgetRenderError, WidgetRenderer,
};
pub use removal::PendingRemovals;
pub use retry::{BackoffStrategy, RetryPolicy};
