//! The dashboard engine.
//!
//! [`Engine`] owns the committed layout and wires every input into it:
//! pointer and keyboard events go through the [`InteractionMachine`], commits
//! land in the [`LayoutStore`], and each committed mutation is reported to the
//! host callback exactly once and handed to the optional [`Persister`].
//! Timers (rejection feedback, pending removals, notifications, persistence
//! retries) are plain deadlines advanced by [`Engine::tick`].
//!
//! The engine is single-threaded and never blocks; the host drives it with
//! events and a clock.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use dashgrid_core::geometry::{GridRect, MeasuredGrid, PixelRect, container_height};
use dashgrid_layout::{ItemId, LayoutItem, LayoutStore, ReflowAction, StoreError};
use web_time::Instant;

use crate::config::GridConfig;
use crate::interaction::{
    CancelReason, Ghost, InteractionContext, InteractionEffect, InteractionError, InteractionEvent,
    InteractionEventKind, InteractionMachine, InteractionPhase, InteractionTransition, Key,
    PointerHandle, PointerPosition,
};
use crate::notify::{Notification, NotificationLevel, Notifications};
use crate::persist::{LayoutSnapshot, Persister, SaveStatus};
use crate::registry::WidgetRegistry;
use crate::removal::PendingRemovals;

/// Host callback receiving the full layout after each committed change.
pub type LayoutChangeCallback = Box<dyn FnMut(&[LayoutItem])>;

/// Why a widget could not be added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddError {
    /// No registry entry for this type key.
    UnknownType(String),
    /// The widget's default width exceeds the grid.
    TooWide { w: u32, columns: u32 },
    Store(StoreError),
}

impl fmt::Display for AddError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType(kind) => write!(f, "unknown widget type '{kind}'"),
            Self::TooWide { w, columns } => {
                write!(f, "widget width {w} does not fit a {columns}-column grid")
            }
            Self::Store(e) => write!(f, "layout refused the widget: {e}"),
        }
    }
}

impl std::error::Error for AddError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

/// Why a removal could not be requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveError {
    UnknownItem(ItemId),
}

impl fmt::Display for RemoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownItem(id) => write!(f, "no widget with id '{id}'"),
        }
    }
}

impl std::error::Error for RemoveError {}

/// What one [`Engine::tick`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Widgets whose undo window ran out, in removal order.
    pub removed: Vec<ItemId>,
    pub rejection_cleared: bool,
    pub notifications_expired: usize,
    pub persistence: Option<SaveStatus>,
}

impl TickReport {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.removed.is_empty()
            && !self.rejection_cleared
            && self.notifications_expired == 0
            && self.persistence.is_none()
    }
}

/// Content of one widget frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedWidget {
    Widget { output: String },
    /// The item's type has no registry entry.
    UnknownType { kind: String },
    /// The renderer failed or panicked.
    Fault { message: String },
}

/// One placed widget, ready to paint.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetFrame {
    pub id: ItemId,
    pub kind: String,
    pub grid: GridRect,
    pub rect: PixelRect,
    pub content: RenderedWidget,
    pub pending_removal: bool,
    /// Being dragged or resized (drawn faded under the ghost).
    pub interacting: bool,
}

/// Drag/resize preview.
#[derive(Debug, Clone, PartialEq)]
pub struct GhostFrame {
    pub item: ItemId,
    pub grid: GridRect,
    pub rect: PixelRect,
    pub valid: bool,
    /// Rejected drop feedback in progress.
    pub shake: bool,
}

/// Everything a host needs to paint one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub container_height: f64,
    pub col_width: f64,
    pub widgets: Vec<WidgetFrame>,
    pub ghost: Option<GhostFrame>,
    pub notifications: Vec<Notification>,
}

/// Interactive dashboard engine.
pub struct Engine {
    config: GridConfig,
    registry: WidgetRegistry,
    store: LayoutStore,
    machine: InteractionMachine,
    removals: PendingRemovals,
    notifications: Notifications,
    persister: Option<Persister>,
    on_change: Option<LayoutChangeCallback>,
    container_width: f64,
    sequence: u64,
    initial_repairs: Vec<ReflowAction>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("items", &self.store.len())
            .field("phase", &self.machine.phase())
            .field("pending_removals", &self.removals.len())
            .field("notifications", &self.notifications.len())
            .field("persister", &self.persister)
            .field("container_width", &self.container_width)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Build an engine around an untrusted initial layout.
    ///
    /// The config is sanitized and the layout repaired; neither fires the
    /// host callback.
    pub fn new(config: GridConfig, registry: WidgetRegistry, initial: Vec<LayoutItem>) -> Self {
        let config = config.sanitized();
        let (store, outcome) = LayoutStore::from_initial(config.columns, initial);
        let store = store.with_max_push_depth(config.max_push_depth);
        if !outcome.is_unchanged() {
            tracing::info!(
                target: "dashgrid.engine",
                repairs = outcome.actions.len(),
                items = store.len(),
                "initial layout repaired"
            );
        }
        Self {
            machine: InteractionMachine::new(config.reject_feedback()),
            removals: PendingRemovals::new(config.remove_undo()),
            notifications: Notifications::new(config.notification_ttl()),
            persister: None,
            on_change: None,
            container_width: 0.0,
            sequence: 0,
            initial_repairs: outcome.actions,
            registry,
            store,
            config,
        }
    }

    /// Build from the persisted layout, falling back to `fallback` when
    /// nothing usable is stored.
    pub fn from_persisted(
        config: GridConfig,
        registry: WidgetRegistry,
        persister: Persister,
        fallback: Vec<LayoutItem>,
    ) -> Self {
        let initial = match persister.load() {
            Ok(Some(snapshot)) => snapshot.items,
            Ok(None) => fallback,
            Err(err) => {
                tracing::warn!(
                    target: "dashgrid.persist",
                    key = persister.key(),
                    error = %err,
                    "stored layout unusable, starting from fallback"
                );
                fallback
            }
        };
        Self::new(config, registry, initial).with_persister(persister)
    }

    #[must_use]
    pub fn with_persister(mut self, persister: Persister) -> Self {
        self.persister = Some(persister);
        self
    }

    /// Register the host callback.
    #[must_use]
    pub fn on_layout_change(mut self, callback: impl FnMut(&[LayoutItem]) + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut WidgetRegistry {
        &mut self.registry
    }

    #[must_use]
    pub fn store(&self) -> &LayoutStore {
        &self.store
    }

    /// Committed layout, in order.
    #[must_use]
    pub fn layout(&self) -> &[LayoutItem] {
        self.store.items()
    }

    /// Repairs applied to the initial layout.
    #[must_use]
    pub fn initial_repairs(&self) -> &[ReflowAction] {
        &self.initial_repairs
    }

    #[must_use]
    pub fn interaction(&self) -> &InteractionMachine {
        &self.machine
    }

    #[must_use]
    pub fn phase(&self) -> InteractionPhase {
        self.machine.phase()
    }

    /// Current ghost, if a drag, resize or rejection is showing one.
    #[must_use]
    pub fn ghost(&self) -> Option<Ghost> {
        self.machine.ghost().map(|(_, ghost, _)| ghost)
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    pub fn dismiss_notification(&mut self, id: u64) -> bool {
        self.notifications.dismiss(id)
    }

    #[must_use]
    pub fn is_pending_removal(&self, id: &ItemId) -> bool {
        self.removals.is_pending(id)
    }

    #[must_use]
    pub fn persister(&self) -> Option<&Persister> {
        self.persister.as_ref()
    }

    /// Record the container's measured width (0 while unmeasured).
    pub fn set_container_width(&mut self, px: f64) {
        self.container_width = if px.is_finite() { px.max(0.0) } else { 0.0 };
    }

    /// Grid geometry for the current container width.
    #[must_use]
    pub fn measured_grid(&self) -> Option<MeasuredGrid> {
        self.config.metrics().measure(self.container_width)
    }

    /// Feed one input event.
    pub fn handle_event(
        &mut self,
        kind: InteractionEventKind,
        now: Instant,
    ) -> Result<InteractionTransition, InteractionError> {
        self.sequence += 1;
        let event = InteractionEvent::new(self.sequence, kind);
        let ctx = InteractionContext {
            store: &self.store,
            grid: self.config.metrics().measure(self.container_width),
            policy: self.config.conflict_policy,
            now,
        };
        let transition = self.machine.apply_event(&event, &ctx)?;
        self.apply_effect(&transition.effect, now);
        Ok(transition)
    }

    pub fn pointer_down(
        &mut self,
        item: impl Into<ItemId>,
        handle: PointerHandle,
        pointer_id: u32,
        position: PointerPosition,
        now: Instant,
    ) -> Result<InteractionTransition, InteractionError> {
        self.handle_event(
            InteractionEventKind::PointerDown {
                item: item.into(),
                handle,
                pointer_id,
                position,
            },
            now,
        )
    }

    pub fn pointer_move(
        &mut self,
        pointer_id: u32,
        position: PointerPosition,
        now: Instant,
    ) -> Result<InteractionTransition, InteractionError> {
        self.handle_event(InteractionEventKind::PointerMove { pointer_id, position }, now)
    }

    pub fn pointer_up(
        &mut self,
        pointer_id: u32,
        position: PointerPosition,
        now: Instant,
    ) -> Result<InteractionTransition, InteractionError> {
        self.handle_event(InteractionEventKind::PointerUp { pointer_id, position }, now)
    }

    /// Host-side cancel (pointer capture lost, window blur).
    pub fn cancel(&mut self, now: Instant) -> Result<InteractionTransition, InteractionError> {
        self.handle_event(
            InteractionEventKind::Cancel {
                reason: CancelReason::PointerCancel,
            },
            now,
        )
    }

    pub fn key_down(&mut self, key: Key, now: Instant) -> Result<InteractionTransition, InteractionError> {
        self.handle_event(InteractionEventKind::KeyDown { key }, now)
    }

    fn apply_effect(&mut self, effect: &InteractionEffect, now: Instant) {
        match effect {
            InteractionEffect::DropCommitted { item, rect } => {
                if self.store.get(item).is_some_and(|current| current.rect() == *rect) {
                    tracing::debug!(target: "dashgrid.engine", item = %item, "drop at origin, nothing to commit");
                    return;
                }
                match self.store.move_item(item, rect.x, rect.y) {
                    Ok(_) => self.commit(now),
                    Err(err) => {
                        tracing::warn!(target: "dashgrid.engine", item = %item, error = %err, "drop no longer applies");
                    }
                }
            }
            InteractionEffect::ResizeCommitted { item, rect } => {
                if self.store.get(item).is_some_and(|current| current.rect() == *rect) {
                    tracing::debug!(target: "dashgrid.engine", item = %item, "resize to same span, nothing to commit");
                    return;
                }
                match self
                    .store
                    .resize_item(item, rect.w, rect.h, self.config.conflict_policy)
                {
                    Ok(_) => self.commit(now),
                    Err(StoreError::PushDown(err)) => {
                        tracing::warn!(target: "dashgrid.engine", item = %item, error = %err, "resize refused");
                        self.notify_push_down_failure(now);
                    }
                    Err(err) => {
                        tracing::warn!(target: "dashgrid.engine", item = %item, error = %err, "resize no longer applies");
                    }
                }
            }
            InteractionEffect::Rejected {
                item,
                cause: Some(StoreError::PushDown(err)),
                ..
            } => {
                tracing::warn!(target: "dashgrid.engine", item = %item, error = %err, "resize refused");
                self.notify_push_down_failure(now);
            }
            _ => {}
        }
    }

    fn notify_push_down_failure(&mut self, now: Instant) {
        self.notifications.push(
            NotificationLevel::Warning,
            "Cannot resize: not enough space to push displaced widgets",
            now,
        );
    }

    /// Report a committed mutation: host callback once, then persistence.
    fn commit(&mut self, now: Instant) {
        tracing::debug!(target: "dashgrid.engine", items = self.store.len(), "layout committed");
        if let Some(callback) = self.on_change.as_mut() {
            callback(self.store.items());
        }
        if let Some(persister) = self.persister.as_mut() {
            let snapshot = LayoutSnapshot::new(self.store.columns(), self.store.items());
            persister.save(&snapshot, now);
        }
    }

    /// Add a widget of registered type `kind` at the first free position.
    pub fn add_widget(&mut self, kind: &str, now: Instant) -> Result<ItemId, AddError> {
        let Some(definition) = self.registry.resolve(kind) else {
            tracing::warn!(target: "dashgrid.engine", kind, "add refused: unknown widget type");
            self.notifications
                .push(NotificationLevel::Error, format!("Unknown widget type: {kind}"), now);
            return Err(AddError::UnknownType(kind.to_owned()));
        };
        let (size, limits) = (definition.default_size, definition.limits);

        match self.store.add_with_limits(kind, size, &limits) {
            Ok(id) => {
                self.commit(now);
                Ok(id)
            }
            Err(StoreError::TooWide { w, columns }) => {
                tracing::warn!(target: "dashgrid.engine", kind, w, columns, "add refused: wider than grid");
                self.notifications.push(
                    NotificationLevel::Warning,
                    "Dashboard is full, remove a widget first",
                    now,
                );
                Err(AddError::TooWide { w, columns })
            }
            Err(err) => Err(AddError::Store(err)),
        }
    }

    /// Mark `id` for removal after the undo window. Re-requesting restarts
    /// the window. Returns the deadline.
    pub fn request_remove(&mut self, id: &ItemId, now: Instant) -> Result<Instant, RemoveError> {
        if !self.store.contains(id) {
            return Err(RemoveError::UnknownItem(id.clone()));
        }
        let deadline = self.removals.arm(id.clone(), now);
        tracing::debug!(target: "dashgrid.engine", item = %id, "removal pending");
        Ok(deadline)
    }

    /// Cancel a pending removal. `false` when none was pending.
    pub fn undo_remove(&mut self, id: &ItemId) -> bool {
        let undone = self.removals.undo(id);
        if undone {
            tracing::debug!(target: "dashgrid.engine", item = %id, "removal undone");
        }
        undone
    }

    /// Advance every timer to `now`.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport {
            rejection_cleared: self.machine.tick(now).is_some(),
            ..TickReport::default()
        };

        for id in self.removals.take_expired(now) {
            self.machine.cancel_for_item(&id, CancelReason::ItemRemoved);
            match self.store.remove(&id) {
                Ok(_) => {
                    self.commit(now);
                    report.removed.push(id);
                }
                Err(err) => {
                    tracing::debug!(target: "dashgrid.engine", item = %id, error = %err, "pending removal target already gone");
                }
            }
        }

        report.notifications_expired = self.notifications.expire(now);
        report.persistence = self.persister.as_mut().and_then(|p| p.tick(now));
        report
    }

    /// Earliest pending deadline across every timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.machine.next_deadline(),
            self.removals.next_deadline(),
            self.notifications.next_deadline(),
            self.persister.as_ref().and_then(Persister::next_deadline),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Lay out and render every widget for a container `container_px_width`
    /// pixels wide. `None` until the width is usable.
    ///
    /// The width is recorded as the container width, so pointer snapping and
    /// the painted rects always share one grid.
    #[must_use]
    pub fn render(&mut self, container_px_width: f64) -> Option<RenderPlan> {
        self.set_container_width(container_px_width);
        let grid = self.measured_grid()?;
        let ghost = self.machine.ghost();
        let target = self.machine.target();

        let widgets = self
            .store
            .items()
            .iter()
            .map(|item| {
                let rect = grid.rect(item.rect());
                WidgetFrame {
                    id: item.id.clone(),
                    kind: item.kind.clone(),
                    grid: item.rect(),
                    rect,
                    content: self.render_widget(item, rect),
                    pending_removal: self.removals.is_pending(&item.id),
                    interacting: ghost.is_some() && target == Some(&item.id),
                }
            })
            .collect();

        let ghost = ghost.map(|(item, ghost, shake)| GhostFrame {
            item: item.clone(),
            grid: ghost.rect,
            rect: grid.rect(ghost.rect),
            valid: ghost.valid,
            shake,
        });
        let rows = ghost
            .as_ref()
            .map_or(0, |g| g.grid.bottom())
            .max(self.store.rows());

        Some(RenderPlan {
            container_height: container_height(rows, self.config.row_height, self.config.gap),
            col_width: grid.col_width,
            widgets,
            ghost,
            notifications: self.notifications.iter().cloned().collect(),
        })
    }

    fn render_widget(&self, item: &LayoutItem, rect: PixelRect) -> RenderedWidget {
        let Some(definition) = self.registry.resolve(&item.kind) else {
            return RenderedWidget::UnknownType {
                kind: item.kind.clone(),
            };
        };
        let renderer = definition.renderer();
        match catch_unwind(AssertUnwindSafe(|| renderer.render(item, rect))) {
            Ok(Ok(output)) => RenderedWidget::Widget { output },
            Ok(Err(err)) => {
                tracing::error!(target: "dashgrid.engine", item = %item.id, kind = %item.kind, error = %err, "widget renderer failed");
                RenderedWidget::Fault {
                    message: err.message().to_owned(),
                }
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(target: "dashgrid.engine", item = %item.id, kind = %item.kind, panic = %message, "widget renderer panicked");
                RenderedWidget::Fault { message }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "widget renderer panicked".to_owned()
    }
}
