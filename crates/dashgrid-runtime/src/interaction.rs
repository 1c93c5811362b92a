//! Drag and resize lifecycle.
//!
//! ```text
//! Idle -> Dragging | Resizing -> Idle        (commit or cancel)
//!                            \-> Rejecting -> Idle   (invalid drop, timed)
//! ```
//!
//! The machine never mutates the layout. Each [`InteractionMachine::apply_event`]
//! call returns an [`InteractionTransition`] whose effect tells the caller what
//! to do: draw a ghost, commit a drop or resize, or nothing at all. Events that
//! do not fit the current phase (a move after release, a second pointer) are
//! reported as [`InteractionEffect::Noop`] with a reason instead of an error.

use std::fmt;

use dashgrid_core::geometry::{GridRect, MeasuredGrid};
use dashgrid_layout::{ConflictPolicy, ItemId, LayoutStore, StoreError, snap_to_grid, snap_to_size};
use serde::{Deserialize, Serialize};
use web_time::{Duration, Instant};

/// Pointer position in pixels relative to the grid container's top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

impl PointerPosition {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Which part of a widget the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerHandle {
    /// The drag handle (title bar).
    Drag,
    /// The bottom-right resize handle.
    Resize,
    /// Anywhere else; presses here never start an interaction.
    Body,
}

/// Keys the machine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "key", content = "char", rename_all = "snake_case")]
pub enum Key {
    Escape,
    Char(char),
    Other,
}

/// Why an interaction ended without committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    EscapeKey,
    /// The host lost the pointer (pointercancel, blur, capture lost).
    PointerCancel,
    Programmatic,
    /// The widget being dragged or resized left the layout.
    ItemRemoved,
}

/// Input to the machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InteractionEventKind {
    PointerDown {
        item: ItemId,
        handle: PointerHandle,
        pointer_id: u32,
        position: PointerPosition,
    },
    PointerMove {
        pointer_id: u32,
        position: PointerPosition,
    },
    PointerUp {
        pointer_id: u32,
        position: PointerPosition,
    },
    Cancel {
        reason: CancelReason,
    },
    KeyDown {
        key: Key,
    },
}

/// One sequenced input event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub sequence: u64,
    pub kind: InteractionEventKind,
}

/// Malformed input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionEventError {
    NonFinitePosition { x: f64, y: f64 },
}

impl fmt::Display for InteractionEventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinitePosition { x, y } => {
                write!(f, "pointer position must be finite (got {x}, {y})")
            }
        }
    }
}

impl std::error::Error for InteractionEventError {}

impl InteractionEvent {
    #[must_use]
    pub fn new(sequence: u64, kind: InteractionEventKind) -> Self {
        Self { sequence, kind }
    }

    pub fn validate(&self) -> Result<(), InteractionEventError> {
        let position = match &self.kind {
            InteractionEventKind::PointerDown { position, .. }
            | InteractionEventKind::PointerMove { position, .. }
            | InteractionEventKind::PointerUp { position, .. } => *position,
            InteractionEventKind::Cancel { .. } | InteractionEventKind::KeyDown { .. } => {
                return Ok(());
            }
        };
        if position.is_finite() {
            Ok(())
        } else {
            Err(InteractionEventError::NonFinitePosition {
                x: position.x,
                y: position.y,
            })
        }
    }
}

/// Machine errors.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionError {
    InvalidEvent(InteractionEventError),
}

impl fmt::Display for InteractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEvent(error) => write!(f, "invalid interaction event: {error}"),
        }
    }
}

impl std::error::Error for InteractionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidEvent(error) => Some(error),
        }
    }
}

/// Preview footprint shown while dragging or resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ghost {
    pub rect: GridRect,
    /// Whether releasing here would commit.
    pub valid: bool,
}

/// An in-progress drag or resize.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveInteraction {
    pub item: ItemId,
    pub pointer_id: u32,
    /// Committed footprint when the interaction started.
    pub origin: GridRect,
    /// Pointer offset from the widget's top-left corner at press time (drag only).
    pub grab_offset: PointerPosition,
    pub ghost: Ghost,
    pub started_sequence: u64,
}

/// Full machine state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Dragging(ActiveInteraction),
    Resizing(ActiveInteraction),
    /// An invalid drop is being shown (shaking ghost) until `until`.
    Rejecting {
        item: ItemId,
        ghost: Ghost,
        until: Instant,
    },
}

/// Phase tag of [`InteractionState`], for transition records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionPhase {
    Idle,
    Dragging,
    Resizing,
    Rejecting,
}

impl InteractionPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Dragging => "dragging",
            Self::Resizing => "resizing",
            Self::Rejecting => "rejecting",
        }
    }
}

impl fmt::Display for InteractionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl InteractionState {
    #[must_use]
    pub const fn phase(&self) -> InteractionPhase {
        match self {
            Self::Idle => InteractionPhase::Idle,
            Self::Dragging(_) => InteractionPhase::Dragging,
            Self::Resizing(_) => InteractionPhase::Resizing,
            Self::Rejecting { .. } => InteractionPhase::Rejecting,
        }
    }
}

/// Why an event was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoopReason {
    IdleWithoutActiveInteraction,
    InteractionAlreadyInProgress,
    PointerMismatch,
    BodyPressIgnored,
    UnknownItem,
    NotResizable,
    GeometryUnavailable,
    UnhandledKey,
    GhostUnchanged,
}

/// What one transition asks the caller to do.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEffect {
    DragStarted {
        item: ItemId,
        pointer_id: u32,
        origin: GridRect,
    },
    ResizeStarted {
        item: ItemId,
        pointer_id: u32,
        origin: GridRect,
    },
    GhostUpdated {
        item: ItemId,
        ghost: Ghost,
    },
    /// Apply the drop: move `item` to `rect`.
    DropCommitted { item: ItemId, rect: GridRect },
    /// Apply the resize: `item` gets `rect`'s span under the engine's policy.
    ResizeCommitted { item: ItemId, rect: GridRect },
    /// The release landed on an invalid ghost. `cause` is the store's refusal.
    Rejected {
        item: ItemId,
        ghost: Ghost,
        until: Instant,
        cause: Option<StoreError>,
    },
    RejectionCleared {
        item: ItemId,
    },
    Canceled {
        item: ItemId,
        reason: CancelReason,
    },
    Noop {
        reason: NoopReason,
    },
}

impl InteractionEffect {
    const fn noop(reason: NoopReason) -> Self {
        Self::Noop { reason }
    }

    #[must_use]
    pub const fn is_noop(&self) -> bool {
        matches!(self, Self::Noop { .. })
    }
}

/// One machine step.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionTransition {
    pub transition_id: u64,
    pub sequence: u64,
    pub from: InteractionPhase,
    pub to: InteractionPhase,
    pub effect: InteractionEffect,
}

/// Read-only inputs for one step.
#[derive(Debug, Clone, Copy)]
pub struct InteractionContext<'a> {
    pub store: &'a LayoutStore,
    /// `None` until the container has a usable width.
    pub grid: Option<MeasuredGrid>,
    pub policy: ConflictPolicy,
    pub now: Instant,
}

/// Drag/resize lifecycle machine.
#[derive(Debug, Clone)]
pub struct InteractionMachine {
    state: InteractionState,
    reject_feedback: Duration,
    transition_counter: u64,
}

impl Default for InteractionMachine {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::config::DEFAULT_REJECT_FEEDBACK_MS))
    }
}

type Step = (Option<InteractionState>, InteractionEffect);

impl InteractionMachine {
    #[must_use]
    pub fn new(reject_feedback: Duration) -> Self {
        Self {
            state: InteractionState::Idle,
            reject_feedback,
            transition_counter: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    #[must_use]
    pub const fn phase(&self) -> InteractionPhase {
        self.state.phase()
    }

    /// Dragging or resizing.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(
            self.state,
            InteractionState::Dragging(_) | InteractionState::Resizing(_)
        )
    }

    /// Item being dragged, resized, or shown as rejected.
    #[must_use]
    pub fn target(&self) -> Option<&ItemId> {
        match &self.state {
            InteractionState::Idle => None,
            InteractionState::Dragging(active) | InteractionState::Resizing(active) => {
                Some(&active.item)
            }
            InteractionState::Rejecting { item, .. } => Some(item),
        }
    }

    /// Current ghost and whether it is shaking.
    #[must_use]
    pub fn ghost(&self) -> Option<(&ItemId, Ghost, bool)> {
        match &self.state {
            InteractionState::Idle => None,
            InteractionState::Dragging(active) | InteractionState::Resizing(active) => {
                Some((&active.item, active.ghost, false))
            }
            InteractionState::Rejecting { item, ghost, .. } => Some((item, *ghost, true)),
        }
    }

    /// When the rejection feedback ends.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match &self.state {
            InteractionState::Rejecting { until, .. } => Some(*until),
            _ => None,
        }
    }

    /// Apply one input event.
    pub fn apply_event(
        &mut self,
        event: &InteractionEvent,
        ctx: &InteractionContext<'_>,
    ) -> Result<InteractionTransition, InteractionError> {
        event.validate().map_err(InteractionError::InvalidEvent)?;

        let (next, effect) = match &event.kind {
            InteractionEventKind::PointerDown {
                item,
                handle,
                pointer_id,
                position,
            } => self.on_pointer_down(item, *handle, *pointer_id, *position, event.sequence, ctx),
            InteractionEventKind::PointerMove {
                pointer_id,
                position,
            } => self.on_pointer_move(*pointer_id, *position, ctx),
            InteractionEventKind::PointerUp {
                pointer_id,
                position,
            } => self.on_pointer_up(*pointer_id, *position, ctx),
            InteractionEventKind::Cancel { reason } => self.on_cancel(*reason),
            InteractionEventKind::KeyDown { key: Key::Escape } => {
                self.on_cancel(CancelReason::EscapeKey)
            }
            InteractionEventKind::KeyDown { .. } => {
                (None, InteractionEffect::noop(NoopReason::UnhandledKey))
            }
        };
        Ok(self.record(event.sequence, next, effect))
    }

    /// Clear an elapsed rejection. `None` when nothing changed.
    pub fn tick(&mut self, now: Instant) -> Option<InteractionTransition> {
        let InteractionState::Rejecting { item, until, .. } = &self.state else {
            return None;
        };
        if now < *until {
            return None;
        }
        let effect = InteractionEffect::RejectionCleared { item: item.clone() };
        Some(self.record(0, Some(InteractionState::Idle), effect))
    }

    /// Abandon any drag or resize. `None` when idle or rejecting.
    pub fn force_cancel(&mut self, reason: CancelReason) -> Option<InteractionTransition> {
        if !self.is_active() {
            return None;
        }
        let (next, effect) = self.on_cancel(reason);
        Some(self.record(0, next, effect))
    }

    /// Cancel only if `item` is the one being dragged or resized.
    pub fn cancel_for_item(
        &mut self,
        item: &ItemId,
        reason: CancelReason,
    ) -> Option<InteractionTransition> {
        if self.is_active() && self.target() == Some(item) {
            self.force_cancel(reason)
        } else {
            None
        }
    }

    fn record(
        &mut self,
        sequence: u64,
        next: Option<InteractionState>,
        effect: InteractionEffect,
    ) -> InteractionTransition {
        let from = self.state.phase();
        if let Some(next) = next {
            self.state = next;
        }
        let to = self.state.phase();
        self.transition_counter = self.transition_counter.saturating_add(1);
        if from != to {
            tracing::debug!(
                target: "dashgrid.interaction",
                transition_id = self.transition_counter,
                sequence,
                from = %from,
                to = %to,
                "interaction phase changed"
            );
        }
        InteractionTransition {
            transition_id: self.transition_counter,
            sequence,
            from,
            to,
            effect,
        }
    }

    fn on_pointer_down(
        &self,
        item: &ItemId,
        handle: PointerHandle,
        pointer_id: u32,
        position: PointerPosition,
        sequence: u64,
        ctx: &InteractionContext<'_>,
    ) -> Step {
        if self.is_active() {
            return (None, InteractionEffect::noop(NoopReason::InteractionAlreadyInProgress));
        }
        if handle == PointerHandle::Body {
            return (None, InteractionEffect::noop(NoopReason::BodyPressIgnored));
        }
        let Some(layout_item) = ctx.store.get(item) else {
            return (None, InteractionEffect::noop(NoopReason::UnknownItem));
        };
        let Some(grid) = ctx.grid else {
            return (None, InteractionEffect::noop(NoopReason::GeometryUnavailable));
        };

        let origin = layout_item.rect();
        let pixels = grid.rect(origin);
        let mut active = ActiveInteraction {
            item: item.clone(),
            pointer_id,
            origin,
            grab_offset: PointerPosition::default(),
            ghost: Ghost {
                rect: origin,
                valid: true,
            },
            started_sequence: sequence,
        };

        match handle {
            PointerHandle::Drag => {
                active.grab_offset =
                    PointerPosition::new(position.x - pixels.left, position.y - pixels.top);
                let effect = InteractionEffect::DragStarted {
                    item: item.clone(),
                    pointer_id,
                    origin,
                };
                (Some(InteractionState::Dragging(active)), effect)
            }
            PointerHandle::Resize => {
                if !layout_item.resizable {
                    return (None, InteractionEffect::noop(NoopReason::NotResizable));
                }
                let effect = InteractionEffect::ResizeStarted {
                    item: item.clone(),
                    pointer_id,
                    origin,
                };
                (Some(InteractionState::Resizing(active)), effect)
            }
            PointerHandle::Body => (None, InteractionEffect::noop(NoopReason::BodyPressIgnored)),
        }
    }

    fn on_pointer_move(
        &self,
        pointer_id: u32,
        position: PointerPosition,
        ctx: &InteractionContext<'_>,
    ) -> Step {
        let (active, resizing) = match &self.state {
            InteractionState::Dragging(active) => (active, false),
            InteractionState::Resizing(active) => (active, true),
            _ => return (None, InteractionEffect::noop(NoopReason::IdleWithoutActiveInteraction)),
        };
        if active.pointer_id != pointer_id {
            return (None, InteractionEffect::noop(NoopReason::PointerMismatch));
        }
        let Some(grid) = ctx.grid else {
            return (None, InteractionEffect::noop(NoopReason::GeometryUnavailable));
        };
        let Some((ghost, _)) = evaluate(active, resizing, position, grid, ctx) else {
            return (None, InteractionEffect::noop(NoopReason::UnknownItem));
        };
        if ghost == active.ghost {
            return (None, InteractionEffect::noop(NoopReason::GhostUnchanged));
        }

        let mut updated = active.clone();
        updated.ghost = ghost;
        let effect = InteractionEffect::GhostUpdated {
            item: active.item.clone(),
            ghost,
        };
        let next = if resizing {
            InteractionState::Resizing(updated)
        } else {
            InteractionState::Dragging(updated)
        };
        (Some(next), effect)
    }

    fn on_pointer_up(
        &self,
        pointer_id: u32,
        position: PointerPosition,
        ctx: &InteractionContext<'_>,
    ) -> Step {
        let (active, resizing) = match &self.state {
            InteractionState::Dragging(active) => (active, false),
            InteractionState::Resizing(active) => (active, true),
            _ => return (None, InteractionEffect::noop(NoopReason::IdleWithoutActiveInteraction)),
        };
        if active.pointer_id != pointer_id {
            return (None, InteractionEffect::noop(NoopReason::PointerMismatch));
        }

        // Without geometry the last ghost stands, but is re-checked against
        // the current layout.
        let evaluated = match ctx.grid {
            Some(grid) => evaluate(active, resizing, position, grid, ctx),
            None => revalidate(active, resizing, ctx),
        };
        let Some((ghost, cause)) = evaluated else {
            let effect = InteractionEffect::Canceled {
                item: active.item.clone(),
                reason: CancelReason::ItemRemoved,
            };
            return (Some(InteractionState::Idle), effect);
        };

        if ghost.valid {
            let item = active.item.clone();
            let effect = if resizing {
                InteractionEffect::ResizeCommitted {
                    item,
                    rect: ghost.rect,
                }
            } else {
                InteractionEffect::DropCommitted {
                    item,
                    rect: ghost.rect,
                }
            };
            return (Some(InteractionState::Idle), effect);
        }

        let until = ctx.now + self.reject_feedback;
        tracing::debug!(
            target: "dashgrid.interaction",
            item = %active.item,
            x = ghost.rect.x,
            y = ghost.rect.y,
            w = ghost.rect.w,
            h = ghost.rect.h,
            "release on invalid ghost rejected"
        );
        let effect = InteractionEffect::Rejected {
            item: active.item.clone(),
            ghost,
            until,
            cause,
        };
        let next = InteractionState::Rejecting {
            item: active.item.clone(),
            ghost,
            until,
        };
        (Some(next), effect)
    }

    fn on_cancel(&self, reason: CancelReason) -> Step {
        match &self.state {
            InteractionState::Dragging(active) | InteractionState::Resizing(active) => {
                let effect = InteractionEffect::Canceled {
                    item: active.item.clone(),
                    reason,
                };
                (Some(InteractionState::Idle), effect)
            }
            InteractionState::Idle | InteractionState::Rejecting { .. } => {
                (None, InteractionEffect::noop(NoopReason::IdleWithoutActiveInteraction))
            }
        }
    }
}

/// Ghost for the pointer at `position`. `None` when the item is gone.
fn evaluate(
    active: &ActiveInteraction,
    resizing: bool,
    position: PointerPosition,
    grid: MeasuredGrid,
    ctx: &InteractionContext<'_>,
) -> Option<(Ghost, Option<StoreError>)> {
    let item = ctx.store.get(&active.item)?;
    let metrics = grid.metrics;
    let columns = ctx.store.columns();

    if resizing {
        let corner = grid.rect(active.origin);
        let span = snap_to_size(
            position.x - corner.left,
            position.y - corner.top,
            grid.col_width,
            metrics.row_height,
            active.origin.x,
            &item.constraints(columns),
            columns,
        );
        Some(check_resize(active, span.w, span.h, ctx))
    } else {
        let point = snap_to_grid(
            position.x - active.grab_offset.x,
            position.y - active.grab_offset.y,
            grid.col_width,
            metrics.row_height,
            metrics.gap,
            active.origin.w,
            active.origin.h,
            columns,
        );
        Some(check_move(active, point.x, point.y, ctx))
    }
}

/// Re-check the current ghost without new pointer geometry.
fn revalidate(
    active: &ActiveInteraction,
    resizing: bool,
    ctx: &InteractionContext<'_>,
) -> Option<(Ghost, Option<StoreError>)> {
    ctx.store.get(&active.item)?;
    let rect = active.ghost.rect;
    if resizing {
        Some(check_resize(active, rect.w, rect.h, ctx))
    } else {
        Some(check_move(active, rect.x, rect.y, ctx))
    }
}

fn check_move(
    active: &ActiveInteraction,
    x: u32,
    y: u32,
    ctx: &InteractionContext<'_>,
) -> (Ghost, Option<StoreError>) {
    match ctx.store.plan_move(&active.item, x, y) {
        Ok(rect) => (Ghost { rect, valid: true }, None),
        Err(err) => (
            Ghost {
                rect: active.origin.with_origin(x, y),
                valid: false,
            },
            Some(err),
        ),
    }
}

fn check_resize(
    active: &ActiveInteraction,
    w: u32,
    h: u32,
    ctx: &InteractionContext<'_>,
) -> (Ghost, Option<StoreError>) {
    match ctx.store.plan_resize(&active.item, w, h, ctx.policy) {
        Ok(plan) => (
            Ghost {
                rect: plan.rect,
                valid: true,
            },
            None,
        ),
        Err(err) => (
            Ghost {
                rect: active.origin.with_size(w, h),
                valid: false,
            },
            Some(err),
        ),
    }
}
