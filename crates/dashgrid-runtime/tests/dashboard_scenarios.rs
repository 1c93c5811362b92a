#![forbid(unsafe_code)]

//! End-to-end dashboard scenarios driven through [`Engine`].
//!
//! Geometry used throughout: a 1192px container with 12 columns and 8px gaps
//! gives 92px columns (100px column pitch) and 80px rows (88px row pitch).
//!
//! Run:
//!   cargo test -p dashgrid-runtime --test dashboard_scenarios

use std::cell::RefCell;
use std::rc::Rc;

use dashgrid_core::geometry::{GridPoint, GridRect, GridSpan, PixelRect};
use dashgrid_layout::{
    ConflictPolicy, ItemId, LayoutItem, find_first_available, invariant_report,
};
use dashgrid_runtime::{
    Engine, GridConfig, InteractionEffect, InteractionPhase, Key, NoopReason, PointerHandle,
    PointerPosition, WidgetDefinition, WidgetRegistry, WidgetRenderError,
};
use web_time::{Duration, Instant};

const WIDTH: f64 = 1192.0;
const POINTER: u32 = 1;

fn label(item: &LayoutItem, _rect: PixelRect) -> Result<String, WidgetRenderError> {
    Ok(item.kind.clone())
}

fn registry() -> WidgetRegistry {
    let mut registry = WidgetRegistry::new();
    for (key, name) in [("chart", "Chart"), ("note", "Note"), ("table", "Table")] {
        registry
            .register(key, WidgetDefinition::new(name, GridSpan::new(2, 2), label))
            .expect("valid definition");
    }
    registry
}

type Calls = Rc<RefCell<Vec<Vec<LayoutItem>>>>;

fn engine_with(config: GridConfig, items: Vec<LayoutItem>) -> (Engine, Calls) {
    let calls: Calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    let mut engine = Engine::new(config, registry(), items)
        .on_layout_change(move |layout| sink.borrow_mut().push(layout.to_vec()));
    engine.set_container_width(WIDTH);
    (engine, calls)
}

fn engine(items: Vec<LayoutItem>) -> (Engine, Calls) {
    engine_with(GridConfig::default(), items)
}

fn at(x: f64, y: f64) -> PointerPosition {
    PointerPosition::new(x, y)
}

fn rect_of(engine: &Engine, id: &str) -> GridRect {
    engine
        .store()
        .get(&ItemId::new(id))
        .map(LayoutItem::rect)
        .expect("item present")
}

fn assert_clean(engine: &Engine) {
    let report = invariant_report(engine.layout(), engine.config().columns);
    assert!(report.is_clean(), "layout invariants broken: {:?}", report.issues);
}

// ---------------------------------------------------------------------------
// Scenario 1: auto-placement
// ---------------------------------------------------------------------------

#[test]
fn first_fit_lands_right_of_existing_widget() {
    let layout = vec![LayoutItem::new("a", "chart", 0, 0, 4, 2)];
    assert_eq!(
        find_first_available(&layout, 2, 2, 12),
        Some(GridPoint::new(4, 0))
    );

    let (mut engine, calls) = engine(layout);
    let id = engine.add_widget("note", Instant::now()).expect("room");
    assert_eq!(rect_of(&engine, id.as_str()), GridRect::new(4, 0, 2, 2));
    assert_eq!(calls.borrow().len(), 1);
    assert_clean(&engine);
}

// ---------------------------------------------------------------------------
// Scenario 2: drag onto a neighbor
// ---------------------------------------------------------------------------

#[test]
fn drag_onto_neighbor_is_rejected_without_callback() {
    let now = Instant::now();
    let (mut engine, calls) = engine(vec![
        LayoutItem::new("a", "chart", 0, 0, 2, 2),
        LayoutItem::new("b", "chart", 4, 0, 2, 2),
    ]);

    engine
        .pointer_down("a", PointerHandle::Drag, POINTER, at(10.0, 10.0), now)
        .expect("valid");
    engine.pointer_move(POINTER, at(410.0, 10.0), now).expect("valid");
    let ghost = engine.ghost().expect("dragging shows a ghost");
    assert_eq!(ghost.rect, GridRect::new(4, 0, 2, 2));
    assert!(!ghost.valid);

    let release = engine.pointer_up(POINTER, at(410.0, 10.0), now).expect("valid");
    assert!(matches!(release.effect, InteractionEffect::Rejected { .. }));
    assert_eq!(engine.phase(), InteractionPhase::Rejecting);
    assert_eq!(rect_of(&engine, "a"), GridRect::new(0, 0, 2, 2));
    assert!(calls.borrow().is_empty());

    let plan = engine.render(WIDTH).expect("measured");
    let ghost = plan.ghost.expect("shaking ghost");
    assert!(ghost.shake);
    assert!(!ghost.valid);

    let report = engine.tick(now + Duration::from_millis(400));
    assert!(report.rejection_cleared);
    assert_eq!(engine.phase(), InteractionPhase::Idle);
    assert!(engine.ghost().is_none());
    assert!(calls.borrow().is_empty());
}

#[test]
fn drag_to_free_space_commits_once() {
    let now = Instant::now();
    let (mut engine, calls) = engine(vec![
        LayoutItem::new("a", "chart", 0, 0, 2, 2),
        LayoutItem::new("b", "chart", 4, 0, 2, 2),
    ]);

    engine
        .pointer_down("a", PointerHandle::Drag, POINTER, at(10.0, 10.0), now)
        .expect("valid");
    // Several moves, one release: exactly one callback.
    for x in [60.0, 160.0, 260.0, 710.0] {
        engine.pointer_move(POINTER, at(x, 10.0), now).expect("valid");
    }
    engine.pointer_up(POINTER, at(710.0, 10.0), now).expect("valid");

    assert_eq!(rect_of(&engine, "a"), GridRect::new(7, 0, 2, 2));
    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], engine.layout());
    assert_clean(&engine);
}

#[test]
fn drop_back_at_origin_does_not_call_back() {
    let now = Instant::now();
    let (mut engine, calls) = engine(vec![LayoutItem::new("a", "chart", 0, 0, 2, 2)]);
    engine
        .pointer_down("a", PointerHandle::Drag, POINTER, at(10.0, 10.0), now)
        .expect("valid");
    engine.pointer_move(POINTER, at(300.0, 10.0), now).expect("valid");
    engine.pointer_up(POINTER, at(12.0, 12.0), now).expect("valid");
    assert_eq!(engine.phase(), InteractionPhase::Idle);
    assert!(calls.borrow().is_empty());
}

#[test]
fn drag_clamps_to_right_edge() {
    let now = Instant::now();
    let (mut engine, _) = engine(vec![LayoutItem::new("a", "chart", 0, 0, 3, 1)]);
    engine
        .pointer_down("a", PointerHandle::Drag, POINTER, at(10.0, 10.0), now)
        .expect("valid");
    engine.pointer_move(POINTER, at(5000.0, 10.0), now).expect("valid");
    engine.pointer_up(POINTER, at(5000.0, 10.0), now).expect("valid");
    assert_eq!(rect_of(&engine, "a"), GridRect::new(9, 0, 3, 1));
}

#[test]
fn far_drags_never_share_the_last_rows() {
    let now = Instant::now();
    let (mut engine, calls) = engine(vec![
        LayoutItem::new("a", "chart", 0, 0, 2, 2),
        LayoutItem::new("b", "chart", 4, 0, 2, 2),
    ]);
    let last = u32::MAX - 2;

    engine
        .pointer_down("a", PointerHandle::Drag, POINTER, at(10.0, 10.0), now)
        .expect("valid");
    engine.pointer_move(POINTER, at(10.0, 1e12), now).expect("valid");
    engine.pointer_up(POINTER, at(10.0, 1e12), now).expect("valid");
    assert_eq!(rect_of(&engine, "a"), GridRect::new(0, last, 2, 2));

    engine
        .pointer_down("b", PointerHandle::Drag, POINTER, at(410.0, 10.0), now)
        .expect("valid");
    engine.pointer_move(POINTER, at(10.0, 1e12), now).expect("valid");
    let ghost = engine.ghost().expect("dragging");
    assert_eq!(ghost.rect, GridRect::new(0, last, 2, 2));
    assert!(!ghost.valid);
    let release = engine.pointer_up(POINTER, at(10.0, 1e12), now).expect("valid");

    assert!(matches!(release.effect, InteractionEffect::Rejected { .. }));
    assert_eq!(rect_of(&engine, "b"), GridRect::new(4, 0, 2, 2));
    assert_eq!(calls.borrow().len(), 1);
    assert_clean(&engine);
}

// ---------------------------------------------------------------------------
// Scenario 3: resize with push-down
// ---------------------------------------------------------------------------

#[test]
fn resize_pushes_neighbor_below_new_bottom() {
    let now = Instant::now();
    let (mut engine, calls) = engine(vec![
        LayoutItem::new("a", "chart", 0, 0, 2, 1),
        LayoutItem::new("b", "chart", 0, 2, 2, 2),
    ]);

    engine
        .pointer_down("a", PointerHandle::Resize, POINTER, at(184.0, 80.0), now)
        .expect("valid");
    engine.pointer_move(POINTER, at(184.0, 340.0), now).expect("valid");
    let ghost = engine.ghost().expect("resize ghost");
    assert!(ghost.valid, "push-down can resolve the overlap");
    engine.pointer_up(POINTER, at(184.0, 340.0), now).expect("valid");

    assert_eq!(rect_of(&engine, "a"), GridRect::new(0, 0, 2, 4));
    assert!(rect_of(&engine, "b").y >= 4);
    assert_eq!(calls.borrow().len(), 1);
    assert_clean(&engine);
}

#[test]
fn resize_past_push_depth_is_refused_with_notification() {
    let now = Instant::now();
    let column: Vec<_> = (0..12)
        .map(|i| LayoutItem::new(format!("s{i}"), "note", 0, i, 1, 1))
        .collect();
    let (mut engine, calls) = engine(column.clone());

    engine
        .pointer_down("s0", PointerHandle::Resize, POINTER, at(92.0, 80.0), now)
        .expect("valid");
    engine.pointer_move(POINTER, at(92.0, 160.0), now).expect("valid");
    assert!(engine.ghost().is_some_and(|g| !g.valid));
    let release = engine.pointer_up(POINTER, at(92.0, 160.0), now).expect("valid");

    assert!(matches!(release.effect, InteractionEffect::Rejected { .. }));
    assert_eq!(engine.layout(), column.as_slice());
    assert!(calls.borrow().is_empty());
    let messages: Vec<_> = engine.notifications().map(|n| n.message.clone()).collect();
    assert_eq!(
        messages,
        ["Cannot resize: not enough space to push displaced widgets"]
    );

    engine.tick(now + Duration::from_millis(3000));
    assert_eq!(engine.notifications().count(), 0);
}

#[test]
fn clamp_policy_stops_at_neighbor() {
    let now = Instant::now();
    let config = GridConfig::default().with_conflict_policy(ConflictPolicy::ClampToNeighbors);
    let (mut engine, calls) = engine_with(
        config,
        vec![
            LayoutItem::new("a", "chart", 0, 0, 2, 1),
            LayoutItem::new("b", "chart", 0, 2, 2, 2),
        ],
    );
    engine
        .pointer_down("a", PointerHandle::Resize, POINTER, at(184.0, 80.0), now)
        .expect("valid");
    engine.pointer_up(POINTER, at(184.0, 340.0), now).expect("valid");

    assert_eq!(rect_of(&engine, "a"), GridRect::new(0, 0, 2, 2));
    assert_eq!(rect_of(&engine, "b"), GridRect::new(0, 2, 2, 2));
    assert_eq!(calls.borrow().len(), 1);
}

#[test]
fn reject_policy_refuses_overlapping_resize() {
    let now = Instant::now();
    let config = GridConfig::default().with_conflict_policy(ConflictPolicy::RejectOverlap);
    let (mut engine, calls) = engine_with(
        config,
        vec![
            LayoutItem::new("a", "chart", 0, 0, 2, 1),
            LayoutItem::new("b", "chart", 0, 2, 2, 2),
        ],
    );
    engine
        .pointer_down("a", PointerHandle::Resize, POINTER, at(184.0, 80.0), now)
        .expect("valid");
    engine.pointer_up(POINTER, at(184.0, 340.0), now).expect("valid");

    assert_eq!(rect_of(&engine, "a"), GridRect::new(0, 0, 2, 1));
    assert!(calls.borrow().is_empty());
    // Silent reject: only push-down failures notify.
    assert_eq!(engine.notifications().count(), 0);
}

#[test]
fn resize_respects_item_limits() {
    let now = Instant::now();
    let (mut engine, _) = engine(vec![
        LayoutItem::new("a", "chart", 0, 0, 2, 2)
            .with_min_size(2, 2)
            .with_max_size(Some(3), Some(3)),
    ]);
    engine
        .pointer_down("a", PointerHandle::Resize, POINTER, at(192.0, 168.0), now)
        .expect("valid");
    engine.pointer_up(POINTER, at(2000.0, 2000.0), now).expect("valid");
    assert_eq!(rect_of(&engine, "a"), GridRect::new(0, 0, 3, 3));

    engine
        .pointer_down("a", PointerHandle::Resize, POINTER, at(292.0, 256.0), now)
        .expect("valid");
    engine.pointer_up(POINTER, at(1.0, 1.0), now).expect("valid");
    assert_eq!(rect_of(&engine, "a"), GridRect::new(0, 0, 2, 2));
}

// ---------------------------------------------------------------------------
// Scenario 4: cancel mid-drag
// ---------------------------------------------------------------------------

#[test]
fn escape_mid_drag_restores_everything() {
    let now = Instant::now();
    let (mut engine, calls) = engine(vec![LayoutItem::new("a", "chart", 0, 0, 2, 2)]);
    engine
        .pointer_down("a", PointerHandle::Drag, POINTER, at(10.0, 10.0), now)
        .expect("valid");
    engine.pointer_move(POINTER, at(510.0, 186.0), now).expect("valid");
    assert_eq!(engine.ghost().map(|g| g.rect), Some(GridRect::new(5, 2, 2, 2)));

    engine.key_down(Key::Escape, now).expect("valid");
    assert!(engine.ghost().is_none());
    assert_eq!(engine.phase(), InteractionPhase::Idle);
    assert_eq!(rect_of(&engine, "a"), GridRect::new(0, 0, 2, 2));

    // The release that follows belongs to a finished interaction.
    let stale = engine.pointer_up(POINTER, at(510.0, 186.0), now).expect("valid");
    assert_eq!(
        stale.effect,
        InteractionEffect::Noop { reason: NoopReason::IdleWithoutActiveInteraction }
    );
    assert!(calls.borrow().is_empty());
}

#[test]
fn host_cancel_mid_resize_restores_span() {
    let now = Instant::now();
    let (mut engine, calls) = engine(vec![LayoutItem::new("a", "chart", 0, 0, 2, 2)]);
    engine
        .pointer_down("a", PointerHandle::Resize, POINTER, at(192.0, 168.0), now)
        .expect("valid");
    engine.pointer_move(POINTER, at(600.0, 600.0), now).expect("valid");
    engine.cancel(now).expect("valid");
    assert_eq!(rect_of(&engine, "a"), GridRect::new(0, 0, 2, 2));
    assert!(calls.borrow().is_empty());
}

// ---------------------------------------------------------------------------
// Scenario 5: remove with undo
// ---------------------------------------------------------------------------

#[test]
fn undo_before_expiry_keeps_widget() {
    let t0 = Instant::now();
    let (mut engine, calls) = engine(vec![LayoutItem::new("a", "chart", 0, 0, 2, 2)]);
    let id = ItemId::new("a");

    engine.request_remove(&id, t0).expect("present");
    let plan = engine.render(WIDTH).expect("measured");
    assert!(plan.widgets[0].pending_removal);

    engine.tick(t0 + Duration::from_millis(1500));
    assert!(engine.undo_remove(&id));
    let report = engine.tick(t0 + Duration::from_millis(5000));
    assert!(report.removed.is_empty());
    assert!(engine.store().contains(&id));
    assert!(calls.borrow().is_empty());
}

#[test]
fn expired_removal_cancels_drag_of_that_widget() {
    let t0 = Instant::now();
    let (mut engine, calls) = engine(vec![
        LayoutItem::new("a", "chart", 0, 0, 2, 2),
        LayoutItem::new("b", "chart", 2, 0, 2, 2),
    ]);
    let id = ItemId::new("a");
    engine.request_remove(&id, t0).expect("present");
    engine
        .pointer_down("a", PointerHandle::Drag, POINTER, at(10.0, 10.0), t0)
        .expect("valid");

    let report = engine.tick(t0 + Duration::from_millis(3000));
    assert_eq!(report.removed, vec![id]);
    assert_eq!(engine.phase(), InteractionPhase::Idle);
    assert_eq!(calls.borrow().len(), 1);
    assert_eq!(calls.borrow()[0].len(), 1);
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[test]
fn container_grows_with_ghost() {
    let now = Instant::now();
    let (mut engine, _) = engine(vec![LayoutItem::new("a", "chart", 0, 0, 2, 2)]);
    let before = engine.render(WIDTH).expect("measured").container_height;
    assert_eq!(before, 168.0);

    engine
        .pointer_down("a", PointerHandle::Drag, POINTER, at(10.0, 10.0), now)
        .expect("valid");
    engine.pointer_move(POINTER, at(10.0, 450.0), now).expect("valid");
    let plan = engine.render(WIDTH).expect("measured");
    let ghost = plan.ghost.as_ref().expect("ghost");
    assert_eq!(ghost.grid, GridRect::new(0, 5, 2, 2));
    // Seven rows: 7 * 80 + 6 * 8.
    assert_eq!(plan.container_height, 608.0);
    assert!(plan.widgets[0].interacting);
}

#[test]
fn unmeasured_container_blocks_interaction() {
    let now = Instant::now();
    let (mut engine, _) = engine(vec![LayoutItem::new("a", "chart", 0, 0, 2, 2)]);
    engine.set_container_width(0.0);
    let t = engine
        .pointer_down("a", PointerHandle::Drag, POINTER, at(10.0, 10.0), now)
        .expect("valid");
    assert_eq!(
        t.effect,
        InteractionEffect::Noop { reason: NoopReason::GeometryUnavailable }
    );
    assert!(engine.render(0.0).is_none());
}
