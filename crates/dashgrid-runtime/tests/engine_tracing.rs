#![forbid(unsafe_code)]

//! Structured logging contract of the engine.
//!
//! Captures events with a `tracing_subscriber` layer and asserts on targets,
//! levels and fields rather than on formatted output.
//!
//! Run:
//!   cargo test -p dashgrid-runtime --test engine_tracing

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dashgrid_core::geometry::{GridSpan, PixelRect};
use dashgrid_layout::LayoutItem;
use dashgrid_runtime::{
    Engine, GridConfig, PointerHandle, PointerPosition, WidgetDefinition, WidgetRegistry,
    WidgetRenderError,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use web_time::Instant;

// ============================================================================
// Tracing capture infrastructure
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    target: String,
    message: String,
    fields: HashMap<String, String>,
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for EventCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let message = fields.get("message").cloned().unwrap_or_default();
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message,
            fields,
        });
    }
}

fn with_captured_tracing<F>(f: F) -> Vec<CapturedEvent>
where
    F: FnOnce(),
{
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = EventCapture {
        events: Arc::clone(&events),
    };
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    captured
}

fn by_target<'a>(events: &'a [CapturedEvent], target: &str) -> Vec<&'a CapturedEvent> {
    events.iter().filter(|e| e.target == target).collect()
}

// ============================================================================
// Fixtures
// ============================================================================

fn label(item: &LayoutItem, _rect: PixelRect) -> Result<String, WidgetRenderError> {
    Ok(item.kind.clone())
}

fn failing(_item: &LayoutItem, _rect: PixelRect) -> Result<String, WidgetRenderError> {
    Err(WidgetRenderError::new("datasource offline"))
}

fn registry() -> WidgetRegistry {
    let mut registry = WidgetRegistry::new();
    registry
        .register("chart", WidgetDefinition::new("Chart", GridSpan::new(2, 2), label))
        .expect("valid");
    registry
        .register("feed", WidgetDefinition::new("Feed", GridSpan::new(2, 2), failing))
        .expect("valid");
    registry
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn invalid_config_values_warn_and_fall_back() {
    let events = with_captured_tracing(|| {
        let config = GridConfig {
            columns: 0,
            row_height: -5.0,
            ..GridConfig::default()
        };
        let engine = Engine::new(config, registry(), Vec::new());
        assert_eq!(engine.config().columns, 12);
        assert_eq!(engine.config().row_height, 80.0);
    });

    let warnings: Vec<_> = by_target(&events, "dashgrid.config")
        .into_iter()
        .filter(|e| e.level == tracing::Level::WARN)
        .collect();
    assert_eq!(warnings.len(), 2, "one warning per clamped value: {warnings:?}");
    assert_eq!(warnings[0].fields.get("fallback").map(String::as_str), Some("12"));
}

#[test]
fn dropped_initial_items_are_reported() {
    let events = with_captured_tracing(|| {
        let initial = vec![
            LayoutItem::new("a", "chart", 0, 0, 2, 2),
            LayoutItem::new("a", "chart", 4, 0, 2, 2),
            LayoutItem::new("wide", "chart", 0, 0, 20, 1),
        ];
        let engine = Engine::new(GridConfig::default(), registry(), initial);
        assert_eq!(engine.layout().len(), 1);
    });

    let store_warnings: Vec<_> = by_target(&events, "dashgrid.store")
        .into_iter()
        .filter(|e| e.level == tracing::Level::WARN)
        .collect();
    assert_eq!(store_warnings.len(), 2, "{store_warnings:?}");
    assert!(events
        .iter()
        .any(|e| e.target == "dashgrid.engine" && e.message.contains("initial layout repaired")));
}

#[test]
fn registry_overwrite_warns() {
    let events = with_captured_tracing(|| {
        let mut registry = registry();
        registry
            .register("chart", WidgetDefinition::new("Chart v2", GridSpan::new(3, 2), label))
            .expect("valid");
    });
    let warning = by_target(&events, "dashgrid.registry")
        .into_iter()
        .find(|e| e.level == tracing::Level::WARN)
        .expect("overwrite warning");
    assert_eq!(warning.fields.get("key").map(String::as_str), Some("chart"));
}

#[test]
fn renderer_failure_logs_error_with_item() {
    let mut engine = Engine::new(
        GridConfig::default(),
        registry(),
        vec![
            LayoutItem::new("ok", "chart", 0, 0, 2, 2),
            LayoutItem::new("bad", "feed", 2, 0, 2, 2),
        ],
    );
    let events = with_captured_tracing(|| {
        let plan = engine.render(1192.0).expect("measured");
        assert_eq!(plan.widgets.len(), 2);
    });
    let errors: Vec<_> = by_target(&events, "dashgrid.engine")
        .into_iter()
        .filter(|e| e.level == tracing::Level::ERROR)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].fields.get("item").map(String::as_str), Some("bad"));
    assert_eq!(
        errors[0].fields.get("error").map(String::as_str),
        Some("datasource offline")
    );
}

#[test]
fn phase_changes_are_traced() {
    let mut engine = Engine::new(
        GridConfig::default(),
        registry(),
        vec![LayoutItem::new("a", "chart", 0, 0, 2, 2)],
    );
    engine.set_container_width(1192.0);
    let now = Instant::now();
    let events = with_captured_tracing(|| {
        engine
            .pointer_down("a", PointerHandle::Drag, 1, PointerPosition::new(10.0, 10.0), now)
            .expect("valid");
        engine
            .pointer_up(1, PointerPosition::new(310.0, 10.0), now)
            .expect("valid");
    });

    let phases: Vec<_> = by_target(&events, "dashgrid.interaction")
        .into_iter()
        .filter_map(|e| Some((e.fields.get("from")?.clone(), e.fields.get("to")?.clone())))
        .collect();
    assert_eq!(
        phases,
        [
            ("idle".to_string(), "dragging".to_string()),
            ("dragging".to_string(), "idle".to_string()),
        ]
    );
    assert!(by_target(&events, "dashgrid.engine")
        .iter()
        .any(|e| e.message == "layout committed"));
    assert!(by_target(&events, "dashgrid.store")
        .iter()
        .any(|e| e.message == "item moved"));
}
