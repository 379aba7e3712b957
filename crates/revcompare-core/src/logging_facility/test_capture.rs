//! In-memory event capture for logging assertions in tests
//!
//! Comparisons report degraded fields and not-registered relations only
//! through logs, so tests read those diagnostics back from here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// One recorded event, every field rendered as text
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub op: Option<String>,
    pub event: Option<String>,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

struct TextFields(HashMap<String, String>);

impl Visit for TextFields {
    // Integers and booleans reach here too; their Debug form is the plain value.
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }
}

type Buffer = Arc<Mutex<Vec<CapturedEvent>>>;

struct CaptureLayer(Buffer);

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = TextFields(HashMap::new());
        event.record(&mut fields);
        let fields = fields.0;
        let captured = CapturedEvent {
            level: *event.metadata().level(),
            op: fields.get("op").cloned(),
            event: fields.get("event").cloned(),
            fields,
        };
        if let Ok(mut buffer) = self.0.lock() {
            buffer.push(captured);
        }
    }
}

/// Shared view of everything captured so far
#[derive(Clone)]
pub struct TestCapture(Buffer);

impl TestCapture {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.0.lock().map(|buffer| buffer.clone()).unwrap_or_default()
    }

    /// Events at WARN level or above
    pub fn warnings(&self) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.level <= Level::WARN)
            .collect()
    }

    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CapturedEvent) -> bool,
    {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

static CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capture layer as the global subscriber, once per process
///
/// Every test in a binary shares one buffer; filter on values unique to the
/// test.
///
/// ```
/// use revcompare_core::logging_facility::test_capture::init_test_capture;
/// use revcompare_core::log_op_start;
///
/// let capture = init_test_capture();
/// log_op_start!("doc_capture_example");
/// assert_eq!(capture.count_events(|e| e.op.as_deref() == Some("doc_capture_example")), 1);
/// ```
pub fn init_test_capture() -> TestCapture {
    CAPTURE
        .get_or_init(|| {
            let buffer = Buffer::default();
            let _ = tracing_subscriber::registry()
                .with(CaptureLayer(buffer.clone()))
                .try_init();
            TestCapture(buffer)
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_filter_by_level() {
        let buffer = Buffer::default();
        let capture = TestCapture(buffer.clone());
        let subscriber = tracing_subscriber::registry().with(CaptureLayer(buffer));
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(op = "resolve", event = "degraded", field = "pets");
            tracing::info!(op = "compare", event = "end", duration_ms = 3u64);
        });

        let warned = capture.warnings();
        assert_eq!(warned.len(), 1);
        assert_eq!(warned[0].op.as_deref(), Some("resolve"));
        assert_eq!(warned[0].field("field"), Some("pets"));
        assert_eq!(capture.count_events(|e| e.field("duration_ms") == Some("3")), 1);
    }
}
