//! Progress events and the per-run status sink
//!
//! Stages push human-readable [`StatusEvent`]s while they work. A streaming
//! transport attaches a channel to the run and forwards whatever arrives; when
//! nothing is attached the events are dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

/// Kind of a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Start,
    Step,
    Status,
    Complete,
    Error,
}

/// A single progress notification
///
/// Serializes flat, e.g. `{"type":"step","node":"planner","label":"...","ticker":"AAPL"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Node-specific fields, flattened into the top-level object
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl StatusEvent {
    fn new(kind: EventKind) -> Self {
        Self {
            kind,
            node: None,
            label: None,
            message: None,
            payload: Map::new(),
        }
    }

    pub fn start(message: impl Into<String>) -> Self {
        Self::new(EventKind::Start).with_message(message)
    }

    /// A stage finished and its output is attached as payload
    pub fn step(
        node: impl Into<String>,
        label: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut event = Self::new(EventKind::Step).with_message(message);
        event.node = Some(node.into());
        event.label = Some(label.into());
        event
    }

    /// Intermediate progress from inside a stage
    pub fn status(
        node: impl Into<String>,
        label: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut event = Self::new(EventKind::Status).with_message(message);
        event.node = Some(node.into());
        event.label = Some(label.into());
        event
    }

    pub fn complete() -> Self {
        Self::new(EventKind::Complete)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventKind::Error).with_message(message)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach one node-specific field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Attach every field of a JSON object; non-object values are ignored
    pub fn with_payload(mut self, value: Value) -> Self {
        if let Value::Object(map) = value {
            self.payload.extend(map);
        }
        self
    }

    /// `complete` and `error` end a stream
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventKind::Complete | EventKind::Error)
    }
}

/// Sender half of a run's status channel
///
/// Cloning is cheap. A detached emitter (the default) silently discards events.
#[derive(Debug, Clone, Default)]
pub struct StatusEmitter {
    sink: Option<mpsc::UnboundedSender<StatusEvent>>,
}

impl StatusEmitter {
    /// Emitter with no listener
    pub fn detached() -> Self {
        Self::default()
    }

    /// Emitter forwarding into `sink`
    pub fn new(sink: mpsc::UnboundedSender<StatusEvent>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Create an emitter together with the receiver a transport drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Enqueue an event if a listener is attached; otherwise drop it
    pub fn emit(&self, event: StatusEvent) {
        if let Some(sink) = &self.sink {
            if sink.send(event).is_err() {
                tracing::trace!("Status listener gone, dropping event");
            }
        }
    }

    pub fn is_attached(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| !s.is_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_serializes_flat() {
        let event = StatusEvent::step("planner", "Understanding your request", "Identified ticker: AAPL")
            .with_field("ticker", "AAPL")
            .with_field("intent", "stock_analysis");

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "step",
                "node": "planner",
                "label": "Understanding your request",
                "message": "Identified ticker: AAPL",
                "ticker": "AAPL",
                "intent": "stock_analysis",
            })
        );
    }

    #[test]
    fn test_complete_has_only_type() {
        let value = serde_json::to_value(StatusEvent::complete()).unwrap();
        assert_eq!(value, json!({"type": "complete"}));
    }

    #[test]
    fn test_deserialize_collects_extra_fields() {
        let event: StatusEvent =
            serde_json::from_value(json!({"type": "status", "node": "analysis", "message": "x", "extra": 3}))
                .unwrap();
        assert_eq!(event.kind, EventKind::Status);
        assert_eq!(event.payload.get("extra"), Some(&json!(3)));
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_with_payload_ignores_non_objects() {
        let event = StatusEvent::complete().with_payload(json!([1, 2]));
        assert!(event.payload.is_empty());
    }

    #[test]
    fn test_detached_emitter_drops() {
        let emitter = StatusEmitter::detached();
        assert!(!emitter.is_attached());
        emitter.emit(StatusEvent::start("ignored"));
    }

    #[test]
    fn test_channel_delivers_in_order() {
        let (emitter, mut rx) = StatusEmitter::channel();
        emitter.emit(StatusEvent::start("a"));
        emitter.emit(StatusEvent::error("b"));

        assert_eq!(rx.try_recv().unwrap().kind, EventKind::Start);
        let last = rx.try_recv().unwrap();
        assert!(last.is_terminal());
        assert_eq!(last.message.as_deref(), Some("b"));
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (emitter, rx) = StatusEmitter::channel();
        drop(rx);
        assert!(!emitter.is_attached());
        emitter.emit(StatusEvent::complete());
    }
}
