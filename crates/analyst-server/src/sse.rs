//! Relay from a pipeline run's status channel to an SSE response
//!
//! The relay owns the run: it aborts the run task once a terminal event has
//! been forwarded, when no event arrives within the idle limit, or when the
//! client goes away.

use analyst_core::StatusEvent;
use axum::response::sse::Event;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use serde_json::json;
use tokio::time::timeout;
use tracing::{debug, warn};

pub type SseItem = Result<Event, Infallible>;

/// Serialize a status event as one `data:` frame
pub fn to_sse(event: &StatusEvent) -> SseItem {
    let frame = Event::default()
        .json_data(event)
        .unwrap_or_else(|e| Event::default().data(error_frame(&e.to_string())));
    Ok(frame)
}

fn error_frame(message: &str) -> String {
    json!({ "type": "error", "message": message }).to_string()
}

/// Forward events until exactly one terminal event has been sent
///
/// `limit` bounds the wait for each next event; every event restarts it.
pub async fn relay(
    mut events: mpsc::UnboundedReceiver<StatusEvent>,
    run: JoinHandle<()>,
    out: mpsc::Sender<SseItem>,
    limit: Duration,
) {
    let _ = out.send(to_sse(&StatusEvent::start("Starting analysis pipeline..."))).await;

    loop {
        let next = tokio::select! {
            () = out.closed() => {
                debug!("Client disconnected, cancelling run");
                break;
            }
            next = timeout(limit, events.recv()) => next,
        };

        let event = match next {
            Ok(Some(event)) => event,
            Ok(None) => StatusEvent::error("Pipeline terminated unexpectedly"),
            Err(_) => {
                warn!("No pipeline progress for {}s, cancelling", limit.as_secs());
                StatusEvent::error(format!("Pipeline timeout ({} min)", limit.as_secs() / 60))
            }
        };

        let terminal = event.is_terminal();
        if out.send(to_sse(&event)).await.is_err() || terminal {
            break;
        }
    }

    run.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_core::StatusEmitter;
    use tokio::sync::oneshot;

    async fn collect(mut rx: mpsc::Receiver<SseItem>) -> usize {
        let mut n = 0;
        while rx.recv().await.is_some() {
            n += 1;
        }
        n
    }

    #[tokio::test]
    async fn test_stops_after_terminal_event() {
        let (emitter, events) = StatusEmitter::channel();
        emitter.emit(StatusEvent::status("planner", "Working", "..."));
        emitter.emit(StatusEvent::complete());
        emitter.emit(StatusEvent::status("late", "Ignored", "..."));

        let run = tokio::spawn(async {});
        let (tx, rx) = mpsc::channel(16);
        relay(events, run, tx, Duration::from_secs(5)).await;

        // start, status, complete
        assert_eq!(collect(rx).await, 3);
    }

    #[tokio::test]
    async fn test_timeout_aborts_the_run() {
        let (_emitter, events) = StatusEmitter::channel();
        let (guard, dropped) = oneshot::channel::<()>();
        let run = tokio::spawn(async move {
            let _guard = guard;
            std::future::pending::<()>().await;
        });
        let (tx, rx) = mpsc::channel(16);

        relay(events, run, tx, Duration::from_millis(50)).await;

        // start, timeout error
        assert_eq!(collect(rx).await, 2);
        assert!(dropped.await.is_err());
    }

    #[tokio::test]
    async fn test_steady_progress_outlives_idle_limit() {
        let (emitter, events) = StatusEmitter::channel();
        let run = tokio::spawn(async move {
            for i in 0..10 {
                tokio::time::sleep(Duration::from_millis(30)).await;
                emitter.emit(StatusEvent::status("stock_info", "Searching", format!("query {i}")));
            }
            emitter.emit(StatusEvent::complete());
        });
        let (tx, rx) = mpsc::channel(64);

        relay(events, run, tx, Duration::from_millis(150)).await;

        // start, 10 status, complete
        assert_eq!(collect(rx).await, 12);
    }

    #[test]
    fn test_error_frame_escapes_message() {
        let frame = error_frame(r#"bad "value" at {line 1}"#);
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["type"], "error");
        assert_eq!(parsed["message"], r#"bad "value" at {line 1}"#);
    }

    #[tokio::test]
    async fn test_closed_channel_reports_error() {
        let (emitter, events) = StatusEmitter::channel();
        drop(emitter);
        let (tx, mut rx) = mpsc::channel(16);

        relay(events, tokio::spawn(async {}), tx, Duration::from_secs(5)).await;

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }
}
