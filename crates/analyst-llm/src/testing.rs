//! Offline provider for tests and demos

use crate::{CompletionRequest, CompletionResponse, LLMProvider, Result};
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

type Responder = dyn Fn(&CompletionRequest) -> Result<String> + Send + Sync;

/// Provider that answers every request with a closure and records the requests
///
/// ```
/// use analyst_llm::testing::ScriptedProvider;
///
/// let provider = ScriptedProvider::new(|req| {
///     Ok(match req.schema_name() {
///         Some("planner_output") => r#"{"intent":"stock_analysis","ticker":"AAPL","reasoning":"r"}"#.into(),
///         _ => "free text".into(),
///     })
/// });
/// assert_eq!(provider.call_count(), 0);
/// ```
pub struct ScriptedProvider {
    responder: Box<Responder>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with the same text
    pub fn always(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Requests received so far, in order
    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let reply = (self.responder)(&request);
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        reply.map(CompletionResponse::text)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LLMError, Message};

    #[tokio::test]
    async fn test_records_requests() {
        let provider = ScriptedProvider::always("ok");
        let request = CompletionRequest::builder("m").add_message(Message::user("q")).build();

        let response = provider.complete(request).await.unwrap();
        assert_eq!(response.message.text(), "ok");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.calls()[0].user_text(), "q");
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let provider = ScriptedProvider::new(|_| Err(LLMError::RequestFailed("down".into())));
        let request = CompletionRequest::builder("m").build();
        tokio_test::assert_err!(provider.complete(request).await);
        assert_eq!(provider.call_count(), 1);
    }
}
