use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use analyst_llm::providers::{OpenAIConfig, OpenAIProvider};
use analyst_llm::{CompletionRequest, LLMError, LLMProvider, Message, ModelGateway, StopReason};
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn provider_for(server: &MockServer, max_retries: u32) -> OpenAIProvider {
    let config = OpenAIConfig::new("sk-test")
        .with_api_base(server.uri())
        .with_timeout(5)
        .with_max_retries(max_retries)
        .with_initial_backoff(Duration::from_millis(1));
    OpenAIProvider::with_config(config).unwrap()
}

fn ok_body(content: &str) -> serde_json::Value {
    json!({
        "choices": [{
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 20 }
    })
}

fn request() -> CompletionRequest {
    CompletionRequest::builder("sonar")
        .system("You are terse")
        .add_message(Message::user("hi"))
        .build()
}

struct FailThenSucceed {
    calls: Arc<AtomicUsize>,
    failures: usize,
    status: u16,
}

impl Respond for FailThenSucceed {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            ResponseTemplate::new(self.status).set_body_string("try later")
        } else {
            ResponseTemplate::new(200).set_body_json(ok_body("recovered"))
        }
    }
}

#[tokio::test]
async fn parses_content_and_usage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "sonar",
            "messages": [
                {"role": "system", "content": "You are terse"},
                {"role": "user", "content": "hi"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("hello")))
        .expect(1)
        .mount(&server)
        .await;

    let response = provider_for(&server, 0).complete(request()).await.unwrap();
    assert_eq!(response.message.text(), "hello");
    assert_eq!(response.stop_reason, StopReason::EndTurn);
    assert_eq!(response.usage.total(), 30);
}

#[tokio::test]
async fn retries_server_errors_then_succeeds() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(FailThenSucceed {
            calls: calls.clone(),
            failures: 2,
            status: 503,
        })
        .mount(&server)
        .await;

    let response = provider_for(&server, 5).complete(request()).await.unwrap();
    assert_eq!(response.message.text(), "recovered");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retries_rate_limits_until_exhausted() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(FailThenSucceed {
            calls: calls.clone(),
            failures: usize::MAX,
            status: 429,
        })
        .mount(&server)
        .await;

    let err = provider_for(&server, 2).complete(request()).await.unwrap_err();
    assert!(matches!(err, LLMError::RateLimitExceeded(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn authentication_failure_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = provider_for(&server, 5).complete(request()).await.unwrap_err();
    assert!(matches!(err, LLMError::AuthenticationFailed));
}

#[tokio::test]
async fn missing_choices_is_unexpected_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = provider_for(&server, 0).complete(request()).await.unwrap_err();
    assert!(matches!(err, LLMError::UnexpectedResponse(_)));
}

#[derive(Debug, Deserialize)]
struct TickerOnly {
    ticker: String,
}

impl analyst_llm::StructuredOutput for TickerOnly {
    const NAME: &'static str = "ticker_only";

    fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {"ticker": {"type": "string"}},
            "required": ["ticker"],
            "additionalProperties": false
        })
    }
}

#[tokio::test]
async fn gateway_sends_json_schema_response_format() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "temperature": 0.0,
            "response_format": {
                "type": "json_schema",
                "json_schema": {"name": "ticker_only", "strict": true}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(r#"{"ticker":"NVDA"}"#)))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = ModelGateway::new(Arc::new(provider_for(&server, 0)), "sonar");
    let out: TickerOnly = gateway
        .invoke_structured("Extract the ticker", "Analyze Nvidia")
        .await
        .unwrap();
    assert_eq!(out.ticker, "NVDA");
}
