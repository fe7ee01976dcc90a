//! Provider Adapter Integration Tests
//!
//! The remote and local adapters against a mock HTTP server: request
//! shape, response parsing, status and timeout mapping.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nudge::adapters::{AiProvider, CallBudget, OllamaProvider, OpenAiProvider, ProviderError, ProviderRequest};
use nudge::domain::TaskSource;

fn budget() -> CallBudget {
    CallBudget {
        first_response: Duration::from_secs(2),
        overall: Duration::from_secs(5),
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [
            { "message": { "role": "assistant", "content": content } }
        ]
    })
}

fn remote(server: &MockServer) -> OpenAiProvider {
    OpenAiProvider::new(server.uri(), "gpt-4o-mini", Some("test-key".to_string()))
}

#[tokio::test]
async fn test_remote_extract_parses_fenced_json() {
    let server = MockServer::start().await;
    let content = "```json\n{\"tasks\":[{\"content\":\"Call Jake\",\"actionType\":\"CALL\",\"contactName\":\"Jake\",\"isActionable\":true},{\"content\":\"Book dentist\",\"actionType\":\"calendar\"}]}\n```";

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(content)))
        .expect(1)
        .mount(&server)
        .await;

    let tasks = remote(&server)
        .extract(&ProviderRequest::new("call jake and book the dentist"), budget())
        .await
        .unwrap();

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].content.as_deref(), Some("Call Jake"));
    assert_eq!(tasks[0].action_type.as_deref(), Some("CALL"));
    assert_eq!(tasks[0].contact_name.as_deref(), Some("Jake"));
    assert_eq!(tasks[1].content.as_deref(), Some("Book dentist"));
    assert!(tasks[1].is_actionable);
}

#[tokio::test]
async fn test_remote_chat_returns_trimmed_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  One step at a time.  \n")))
        .mount(&server)
        .await;

    let reply = remote(&server)
        .chat(&ProviderRequest::new("I'm so overwhelmed"), budget())
        .await
        .unwrap();
    assert_eq!(reply, "One step at a time.");
}

#[tokio::test]
async fn test_remote_server_error_maps_to_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = remote(&server)
        .extract(&ProviderRequest::new("buy milk"), budget())
        .await
        .unwrap_err();

    match err {
        ProviderError::Status { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("upstream exploded"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_remote_slow_headers_time_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("{\"tasks\":[]}"))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;

    let tight = CallBudget {
        first_response: Duration::from_millis(100),
        overall: Duration::from_millis(300),
    };
    let err = remote(&server)
        .extract(&ProviderRequest::new("buy milk"), tight)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ProviderError::Timeout {
            stage: "first response",
            after_ms: 100
        }
    );
}

#[tokio::test]
async fn test_remote_non_json_content_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Sure! Here are your tasks: milk")))
        .mount(&server)
        .await;

    let err = remote(&server)
        .extract(&ProviderRequest::new("buy milk"), budget())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Malformed(_)));
}

#[tokio::test]
async fn test_remote_empty_choices_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = remote(&server)
        .chat(&ProviderRequest::new("hello"), budget())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Malformed(_)));
}

#[tokio::test]
async fn test_remote_without_key_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(server.uri(), "gpt-4o-mini", None);
    assert!(!provider.is_available());

    let err = provider
        .extract(&ProviderRequest::new("buy milk"), budget())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Unconfigured(_)));
}

#[tokio::test]
async fn test_local_extract_uses_api_chat() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({ "model": "llama3.2", "stream": false, "format": "json" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2",
            "message": {
                "role": "assistant",
                "content": "{\"tasks\":[{\"content\":\"Water the plants\"}]}"
            },
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(server.uri(), "llama3.2");
    assert_eq!(provider.tier(), TaskSource::Local);

    let tasks = provider
        .extract(&ProviderRequest::new("the plants are dying"), budget())
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].content.as_deref(), Some("Water the plants"));
}

#[tokio::test]
async fn test_local_unreachable_is_transport_error() {
    // Nothing listens on the discard port
    let provider = OllamaProvider::new("http://127.0.0.1:9", "llama3.2");

    let err = provider
        .chat(&ProviderRequest::new("hello"), budget())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Transport(_) | ProviderError::Timeout { .. }));
}
