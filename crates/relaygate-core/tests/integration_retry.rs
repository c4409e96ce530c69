#![allow(clippy::tests_outside_test_module, reason = "integration tests live in tests/ dir")]
#![allow(clippy::expect_used, reason = "panics are the assertion mechanism in tests")]

use relaygate_core::retry::{CancelSignal, ExecutionError, RetryExecutor};
use relaygate_core::{Credential, CredentialPool, UpstreamClient};
use relaygate_types::{ClassifierConfig, RetryPolicy, UpstreamConfig};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        fixed_delay_ms: 5,
        base_backoff_ms: 10,
        backoff_multiplier: 2.0,
        max_backoff_ms: 40,
    }
}

fn messages_body() -> serde_json::Value {
    serde_json::json!({
        "model": "claude-sonnet-4-5",
        "max_tokens": 16,
        "messages": [{"role": "user", "content": "Hi"}]
    })
}

fn success_body() -> serde_json::Value {
    serde_json::json!({
        "id": "msg_mock",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": "Hello from mock!"}]
    })
}

fn client_for(server: &MockServer) -> UpstreamClient {
    let config = UpstreamConfig { base_url: server.uri(), ..UpstreamConfig::default() };
    UpstreamClient::new(&config).expect("client")
}

fn pool(ids: &[&str]) -> CredentialPool {
    CredentialPool::new(ids.iter().map(|id| Credential::new(*id, format!("sk-{id}"))).collect(), 0)
        .expect("pool")
}

#[tokio::test]
async fn test_overload_then_success_keeps_same_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_json(serde_json::json!({
            "type": "error",
            "error": {"type": "overloaded_error", "message": "Overloaded"}
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-a"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .with_priority(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let p = pool(&["a", "b"]);
    let executor = RetryExecutor::new(fast_policy(), &ClassifierConfig::default());
    let body = messages_body();

    let result = executor
        .run("it-1", &p, &CancelSignal::never(), |credential, _attempt| {
            let client = &client;
            let body = &body;
            async move { client.send_messages(&credential, body).await }
        })
        .await
        .expect("second attempt succeeds");

    assert_eq!(result.attempts, 2);
    assert_eq!(result.credential_id, "a");
    assert_eq!(result.value["id"], "msg_mock");
}

#[tokio::test]
async fn test_server_error_rotates_to_next_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-a"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let p = pool(&["a", "b"]);
    let executor = RetryExecutor::new(fast_policy(), &ClassifierConfig::default());
    let body = messages_body();

    let result = executor
        .run("it-2", &p, &CancelSignal::never(), |credential, _attempt| {
            let client = &client;
            let body = &body;
            async move { client.send_messages(&credential, body).await }
        })
        .await
        .expect("rotated key succeeds");

    assert_eq!(result.credential_id, "b");
    assert_eq!(p.stats()[0].consecutive_failures, 1);
}

#[tokio::test]
async fn test_bad_request_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "type": "error",
            "error": {"type": "invalid_request_error", "message": "max_tokens: Field required"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let p = pool(&["a"]);
    let executor = RetryExecutor::new(fast_policy(), &ClassifierConfig::default());
    let body = messages_body();

    let err = executor
        .run("it-3", &p, &CancelSignal::never(), |credential, _attempt| {
            let client = &client;
            let body = &body;
            async move { client.send_messages(&credential, body).await }
        })
        .await
        .expect_err("400 without signature text is terminal");

    match err {
        ExecutionError::NonRetryable { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("max_tokens"));
        },
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_signature_failure_exhausts_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "type": "error",
            "error": {
                "type": "invalid_request_error",
                "message": "messages.1.content.0: Invalid `signature` in `thinking` block"
            }
        })))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let p = pool(&["a", "b"]);
    let executor = RetryExecutor::new(fast_policy(), &ClassifierConfig::default());
    let body = messages_body();

    let err = executor
        .run("it-4", &p, &CancelSignal::never(), |credential, _attempt| {
            let client = &client;
            let body = &body;
            async move { client.send_messages(&credential, body).await }
        })
        .await
        .expect_err("signature failure never clears");

    assert!(matches!(err, ExecutionError::RetriesExhausted { attempts: 3, last_status: 400, .. }));
    // Signature failures are not the credential's fault.
    assert_eq!(p.stats()[0].total_failures, 0);
}

#[tokio::test]
async fn test_connection_refused_is_transport_failure() {
    // Reserve a port, then release it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let config = UpstreamConfig {
        base_url: format!("http://{addr}"),
        request_timeout_secs: 2,
        ..UpstreamConfig::default()
    };
    let client = UpstreamClient::new(&config).expect("client");
    let credential = Credential::new("a", "sk-a");

    let result = client.send_messages(&credential, &messages_body()).await;
    assert!(matches!(
        result,
        Err(relaygate_core::AttemptFailure::Transport { timed_out: false, .. })
    ));
}
