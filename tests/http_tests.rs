//! Integration tests against a local HTTP server.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::{Duration, Instant};
use telegram_client::errors::{ApiErrorKind, RequestError, ResponseError};
use telegram_client::fixtures::{self, BOT_TOKEN};
use telegram_client::services::media::{MediaServiceTrait, SendDocumentRequest};
use telegram_client::services::messages::{MessagesServiceTrait, SendMessageRequest};
use telegram_client::{CallContext, InputFile, TelegramClient, TelegramConfig, TelegramError};
use wiremock::matchers::{body_json, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn method_path(name: &str) -> String {
    format!("/bot{}/{}", BOT_TOKEN, name)
}

fn ok(result: impl serde::Serialize) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": result}))
}

fn client_for(server: &MockServer) -> TelegramClient {
    client_with(fixtures::test_config(&server.uri()))
}

fn client_with(config: TelegramConfig) -> TelegramClient {
    TelegramClient::new(config).expect("Failed to build client")
}

#[tokio::test]
async fn test_send_message_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(method_path("sendMessage")))
        .and(header_regex("content-type", "^application/json"))
        .and(body_json(json!({"chat_id": 42, "text": "hello"})))
        .respond_with(ok(fixtures::text_message(42, 1, "hello")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let message = client
        .messages()
        .send_message(&CallContext::new(), SendMessageRequest::new(42, "hello"))
        .await
        .unwrap();

    assert_eq!(message.message_id, 1);
}

#[tokio::test]
async fn test_api_error_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(method_path("sendMessage")))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "ok": false,
            "error_code": 403,
            "description": "Forbidden: bot was blocked by the user"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .messages()
        .send_message(&CallContext::new(), SendMessageRequest::new(42, "hello"))
        .await
        .unwrap_err();

    assert_eq!(err.api_kind(), Some(ApiErrorKind::BotBlocked));
}

#[tokio::test]
async fn test_retry_after_header_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(method_path("sendMessage")))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "1")
                .set_body_json(json!({
                    "ok": false,
                    "error_code": 429,
                    "description": "Too Many Requests"
                })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(method_path("sendMessage")))
        .respond_with(ok(fixtures::text_message(42, 2, "hello")))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let started = Instant::now();
    let message = client
        .messages()
        .send_message(&CallContext::new(), SendMessageRequest::new(42, "hello"))
        .await
        .unwrap();

    assert_eq!(message.message_id, 2);
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_non_json_gateway_error_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(method_path("sendMessage")))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(method_path("sendMessage")))
        .respond_with(ok(fixtures::text_message(42, 3, "hello")))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let message = client
        .messages()
        .send_message(&CallContext::new(), SendMessageRequest::new(42, "hello"))
        .await
        .unwrap();

    assert_eq!(message.message_id, 3);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_oversized_response_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(method_path("getMe")))
        .respond_with(ok(json!({"padding": "x".repeat(512)})))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = fixtures::test_config(&server.uri());
    config.max_response_bytes = 128;
    let client = client_with(config);

    let result: Result<serde_json::Value, _> = client
        .call(&CallContext::new(), "getMe", telegram_client::Payload::new())
        .await;

    assert!(matches!(
        result,
        Err(TelegramError::Response(ResponseError::BodyTooLarge { limit: 128 }))
    ));
}

#[tokio::test]
async fn test_upload_from_disk_is_streamed_as_multipart() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(method_path("sendDocument")))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .respond_with(ok(fixtures::photo_message(42, 4)))
        .expect(1)
        .mount(&server)
        .await;

    let file = std::env::temp_dir().join(format!("upload-{}.csv", std::process::id()));
    tokio::fs::write(&file, b"id,total\n1,42\n").await.unwrap();

    let client = client_for(&server);
    let result = client
        .media()
        .send_document(
            &CallContext::new(),
            SendDocumentRequest::new(42, InputFile::path(&file)).caption("weekly"),
        )
        .await;
    let _ = tokio::fs::remove_file(&file).await;
    result.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).into_owned();
    assert!(body.contains("name=\"document\"; filename=\"upload-"));
    assert!(body.contains("Content-Type: text/csv\r\n\r\nid,total\n1,42\n\r\n"));
    assert!(body.contains("name=\"caption\"\r\n\r\nweekly\r\n"));
}

#[tokio::test]
async fn test_missing_upload_file_is_a_request_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(method_path("sendDocument")))
        .respond_with(ok(fixtures::photo_message(42, 4)))
        .mount(&server)
        .await;

    let file = std::env::temp_dir().join(format!("missing-{}.csv", std::process::id()));
    let client = client_for(&server);
    let err = client
        .media()
        .send_document(&CallContext::new(), SendDocumentRequest::new(42, InputFile::path(&file)))
        .await
        .unwrap_err();

    assert!(
        matches!(err, TelegramError::Request(RequestError::UploadSource { .. })),
        "unexpected error: {:?}",
        err
    );
    assert_eq!(client.resilience().circuit_breaker().total_failures(), 0);
    assert_eq!(client.circuit_metrics().total_calls, 1);
}

#[tokio::test]
async fn test_caller_deadline_bounds_slow_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(method_path("sendMessage")))
        .respond_with(
            ok(fixtures::text_message(42, 5, "slow")).set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let ctx = CallContext::new().with_timeout(Duration::from_millis(200));
    let err = client
        .messages()
        .send_message(&ctx, SendMessageRequest::new(42, "slow"))
        .await
        .unwrap_err();

    assert!(matches!(err, TelegramError::DeadlineExceeded));
}
