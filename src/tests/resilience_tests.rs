//! Resilience pipeline tests driven through the client.

use crate::client::TelegramClient;
use crate::config::TelegramConfig;
use crate::context::CallContext;
use crate::errors::{ApiErrorKind, TelegramError};
use crate::fixtures;
use crate::mocks::{MockHttpTransport, MockResponse};
use crate::resilience::{
    CircuitBreakerConfig, CircuitState, RateLimiterConfig, ResilienceOrchestrator, RetryConfig,
};
use crate::services::messages::{MessagesServiceTrait, SendMessageRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn config() -> TelegramConfig {
    fixtures::test_config("http://mock.local")
}

fn client(config: TelegramConfig, transport: &Arc<MockHttpTransport>) -> TelegramClient {
    TelegramClient::with_transport(config, transport.clone()).unwrap()
}

async fn send(client: &TelegramClient, chat_id: i64) -> Result<crate::types::Message, TelegramError> {
    client
        .messages()
        .send_message(&CallContext::new(), SendMessageRequest::new(chat_id, "ping"))
        .await
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_hint_is_honoured() {
    let transport = Arc::new(
        MockHttpTransport::new()
            .add_response(MockResponse::rate_limited(5))
            .add_result(&fixtures::text_message(10, 1, "ping")),
    );
    let client = client(config(), &transport);

    let started = Instant::now();
    let message = send(&client, 10).await.unwrap();

    assert_eq!(message.message_id, 1);
    assert_eq!(transport.request_count(), 2);
    assert!(started.elapsed() >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_server_errors_exhaust_retry_budget() {
    let transport = Arc::new(
        MockHttpTransport::new().with_default_response(MockResponse::server_error(500)),
    );
    let client = client(config(), &transport);

    let err = send(&client, 10).await.unwrap_err();

    match err {
        TelegramError::MaxRetriesExceeded { attempts, last } => {
            assert_eq!(attempts, 4);
            assert_eq!(last.api_kind(), Some(ApiErrorKind::ServerError));
        }
        other => panic!("expected MaxRetriesExceeded, got {:?}", other),
    }
    assert_eq!(transport.request_count(), 4);
    assert_eq!(client.metrics().retries_exhausted, 1);
}

#[tokio::test(start_paused = true)]
async fn test_network_error_then_success() {
    let transport = Arc::new(
        MockHttpTransport::new()
            .add_response(MockResponse::network_error("connection reset"))
            .add_result(&fixtures::text_message(10, 2, "ping")),
    );
    let client = client(config(), &transport);

    assert_eq!(send(&client, 10).await.unwrap().message_id, 2);
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_circuit_opens_and_stops_retries() {
    let mut config = config();
    config.resilience.circuit_breaker = CircuitBreakerConfig::new()
        .min_requests(2)
        .failure_ratio(0.5)
        .open_timeout(Duration::from_secs(30));
    let transport = Arc::new(
        MockHttpTransport::new().with_default_response(MockResponse::server_error(502)),
    );
    let client = client(config, &transport);

    let err = send(&client, 10).await.unwrap_err();
    assert!(err.is_circuit_open());
    assert_eq!(transport.request_count(), 2);
    assert_eq!(client.resilience().circuit_state(), CircuitState::Open);

    let err = send(&client, 11).await.unwrap_err();
    assert!(err.is_circuit_open());
    assert_eq!(transport.request_count(), 2);
    assert_eq!(client.metrics().circuit_rejections, 2);
}

#[tokio::test(start_paused = true)]
async fn test_circuit_recovers_after_timeout() {
    let mut config = config();
    config.resilience.retry = RetryConfig::new().max_retries(0);
    config.resilience.circuit_breaker = CircuitBreakerConfig::new()
        .min_requests(1)
        .open_timeout(Duration::from_secs(10))
        .half_open_max_requests(1);
    let transport = Arc::new(
        MockHttpTransport::new()
            .add_response(MockResponse::server_error(503))
            .with_default_response(MockResponse::result(&fixtures::text_message(10, 3, "ping"))),
    );
    let client = client(config, &transport);

    assert!(send(&client, 10).await.is_err());
    assert_eq!(client.resilience().circuit_state(), CircuitState::Open);
    assert!(send(&client, 10).await.unwrap_err().is_circuit_open());

    tokio::time::advance(Duration::from_secs(11)).await;

    assert_eq!(send(&client, 10).await.unwrap().message_id, 3);
    assert_eq!(client.resilience().circuit_state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_half_open_call_does_not_wedge_circuit() {
    let mut config = config();
    config.resilience.retry = RetryConfig::new().max_retries(0);
    config.resilience.circuit_breaker = CircuitBreakerConfig::new()
        .min_requests(1)
        .open_timeout(Duration::from_secs(10))
        .half_open_max_requests(1);
    let transport = Arc::new(
        MockHttpTransport::new()
            .add_response(MockResponse::server_error(503))
            .add_response(
                MockResponse::result(&fixtures::text_message(11, 4, "ping"))
                    .with_delay(Duration::from_secs(60)),
            )
            .with_default_response(MockResponse::result(&fixtures::text_message(12, 5, "ping"))),
    );
    let client = client(config, &transport);

    assert!(send(&client, 10).await.is_err());
    tokio::time::advance(Duration::from_secs(11)).await;
    assert_eq!(client.resilience().circuit_state(), CircuitState::HalfOpen);

    // The caller gives up and drops the in-flight call
    let dropped = tokio::time::timeout(Duration::from_millis(100), send(&client, 11)).await;
    assert!(dropped.is_err());

    assert_eq!(send(&client, 12).await.unwrap().message_id, 5);
    assert_eq!(client.resilience().circuit_state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_client_errors_do_not_trip_circuit() {
    let mut config = config();
    config.resilience.circuit_breaker = CircuitBreakerConfig::new().min_requests(1);
    let transport = Arc::new(
        MockHttpTransport::new()
            .with_default_response(MockResponse::api_error(400, "Bad Request: message text is empty")),
    );
    let client = client(config, &transport);

    for _ in 0..5 {
        assert!(send(&client, 10).await.is_err());
    }
    assert_eq!(client.resilience().circuit_state(), CircuitState::Closed);
    assert_eq!(transport.request_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_destination_bucket_throttles_same_chat() {
    let mut config = config();
    config.resilience.rate_limiter = RateLimiterConfig::new()
        .global(1_000.0, 1_000)
        .chat(1.0, 1)
        .group(1_000.0, 1_000);
    let transport = Arc::new(MockHttpTransport::new().with_default_response(MockResponse::result(
        &fixtures::text_message(10, 1, "ping"),
    )));
    let client = client(config, &transport);

    let started = Instant::now();
    send(&client, 10).await.unwrap();
    send(&client, 20).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(100));

    send(&client, 10).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(900));
    assert_eq!(client.resilience().rate_limiter().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_group_destinations_use_group_bucket() {
    let mut config = config();
    config.resilience.rate_limiter = RateLimiterConfig::new()
        .global(1_000.0, 1_000)
        .chat(1_000.0, 1_000)
        .group(0.5, 1);
    let transport = Arc::new(MockHttpTransport::new().with_default_response(MockResponse::result(
        &fixtures::text_message(-100, 1, "ping"),
    )));
    let client = client(config, &transport);

    let started = Instant::now();
    send(&client, 10).await.unwrap();
    send(&client, 10).await.unwrap();
    send(&client, -100).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(100));

    send(&client, -100).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(1_900));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_while_throttled_skips_transport() {
    let mut config = config();
    config.resilience.rate_limiter = RateLimiterConfig::new()
        .global(1_000.0, 1_000)
        .chat(0.1, 1);
    let transport = Arc::new(MockHttpTransport::new().with_default_response(MockResponse::result(
        &fixtures::text_message(10, 1, "ping"),
    )));
    let client = client(config, &transport);

    send(&client, 10).await.unwrap();

    let ctx = CallContext::new().with_timeout(Duration::from_millis(500));
    let err = client
        .messages()
        .send_message(&ctx, SendMessageRequest::new(10, "late"))
        .await
        .unwrap_err();

    assert!(matches!(err, TelegramError::DeadlineExceeded));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff() {
    let transport = Arc::new(
        MockHttpTransport::new().with_default_response(MockResponse::rate_limited(60)),
    );
    let client = client(config(), &transport);
    let ctx = CallContext::new();

    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let err = client
        .messages()
        .send_message(&ctx, SendMessageRequest::new(10, "x"))
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_custom_retry_predicate() {
    let config = config();
    let resilience = Arc::new(ResilienceOrchestrator::with_predicates(
        config.resilience.clone(),
        Arc::new(|error: &TelegramError| error.api_kind() == Some(ApiErrorKind::MessageNotFound)),
        Arc::new(|_: &TelegramError| false),
    ));
    let transport = Arc::new(
        MockHttpTransport::new()
            .add_response(MockResponse::api_error(400, "Bad Request: message to edit not found"))
            .add_result(&fixtures::text_message(10, 4, "ping"))
            .add_response(MockResponse::server_error(500)),
    );
    let client = TelegramClient::with_parts(config, transport.clone(), resilience).unwrap();

    assert_eq!(send(&client, 10).await.unwrap().message_id, 4);
    assert_eq!(transport.request_count(), 2);

    let err = send(&client, 10).await.unwrap_err();
    assert_eq!(err.api_kind(), Some(ApiErrorKind::ServerError));
    assert_eq!(transport.request_count(), 3);
    assert_eq!(client.resilience().circuit_breaker().total_failures(), 0);
}
