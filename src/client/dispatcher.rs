//! Shared call path used by every typed method.

use crate::config::TelegramConfig;
use crate::context::CallContext;
use crate::encoding::{encode, Payload};
use crate::errors::{ResponseError, TelegramResult};
use crate::observability::{create_request_span, record_error, record_success, MetricsCollector};
use crate::resilience::ResilienceOrchestrator;
use crate::transport::{HttpRequest, HttpTransport};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, Instrument};

/// Encodes, sends and decodes one API method call under the resilience pipeline
pub struct Dispatcher {
    config: Arc<TelegramConfig>,
    transport: Arc<dyn HttpTransport>,
    resilience: Arc<ResilienceOrchestrator>,
    metrics: Arc<MetricsCollector>,
}

impl Dispatcher {
    /// Create a dispatcher
    pub fn new(
        config: Arc<TelegramConfig>,
        transport: Arc<dyn HttpTransport>,
        resilience: Arc<ResilienceOrchestrator>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            config,
            transport,
            resilience,
            metrics,
        }
    }

    /// Call `method` with `payload` and decode its result
    ///
    /// The payload's `chat_id` selects the rate-limit destination. The body is
    /// re-encoded for every attempt, so file factories are reopened on retry.
    pub async fn call<R>(&self, ctx: &CallContext, method: &str, payload: Payload) -> TelegramResult<R>
    where
        R: DeserializeOwned,
    {
        let url = self.config.method_url(method)?;
        let destination = payload.destination();
        let span = create_request_span(method, destination.as_deref());

        async {
            let payload = &payload;
            let result = self
                .resilience
                .run(ctx, destination.as_deref(), || {
                    let url = url.clone();
                    async move {
                        let body = encode(payload)?;
                        let mut request =
                            HttpRequest::post(method, url, body).with_timeout(self.config.timeout);
                        request.headers = self.config.default_headers.clone();
                        self.transport.send(request).await
                    }
                })
                .await;

            self.metrics.record(method, result.as_ref().map(|_| ()));

            match &result {
                Ok(_) => record_success(&tracing::Span::current()),
                Err(error) => {
                    debug!(error = %error, "Call failed");
                    record_error(&tracing::Span::current(), error.error_code());
                }
            }

            let value = result?;
            serde_json::from_value(value).map_err(|e| ResponseError::from(e).into())
        }
        .instrument(span)
        .await
    }

    /// The client configuration
    pub fn config(&self) -> &TelegramConfig {
        &self.config
    }

    /// The shared resilience orchestrator
    pub fn resilience(&self) -> &Arc<ResilienceOrchestrator> {
        &self.resilience
    }

    /// Call metrics
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("resilience", &self.resilience)
            .finish()
    }
}
