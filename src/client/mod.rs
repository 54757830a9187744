//! Bot API client implementation.
//!
//! Provides the main entry point for calling Bot API methods.

mod dispatcher;

pub use dispatcher::Dispatcher;

use crate::config::TelegramConfig;
use crate::context::CallContext;
use crate::encoding::Payload;
use crate::errors::TelegramResult;
use crate::observability::{MetricsCollector, MetricsSnapshot};
use crate::resilience::{CircuitMetrics, ResilienceOrchestrator};
use crate::services::{BotService, MediaService, MessagesService};
use crate::transport::{HttpTransport, ReqwestTransport};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Main Bot API client
///
/// Cloning is cheap; clones share the rate limiter, circuit breaker and
/// transport.
#[derive(Clone)]
pub struct TelegramClient {
    dispatcher: Arc<Dispatcher>,
    messages_service: MessagesService,
    media_service: MediaService,
    bot_service: BotService,
}

impl TelegramClient {
    /// Create a new client with the given configuration
    pub fn new(config: TelegramConfig) -> TelegramResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(
            config.timeout,
            config.max_response_bytes,
        )?);
        Self::with_transport(config, transport)
    }

    /// Create a new client with a custom transport
    pub fn with_transport(
        config: TelegramConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> TelegramResult<Self> {
        let resilience = Arc::new(ResilienceOrchestrator::with_config(
            config.resilience.clone(),
        ));
        Self::with_parts(config, transport, resilience)
    }

    /// Create a client from explicit parts, e.g. an orchestrator with custom
    /// retry or failure predicates
    pub fn with_parts(
        config: TelegramConfig,
        transport: Arc<dyn HttpTransport>,
        resilience: Arc<ResilienceOrchestrator>,
    ) -> TelegramResult<Self> {
        config.validate()?;

        if resilience.start() {
            debug!("Started rate limiter sweep");
        }

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(config),
            transport,
            resilience,
            Arc::new(MetricsCollector::new()),
        ));

        Ok(Self {
            messages_service: MessagesService::new(dispatcher.clone()),
            media_service: MediaService::new(dispatcher.clone()),
            bot_service: BotService::new(dispatcher.clone()),
            dispatcher,
        })
    }

    /// Call any API method with a raw payload
    pub async fn call<R>(&self, ctx: &CallContext, method: &str, payload: Payload) -> TelegramResult<R>
    where
        R: DeserializeOwned,
    {
        self.dispatcher.call(ctx, method, payload).await
    }

    /// Get the configuration
    pub fn config(&self) -> &TelegramConfig {
        self.dispatcher.config()
    }

    /// Get the messages service
    pub fn messages(&self) -> &MessagesService {
        &self.messages_service
    }

    /// Get the media service
    pub fn media(&self) -> &MediaService {
        &self.media_service
    }

    /// Get the bot service
    pub fn bot(&self) -> &BotService {
        &self.bot_service
    }

    /// The shared resilience orchestrator
    pub fn resilience(&self) -> &ResilienceOrchestrator {
        self.dispatcher.resilience()
    }

    /// Circuit breaker metrics
    pub fn circuit_metrics(&self) -> CircuitMetrics {
        self.dispatcher.resilience().circuit_metrics()
    }

    /// Call metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        self.dispatcher.metrics().snapshot()
    }

    /// Start background maintenance if it is not running
    pub fn start(&self) -> bool {
        self.dispatcher.resilience().start()
    }

    /// Stop background maintenance. Safe to call repeatedly.
    pub fn stop(&self) {
        self.dispatcher.resilience().stop();
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
