//! Observability infrastructure for the Bot API client.
//!
//! Provides token redaction, request spans, and call metrics.

pub mod logging;
pub mod metrics;
pub mod tracing_utils;

pub use logging::*;
pub use metrics::*;
pub use tracing_utils::*;
