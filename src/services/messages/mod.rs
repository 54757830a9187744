//! Messages service for the Bot API.
//!
//! Provides methods for sending, editing, forwarding and deleting text
//! messages.

mod requests;
mod service;

pub use requests::*;
pub use service::*;
