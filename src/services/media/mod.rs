//! Media service for the Bot API.
//!
//! Provides photo, document and media-group uploads.

mod requests;
mod service;

pub use requests::*;
pub use service::*;
