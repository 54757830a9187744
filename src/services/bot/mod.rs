//! Bot identity service.

mod service;

pub use service::*;
