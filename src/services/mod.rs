//! Service implementations for Bot API methods.
//!
//! Each service module groups a category of methods. All of them go through
//! the shared [`Dispatcher`](crate::client::Dispatcher).

pub mod bot;
pub mod media;
pub mod messages;

pub use bot::{BotService, BotServiceTrait};
pub use media::{MediaService, MediaServiceTrait};
pub use messages::{MessagesService, MessagesServiceTrait};
