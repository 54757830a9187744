//! Users and chats.

use serde::{Deserialize, Serialize};

/// A user or bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Whether this user is a bot
    pub is_bot: bool,
    /// First name
    pub first_name: String,
    /// Last name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Username without the leading `@`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// IETF language tag of the user's client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    /// Whether the bot can be invited to groups (returned by `getMe` only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_join_groups: Option<bool>,
    /// Whether privacy mode is disabled (returned by `getMe` only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_read_all_group_messages: Option<bool>,
}

/// Kind of chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    /// One-to-one chat
    Private,
    /// Basic group
    Group,
    /// Supergroup
    Supergroup,
    /// Broadcast channel
    Channel,
}

/// A chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    /// Unique identifier
    pub id: i64,
    /// Kind of chat
    #[serde(rename = "type")]
    pub kind: ChatType,
    /// Title for groups and channels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// First name of the other party in a private chat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Last name of the other party in a private chat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl Chat {
    /// Whether the chat is private
    pub fn is_private(&self) -> bool {
        self.kind == ChatType::Private
    }
}
