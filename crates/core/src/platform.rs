//! Chat platform seam.
//!
//! The roster core never talks to a gateway directly; everything it needs from
//! the chat server goes through [`ChatPlatform`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

macro_rules! snowflake {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake!(GuildId);
snowflake!(ChannelId);
snowflake!(MessageId);
snowflake!(UserId);
snowflake!(RoleId);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Unknown channel {0}")]
    ChannelNotFound(ChannelId),

    #[error("Unknown message {message} in channel {channel}")]
    MessageNotFound {
        channel: ChannelId,
        message: MessageId,
    },

    #[error("Unknown member {0}")]
    MemberNotFound(UserId),

    #[error("Request failed: {0}")]
    Request(String),
}

/// One titled block of a [`Document`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentField {
    pub name: String,
    pub value: String,
}

/// Rich message body (an embed on platforms that have them)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<DocumentField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Milliseconds since the Unix epoch shown alongside the footer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
}

impl Document {
    pub fn notice(color: u32, text: impl Into<String>) -> Self {
        Self {
            description: Some(text.into()),
            color: Some(color),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn stamped_now(mut self) -> Self {
        self.timestamp_ms = Some(current_unix_ms());
        self
    }

    /// Flatten into text for terminals and logs.
    pub fn to_plain_text(&self) -> String {
        let mut out = Vec::new();
        if let Some(title) = &self.title {
            out.push(title.clone());
        }
        if let Some(description) = &self.description {
            out.push(description.clone());
        }
        for field in &self.fields {
            out.push(field.name.clone());
            out.push(field.value.trim().to_string());
        }
        if let Some(footer) = &self.footer {
            out.push(footer.clone());
        }
        if let Some(image) = &self.image_url {
            out.push(format!("[image] {image}"));
        }
        out.join("\n")
    }
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|dur| u64::try_from(dur.as_millis()).ok())
        .unwrap_or(0)
}

/// A message as seen in channel history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub author_id: UserId,
    pub content: Option<String>,
    pub document: Option<Document>,
}

impl PostedMessage {
    pub fn title(&self) -> Option<&str> {
        self.document.as_ref()?.title.as_deref()
    }
}

/// A member of the live server directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: UserId,
    pub display_name: String,
    pub username: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub role_ids: Vec<RoleId>,
}

impl DirectoryEntry {
    pub fn tag(&self) -> &str {
        &self.username
    }
}

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Capabilities the roster core and its command adapter consume
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// The account this process posts as.
    fn self_id(&self) -> UserId;

    async fn fetch_directory(&self, guild: GuildId) -> PlatformResult<Vec<DirectoryEntry>>;

    async fn fetch_member(&self, guild: GuildId, user: UserId) -> PlatformResult<DirectoryEntry>;

    async fn send_document(
        &self,
        channel: ChannelId,
        document: &Document,
    ) -> PlatformResult<PostedMessage>;

    async fn edit_document(
        &self,
        channel: ChannelId,
        message: MessageId,
        document: &Document,
    ) -> PlatformResult<()>;

    /// `Ok(None)` when the message no longer exists.
    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> PlatformResult<Option<PostedMessage>>;

    /// Newest first.
    async fn fetch_recent_messages(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> PlatformResult<Vec<PostedMessage>>;

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()>;

    async fn react(&self, channel: ChannelId, message: MessageId, emoji: &str)
        -> PlatformResult<()>;

    async fn add_roles(
        &self,
        guild: GuildId,
        user: UserId,
        roles: &[RoleId],
        reason: &str,
    ) -> PlatformResult<()>;

    async fn remove_roles(
        &self,
        guild: GuildId,
        user: UserId,
        roles: &[RoleId],
        reason: &str,
    ) -> PlatformResult<()>;

    async fn reset_nickname(&self, guild: GuildId, user: UserId, reason: &str)
        -> PlatformResult<()>;
}
