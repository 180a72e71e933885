//! In-process [`ChatPlatform`] used by the console front end and by tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::platform::{
    ChannelId, ChatPlatform, DirectoryEntry, Document, GuildId, MessageId, PlatformError,
    PlatformResult, PostedMessage, RoleId, UserId,
};

/// Something the platform did, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    Sent(PostedMessage),
    Edited {
        channel: ChannelId,
        message: MessageId,
        document: Document,
    },
    Deleted {
        channel: ChannelId,
        message: MessageId,
    },
    Reacted {
        channel: ChannelId,
        message: MessageId,
        emoji: String,
    },
    RolesAdded {
        user: UserId,
        roles: Vec<RoleId>,
        reason: String,
    },
    RolesRemoved {
        user: UserId,
        roles: Vec<RoleId>,
        reason: String,
    },
    NicknameReset {
        user: UserId,
    },
}

type Observer = Box<dyn Fn(&PlatformEvent) + Send + Sync>;

#[derive(Default)]
struct MemoryState {
    next_message_id: u64,
    channels: BTreeMap<ChannelId, Vec<PostedMessage>>,
    directory: BTreeMap<GuildId, Vec<DirectoryEntry>>,
    events: Vec<PlatformEvent>,
    fail_sends: bool,
    fail_directory: bool,
}

/// Chat platform that keeps channels and members in memory
pub struct MemoryPlatform {
    self_id: UserId,
    state: Mutex<MemoryState>,
    observer: Option<Observer>,
}

impl MemoryPlatform {
    pub fn new(self_id: UserId) -> Self {
        Self {
            self_id,
            state: Mutex::new(MemoryState {
                next_message_id: 1,
                ..MemoryState::default()
            }),
            observer: None,
        }
    }

    /// Call `observer` for every event as it is recorded.
    #[must_use]
    pub fn with_observer(
        mut self,
        observer: impl Fn(&PlatformEvent) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn set_directory(&self, guild: GuildId, entries: Vec<DirectoryEntry>) {
        self.lock().directory.insert(guild, entries);
    }

    /// Make every later send fail until switched off.
    pub fn set_fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    pub fn set_fail_directory(&self, fail: bool) {
        self.lock().fail_directory = fail;
    }

    /// Record a message written by someone else, such as a command.
    pub fn post_user_message(
        &self,
        channel: ChannelId,
        author: UserId,
        content: impl Into<String>,
    ) -> PostedMessage {
        let mut state = self.lock();
        let message = PostedMessage {
            channel_id: channel,
            message_id: next_id(&mut state),
            author_id: author,
            content: Some(content.into()),
            document: None,
        };
        state.channels.entry(channel).or_default().push(message.clone());
        message
    }

    /// Delete a message behind the bot's back.
    pub fn remove_message(&self, channel: ChannelId, message: MessageId) -> bool {
        let mut state = self.lock();
        let Some(history) = state.channels.get_mut(&channel) else {
            return false;
        };
        let before = history.len();
        history.retain(|m| m.message_id != message);
        history.len() != before
    }

    /// Oldest first.
    pub fn messages(&self, channel: ChannelId) -> Vec<PostedMessage> {
        self.lock().channels.get(&channel).cloned().unwrap_or_default()
    }

    /// Messages in `channel` posted by this platform's own account.
    pub fn own_documents(&self, channel: ChannelId) -> Vec<PostedMessage> {
        self.messages(channel)
            .into_iter()
            .filter(|m| m.author_id == self.self_id && m.document.is_some())
            .collect()
    }

    pub fn events(&self) -> Vec<PlatformEvent> {
        self.lock().events.clone()
    }

    pub fn member(&self, guild: GuildId, user: UserId) -> Option<DirectoryEntry> {
        self.lock()
            .directory
            .get(&guild)?
            .iter()
            .find(|e| e.id == user)
            .cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn emit(&self, state: &mut MemoryState, event: PlatformEvent) {
        if let Some(observer) = &self.observer {
            observer(&event);
        }
        state.events.push(event);
    }

    fn with_member<T>(
        &self,
        guild: GuildId,
        user: UserId,
        f: impl FnOnce(&mut DirectoryEntry) -> T,
    ) -> PlatformResult<T> {
        let mut state = self.lock();
        let entry = state
            .directory
            .get_mut(&guild)
            .and_then(|entries| entries.iter_mut().find(|e| e.id == user))
            .ok_or(PlatformError::MemberNotFound(user))?;
        Ok(f(entry))
    }
}

fn next_id(state: &mut MemoryState) -> MessageId {
    let id = MessageId(state.next_message_id);
    state.next_message_id += 1;
    id
}

#[async_trait]
impl ChatPlatform for MemoryPlatform {
    fn self_id(&self) -> UserId {
        self.self_id
    }

    async fn fetch_directory(&self, guild: GuildId) -> PlatformResult<Vec<DirectoryEntry>> {
        let state = self.lock();
        if state.fail_directory {
            return Err(PlatformError::Request("directory unavailable".to_string()));
        }
        Ok(state.directory.get(&guild).cloned().unwrap_or_default())
    }

    async fn fetch_member(&self, guild: GuildId, user: UserId) -> PlatformResult<DirectoryEntry> {
        self.member(guild, user)
            .ok_or(PlatformError::MemberNotFound(user))
    }

    async fn send_document(
        &self,
        channel: ChannelId,
        document: &Document,
    ) -> PlatformResult<PostedMessage> {
        let mut state = self.lock();
        if state.fail_sends {
            return Err(PlatformError::Request("send rejected".to_string()));
        }
        let message = PostedMessage {
            channel_id: channel,
            message_id: next_id(&mut state),
            author_id: self.self_id,
            content: None,
            document: Some(document.clone()),
        };
        state.channels.entry(channel).or_default().push(message.clone());
        self.emit(&mut state, PlatformEvent::Sent(message.clone()));
        Ok(message)
    }

    async fn edit_document(
        &self,
        channel: ChannelId,
        message: MessageId,
        document: &Document,
    ) -> PlatformResult<()> {
        let mut state = self.lock();
        let history = state
            .channels
            .get_mut(&channel)
            .ok_or(PlatformError::ChannelNotFound(channel))?;
        let target = history
            .iter_mut()
            .find(|m| m.message_id == message)
            .ok_or(PlatformError::MessageNotFound { channel, message })?;
        if target.author_id != self.self_id {
            return Err(PlatformError::Request(format!(
                "cannot edit message {message} authored by {}",
                target.author_id
            )));
        }
        target.document = Some(document.clone());
        self.emit(
            &mut state,
            PlatformEvent::Edited {
                channel,
                message,
                document: document.clone(),
            },
        );
        Ok(())
    }

    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> PlatformResult<Option<PostedMessage>> {
        let state = self.lock();
        let history = state
            .channels
            .get(&channel)
            .ok_or(PlatformError::ChannelNotFound(channel))?;
        Ok(history.iter().find(|m| m.message_id == message).cloned())
    }

    async fn fetch_recent_messages(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> PlatformResult<Vec<PostedMessage>> {
        let state = self.lock();
        Ok(state
            .channels
            .get(&channel)
            .map(|history| history.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()> {
        let mut state = self.lock();
        let history = state
            .channels
            .get_mut(&channel)
            .ok_or(PlatformError::ChannelNotFound(channel))?;
        let before = history.len();
        history.retain(|m| m.message_id != message);
        if history.len() == before {
            return Err(PlatformError::MessageNotFound { channel, message });
        }
        self.emit(&mut state, PlatformEvent::Deleted { channel, message });
        Ok(())
    }

    async fn react(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> PlatformResult<()> {
        let mut state = self.lock();
        let exists = state
            .channels
            .get(&channel)
            .is_some_and(|history| history.iter().any(|m| m.message_id == message));
        if !exists {
            return Err(PlatformError::MessageNotFound { channel, message });
        }
        self.emit(
            &mut state,
            PlatformEvent::Reacted {
                channel,
                message,
                emoji: emoji.to_string(),
            },
        );
        Ok(())
    }

    async fn add_roles(
        &self,
        guild: GuildId,
        user: UserId,
        roles: &[RoleId],
        reason: &str,
    ) -> PlatformResult<()> {
        self.with_member(guild, user, |entry| {
            for role in roles {
                if !entry.role_ids.contains(role) {
                    entry.role_ids.push(*role);
                }
            }
        })?;
        let mut state = self.lock();
        self.emit(
            &mut state,
            PlatformEvent::RolesAdded {
                user,
                roles: roles.to_vec(),
                reason: reason.to_string(),
            },
        );
        Ok(())
    }

    async fn remove_roles(
        &self,
        guild: GuildId,
        user: UserId,
        roles: &[RoleId],
        reason: &str,
    ) -> PlatformResult<()> {
        self.with_member(guild, user, |entry| {
            entry.role_ids.retain(|role| !roles.contains(role));
        })?;
        let mut state = self.lock();
        self.emit(
            &mut state,
            PlatformEvent::RolesRemoved {
                user,
                roles: roles.to_vec(),
                reason: reason.to_string(),
            },
        );
        Ok(())
    }

    async fn reset_nickname(
        &self,
        guild: GuildId,
        user: UserId,
        _reason: &str,
    ) -> PlatformResult<()> {
        self.with_member(guild, user, |entry| {
            entry.nickname = None;
            entry.display_name = entry.username.clone();
        })?;
        let mut state = self.lock();
        self.emit(&mut state, PlatformEvent::NicknameReset { user });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT: UserId = UserId(900);
    const CHANNEL: ChannelId = ChannelId(10);

    #[tokio::test]
    async fn recent_messages_are_newest_first() {
        let platform = MemoryPlatform::new(BOT);
        for i in 0..4 {
            platform.post_user_message(CHANNEL, UserId(1), format!("msg {i}"));
        }
        let recent = platform.fetch_recent_messages(CHANNEL, 2).await.unwrap();
        let contents: Vec<_> = recent.iter().filter_map(|m| m.content.clone()).collect();
        assert_eq!(contents, vec!["msg 3", "msg 2"]);
    }

    #[tokio::test]
    async fn edits_are_limited_to_own_messages() {
        let platform = MemoryPlatform::new(BOT);
        let human = platform.post_user_message(CHANNEL, UserId(1), "hi");
        let doc = Document::notice(0, "x");
        assert!(platform
            .edit_document(CHANNEL, human.message_id, &doc)
            .await
            .is_err());
        let mine = platform.send_document(CHANNEL, &doc).await.unwrap();
        assert!(platform
            .edit_document(CHANNEL, mine.message_id, &doc)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn removed_message_cannot_be_fetched() {
        let platform = MemoryPlatform::new(BOT);
        let sent = platform
            .send_document(CHANNEL, &Document::notice(0, "x"))
            .await
            .unwrap();
        assert!(platform.remove_message(CHANNEL, sent.message_id));
        let fetched = platform.fetch_message(CHANNEL, sent.message_id).await.unwrap();
        assert!(fetched.is_none());
    }
}
