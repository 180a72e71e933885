use log::{debug, info, warn};

use crate::error::Result;
use crate::platform::{ChannelId, ChatPlatform, Document, MessageId, PlatformError};

/// How many recent messages are scanned for an orphaned roster document
pub const DEFAULT_SCAN_LIMIT: usize = 10;

/// Where the authoritative roster document lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentLocation {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// What [`RosterSync::sync`] had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Edited the cached document
    Edited(DocumentLocation),
    /// Found an uncached roster document in recent history and adopted it
    Adopted(DocumentLocation),
    /// Posted a fresh document
    Created(DocumentLocation),
}

impl SyncOutcome {
    pub const fn location(self) -> DocumentLocation {
        match self {
            Self::Edited(loc) | Self::Adopted(loc) | Self::Created(loc) => loc,
        }
    }
}

/// Keeps at most one live roster document and pushes fresh content into it.
#[derive(Debug, Clone)]
pub struct RosterSync {
    cached: Option<DocumentLocation>,
    signature: String,
    scan_limit: usize,
}

impl RosterSync {
    /// `signature` is the document title that marks a message as the roster.
    pub fn new(signature: impl Into<String>, scan_limit: usize) -> Self {
        Self {
            cached: None,
            signature: signature.into(),
            scan_limit: scan_limit.max(1),
        }
    }

    pub const fn cached(&self) -> Option<DocumentLocation> {
        self.cached
    }

    pub fn forget(&mut self) {
        self.cached = None;
    }

    /// Edit the cached document, else adopt one from recent history, else create one.
    ///
    /// Only a failure to create the fallback document is an error.
    pub async fn sync(
        &mut self,
        platform: &dyn ChatPlatform,
        trigger_channel: ChannelId,
        document: &Document,
    ) -> Result<SyncOutcome> {
        if let Some(loc) = self.cached {
            match edit_existing(platform, loc, document).await {
                Ok(()) => return Ok(SyncOutcome::Edited(loc)),
                Err(err) => {
                    info!(
                        "Cached roster message {} in {} unusable ({err}); relocating",
                        loc.message_id, loc.channel_id
                    );
                    self.cached = None;
                }
            }
        }

        match self.adopt_recent(platform, trigger_channel, document).await {
            Ok(Some(loc)) => {
                self.cached = Some(loc);
                return Ok(SyncOutcome::Adopted(loc));
            }
            Ok(None) => {}
            Err(err) => warn!("Roster history scan in {trigger_channel} failed: {err}"),
        }

        let sent = platform.send_document(trigger_channel, document).await?;
        let loc = DocumentLocation {
            channel_id: sent.channel_id,
            message_id: sent.message_id,
        };
        info!("Posted new roster message {} in {}", loc.message_id, loc.channel_id);
        self.cached = Some(loc);
        Ok(SyncOutcome::Created(loc))
    }

    async fn adopt_recent(
        &self,
        platform: &dyn ChatPlatform,
        channel: ChannelId,
        document: &Document,
    ) -> std::result::Result<Option<DocumentLocation>, PlatformError> {
        let me = platform.self_id();
        let recent = platform.fetch_recent_messages(channel, self.scan_limit).await?;
        let Some(found) = recent
            .into_iter()
            .take(self.scan_limit)
            .find(|msg| msg.author_id == me && msg.title() == Some(self.signature.as_str()))
        else {
            debug!("No roster message among the last {} in {channel}", self.scan_limit);
            return Ok(None);
        };
        let loc = DocumentLocation {
            channel_id: found.channel_id,
            message_id: found.message_id,
        };
        platform.edit_document(loc.channel_id, loc.message_id, document).await?;
        Ok(Some(loc))
    }
}

async fn edit_existing(
    platform: &dyn ChatPlatform,
    loc: DocumentLocation,
    document: &Document,
) -> std::result::Result<(), PlatformError> {
    let exists = platform.fetch_message(loc.channel_id, loc.message_id).await?;
    if exists.is_none() {
        return Err(PlatformError::MessageNotFound {
            channel: loc.channel_id,
            message: loc.message_id,
        });
    }
    platform
        .edit_document(loc.channel_id, loc.message_id, document)
        .await
}
