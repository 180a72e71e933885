//! Console front end: stdin lines become commands from an administrator in
//! the roster channel, and everything the bot posts is printed.

use anyhow::Result;
use log::info;
use roster_core::{
    load_roster_or, ChannelId, ChatPlatform, MemoryPlatform, PlatformEvent, Roster,
    RosterPersister, RosterService,
};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config::BotConfig;
use crate::handler::{Author, CommandHandler, IncomingMessage, Outcome};

/// Channel the console writes to when no roster channel is configured
pub const CONSOLE_CHANNEL: ChannelId = ChannelId(1);

/// Load persisted state (or the default categories) and start the debounced writer.
pub async fn start_service(config: &BotConfig) -> RosterService {
    let defaults = Roster::with_categories(&config.default_categories);
    let initial = load_roster_or(&config.state_file, defaults).await;
    let persister = RosterPersister::start(&config.state_file, config.debounce());
    info!(
        "Roster state at {} ({} categories, {} members)",
        persister.path().display(),
        initial.categories().len(),
        initial.member_count()
    );
    RosterService::init(initial, Some(persister), config.render.clone())
        .with_style(config.default_style)
        .with_scan_limit(config.scan_limit)
}

/// One line of terminal output per platform event.
pub fn render_event(event: &PlatformEvent) -> String {
    match event {
        PlatformEvent::Sent(message) => {
            let body = match (&message.document, &message.content) {
                (Some(document), _) => document.to_plain_text(),
                (None, Some(content)) => content.clone(),
                (None, None) => String::new(),
            };
            format!("── message {} ──\n{body}", message.message_id)
        }
        PlatformEvent::Edited {
            message, document, ..
        } => format!(
            "── message {message} (edited) ──\n{}",
            document.to_plain_text()
        ),
        PlatformEvent::Deleted { message, .. } => format!("[message {message} deleted]"),
        PlatformEvent::Reacted { message, emoji, .. } => format!("[{emoji} on message {message}]"),
        PlatformEvent::RolesAdded {
            user,
            roles,
            reason,
        } => format!("[roles added to {user}: {} ({reason})]", join_ids(roles)),
        PlatformEvent::RolesRemoved {
            user,
            roles,
            reason,
        } => format!("[roles removed from {user}: {} ({reason})]", join_ids(roles)),
        PlatformEvent::NicknameReset { user } => format!("[nickname of {user} reset]"),
    }
}

fn join_ids<T: ToString>(ids: &[T]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

pub struct Console {
    handler: CommandHandler,
    platform: Arc<MemoryPlatform>,
    channel: ChannelId,
    operator: Author,
}

impl Console {
    /// Build the in-memory platform, seed its directory and load the roster.
    pub async fn start(
        config: &BotConfig,
        observer: impl Fn(&PlatformEvent) + Send + Sync + 'static,
    ) -> Self {
        let platform =
            Arc::new(MemoryPlatform::new(config.console.self_user_id).with_observer(observer));
        platform.set_directory(config.guild_id, config.console.directory.clone());

        let service = start_service(config).await;
        let shared: Arc<dyn ChatPlatform> = platform.clone();
        let handler = CommandHandler::new(service, shared, config);

        Self {
            handler,
            platform,
            channel: config.roster_channel_id.unwrap_or(CONSOLE_CHANNEL),
            operator: Author {
                id: config.console.operator_id,
                tag: config.console.operator_tag.clone(),
                is_bot: false,
                is_admin: true,
                role_ids: Vec::new(),
            },
        }
    }

    pub const fn handler(&self) -> &CommandHandler {
        &self.handler
    }

    pub fn platform(&self) -> &MemoryPlatform {
        &self.platform
    }

    /// Post `line` as the operator and handle it.
    pub async fn submit(&mut self, line: &str) -> Outcome {
        let posted = self
            .platform
            .post_user_message(self.channel, self.operator.id, line);
        let message = IncomingMessage {
            channel_id: self.channel,
            message_id: posted.message_id,
            author: self.operator.clone(),
            content: line.to_string(),
        };
        self.handler.handle(&message).await
    }

    /// Handle lines until end of input or Ctrl-C, then flush the roster.
    pub async fn run<R: AsyncBufRead + Unpin>(mut self, input: R) -> Result<()> {
        info!(
            "Console ready in channel {}; one command per line",
            self.channel
        );
        let mut lines = input.lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    if let Outcome::Warned(text) = self.submit(&line).await {
                        info!("Rejected '{line}': {text}");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                }
            }
        }
        self.handler.shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::read_roster;
    use tempfile::TempDir;

    #[tokio::test]
    async fn submitted_lines_act_as_the_operator() {
        let temp = TempDir::new().expect("tempdir");
        let config = BotConfig {
            state_file: temp.path().join("state.json"),
            cleanup_delay_ms: 0,
            ..BotConfig::default()
        };
        let mut console = Console::start(&config, |_| {}).await;

        let outcome = console.submit("+shamu ecli").await;
        assert!(matches!(outcome, Outcome::Added(_)), "{outcome:?}");
        assert_eq!(
            console.handler().service().roster().find_member("shamu"),
            Some(("Eclipse", "Shamu"))
        );
        let rosters = console
            .platform()
            .own_documents(CONSOLE_CHANNEL)
            .into_iter()
            .filter(|m| m.title() == Some(config.render.title.as_str()))
            .count();
        assert_eq!(rosters, 1);

        console.run(&b""[..]).await.unwrap();
        let saved = read_roster(&config.state_file).await.unwrap().unwrap();
        assert_eq!(saved.find_member("shamu"), Some(("Eclipse", "Shamu")));
    }
}
