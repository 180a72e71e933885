use log::{debug, error, info, warn};
use roster_core::{
    locate_member, normalize_display_name, AddOutcome, ChannelId, ChatPlatform, DirectoryEntry,
    Document, DocumentField, GuildId, MemberStyle, MessageId, PlatformError, Removed, Resolution,
    RoleId, RosterError, RosterService, SyncOutcome, UserId,
};
use std::sync::Arc;
use std::time::Duration;

use crate::command::{Command, CommandParser, Scope, Target};
use crate::config::BotConfig;
use crate::recipes::{RoleDiff, RoleRecipe};

type Result<T> = std::result::Result<T, RosterError>;

pub const WARN_COLOR: u32 = 0xE67E22;
pub const INFO_COLOR: u32 = 0x2ECC71;
pub const HELP_COLOR: u32 = 0x00FF00;
pub const ROLES_COLOR: u32 = 0xFFA500;

/// Who wrote a message, as far as command handling cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    pub tag: String,
    pub is_bot: bool,
    pub is_admin: bool,
    pub role_ids: Vec<RoleId>,
}

/// A chat message delivered to the handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub author: Author,
    pub content: String,
}

/// What handling a message did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not a command, or written by a bot
    Ignored,
    /// Rejected with a warning reply; nothing changed
    Warned(String),
    Added(AddOutcome),
    Removed(Removed),
    CategoryAdded { name: String, position: usize },
    CategoryDeleted(String),
    CategoryRenamed { from: String, to: String },
    StyleChanged(MemberStyle),
    StylesListed,
    HelpShown,
    Synced(SyncOutcome),
    RolesChanged { target: UserId, diff: RoleDiff },
    NothingToChange { target: UserId },
}

/// Turns chat commands into roster and role operations.
///
/// Commands are handled one at a time through `&mut self`; every failure ends
/// up as a warning reply instead of an error.
pub struct CommandHandler {
    service: RosterService,
    platform: Arc<dyn ChatPlatform>,
    parser: CommandParser,
    recipes: Vec<RoleRecipe>,
    guild_id: GuildId,
    roster_channel: Option<ChannelId>,
    help_roles: Vec<RoleId>,
    cleanup_delay: Duration,
}

impl CommandHandler {
    pub fn new(service: RosterService, platform: Arc<dyn ChatPlatform>, config: &BotConfig) -> Self {
        Self {
            service,
            platform,
            parser: CommandParser::new(config.recipes.iter().map(|r| r.trigger.as_str())),
            recipes: config.recipes.clone(),
            guild_id: config.guild_id,
            roster_channel: config.roster_channel_id,
            help_roles: config.help_role_ids.clone(),
            cleanup_delay: config.cleanup_delay(),
        }
    }

    pub const fn service(&self) -> &RosterService {
        &self.service
    }

    /// Flush pending roster writes.
    pub async fn shutdown(self) {
        self.service.shutdown().await;
    }

    pub async fn handle(&mut self, message: &IncomingMessage) -> Outcome {
        if message.author.is_bot {
            return Outcome::Ignored;
        }
        let Some(command) = self.parser.parse(&message.content) else {
            return Outcome::Ignored;
        };
        debug!("{} -> {command:?}", message.author.tag);

        if let Some(warning) = self.scope_violation(command.scope(), message.channel_id) {
            return self.warn(message, warning).await;
        }

        match self.dispatch(message, command).await {
            Ok(outcome) => outcome,
            Err(err) if err.is_user_error() => self.warn(message, &err.to_string()).await,
            Err(err) => {
                error!("Command '{}' failed: {err}", message.content);
                self.warn(message, "Something went wrong talking to the chat server (see logs).")
                    .await
            }
        }
    }

    fn scope_violation(&self, scope: Scope, channel: ChannelId) -> Option<&'static str> {
        let roster_channel = self.roster_channel?;
        if channel == roster_channel {
            return None;
        }
        match scope {
            Scope::Anywhere => None,
            Scope::Roster => Some("Roster commands only allowed in the designated channel."),
            Scope::Category => Some("Category commands only allowed in the designated channel."),
        }
    }

    async fn dispatch(&mut self, message: &IncomingMessage, command: Command) -> Result<Outcome> {
        match command {
            Command::Recipe { trigger, target } => self.run_recipe(message, &trigger, target).await,
            Command::Style(name) => self.change_style(message, name.as_deref()).await,
            Command::Help => self.show_help(message).await,
            Command::Sync => {
                let outcome = self.service.publish(&*self.platform, message.channel_id).await?;
                Ok(Outcome::Synced(outcome))
            }
            Command::Add(args) => self.add_member(message, &args).await,
            Command::Remove(text) => self.remove_member(message, &text).await,
            Command::AddCategory { name, position } => {
                let landed = self.service.add_category(&name, position)?;
                self.sync_display(message).await;
                let text = match position {
                    Some(_) => format!("✅ Category '{name}' added at position {landed}."),
                    None => format!("✅ Category '{name}' added."),
                };
                self.notify(message, INFO_COLOR, text).await;
                Ok(Outcome::CategoryAdded {
                    name,
                    position: landed,
                })
            }
            Command::DeleteCategory(fragment) => {
                let name = self.service.resolve_category(&fragment)?;
                self.service.delete_category(&name)?;
                self.sync_display(message).await;
                self.notify(
                    message,
                    INFO_COLOR,
                    format!("🗑️ Category '{name}' and its members deleted."),
                )
                .await;
                Ok(Outcome::CategoryDeleted(name))
            }
            Command::RenameCategory { fragment, new_name } => {
                let old = self.service.resolve_category(&fragment)?;
                self.service.rename_category(&old, &new_name)?;
                self.sync_display(message).await;
                self.notify(
                    message,
                    INFO_COLOR,
                    format!("✏️ Category '{old}' renamed to '{new_name}'."),
                )
                .await;
                Ok(Outcome::CategoryRenamed {
                    from: old,
                    to: new_name,
                })
            }
            Command::Usage { text, .. } => Err(RosterError::validation(text)),
        }
    }

    /// `+<name> <category>` first, then `+<category> <name>`.
    fn split_add_args(&self, args: &[String]) -> Result<(String, String)> {
        let roster = self.service.roster();
        let (first, last) = match (args.first(), args.last()) {
            (Some(first), Some(last)) if args.len() >= 2 => (first, last),
            _ => return Err(RosterError::validation("Usage: +name category OR +category name.")),
        };

        let by_last = roster.resolve_category(last);
        if by_last != Resolution::NotFound {
            let category = by_last
                .map(str::to_string)
                .into_result("category fragment", last, Clone::clone)?;
            return Ok((category, args[..args.len() - 1].join(" ")));
        }
        match roster.resolve_category(first) {
            Resolution::NotFound => Err(RosterError::validation(format!(
                "Invalid or missing category fragment. Try: {}.",
                roster.category_names().collect::<Vec<_>>().join(", ")
            ))),
            by_first => {
                let category = by_first
                    .map(str::to_string)
                    .into_result("category fragment", first, Clone::clone)?;
                Ok((category, args[1..].join(" ")))
            }
        }
    }

    async fn add_member(&mut self, message: &IncomingMessage, args: &[String]) -> Result<Outcome> {
        let (category, name) = self.split_add_args(args)?;
        let outcome = self.service.add_member(&category, &name)?;
        let reaction = match &outcome {
            AddOutcome::Unchanged { .. } => "⚠️",
            AddOutcome::Moved { .. } => "🔁",
            AddOutcome::Added { .. } => "✅",
        };
        self.react(message, reaction).await;
        if outcome.changed() {
            info!("{} listed {} under {category}", message.author.tag, outcome.name());
            self.sync_display(message).await;
        }
        self.cleanup(message);
        Ok(Outcome::Added(outcome))
    }

    /// `-<category> <name>` drops the category token only when it resolves
    /// and the whole text is not itself a listed member.
    async fn remove_member(&mut self, message: &IncomingMessage, text: &str) -> Result<Outcome> {
        let roster = self.service.roster();
        let name = match text.split_once(char::is_whitespace) {
            Some((head, tail))
                if roster.find_member(text).is_none()
                    && roster.resolve_category(head).found().is_some() =>
            {
                tail.trim().to_string()
            }
            _ => text.to_string(),
        };

        let Some(removed) = self.service.remove_member(&name) else {
            return Err(RosterError::validation(format!(
                "{} not found in roster.",
                normalize_display_name(&name)
            )));
        };
        info!(
            "{} removed {} from {}",
            message.author.tag, removed.name, removed.category
        );
        self.react(message, "❌").await;
        self.sync_display(message).await;
        self.cleanup(message);
        Ok(Outcome::Removed(removed))
    }

    async fn change_style(
        &mut self,
        message: &IncomingMessage,
        name: Option<&str>,
    ) -> Result<Outcome> {
        let Some(name) = name else {
            let text = format!(
                "Available styles: {} | Usage: +estilo name (alias: +styles name)",
                MemberStyle::catalog()
            );
            self.warn(message, &text).await;
            return Ok(Outcome::StylesListed);
        };
        let style: MemberStyle = name.parse()?;
        self.service.set_style(style);
        self.react(message, "🎨").await;
        self.sync_display(message).await;
        self.cleanup(message);
        Ok(Outcome::StyleChanged(style))
    }

    async fn show_help(&mut self, message: &IncomingMessage) -> Result<Outcome> {
        let author = &message.author;
        let allowed =
            author.is_admin || author.role_ids.iter().any(|r| self.help_roles.contains(r));
        if !allowed {
            return Err(RosterError::validation(
                "Help command restricted: need Administrator or required role.",
            ));
        }

        let field = |name: &str, value: String| DocumentField {
            name: name.to_string(),
            value,
        };
        let categories: Vec<&str> = self.service.roster().category_names().collect();
        let document = Document {
            title: Some("📋 Roster Commands".to_string()),
            description: Some("Editable roster management:".to_string()),
            color: Some(HELP_COLOR),
            fields: vec![
                field(
                    "`+name category`",
                    "Add member (category can be partial). Ex: `+Shamu ecli` -> Eclipse".into(),
                ),
                field(
                    "`+category name`",
                    "Inverse order also works. Ex: `+tri Atlas` -> Trial".into(),
                ),
                field("`-name`", "Remove member. Ex: `-Camsita`".into()),
                field("`!roster`", "Create or refresh roster message".into()),
                field(
                    "`!addcat name [pos]` / `!delcat cat` / `!editcat cat new`",
                    "Add, delete or rename a category".into(),
                ),
                field("`+estilo name`", "Change style. Ex: +estilo sparkle".into()),
                field("Styles", MemberStyle::catalog()),
                field("Categories", categories.join(", ")),
            ],
            ..Document::default()
        };
        self.platform
            .send_document(message.channel_id, &document)
            .await?;
        Ok(Outcome::HelpShown)
    }

    async fn run_recipe(
        &mut self,
        message: &IncomingMessage,
        trigger: &str,
        target: Option<Target>,
    ) -> Result<Outcome> {
        if !message.author.is_admin {
            return Err(RosterError::validation("You lack Administrator permission."));
        }
        let Some(recipe) = self.recipes.iter().find(|r| r.trigger.eq_ignore_ascii_case(trigger))
        else {
            return Err(RosterError::not_found("recipe", trigger));
        };
        let Some(target) = target else {
            return Err(RosterError::validation(format!(
                "Usage: +{trigger} @user OR +{trigger} partialName"
            )));
        };
        let member = self.find_target(target).await?;

        if recipe.plan(&member).is_empty() {
            self.react(message, "⚠️").await;
            self.warn(
                message,
                &format!("Nothing to change for {}.", member.display_name),
            )
            .await;
            return Ok(Outcome::NothingToChange { target: member.id });
        }

        let diff = recipe
            .apply(&*self.platform, self.guild_id, &member, &message.author.tag)
            .await?;
        self.react(message, &recipe.emoji).await;
        self.notify(
            message,
            ROLES_COLOR,
            format!(
                "{} {} for {}: {}",
                recipe.emoji,
                recipe.verb,
                member.display_name,
                diff.changes().join(", ")
            ),
        )
        .await;
        Ok(Outcome::RolesChanged {
            target: member.id,
            diff,
        })
    }

    async fn find_target(&self, target: Target) -> Result<DirectoryEntry> {
        match target {
            Target::Mention(id) => match self.platform.fetch_member(self.guild_id, id).await {
                Ok(member) => Ok(member),
                Err(PlatformError::MemberNotFound(_)) => {
                    Err(RosterError::not_found("member", format!("<@{id}>")))
                }
                Err(err) => Err(err.into()),
            },
            Target::Query(query) => {
                let directory = self.platform.fetch_directory(self.guild_id).await?;
                locate_member(&query, &directory)
                    .map(Clone::clone)
                    .into_result("member", &query, |m| m.tag().to_string())
            }
        }
    }

    /// Push the roster into its display message; failures become a warning.
    async fn sync_display(&mut self, message: &IncomingMessage) {
        if let Err(err) = self.service.publish(&*self.platform, message.channel_id).await {
            error!("Roster display sync failed: {err}");
            self.warn(message, "Could not update the roster message (see logs).")
                .await;
        }
    }

    async fn warn(&self, message: &IncomingMessage, text: &str) -> Outcome {
        self.notify(message, WARN_COLOR, format!("⚠️ {text}")).await;
        Outcome::Warned(text.to_string())
    }

    /// Best effort.
    async fn notify(&self, message: &IncomingMessage, color: u32, text: String) {
        let document = Document::notice(color, text);
        if let Err(err) = self.platform.send_document(message.channel_id, &document).await {
            warn!("Could not post notice in {}: {err}", message.channel_id);
        }
    }

    /// Best effort.
    async fn react(&self, message: &IncomingMessage, emoji: &str) {
        if let Err(err) = self
            .platform
            .react(message.channel_id, message.message_id, emoji)
            .await
        {
            debug!("Reaction {emoji} on {} failed: {err}", message.message_id);
        }
    }

    /// Delete the command message after a short delay. Best effort.
    fn cleanup(&self, message: &IncomingMessage) {
        let platform = Arc::clone(&self.platform);
        let (channel, id) = (message.channel_id, message.message_id);
        let delay = self.cleanup_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = platform.delete_message(channel, id).await {
                debug!("Cleanup of message {id} failed: {err}");
            }
        });
    }
}
