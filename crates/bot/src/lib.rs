//! # Roster Bot
//!
//! Command adapter around `roster-core`: parses chat text, enforces who may
//! run what and where, applies role recipes, and replies.
//!
//! ```text
//! chat text ──> CommandParser ──> Command
//!                                    │
//!                 CommandHandler ────┤
//!                   ├─ roster commands ──> RosterService ──> sync display
//!                   ├─ role recipes ─────> Member Locator ──> add/remove roles
//!                   └─ replies, reactions, cleanup (best effort)
//! ```
//!
//! The `roster-bot` binary drives the handler from stdin through the
//! in-memory platform (see [`console`]).

pub mod command;
pub mod config;
pub mod console;
pub mod handler;
pub mod recipes;

pub use command::{Command, CommandParser, Scope, Target};
pub use config::{BotConfig, ConfigError, ConsoleConfig};
pub use console::{render_event, start_service, Console, CONSOLE_CHANNEL};
pub use handler::{Author, CommandHandler, IncomingMessage, Outcome};
pub use recipes::{default_recipes, RoleDiff, RoleRecipe, RoleRef};
