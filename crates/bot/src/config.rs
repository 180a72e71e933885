use roster_core::{
    ChannelId, DirectoryEntry, GuildId, MemberStyle, RenderOptions, RoleId, UserId,
    DEFAULT_DEBOUNCE, DEFAULT_SCAN_LIMIT,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::recipes::{default_recipes, RoleRecipe};

pub const ENV_STATE_FILE: &str = "ROSTER_STATE_FILE";
pub const ENV_CHANNEL_ID: &str = "ROSTER_CHANNEL_ID";
pub const ENV_GUILD_ID: &str = "ROSTER_GUILD_ID";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Bot configuration: TOML file, then environment, then command-line flags
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Where the roster is persisted
    pub state_file: PathBuf,

    /// Quiet period before a roster write lands on disk
    pub debounce_ms: u64,

    /// Recent messages scanned when the roster message is not cached
    pub scan_limit: usize,

    /// Roster and category commands are only accepted here when set
    pub roster_channel_id: Option<ChannelId>,

    pub guild_id: GuildId,

    /// Categories of a fresh roster
    pub default_categories: Vec<String>,

    /// Roles besides administrators allowed to use `+help`
    pub help_role_ids: Vec<RoleId>,

    pub default_style: MemberStyle,

    /// Delay before a handled command message is deleted
    pub cleanup_delay_ms: u64,

    pub render: RenderOptions,

    pub recipes: Vec<RoleRecipe>,

    pub console: ConsoleConfig,
}

/// Identity and member directory used by the console front end
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub self_user_id: UserId,
    pub operator_id: UserId,
    pub operator_tag: String,
    pub directory: Vec<DirectoryEntry>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            self_user_id: UserId(1),
            operator_id: UserId(2),
            operator_tag: "console".to_string(),
            directory: Vec::new(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("state.json"),
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            scan_limit: DEFAULT_SCAN_LIMIT,
            roster_channel_id: None,
            guild_id: GuildId(0),
            default_categories: ["Council", "Staff", "Moderador", "Eclipse", "Trial"]
                .map(String::from)
                .to_vec(),
            help_role_ids: vec![
                RoleId(1_373_410_183_333_679_152),
                RoleId(1_373_410_183_333_679_151),
            ],
            default_style: MemberStyle::default(),
            cleanup_delay_ms: 500,
            render: RenderOptions::default(),
            recipes: default_recipes(),
            console: ConsoleConfig::default(),
        }
    }
}

impl BotConfig {
    /// Load from `path`, or defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `ROSTER_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|var| std::env::var(var).ok())
    }

    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(path) = lookup(ENV_STATE_FILE).filter(|v| !v.trim().is_empty()) {
            self.state_file = PathBuf::from(path);
        }
        if let Some(value) = lookup(ENV_CHANNEL_ID) {
            self.roster_channel_id = Some(ChannelId(parse_id(ENV_CHANNEL_ID, &value)?));
        }
        if let Some(value) = lookup(ENV_GUILD_ID) {
            self.guild_id = GuildId(parse_id(ENV_GUILD_ID, &value)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_limit == 0 {
            return Err(ConfigError::Invalid("scan_limit must be > 0".to_string()));
        }
        if self.render.title.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "render.title must not be empty".to_string(),
            ));
        }

        let mut triggers = HashSet::new();
        for recipe in &self.recipes {
            let trigger = recipe.trigger.trim().to_lowercase();
            if trigger.is_empty() || trigger.contains(char::is_whitespace) {
                return Err(ConfigError::Invalid(format!(
                    "recipe trigger '{}' must be a single word",
                    recipe.trigger
                )));
            }
            if !triggers.insert(trigger) {
                return Err(ConfigError::Invalid(format!(
                    "recipe trigger '{}' defined twice",
                    recipe.trigger
                )));
            }
            if let Some(role) = recipe
                .add
                .iter()
                .find(|a| recipe.remove.iter().any(|r| r.id == a.id))
            {
                return Err(ConfigError::Invalid(format!(
                    "recipe '{}' both adds and removes role {}",
                    recipe.trigger, role.id
                )));
            }
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_millis(self.cleanup_delay_ms)
    }
}

fn parse_id(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn defaults_validate() {
        let config = BotConfig::default();
        config.validate().unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.scan_limit, 10);
        assert_eq!(config.recipes.len(), 3);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: BotConfig = toml::from_str(
            r#"
            state_file = "data/roster.json"
            roster_channel_id = 1373410183853772849
            default_style = "corona"

            [render]
            title = "Test Roster"
            "#,
        )
        .unwrap();
        assert_eq!(config.state_file, PathBuf::from("data/roster.json"));
        assert_eq!(config.roster_channel_id, Some(ChannelId(1_373_410_183_853_772_849)));
        assert_eq!(config.default_style, MemberStyle::Corona);
        assert_eq!(config.render.title, "Test Roster");
        assert_eq!(config.render.empty_placeholder, "*Vacío*");
        assert_eq!(config.debounce_ms, 500);
    }

    #[test]
    fn example_config_parses() {
        let config: BotConfig =
            toml::from_str(include_str!("../../../roster-bot.example.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.render.color, 0x9B59B6);
        assert_eq!(config.console.directory.len(), 2);
        assert_eq!(config.console.directory[1].nickname.as_deref(), Some("Atlas"));
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_STATE_FILE, "/tmp/override.json"),
            (ENV_CHANNEL_ID, "77"),
        ]);
        let mut config = BotConfig::default();
        config
            .apply_env_from(|var| env.get(var).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.state_file, PathBuf::from("/tmp/override.json"));
        assert_eq!(config.roster_channel_id, Some(ChannelId(77)));
        assert_eq!(config.guild_id, GuildId(0));

        let err = config
            .apply_env_from(|var| (var == ENV_GUILD_ID).then(|| "abc".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: ENV_GUILD_ID, .. }));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = BotConfig {
            scan_limit: 0,
            ..BotConfig::default()
        };
        assert!(config.validate().is_err());

        config.scan_limit = 10;
        let role = config.recipes[0].add[0].clone();
        config.recipes[0].remove.push(role);
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("both adds and removes"), "{err}");

        let mut config = BotConfig::default();
        config.recipes[1].trigger = "PASS".to_string();
        assert!(config.validate().is_err());
    }
}
