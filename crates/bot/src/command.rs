//! Text command grammar.
//!
//! ```text
//! +<trigger> @user | +<trigger> partialName   role recipe
//! +estilo [name] | +styles [name]             display style
//! +help                                       command list
//! !roster | +roster                           force a sync
//! +<name> <category> | +<category> <name>     add or move a member
//! -<name> | -<category> <name>                remove a member
//! !addcat <name> [position]                   category lifecycle
//! !delcat <fragment>
//! !editcat <fragment> <newName>
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use roster_core::UserId;

static MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<@!?(\d+)>").expect("mention regex is valid"));

const STYLE_WORDS: [&str; 3] = ["+estilo", "+estilos", "+styles"];

/// Where a command may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Anywhere,
    Roster,
    Category,
}

/// Who a role recipe targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Mention(UserId),
    Query(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Recipe {
        trigger: String,
        target: Option<Target>,
    },
    Style(Option<String>),
    Help,
    Sync,
    /// Whitespace-separated arguments after the `+`, at least two
    Add(Vec<String>),
    /// Text after the `-`, trimmed and non-empty
    Remove(String),
    AddCategory {
        name: String,
        position: Option<usize>,
    },
    DeleteCategory(String),
    RenameCategory {
        fragment: String,
        new_name: String,
    },
    /// A recognised command with missing arguments
    Usage {
        scope: Scope,
        text: &'static str,
    },
}

impl Command {
    pub const fn scope(&self) -> Scope {
        match self {
            Self::Recipe { .. } => Scope::Anywhere,
            Self::Style(_) | Self::Help | Self::Sync | Self::Add(_) | Self::Remove(_) => {
                Scope::Roster
            }
            Self::AddCategory { .. } | Self::DeleteCategory(_) | Self::RenameCategory { .. } => {
                Scope::Category
            }
            Self::Usage { scope, .. } => *scope,
        }
    }
}

/// Parses chat text into [`Command`]s. Recipe triggers come from config.
#[derive(Debug, Clone, Default)]
pub struct CommandParser {
    triggers: Vec<String>,
}

impl CommandParser {
    pub fn new<I, S>(triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            triggers: triggers
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    /// `None` for text that is not a command.
    pub fn parse(&self, content: &str) -> Option<Command> {
        let content = content.trim();
        let lowered = content.to_lowercase();
        let mut words = content.split_whitespace();
        let head = words.next()?.to_lowercase();
        let rest: Vec<&str> = words.collect();

        if let Some(word) = head.strip_prefix('+') {
            if let Some(trigger) = self.triggers.iter().find(|t| t.as_str() == word) {
                return Some(Command::Recipe {
                    trigger: trigger.clone(),
                    target: parse_target(&rest),
                });
            }
        }
        if STYLE_WORDS.contains(&head.as_str()) {
            return Some(Command::Style(rest.first().map(|s| s.to_lowercase())));
        }
        if lowered == "+help" {
            return Some(Command::Help);
        }
        if lowered == "!roster" || lowered == "+roster" {
            return Some(Command::Sync);
        }
        if let Some(args) = content.strip_prefix('+') {
            let args: Vec<String> = args.split_whitespace().map(str::to_string).collect();
            if args.len() < 2 {
                return Some(Command::Usage {
                    scope: Scope::Roster,
                    text: "Usage: +name category OR +category name. Category can be partial.",
                });
            }
            return Some(Command::Add(args));
        }
        if let Some(text) = content.strip_prefix('-') {
            let text = text.trim();
            if text.is_empty() {
                return Some(Command::Usage {
                    scope: Scope::Roster,
                    text: "Usage: -name OR -category name",
                });
            }
            return Some(Command::Remove(text.to_string()));
        }

        match head.as_str() {
            "!addcat" => Some(parse_addcat(&rest)),
            "!delcat" if rest.is_empty() => Some(Command::Usage {
                scope: Scope::Category,
                text: "Usage: !delcat <name>",
            }),
            "!delcat" => Some(Command::DeleteCategory(rest.join(" "))),
            "!editcat" if rest.len() < 2 => Some(Command::Usage {
                scope: Scope::Category,
                text: "Usage: !editcat <oldName> <newName>",
            }),
            "!editcat" => Some(Command::RenameCategory {
                fragment: rest[0].to_string(),
                new_name: rest[1..].join(" "),
            }),
            _ => None,
        }
    }
}

fn parse_addcat(rest: &[&str]) -> Command {
    let Some((last, init)) = rest.split_last() else {
        return Command::Usage {
            scope: Scope::Category,
            text: "Usage: !addcat <name> [position]",
        };
    };
    if init.is_empty() || !last.chars().all(|c| c.is_ascii_digit()) {
        return Command::AddCategory {
            name: rest.join(" "),
            position: None,
        };
    }
    // A position too large to parse is out of range and appends.
    Command::AddCategory {
        name: init.join(" "),
        position: last.parse().ok(),
    }
}

fn parse_target(rest: &[&str]) -> Option<Target> {
    let joined = rest.join(" ");
    if let Some(id) = MENTION
        .captures(&joined)
        .and_then(|caps| caps[1].parse().ok())
    {
        return Some(Target::Mention(UserId(id)));
    }
    (!joined.is_empty()).then_some(Target::Query(joined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parser() -> CommandParser {
        CommandParser::new(["pass", "purge", "eclp"])
    }

    fn add(args: &[&str]) -> Command {
        Command::Add(args.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn recipe_targets() {
        let p = parser();
        assert_eq!(
            p.parse("+pass <@!123>"),
            Some(Command::Recipe {
                trigger: "pass".to_string(),
                target: Some(Target::Mention(UserId(123)))
            })
        );
        assert_eq!(
            p.parse("+PURGE big atlas"),
            Some(Command::Recipe {
                trigger: "purge".to_string(),
                target: Some(Target::Query("big atlas".to_string()))
            })
        );
        assert_eq!(
            p.parse("+eclp"),
            Some(Command::Recipe {
                trigger: "eclp".to_string(),
                target: None
            })
        );
        // Only the whole first word triggers a recipe.
        assert_eq!(p.parse("+passion staff"), Some(add(&["passion", "staff"])));
    }

    #[test]
    fn add_and_remove_forms() {
        let p = parser();
        assert_eq!(p.parse("+Shamu ecli"), Some(add(&["Shamu", "ecli"])));
        assert_eq!(p.parse("+tri  Big   Atlas"), Some(add(&["tri", "Big", "Atlas"])));
        assert!(matches!(p.parse("+solo"), Some(Command::Usage { scope: Scope::Roster, .. })));
        assert_eq!(p.parse("-staff maria"), Some(Command::Remove("staff maria".to_string())));
        assert!(matches!(p.parse("-   "), Some(Command::Usage { .. })));
    }

    #[test]
    fn keywords() {
        let p = parser();
        assert_eq!(p.parse("+help"), Some(Command::Help));
        assert_eq!(p.parse("!ROSTER"), Some(Command::Sync));
        assert_eq!(p.parse("+roster"), Some(Command::Sync));
        assert_eq!(p.parse("+estilo"), Some(Command::Style(None)));
        assert_eq!(
            p.parse("+styles Corona"),
            Some(Command::Style(Some("corona".to_string())))
        );
        assert_eq!(p.parse("hello there"), None);
        assert_eq!(p.parse("   "), None);
    }

    #[test]
    fn category_commands() {
        let p = parser();
        assert_eq!(
            p.parse("!addcat Academy 2"),
            Some(Command::AddCategory {
                name: "Academy".to_string(),
                position: Some(2)
            })
        );
        assert_eq!(
            p.parse("!addcat Squad 7"),
            Some(Command::AddCategory {
                name: "Squad".to_string(),
                position: Some(7)
            })
        );
        assert_eq!(
            p.parse("!addcat Academy 99999999999999999999999"),
            Some(Command::AddCategory {
                name: "Academy".to_string(),
                position: None
            })
        );
        // A lone number is the name, not a position.
        assert_eq!(
            p.parse("!addcat 2024"),
            Some(Command::AddCategory {
                name: "2024".to_string(),
                position: None
            })
        );
        assert_eq!(
            p.parse("!delcat mod"),
            Some(Command::DeleteCategory("mod".to_string()))
        );
        assert_eq!(
            p.parse("!editcat sta Crew Leads"),
            Some(Command::RenameCategory {
                fragment: "sta".to_string(),
                new_name: "Crew Leads".to_string()
            })
        );
        assert_eq!(p.parse("!editcat sta").map(|c| c.scope()), Some(Scope::Category));
        assert_eq!(p.parse("!addcatx"), None);
    }
}
