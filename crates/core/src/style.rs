use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RosterError;

/// Decoration applied to every member name when the roster is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStyle {
    #[default]
    Estrella,
    Flecha,
    Diamante,
    Sparkle,
    Fancy,
    Bracket,
    Corona,
}

impl MemberStyle {
    pub const ALL: [Self; 7] = [
        Self::Estrella,
        Self::Flecha,
        Self::Diamante,
        Self::Sparkle,
        Self::Fancy,
        Self::Bracket,
        Self::Corona,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Self::Estrella => "estrella",
            Self::Flecha => "flecha",
            Self::Diamante => "diamante",
            Self::Sparkle => "sparkle",
            Self::Fancy => "fancy",
            Self::Bracket => "bracket",
            Self::Corona => "corona",
        }
    }

    pub fn decorate(self, name: &str) -> String {
        match self {
            Self::Estrella => format!("✦ {name}"),
            Self::Flecha => format!("➤ {name}"),
            Self::Diamante => format!("◆ {name}"),
            Self::Sparkle => format!("✨ {name}"),
            Self::Fancy => format!("✧彡 {name}"),
            Self::Bracket => format!("【{name}】"),
            Self::Corona => format!("👑 {name}"),
        }
    }

    /// Comma-separated list of style keys, for help and error text.
    pub fn catalog() -> String {
        Self::ALL.map(Self::key).join(", ")
    }
}

impl fmt::Display for MemberStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for MemberStyle {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|style| style.key() == wanted)
            .ok_or_else(|| {
                RosterError::validation(format!(
                    "Invalid style. Use one of: {}",
                    Self::catalog()
                ))
            })
    }
}

/// Swap a leading ASCII letter for its bold-script glyph; anything else passes through.
pub fn fancy_category_name(name: &str) -> String {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    match script_glyph(first) {
        Some(glyph) => std::iter::once(glyph).chain(chars).collect(),
        None => name.to_string(),
    }
}

fn script_glyph(c: char) -> Option<char> {
    let upper = c.to_ascii_uppercase();
    if !upper.is_ascii_uppercase() {
        return None;
    }
    // MATHEMATICAL BOLD SCRIPT CAPITAL A..Z is a contiguous block.
    char::from_u32(0x1D4D0 + (upper as u32 - 'A' as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keys_case_insensitively() {
        assert_eq!("Corona".parse::<MemberStyle>().unwrap(), MemberStyle::Corona);
        assert!("nope".parse::<MemberStyle>().is_err());
    }

    #[test]
    fn every_style_keeps_the_name() {
        for style in MemberStyle::ALL {
            assert!(style.decorate("Atlas").contains("Atlas"), "{style}");
        }
        assert_eq!(MemberStyle::Bracket.decorate("Atlas"), "【Atlas】");
        assert_eq!(MemberStyle::default().decorate("Atlas"), "✦ Atlas");
    }

    #[test]
    fn category_glyphs() {
        assert_eq!(fancy_category_name("Staff"), "𝓢taff");
        assert_eq!(fancy_category_name("eclipse"), "𝓔clipse");
        assert_eq!(fancy_category_name("Zeta"), "𝓩eta");
        assert_eq!(fancy_category_name("Ñu"), "Ñu");
        assert_eq!(fancy_category_name("1st"), "1st");
        assert_eq!(fancy_category_name(""), "");
    }
}
