use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use log::warn;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use crate::error::{Result, RosterError};
use crate::resolve::{resolve_fragment, Resolution};

/// Longest member display name accepted, in characters
pub const MAX_NAME_CHARS: usize = 32;

/// A named, position-significant bucket of member names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub members: Vec<String>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    fn position_of(&self, lowered: &str) -> Option<usize> {
        self.members
            .iter()
            .position(|member| member.to_lowercase() == lowered)
    }

    fn insert_sorted(&mut self, name: String) {
        let idx = self
            .members
            .partition_point(|existing| collate(existing, &name) != Ordering::Greater);
        self.members.insert(idx, name);
    }
}

/// Result of placing a member into a category
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Newly listed
    Added { name: String },
    /// Taken out of `from` and listed under the target category
    Moved { name: String, from: String },
    /// Already listed in the target category, nothing changed
    Unchanged { name: String },
}

impl AddOutcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Added { name } | Self::Moved { name, .. } | Self::Unchanged { name } => name,
        }
    }

    pub const fn changed(&self) -> bool {
        !matches!(self, Self::Unchanged { .. })
    }
}

/// A member taken off the roster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removed {
    pub name: String,
    pub category: String,
}

/// Ordered mapping of category name to a sorted list of member display names.
///
/// Category order is display order. A member name lives in at most one
/// category; members inside a category stay sorted by [`collate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    categories: Vec<Category>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roster with the given empty categories, duplicates dropped.
    pub fn with_categories<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut roster = Self::new();
        for name in names {
            let name = name.into();
            if roster.category(&name).is_none() {
                roster.categories.push(Category::new(name));
            }
        }
        roster
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn member_count(&self) -> usize {
        self.categories.iter().map(|c| c.members.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Category currently holding `name`, compared case-insensitively.
    pub fn find_member(&self, name: &str) -> Option<(&str, &str)> {
        let lowered = name.trim().to_lowercase();
        self.categories.iter().find_map(|c| {
            c.position_of(&lowered)
                .map(|idx| (c.name.as_str(), c.members[idx].as_str()))
        })
    }

    /// Resolve a category fragment against the current category names.
    pub fn resolve_category(&self, fragment: &str) -> Resolution<&str> {
        resolve_fragment(fragment, self.category_names(), |name| *name)
    }

    /// Like [`Roster::resolve_category`] but owned and turned into an error on miss.
    pub fn resolve_category_strict(&self, fragment: &str) -> Result<String> {
        self.resolve_category(fragment)
            .map(str::to_string)
            .into_result("category", fragment, Clone::clone)
    }

    /// List `raw_name` under `category`, moving it out of any other category.
    pub fn add_member(&mut self, category: &str, raw_name: &str) -> Result<AddOutcome> {
        let name = validate_member_name(raw_name)?;
        let target = self
            .index_of(category)
            .ok_or_else(|| RosterError::not_found("category", category))?;
        let lowered = name.to_lowercase();

        let mut moved_from = None;
        for (idx, cat) in self.categories.iter_mut().enumerate() {
            let Some(pos) = cat.position_of(&lowered) else {
                continue;
            };
            if idx == target {
                return Ok(AddOutcome::Unchanged { name });
            }
            cat.members.remove(pos);
            moved_from = Some(cat.name.clone());
            break;
        }

        self.categories[target].insert_sorted(name.clone());
        Ok(match moved_from {
            Some(from) => AddOutcome::Moved { name, from },
            None => AddOutcome::Added { name },
        })
    }

    /// Remove the first case-insensitive exact match, scanning categories in order.
    pub fn remove_member(&mut self, raw_name: &str) -> Option<Removed> {
        let lowered = raw_name.trim().to_lowercase();
        if lowered.is_empty() {
            return None;
        }
        self.categories.iter_mut().find_map(|cat| {
            let pos = cat.position_of(&lowered)?;
            Some(Removed {
                name: cat.members.remove(pos),
                category: cat.name.clone(),
            })
        })
    }

    /// Add an empty category at 1-based `position`, appending when absent or out of range.
    ///
    /// Returns the 1-based position the category landed at.
    pub fn add_category(&mut self, name: &str, position: Option<usize>) -> Result<usize> {
        let name = validate_category_name(name)?;
        if self.index_of(&name).is_some() {
            return Err(RosterError::Duplicate(name));
        }
        let len = self.categories.len();
        let idx = match position {
            Some(pos) if (1..=len + 1).contains(&pos) => pos - 1,
            _ => len,
        };
        self.categories.insert(idx, Category::new(name));
        Ok(idx + 1)
    }

    /// Drop a category and all of its members.
    pub fn delete_category(&mut self, name: &str) -> Result<Category> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| RosterError::not_found("category", name))?;
        Ok(self.categories.remove(idx))
    }

    /// Rename in place, keeping position and members.
    pub fn rename_category(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        let new_name = validate_category_name(new_name)?;
        let idx = self
            .index_of(old_name)
            .ok_or_else(|| RosterError::not_found("category", old_name))?;
        if self.index_of(&new_name).is_some() {
            return Err(RosterError::Duplicate(new_name));
        }
        self.categories[idx].name = new_name;
        Ok(())
    }

    /// Read-only copy for rendering and persistence.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.name == name)
    }
}

/// Title-case every whitespace-delimited word and join with single spaces.
pub fn normalize_display_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize and check a member name.
pub fn validate_member_name(raw: &str) -> Result<String> {
    let name = normalize_display_name(raw);
    if name.is_empty() {
        return Err(RosterError::validation("Empty name."));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(RosterError::validation(format!(
            "Name too long (max {MAX_NAME_CHARS} chars)."
        )));
    }
    Ok(name)
}

fn validate_category_name(raw: &str) -> Result<String> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err(RosterError::validation("Empty category name."));
    }
    Ok(name)
}

/// Case- and accent-insensitive ordering with Spanish `ñ` placed after `n`.
///
/// Names equal at that level fall back to plain code point order so the sort is total.
pub fn collate(a: &str, b: &str) -> Ordering {
    let primary = a.chars().map(primary_weight).cmp(b.chars().map(primary_weight));
    primary.then_with(|| a.cmp(b))
}

fn primary_weight(c: char) -> u32 {
    let base = match c.to_lowercase().next().unwrap_or(c) {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ç' => 'c',
        'ñ' => return weight_of('n') + 1,
        other => other,
    };
    weight_of(base)
}

// Non-letters sort before letters, following ICU root order.
fn weight_of(c: char) -> u32 {
    match c {
        c if c.is_whitespace() => 0x100,
        c if c.is_ascii_punctuation() && !is_symbol(c) => 0x200 + c as u32,
        c if is_symbol(c) => 0x400 + c as u32,
        '0'..='9' => 0x800 + (c as u32 - '0' as u32),
        // Leave a gap after every letter for tailored letters such as ñ.
        'a'..='z' => 0x1000 + (c as u32 - 'a' as u32) * 2,
        c if c.is_alphabetic() => 0x2000 + c as u32,
        _ => 0x600,
    }
}

fn is_symbol(c: char) -> bool {
    matches!(c, '$' | '+' | '<' | '=' | '>' | '^' | '`' | '|' | '~')
}

impl Serialize for Roster {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for cat in &self.categories {
            map.serialize_entry(&cat.name, &cat.members)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Roster {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RosterVisitor;

        impl<'de> Visitor<'de> for RosterVisitor {
            type Value = Roster;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping category names to member name lists")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Roster, A::Error> {
                let mut roster = Roster::new();
                let mut seen = HashSet::new();
                while let Some((name, members)) = access.next_entry::<String, Vec<String>>()? {
                    if roster.index_of(&name).is_some() {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate category '{name}'"
                        )));
                    }
                    let mut category = Category::new(name);
                    for member in members {
                        if member.trim().is_empty() {
                            continue;
                        }
                        // First listing wins when a member appears in several categories.
                        if !seen.insert(member.to_lowercase()) {
                            warn!("Dropping duplicate listing of '{member}'");
                            continue;
                        }
                        category.insert_sorted(member);
                    }
                    roster.categories.push(category);
                }
                Ok(roster)
            }
        }

        deserializer.deserialize_map(RosterVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn default_roster() -> Roster {
        Roster::with_categories(["Council", "Staff", "Moderador", "Eclipse", "Trial"])
    }

    fn members<'a>(roster: &'a Roster, category: &str) -> Vec<&'a str> {
        roster
            .category(category)
            .map(|c| c.members.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn assert_unique(roster: &Roster) {
        let mut seen = std::collections::HashSet::new();
        for cat in roster.categories() {
            for member in &cat.members {
                assert!(
                    seen.insert(member.to_lowercase()),
                    "{member} listed twice"
                );
            }
        }
    }

    fn assert_sorted(roster: &Roster) {
        for cat in roster.categories() {
            for pair in cat.members.windows(2) {
                assert_ne!(collate(&pair[0], &pair[1]), Ordering::Greater, "{pair:?}");
            }
        }
    }

    #[test]
    fn normalizes_to_title_case() {
        assert_eq!(normalize_display_name("  jOHN   doe "), "John Doe");
        assert_eq!(normalize_display_name("élan"), "Élan");
        assert_eq!(normalize_display_name(""), "");
    }

    #[test]
    fn rejects_empty_and_long_names() {
        let mut roster = default_roster();
        assert!(matches!(
            roster.add_member("Staff", "   "),
            Err(RosterError::Validation(_))
        ));
        let long = "x".repeat(MAX_NAME_CHARS + 1);
        assert!(matches!(
            roster.add_member("Staff", &long),
            Err(RosterError::Validation(_))
        ));
        assert!(roster.add_member("Staff", &"y".repeat(MAX_NAME_CHARS)).is_ok());
    }

    #[test]
    fn move_semantics() {
        let mut roster = default_roster();
        assert_eq!(
            roster.add_member("Staff", "bob").unwrap(),
            AddOutcome::Added { name: "Bob".into() }
        );
        assert_eq!(
            roster.add_member("Eclipse", "Bob").unwrap(),
            AddOutcome::Moved {
                name: "Bob".into(),
                from: "Staff".into()
            }
        );
        assert_eq!(members(&roster, "Eclipse"), vec!["Bob"]);
        assert!(members(&roster, "Staff").is_empty());
    }

    #[test]
    fn idempotent_re_add() {
        let mut roster = default_roster();
        roster.add_member("Trial", "atlas").unwrap();
        let before = roster.snapshot();
        let outcome = roster.add_member("Trial", "ATLAS").unwrap();
        assert!(!outcome.changed());
        assert_eq!(roster, before);
    }

    #[test]
    fn uniqueness_and_sort_hold_across_a_sequence() {
        let mut roster = default_roster();
        let ops = [
            ("Staff", "zoe"),
            ("Staff", "ana"),
            ("Eclipse", "Zoe"),
            ("Trial", "ñandu"),
            ("Trial", "nube"),
            ("Trial", "oso"),
            ("Staff", "Ángel"),
            ("Council", "ana"),
            ("Staff", "beto"),
        ];
        for (category, name) in ops {
            roster.add_member(category, name).unwrap();
            assert_unique(&roster);
            assert_sorted(&roster);
        }
        assert_eq!(members(&roster, "Trial"), vec!["Nube", "Ñandu", "Oso"]);
        assert_eq!(members(&roster, "Staff"), vec!["Ángel", "Beto"]);
        assert_eq!(members(&roster, "Council"), vec!["Ana"]);
    }

    #[test]
    fn remove_scans_in_category_order() {
        let mut roster = default_roster();
        roster.add_member("Moderador", "Camsita").unwrap();
        let removed = roster.remove_member("camsita").unwrap();
        assert_eq!(removed.category, "Moderador");
        assert_eq!(removed.name, "Camsita");
        assert!(roster.remove_member("camsita").is_none());
        assert!(roster.remove_member("").is_none());
    }

    #[test]
    fn add_category_positions_are_one_based() {
        let mut roster = default_roster();
        assert_eq!(roster.add_category("Academy", Some(1)).unwrap(), 1);
        assert_eq!(roster.categories()[0].name, "Academy");
        assert_eq!(roster.add_category("Guests", Some(99)).unwrap(), 7);
        assert_eq!(roster.add_category("Alumni", Some(0)).unwrap(), 8);
        assert_eq!(roster.add_category("Veterans", None).unwrap(), 9);
        assert!(matches!(
            roster.add_category("Staff", None),
            Err(RosterError::Duplicate(_))
        ));
    }

    #[test]
    fn category_keys_are_case_sensitive() {
        let mut roster = default_roster();
        assert!(roster.add_category("staff", None).is_ok());
    }

    #[test]
    fn rename_preserves_members_and_position() {
        let mut roster = default_roster();
        roster.add_member("Staff", "maria").unwrap();
        roster.rename_category("Staff", "Crew").unwrap();
        assert_eq!(roster.categories()[1].name, "Crew");
        assert_eq!(members(&roster, "Crew"), vec!["Maria"]);
        assert!(roster.category("Staff").is_none());

        assert!(matches!(
            roster.rename_category("Council", "Crew"),
            Err(RosterError::Duplicate(_))
        ));
    }

    #[test]
    fn delete_drops_members() {
        let mut roster = default_roster();
        roster.add_member("Trial", "atlas").unwrap();
        let removed = roster.delete_category("Trial").unwrap();
        assert_eq!(removed.members, vec!["Atlas"]);
        assert!(roster.find_member("atlas").is_none());
        assert_eq!(roster.categories().len(), 4);
    }

    #[test]
    fn json_keeps_category_order() {
        let mut roster = Roster::with_categories(["Zeta", "Alpha", "Mid"]);
        roster.add_member("Mid", "pablo").unwrap();
        let json = serde_json::to_string(&roster).unwrap();
        assert_eq!(json, r#"{"Zeta":[],"Alpha":[],"Mid":["Pablo"]}"#);
        let back: Roster = serde_json::from_str(&json).unwrap();
        assert_eq!(back, roster);
    }

    #[test]
    fn spaces_and_digits_sort_before_letters() {
        let mut names = vec!["Anabel", "Ana Maria", "Bob", "1bob", "Ana-Luz"];
        names.sort_by(|a, b| collate(a, b));
        assert_eq!(names, vec!["1bob", "Ana Maria", "Ana-Luz", "Anabel", "Bob"]);

        let mut roster = default_roster();
        for name in ["Anabel", "Ana Maria", "Bob", "1bob"] {
            roster.add_member("Staff", name).unwrap();
        }
        assert_eq!(
            members(&roster, "Staff"),
            vec!["1bob", "Ana Maria", "Anabel", "Bob"]
        );
        assert_sorted(&roster);
    }

    #[test]
    fn loading_keeps_only_the_first_listing_of_a_member() {
        let mut roster: Roster =
            serde_json::from_str(r#"{"Staff":["Bob"],"Trial":["bob","Ana"]}"#).unwrap();
        assert_eq!(members(&roster, "Staff"), vec!["Bob"]);
        assert_eq!(members(&roster, "Trial"), vec!["Ana"]);
        assert_unique(&roster);

        let outcome = roster.add_member("Trial", "bob").unwrap();
        assert_eq!(
            outcome,
            AddOutcome::Moved {
                name: "Bob".into(),
                from: "Staff".into()
            }
        );
        assert_eq!(members(&roster, "Trial"), vec!["Ana", "Bob"]);
        assert!(members(&roster, "Staff").is_empty());
        assert_unique(&roster);
    }

    #[test]
    fn json_rejects_non_object_shapes() {
        assert!(serde_json::from_str::<Roster>("[]").is_err());
        assert!(serde_json::from_str::<Roster>(r#"{"Staff": 3}"#).is_err());
        assert!(serde_json::from_str::<Roster>(r#"{"Staff": [1, 2]}"#).is_err());
    }
}
