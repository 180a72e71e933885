//! Role recipes: fixed add/remove role sets applied to one member.

use log::{info, warn};
use roster_core::{ChatPlatform, DirectoryEntry, GuildId, RoleId, RosterError};
use serde::{Deserialize, Serialize};

/// A role known by id, with the name used in announcements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: RoleId,
    pub name: String,
}

impl RoleRef {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: RoleId(id),
            name: name.into(),
        }
    }
}

/// A named role mutation triggered by `+<trigger> <target>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecipe {
    /// Command word without the leading `+`
    pub trigger: String,
    #[serde(default)]
    pub add: Vec<RoleRef>,
    #[serde(default)]
    pub remove: Vec<RoleRef>,
    /// Clear the member's nickname when one is set
    #[serde(default)]
    pub reset_nickname: bool,
    /// Reaction placed on the trigger message after a change
    #[serde(default = "default_emoji")]
    pub emoji: String,
    /// Announcement prefix, e.g. "Changed roles"
    #[serde(default = "default_verb")]
    pub verb: String,
}

fn default_emoji() -> String {
    "✅".to_string()
}

fn default_verb() -> String {
    "Changed roles".to_string()
}

/// Role changes that would actually alter a member
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDiff {
    pub add: Vec<RoleRef>,
    pub remove: Vec<RoleRef>,
    pub reset_nickname: bool,
}

impl RoleDiff {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && !self.reset_nickname
    }

    /// `+Name`, `-Name` and `reset-nick` entries in application order.
    pub fn changes(&self) -> Vec<String> {
        let mut out: Vec<String> = self.add.iter().map(|r| format!("+{}", r.name)).collect();
        out.extend(self.remove.iter().map(|r| format!("-{}", r.name)));
        if self.reset_nickname {
            out.push("reset-nick".to_string());
        }
        out
    }
}

impl RoleRecipe {
    /// Keep only the parts of the recipe that change `member`.
    pub fn plan(&self, member: &DirectoryEntry) -> RoleDiff {
        let holds = |role: &RoleRef| member.role_ids.contains(&role.id);
        let mut diff = RoleDiff {
            reset_nickname: self.reset_nickname && member.nickname.is_some(),
            ..RoleDiff::default()
        };
        for role in &self.add {
            if !holds(role) && !diff.add.iter().any(|r| r.id == role.id) {
                diff.add.push(role.clone());
            }
        }
        for role in &self.remove {
            if holds(role) && !diff.remove.iter().any(|r| r.id == role.id) {
                diff.remove.push(role.clone());
            }
        }
        diff
    }

    /// Apply the planned diff. Returns what was actually changed.
    ///
    /// Role calls are surfaced as errors; a failed nickname reset is logged
    /// and dropped from the returned diff.
    pub async fn apply(
        &self,
        platform: &dyn ChatPlatform,
        guild: GuildId,
        member: &DirectoryEntry,
        author: &str,
    ) -> Result<RoleDiff, RosterError> {
        let mut diff = self.plan(member);
        if diff.is_empty() {
            return Ok(diff);
        }
        let reason = format!("+{} by {author}", self.trigger);

        if !diff.add.is_empty() {
            let ids: Vec<RoleId> = diff.add.iter().map(|r| r.id).collect();
            platform.add_roles(guild, member.id, &ids, &reason).await?;
        }
        if !diff.remove.is_empty() {
            let ids: Vec<RoleId> = diff.remove.iter().map(|r| r.id).collect();
            platform.remove_roles(guild, member.id, &ids, &reason).await?;
        }
        if diff.reset_nickname {
            if let Err(err) = platform.reset_nickname(guild, member.id, &reason).await {
                warn!("Nickname reset for {} failed: {err}", member.tag());
                diff.reset_nickname = false;
            }
        }
        info!(
            "{reason}: {} -> {}",
            member.tag(),
            diff.changes().join(", ")
        );
        Ok(diff)
    }
}

/// The community's built-in recipes: pass, purge and eclp.
pub fn default_recipes() -> Vec<RoleRecipe> {
    let eclipse = RoleRef::new(1_373_410_183_312_703_568, "Eclipse");
    let guest = RoleRef::new(1_373_410_183_249_920_113, "Guest");
    let trial = RoleRef::new(1_373_410_183_312_703_569, "Trial");
    let promo = RoleRef::new(1_373_410_183_312_703_570, "Eclipse Official");
    let academy = RoleRef::new(1_388_667_580_407_087_154, "Academy");

    vec![
        RoleRecipe {
            trigger: "pass".to_string(),
            add: vec![eclipse.clone(), trial.clone()],
            remove: vec![guest.clone()],
            reset_nickname: false,
            emoji: "✅".to_string(),
            verb: "Changed roles".to_string(),
        },
        RoleRecipe {
            trigger: "purge".to_string(),
            add: vec![guest.clone()],
            remove: vec![promo.clone(), eclipse.clone(), trial.clone(), academy.clone()],
            reset_nickname: true,
            emoji: "🧹".to_string(),
            verb: "Purged roles".to_string(),
        },
        RoleRecipe {
            trigger: "eclp".to_string(),
            add: vec![promo, eclipse, academy],
            remove: vec![trial, guest],
            reset_nickname: false,
            emoji: "🌟".to_string(),
            verb: "Promoted".to_string(),
        },
    ]
}
