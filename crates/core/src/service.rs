use log::debug;

use crate::error::Result;
use crate::persist::RosterPersister;
use crate::platform::{ChannelId, ChatPlatform, Document};
use crate::render::{render_roster, RenderOptions};
use crate::roster::{AddOutcome, Category, Removed, Roster};
use crate::style::MemberStyle;
use crate::sync::{RosterSync, SyncOutcome, DEFAULT_SCAN_LIMIT};

/// Owns the live roster, the display style, the debounced writer and the
/// display-document sync state.
///
/// Every successful mutation schedules a write. Handlers get the service by
/// `&mut`, so a command's read-modify-write runs without interleaving.
pub struct RosterService {
    roster: Roster,
    style: MemberStyle,
    render: RenderOptions,
    sync: RosterSync,
    persister: Option<RosterPersister>,
}

impl RosterService {
    /// `persister: None` keeps the roster in memory only.
    pub fn init(
        initial: Roster,
        persister: Option<RosterPersister>,
        render: RenderOptions,
    ) -> Self {
        let sync = RosterSync::new(render.title.clone(), DEFAULT_SCAN_LIMIT);
        Self {
            roster: initial,
            style: MemberStyle::default(),
            render,
            sync,
            persister,
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: MemberStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn with_scan_limit(mut self, scan_limit: usize) -> Self {
        self.sync = RosterSync::new(self.render.title.clone(), scan_limit);
        self
    }

    /// Flush any pending write and stop the writer.
    pub async fn shutdown(self) {
        if let Some(persister) = &self.persister {
            persister.shutdown().await;
        }
    }

    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn snapshot(&self) -> Roster {
        self.roster.snapshot()
    }

    pub const fn style(&self) -> MemberStyle {
        self.style
    }

    /// Style lives for the process only and is never persisted.
    pub fn set_style(&mut self, style: MemberStyle) {
        self.style = style;
    }

    pub const fn sync_state(&self) -> &RosterSync {
        &self.sync
    }

    /// Resolve a category fragment to its exact name.
    pub fn resolve_category(&self, fragment: &str) -> Result<String> {
        self.roster.resolve_category_strict(fragment)
    }

    pub fn add_member(&mut self, category: &str, raw_name: &str) -> Result<AddOutcome> {
        let outcome = self.roster.add_member(category, raw_name)?;
        if outcome.changed() {
            self.persist();
        }
        Ok(outcome)
    }

    pub fn remove_member(&mut self, raw_name: &str) -> Option<Removed> {
        let removed = self.roster.remove_member(raw_name)?;
        self.persist();
        Some(removed)
    }

    pub fn add_category(&mut self, name: &str, position: Option<usize>) -> Result<usize> {
        let landed = self.roster.add_category(name, position)?;
        self.persist();
        Ok(landed)
    }

    pub fn delete_category(&mut self, name: &str) -> Result<Category> {
        let removed = self.roster.delete_category(name)?;
        self.persist();
        Ok(removed)
    }

    pub fn rename_category(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        self.roster.rename_category(old_name, new_name)?;
        self.persist();
        Ok(())
    }

    /// Current display document.
    pub fn render(&self) -> Document {
        render_roster(&self.roster, self.style, &self.render)
    }

    /// Push the current roster into the single roster document.
    pub async fn publish(
        &mut self,
        platform: &dyn ChatPlatform,
        trigger_channel: ChannelId,
    ) -> Result<SyncOutcome> {
        let document = self.render().stamped_now();
        let outcome = self.sync.sync(platform, trigger_channel, &document).await?;
        debug!("Roster sync: {outcome:?}");
        Ok(outcome)
    }

    fn persist(&self) {
        if let Some(persister) = &self.persister {
            persister.schedule(self.roster.snapshot());
        }
    }
}
