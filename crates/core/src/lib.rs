//! # Roster Core
//!
//! Categorized member roster for a community chat server, with fuzzy
//! reference resolution and a single self-healing display message.
//!
//! ## Flow
//!
//! ```text
//! command text
//!     │
//!     ├──> Fragment Resolver / Member Locator
//!     │      └─ exact → prefix → substring, ambiguity reported
//!     │
//!     ├──> Roster Store (RosterService)
//!     │      ├─ mutate in memory
//!     │      └─ schedule debounced write (RosterPersister)
//!     │
//!     └──> Roster Sync
//!            ├─ render document (pure)
//!            └─ edit cached message → adopt recent one → post new one
//! ```
//!
//! ## Example
//!
//! ```rust
//! use roster_core::{Roster, resolve_name, Resolution};
//!
//! let mut roster = Roster::with_categories(["Staff", "Eclipse", "Trial"]);
//! let Resolution::Found(category) = roster.resolve_category("ecli") else {
//!     panic!("fragment should resolve");
//! };
//! let category = category.to_string();
//! roster.add_member(&category, "shamu").unwrap();
//! assert_eq!(roster.find_member("SHAMU"), Some(("Eclipse", "Shamu")));
//! assert_eq!(
//!     resolve_name("ecl", ["Eclipse", "Eclectic"]),
//!     Resolution::Ambiguous(vec!["Eclipse", "Eclectic"])
//! );
//! ```

mod error;
mod locator;
mod memory;
mod persist;
mod platform;
mod render;
mod resolve;
mod roster;
mod service;
mod style;
mod sync;

pub use error::{Result, RosterError};
pub use locator::locate_member;
pub use memory::{MemoryPlatform, PlatformEvent};
pub use persist::{
    load_roster_or, read_roster, write_roster, FlushReport, RosterPersister, DEFAULT_DEBOUNCE,
};
pub use platform::{
    ChannelId, ChatPlatform, DirectoryEntry, Document, DocumentField, GuildId, MessageId,
    PlatformError, PlatformResult, PostedMessage, RoleId, UserId,
};
pub use render::{render_roster, RenderOptions};
pub use resolve::{resolve_fragment, resolve_name, Resolution, AMBIGUITY_SAMPLE};
pub use roster::{
    collate, normalize_display_name, validate_member_name, AddOutcome, Category, Removed, Roster,
    MAX_NAME_CHARS,
};
pub use service::RosterService;
pub use style::{fancy_category_name, MemberStyle};
pub use sync::{DocumentLocation, RosterSync, SyncOutcome, DEFAULT_SCAN_LIMIT};
