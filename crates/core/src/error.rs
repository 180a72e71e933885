use thiserror::Error;

use crate::platform::PlatformError;

/// Result type for roster operations
pub type Result<T> = std::result::Result<T, RosterError>;

/// Errors surfaced by roster mutations, resolution and display sync
#[derive(Error, Debug)]
pub enum RosterError {
    /// Input rejected before touching the roster (empty name, too long, missing args)
    #[error("{0}")]
    Validation(String),

    /// A fragment or query matched more than one candidate at the same tier
    #[error("Ambiguous {kind} '{fragment}' ({total} matches): {}", sample.join(", "))]
    Ambiguous {
        kind: &'static str,
        fragment: String,
        total: usize,
        sample: Vec<String>,
    },

    /// Nothing matched at any tier
    #[error("No {kind} matches '{fragment}'")]
    NotFound { kind: &'static str, fragment: String },

    /// Category name collision
    #[error("Category '{0}' already exists")]
    Duplicate(String),

    /// Chat platform call failed
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// IO error while reading or writing the state file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// State file could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RosterError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not-found error for the given kind of reference
    pub fn not_found(kind: &'static str, fragment: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            fragment: fragment.into(),
        }
    }

    /// Errors the user can fix by rephrasing the command
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Ambiguous { .. } | Self::NotFound { .. } | Self::Duplicate(_)
        )
    }
}
