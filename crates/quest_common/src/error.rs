//! Error types for the progression engine.

use thiserror::Error;

/// Failures of the event ledger backends.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ledger lock poisoned")]
    Poisoned,

    #[error("Corrupt ledger row: {0}")]
    Corrupt(String),
}

/// Failures surfaced to callers of `record_event`.
///
/// All variants are recoverable: the action being measured must succeed
/// regardless.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("User id must not be empty")]
    EmptyUser,

    #[error("Invalid event type '{0}': expected dot-namespaced lower-case identifier")]
    InvalidEventType(String),

    #[error("Ledger write failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Background task failed: {0}")]
    Join(String),
}

impl RecordError {
    /// Whether the error is the caller's fault (bad input) rather than
    /// an infrastructure failure worth retrying.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, RecordError::EmptyUser | RecordError::InvalidEventType(_))
    }
}

/// Fatal configuration problems detected at load time.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Badge id must not be empty")]
    EmptyBadgeId,

    #[error("Duplicate badge id '{0}'")]
    DuplicateBadge(String),

    #[error("Badge '{0}' has no requirements")]
    EmptyRequirements(String),

    #[error("Badge '{badge}' requires '{event_type}' a non-positive number of times")]
    NonPositiveCount { badge: String, event_type: String },

    #[error("Badge '{badge}' lists requirement '{event_type}' more than once")]
    DuplicateRequirement { badge: String, event_type: String },

    #[error("Badge '{badge}' references invalid event type '{event_type}'")]
    InvalidRequirementType { badge: String, event_type: String },

    #[error("Level table is empty")]
    EmptyLevelTable,

    #[error("First level must be order 1 with 0 XP, got order {order} with {xp_required} XP")]
    BadFirstLevel { order: u32, xp_required: u64 },

    #[error("Level orders must be consecutive: expected {expected}, got {found}")]
    LevelOrderGap { expected: u32, found: u32 },

    #[error("Level {order} requires {xp_required} XP, not above the previous level's {previous} XP")]
    NonIncreasingXp {
        order: u32,
        xp_required: u64,
        previous: u64,
    },

    #[error("Invalid event type '{0}' in configuration")]
    InvalidEventType(String),

    #[error("Invalid streak milestone: {0}")]
    InvalidStreak(String),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a notification sink. Logged and swallowed by the notifier.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Notification queue full")]
    QueueFull,

    #[error("Notification channel closed")]
    Closed,

    #[error("Sink failed: {0}")]
    Other(String),
}
