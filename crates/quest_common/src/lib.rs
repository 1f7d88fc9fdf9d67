//! Progression engine for the job-search tracker.
//!
//! Events go into an append-only ledger. XP, levels, badges and streaks
//! are all derived from it on demand.

pub mod aggregate;
pub mod badges;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod levels;
pub mod notifier;
pub mod rules;
pub mod snapshot;
pub mod streaks;
pub mod taxonomy;
pub mod xp;

pub use aggregate::{EventCounts, TallyTransition, UserTally};
pub use badges::{
    BadgeCatalog, BadgeCategory, BadgeDefinition, BadgeStatus, BadgeView, Requirement,
    RequirementProgress,
};
pub use config::{LedgerBackend, QuestConfig};
pub use engine::{ProgressionEngine, RecordReceipt};
pub use error::{ConfigError, LedgerError, RecordError, SinkError};
pub use ledger::{EventLedger, EventRecord, JsonlLedger, MemoryLedger, SqliteLedger};
pub use levels::{LevelCurve, LevelDefinition, UserProgression};
pub use notifier::{
    ChannelSink, FanoutSink, Notification, NotificationIntent, NotificationSink, Notifier,
    RecordingSink, TracingSink,
};
pub use rules::Rules;
pub use snapshot::ProgressionSnapshot;
pub use streaks::{StreakPolicy, StreakStats};
pub use taxonomy::{events, CountMode, EventTaxonomy, EventType};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
