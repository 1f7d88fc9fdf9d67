//! Event ledger: the append-only store of user events.
//!
//! The ledger exclusively owns raw events. Everything else (counts, XP,
//! levels, badges) is derived from it and can be recomputed at any time.
//!
//! Backends:
//! - `SqliteLedger`: durable, with counters materialized atomically in the
//!   same transaction as each insert
//! - `JsonlLedger`: append-only JSONL file, counts computed on read
//! - `MemoryLedger`: in-process, for tests and throwaway deployments
//!
//! No backend deduplicates: recording the same action twice counts twice.

pub mod jsonl;
pub mod memory;
pub mod sqlite;

pub use jsonl::JsonlLedger;
pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;

use crate::aggregate::{distinct_days, TallyTransition, UserTally};
use crate::error::LedgerError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One immutable ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique event id
    pub id: Uuid,
    /// User the event belongs to
    pub user_id: String,
    /// Dot-namespaced event type
    pub event_type: String,
    /// When the action happened (UTC)
    pub occurred_at: DateTime<Utc>,
}

impl EventRecord {
    /// New event occurring now
    pub fn new(user_id: &str, event_type: &str) -> Self {
        Self::at(user_id, event_type, Utc::now())
    }

    /// New event with an explicit timestamp
    pub fn at(user_id: &str, event_type: &str, occurred_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            event_type: event_type.to_string(),
            occurred_at,
        }
    }

    /// UTC calendar day of the event
    pub fn day(&self) -> NaiveDate {
        self.occurred_at.date_naive()
    }
}

/// Storage contract shared by all ledger backends.
///
/// `append` must be atomic with respect to other appends: the returned
/// transition reflects exactly one added row, and concurrent appends for
/// the same user never lose an increment.
pub trait EventLedger: Send + Sync {
    /// Append one event and return the user's tally around the write.
    fn append(&self, record: &EventRecord) -> Result<TallyTransition, LedgerError>;

    /// All events for a user, oldest first.
    fn events(&self, user_id: &str) -> Result<Vec<EventRecord>, LedgerError>;

    /// Current tally for a user. Defaults to recomputing from raw events.
    fn tally(&self, user_id: &str) -> Result<UserTally, LedgerError> {
        Ok(UserTally::from_events(&self.events(user_id)?))
    }

    /// Sorted distinct days on which the user recorded `event_type`.
    fn active_days(&self, user_id: &str, event_type: &str) -> Result<Vec<NaiveDate>, LedgerError> {
        Ok(distinct_days(&self.events(user_id)?, event_type))
    }

    /// Every user with at least one event.
    fn users(&self) -> Result<Vec<String>, LedgerError>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every backend must share.

    use super::*;
    use crate::taxonomy::events;
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::thread;

    pub fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, day, hour, 0, 0).unwrap()
    }

    pub fn append_counts_every_row(ledger: &dyn EventLedger) {
        for _ in 0..3 {
            ledger
                .append(&EventRecord::new("u1", events::JOB_OFFER_CREATED))
                .unwrap();
        }
        let tally = ledger.tally("u1").unwrap();
        assert_eq!(tally.occurrences_of(events::JOB_OFFER_CREATED), 3);
        assert_eq!(ledger.events("u1").unwrap().len(), 3);
        assert!(ledger.tally("nobody").unwrap().occurrences.is_empty());
    }

    pub fn transition_brackets_append(ledger: &dyn EventLedger) {
        let first = ledger
            .append(&EventRecord::at("u1", events::DAILY_LOGIN, ts(1, 8)))
            .unwrap();
        assert!(first.new_day);
        assert_eq!(first.before.occurrences_of(events::DAILY_LOGIN), 0);
        assert_eq!(first.after.days_of(events::DAILY_LOGIN), 1);

        let same_day = ledger
            .append(&EventRecord::at("u1", events::DAILY_LOGIN, ts(1, 20)))
            .unwrap();
        assert!(!same_day.new_day);
        assert_eq!(same_day.before.occurrences_of(events::DAILY_LOGIN), 1);
        assert_eq!(same_day.after.occurrences_of(events::DAILY_LOGIN), 2);
        assert_eq!(same_day.after.days_of(events::DAILY_LOGIN), 1);

        let next_day = ledger
            .append(&EventRecord::at("u1", events::DAILY_LOGIN, ts(2, 8)))
            .unwrap();
        assert!(next_day.new_day);
        assert_eq!(next_day.before.days_of(events::DAILY_LOGIN), 1);
        assert_eq!(next_day.after.days_of(events::DAILY_LOGIN), 2);

        let days = ledger.active_days("u1", events::DAILY_LOGIN).unwrap();
        assert_eq!(days, vec![ts(1, 0).date_naive(), ts(2, 0).date_naive()]);
    }

    pub fn unknown_types_are_stored(ledger: &dyn EventLedger) {
        ledger
            .append(&EventRecord::new("u1", "labs.unreleased_feature"))
            .unwrap();
        let tally = ledger.tally("u1").unwrap();
        assert_eq!(tally.occurrences_of("labs.unreleased_feature"), 1);
    }

    pub fn users_are_isolated(ledger: &dyn EventLedger) {
        ledger.append(&EventRecord::new("alice", events::CV_SECTION_ADDED)).unwrap();
        ledger.append(&EventRecord::new("bob", events::CV_SECTION_ADDED)).unwrap();
        ledger.append(&EventRecord::new("bob", events::CV_SECTION_ADDED)).unwrap();

        assert_eq!(ledger.tally("alice").unwrap().occurrences_of(events::CV_SECTION_ADDED), 1);
        assert_eq!(ledger.tally("bob").unwrap().occurrences_of(events::CV_SECTION_ADDED), 2);
        let mut users = ledger.users().unwrap();
        users.sort();
        assert_eq!(users, vec!["alice".to_string(), "bob".to_string()]);
    }

    pub fn concurrent_appends_are_exact(ledger: Arc<dyn EventLedger>) {
        let threads = 8;
        let per_thread = 25;
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for _ in 0..per_thread {
                        ledger
                            .append(&EventRecord::new("racer", events::JOB_OFFER_CREATED))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let tally = ledger.tally("racer").unwrap();
        assert_eq!(
            tally.occurrences_of(events::JOB_OFFER_CREATED),
            (threads * per_thread) as u64
        );
    }
}
