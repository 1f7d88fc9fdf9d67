//! In-process ledger guarded by a mutex.

use super::{EventLedger, EventRecord};
use crate::aggregate::{TallyTransition, UserTally};
use crate::error::LedgerError;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

#[derive(Default)]
struct UserLog {
    events: Vec<EventRecord>,
    tally: UserTally,
    days: HashMap<String, BTreeSet<NaiveDate>>,
}

/// Ledger kept entirely in memory
#[derive(Default)]
pub struct MemoryLedger {
    users: Mutex<HashMap<String, UserLog>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventLedger for MemoryLedger {
    fn append(&self, record: &EventRecord) -> Result<TallyTransition, LedgerError> {
        let mut users = self.users.lock().map_err(|_| LedgerError::Poisoned)?;
        let log = users.entry(record.user_id.clone()).or_default();

        let new_day = log
            .days
            .entry(record.event_type.clone())
            .or_default()
            .insert(record.day());

        log.events.push(record.clone());
        log.tally.add(&record.event_type, new_day);

        Ok(TallyTransition::from_after(
            log.tally.clone(),
            &record.event_type,
            new_day,
        ))
    }

    fn events(&self, user_id: &str) -> Result<Vec<EventRecord>, LedgerError> {
        let users = self.users.lock().map_err(|_| LedgerError::Poisoned)?;
        Ok(users.get(user_id).map(|log| log.events.clone()).unwrap_or_default())
    }

    fn tally(&self, user_id: &str) -> Result<UserTally, LedgerError> {
        let users = self.users.lock().map_err(|_| LedgerError::Poisoned)?;
        Ok(users.get(user_id).map(|log| log.tally.clone()).unwrap_or_default())
    }

    fn active_days(&self, user_id: &str, event_type: &str) -> Result<Vec<NaiveDate>, LedgerError> {
        let users = self.users.lock().map_err(|_| LedgerError::Poisoned)?;
        Ok(users
            .get(user_id)
            .and_then(|log| log.days.get(event_type))
            .map(|days| days.iter().copied().collect())
            .unwrap_or_default())
    }

    fn users(&self) -> Result<Vec<String>, LedgerError> {
        let users = self.users.lock().map_err(|_| LedgerError::Poisoned)?;
        Ok(users.keys().cloned().collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
