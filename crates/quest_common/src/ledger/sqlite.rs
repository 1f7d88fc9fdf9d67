//! SQLite event ledger.
//!
//! Schema:
//! - events: append-only rows (id, user, type, timestamp, UTC day)
//! - event_counts: materialized occurrences per (user, type)
//! - event_days: distinct (user, type, day) triples
//!
//! Each append inserts the event, bumps the counter with an atomic upsert
//! and records the day, all in one IMMEDIATE transaction. The two derived
//! tables are a cache: `recount` rebuilds a tally from `events` alone.

use super::{EventLedger, EventRecord};
use crate::aggregate::{TallyTransition, UserTally};
use crate::error::LedgerError;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, TransactionBehavior};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default ledger database path
pub const LEDGER_DB_PATH: &str = "/var/lib/quest/ledger.db";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS events (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        user_id TEXT NOT NULL,
        event_type TEXT NOT NULL,
        occurred_at TEXT NOT NULL,
        day TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_events_user ON events(user_id, event_type);

    CREATE TABLE IF NOT EXISTS event_counts (
        user_id TEXT NOT NULL,
        event_type TEXT NOT NULL,
        count INTEGER NOT NULL,
        PRIMARY KEY (user_id, event_type)
    );

    CREATE TABLE IF NOT EXISTS event_days (
        user_id TEXT NOT NULL,
        event_type TEXT NOT NULL,
        day TEXT NOT NULL,
        PRIMARY KEY (user_id, event_type, day)
    );
"#;

/// SQLite-backed ledger
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open or create the ledger at the default path
    pub fn open() -> Result<Self, LedgerError> {
        Self::open_at(LEDGER_DB_PATH)
    }

    /// Open or create the ledger at a specific path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        // WAL lets readers proceed while another process appends
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened SQLite ledger at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Ephemeral database, mostly for tests
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Recompute a user's tally from raw events, ignoring the cache.
    pub fn recount(&self, user_id: &str) -> Result<UserTally, LedgerError> {
        let conn = self.conn.lock().map_err(|_| LedgerError::Poisoned)?;
        Ok(recount_tally(&conn, user_id)?)
    }

    /// Compare the cached tally with a recount. Returns true when they agree.
    pub fn verify(&self, user_id: &str) -> Result<bool, LedgerError> {
        let conn = self.conn.lock().map_err(|_| LedgerError::Poisoned)?;
        let cached = read_tally(&conn, user_id)?;
        let recounted = recount_tally(&conn, user_id)?;
        if cached != recounted {
            warn!("Cached counts for {} disagree with ledger rows", user_id);
        }
        Ok(cached == recounted)
    }

    /// Rewrite a user's cached counters from raw events.
    pub fn rebuild(&self, user_id: &str) -> Result<UserTally, LedgerError> {
        let mut conn = self.conn.lock().map_err(|_| LedgerError::Poisoned)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute("DELETE FROM event_counts WHERE user_id = ?1", params![user_id])?;
        tx.execute("DELETE FROM event_days WHERE user_id = ?1", params![user_id])?;
        tx.execute(
            "INSERT INTO event_counts (user_id, event_type, count)
             SELECT user_id, event_type, COUNT(*) FROM events
             WHERE user_id = ?1 GROUP BY event_type",
            params![user_id],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO event_days (user_id, event_type, day)
             SELECT user_id, event_type, day FROM events WHERE user_id = ?1",
            params![user_id],
        )?;

        let tally = read_tally(&tx, user_id)?;
        tx.commit()?;
        info!("Rebuilt cached counts for {}", user_id);
        Ok(tally)
    }

    /// Total number of rows in the ledger
    pub fn event_count(&self) -> Result<u64, LedgerError> {
        let conn = self.conn.lock().map_err(|_| LedgerError::Poisoned)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl EventLedger for SqliteLedger {
    fn append(&self, record: &EventRecord) -> Result<TallyTransition, LedgerError> {
        let mut conn = self.conn.lock().map_err(|_| LedgerError::Poisoned)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let day = record.day();

        tx.execute(
            "INSERT INTO events (id, user_id, event_type, occurred_at, day)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id.to_string(),
                &record.user_id,
                &record.event_type,
                record.occurred_at,
                day
            ],
        )?;

        tx.execute(
            "INSERT INTO event_counts (user_id, event_type, count) VALUES (?1, ?2, 1)
             ON CONFLICT(user_id, event_type) DO UPDATE SET count = count + 1",
            params![&record.user_id, &record.event_type],
        )?;

        let new_day = tx.execute(
            "INSERT OR IGNORE INTO event_days (user_id, event_type, day) VALUES (?1, ?2, ?3)",
            params![&record.user_id, &record.event_type, day],
        )? == 1;

        let after = read_tally(&tx, &record.user_id)?;
        tx.commit()?;

        debug!(
            "Appended {} for {} (new_day={})",
            record.event_type, record.user_id, new_day
        );
        Ok(TallyTransition::from_after(after, &record.event_type, new_day))
    }

    fn events(&self, user_id: &str) -> Result<Vec<EventRecord>, LedgerError> {
        let conn = self.conn.lock().map_err(|_| LedgerError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, event_type, occurred_at FROM events
             WHERE user_id = ?1 ORDER BY seq",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, DateTime<Utc>>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, user_id, event_type, occurred_at) = row?;
            let id = Uuid::parse_str(&id)
                .map_err(|e| LedgerError::Corrupt(format!("event id '{}': {}", id, e)))?;
            records.push(EventRecord {
                id,
                user_id,
                event_type,
                occurred_at,
            });
        }
        Ok(records)
    }

    fn tally(&self, user_id: &str) -> Result<UserTally, LedgerError> {
        let conn = self.conn.lock().map_err(|_| LedgerError::Poisoned)?;
        Ok(read_tally(&conn, user_id)?)
    }

    fn active_days(&self, user_id: &str, event_type: &str) -> Result<Vec<NaiveDate>, LedgerError> {
        let conn = self.conn.lock().map_err(|_| LedgerError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT day FROM event_days WHERE user_id = ?1 AND event_type = ?2 ORDER BY day",
        )?;
        let days = stmt
            .query_map(params![user_id, event_type], |row| row.get::<_, NaiveDate>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(days)
    }

    fn users(&self) -> Result<Vec<String>, LedgerError> {
        let conn = self.conn.lock().map_err(|_| LedgerError::Poisoned)?;
        let mut stmt = conn.prepare("SELECT DISTINCT user_id FROM events ORDER BY user_id")?;
        let users = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

/// Tally from the materialized tables
fn read_tally(conn: &Connection, user_id: &str) -> rusqlite::Result<UserTally> {
    let mut tally = UserTally::default();

    let mut stmt = conn.prepare("SELECT event_type, count FROM event_counts WHERE user_id = ?1")?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (event_type, count) = row?;
        tally.occurrences.insert(event_type, count as u64);
    }

    let mut stmt = conn.prepare(
        "SELECT event_type, COUNT(*) FROM event_days WHERE user_id = ?1 GROUP BY event_type",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (event_type, days) = row?;
        tally.active_days.insert(event_type, days as u64);
    }

    Ok(tally)
}

/// Tally straight from the events table
fn recount_tally(conn: &Connection, user_id: &str) -> rusqlite::Result<UserTally> {
    let mut tally = UserTally::default();
    let mut stmt = conn.prepare(
        "SELECT event_type, COUNT(*), COUNT(DISTINCT day) FROM events
         WHERE user_id = ?1 GROUP BY event_type",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;
    for row in rows {
        let (event_type, occurrences, days) = row?;
        tally.occurrences.insert(event_type.clone(), occurrences as u64);
        tally.active_days.insert(event_type, days as u64);
    }
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::contract;
    use crate::taxonomy::events;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn test_ledger() -> SqliteLedger {
        SqliteLedger::open_in_memory().unwrap()
    }

    #[test]
    fn test_append_counts_every_row() {
        contract::append_counts_every_row(&test_ledger());
    }

    #[test]
    fn test_transition_brackets_append() {
        contract::transition_brackets_append(&test_ledger());
    }

    #[test]
    fn test_unknown_types_are_stored() {
        contract::unknown_types_are_stored(&test_ledger());
    }

    #[test]
    fn test_users_are_isolated() {
        contract::users_are_isolated(&test_ledger());
    }

    #[test]
    fn test_concurrent_appends_are_exact() {
        contract::concurrent_appends_are_exact(Arc::new(test_ledger()));
    }

    #[test]
    fn test_events_roundtrip_fields() {
        let ledger = test_ledger();
        let record = EventRecord::at("u1", events::AI_SECTION_IMPROVED, contract::ts(3, 14));
        ledger.append(&record).unwrap();

        let stored = ledger.events("u1").unwrap();
        assert_eq!(stored, vec![record]);
    }

    #[test]
    fn test_recount_matches_cache() {
        let ledger = test_ledger();
        for day in 1..=3 {
            ledger
                .append(&EventRecord::at("u1", events::DAILY_LOGIN, contract::ts(day, 9)))
                .unwrap();
            ledger
                .append(&EventRecord::at("u1", events::DAILY_LOGIN, contract::ts(day, 18)))
                .unwrap();
        }

        let recount = ledger.recount("u1").unwrap();
        assert_eq!(recount, ledger.tally("u1").unwrap());
        assert_eq!(recount.occurrences_of(events::DAILY_LOGIN), 6);
        assert_eq!(recount.days_of(events::DAILY_LOGIN), 3);
        assert!(ledger.verify("u1").unwrap());
    }

    #[test]
    fn test_rebuild_repairs_drifted_cache() {
        let ledger = test_ledger();
        ledger.append(&EventRecord::new("u1", events::JOB_OFFER_CREATED)).unwrap();
        ledger.append(&EventRecord::new("u1", events::JOB_OFFER_CREATED)).unwrap();

        {
            let conn = ledger.conn.lock().unwrap();
            conn.execute("UPDATE event_counts SET count = 99 WHERE user_id = 'u1'", [])
                .unwrap();
        }
        assert!(!ledger.verify("u1").unwrap());

        let rebuilt = ledger.rebuild("u1").unwrap();
        assert_eq!(rebuilt.occurrences_of(events::JOB_OFFER_CREATED), 2);
        assert!(ledger.verify("u1").unwrap());
    }

    #[test]
    fn test_users_come_from_events() {
        let ledger = test_ledger();
        ledger.append(&EventRecord::new("u2", events::PROFILE_UPDATED)).unwrap();
        ledger.append(&EventRecord::new("u1", events::PROFILE_UPDATED)).unwrap();

        {
            let conn = ledger.conn.lock().unwrap();
            conn.execute("DELETE FROM event_counts", []).unwrap();
        }
        assert_eq!(ledger.users().unwrap(), vec!["u1".to_string(), "u2".to_string()]);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        {
            let ledger = SqliteLedger::open_at(&path).unwrap();
            ledger.append(&EventRecord::new("u1", events::CV_SECTION_ADDED)).unwrap();
        }
        let ledger = SqliteLedger::open_at(&path).unwrap();
        assert_eq!(ledger.tally("u1").unwrap().occurrences_of(events::CV_SECTION_ADDED), 1);
        assert_eq!(ledger.event_count().unwrap(), 1);
    }

    #[test]
    fn test_two_connections_do_not_lose_updates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared.db");
        let first = Arc::new(SqliteLedger::open_at(&path).unwrap());
        let second = Arc::new(SqliteLedger::open_at(&path).unwrap());

        let handles: Vec<_> = [first.clone(), second.clone()]
            .into_iter()
            .map(|ledger| {
                thread::spawn(move || {
                    for _ in 0..40 {
                        ledger
                            .append(&EventRecord::new("shared", events::JOB_OFFER_NOTE_ADDED))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let tally = first.tally("shared").unwrap();
        assert_eq!(tally.occurrences_of(events::JOB_OFFER_NOTE_ADDED), 80);
        assert!(second.verify("shared").unwrap());
    }
}
