//! Event aggregation: per-user counts derived from the ledger.
//!
//! Two aggregation shapes exist side by side:
//! - occurrences: one per recorded event, keyed by `(user, event type)`
//! - active days: one per distinct UTC calendar day, keyed by
//!   `(user, event type, day)`
//!
//! `EventCounts` is what the badge evaluator and XP sum consume; it picks
//! one of the two per event type according to the taxonomy.

use crate::ledger::EventRecord;
use crate::taxonomy::{CountMode, EventTaxonomy};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Raw per-type tallies for one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTally {
    /// Number of recorded events per type
    pub occurrences: BTreeMap<String, u64>,
    /// Number of distinct calendar days per type
    pub active_days: BTreeMap<String, u64>,
}

impl UserTally {
    /// Recompute from raw events (the source of truth).
    pub fn from_events(records: &[EventRecord]) -> Self {
        let mut tally = Self::default();
        let mut seen_days: HashSet<(&str, NaiveDate)> = HashSet::new();

        for record in records {
            let new_day = seen_days.insert((record.event_type.as_str(), record.day()));
            tally.add(&record.event_type, new_day);
        }

        tally
    }

    pub fn occurrences_of(&self, event_type: &str) -> u64 {
        self.occurrences.get(event_type).copied().unwrap_or(0)
    }

    pub fn days_of(&self, event_type: &str) -> u64 {
        self.active_days.get(event_type).copied().unwrap_or(0)
    }

    /// Total number of events across all types
    pub fn total_events(&self) -> u64 {
        self.occurrences.values().sum()
    }

    /// Count one more event, and one more day if it fell on a new day.
    pub(crate) fn add(&mut self, event_type: &str, new_day: bool) {
        *self.occurrences.entry(event_type.to_string()).or_insert(0) += 1;
        if new_day {
            *self.active_days.entry(event_type.to_string()).or_insert(0) += 1;
        }
    }

    /// The tally as it was before `add(event_type, new_day)`.
    pub(crate) fn without(&self, event_type: &str, new_day: bool) -> Self {
        let mut before = self.clone();
        decrement(&mut before.occurrences, event_type);
        if new_day {
            decrement(&mut before.active_days, event_type);
        }
        before
    }

    /// Effective counts, choosing occurrences or days per type.
    pub fn effective_counts(&self, taxonomy: &EventTaxonomy) -> EventCounts {
        let mut counts = BTreeMap::new();
        for (event_type, &occurrences) in &self.occurrences {
            let count = match taxonomy.mode_for(event_type) {
                CountMode::Occurrences => occurrences,
                CountMode::DistinctDays => self.days_of(event_type),
            };
            counts.insert(event_type.clone(), count);
        }
        EventCounts(counts)
    }
}

fn decrement(map: &mut BTreeMap<String, u64>, key: &str) {
    if let Some(count) = map.get_mut(key) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            map.remove(key);
        }
    }
}

/// Result of a single append: the user's tally on both sides of the write.
///
/// Both sides are captured inside the ledger's critical section, so the
/// pair is exact even when other appends for the same user race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyTransition {
    pub before: UserTally,
    pub after: UserTally,
    /// Whether the event was the first of its type on its calendar day
    pub new_day: bool,
}

impl TallyTransition {
    pub(crate) fn from_after(after: UserTally, event_type: &str, new_day: bool) -> Self {
        Self {
            before: after.without(event_type, new_day),
            after,
            new_day,
        }
    }
}

/// Effective per-type counts for one user. Absent types read as 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventCounts(BTreeMap<String, u64>);

impl EventCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, event_type: &str) -> u64 {
        self.0.get(event_type).copied().unwrap_or(0)
    }

    pub fn set(&mut self, event_type: &str, count: u64) {
        self.0.insert(event_type.to_string(), count);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, u64> {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for EventCounts {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Sorted distinct days on which `event_type` occurred.
pub fn distinct_days(records: &[EventRecord], event_type: &str) -> Vec<NaiveDate> {
    let mut days: Vec<NaiveDate> = records
        .iter()
        .filter(|r| r.event_type == event_type)
        .map(|r| r.day())
        .collect();
    days.sort();
    days.dedup();
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::events;
    use chrono::{TimeZone, Utc};

    fn at(user: &str, event_type: &str, day: u32, hour: u32) -> EventRecord {
        EventRecord::at(
            user,
            event_type,
            Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_tally_from_events() {
        let records = vec![
            at("u1", events::JOB_OFFER_CREATED, 1, 9),
            at("u1", events::JOB_OFFER_CREATED, 1, 10),
            at("u1", events::JOB_OFFER_CREATED, 2, 9),
            at("u1", events::DAILY_LOGIN, 1, 8),
            at("u1", events::DAILY_LOGIN, 1, 20),
        ];
        let tally = UserTally::from_events(&records);

        assert_eq!(tally.occurrences_of(events::JOB_OFFER_CREATED), 3);
        assert_eq!(tally.days_of(events::JOB_OFFER_CREATED), 2);
        assert_eq!(tally.occurrences_of(events::DAILY_LOGIN), 2);
        assert_eq!(tally.days_of(events::DAILY_LOGIN), 1);
        assert_eq!(tally.total_events(), 5);
    }

    #[test]
    fn test_effective_counts_use_mode() {
        let records = vec![
            at("u1", events::DAILY_LOGIN, 1, 8),
            at("u1", events::DAILY_LOGIN, 1, 9),
            at("u1", events::DAILY_LOGIN, 2, 9),
            at("u1", events::AI_INSIGHTS_GENERATED, 2, 9),
            at("u1", events::AI_INSIGHTS_GENERATED, 2, 10),
        ];
        let counts = UserTally::from_events(&records).effective_counts(&EventTaxonomy::builtin());

        assert_eq!(counts.get(events::DAILY_LOGIN), 2);
        assert_eq!(counts.get(events::AI_INSIGHTS_GENERATED), 2);
        assert_eq!(counts.get(events::PROFILE_COMPLETED), 0);
    }

    #[test]
    fn test_without_reverses_add() {
        let mut tally = UserTally::default();
        tally.add("cv.section_added", true);
        let snapshot = tally.clone();
        tally.add("cv.section_added", false);
        tally.add("ai.section_improved", true);

        let before = tally.without("ai.section_improved", true);
        let before = before.without("cv.section_added", false);
        assert_eq!(before, snapshot);
    }

    #[test]
    fn test_transition_from_after() {
        let mut after = UserTally::default();
        after.add(events::JOB_OFFER_CREATED, true);
        let transition = TallyTransition::from_after(after, events::JOB_OFFER_CREATED, true);

        assert_eq!(transition.before, UserTally::default());
        assert_eq!(transition.after.occurrences_of(events::JOB_OFFER_CREATED), 1);
    }

    #[test]
    fn test_distinct_days_sorted() {
        let records = vec![
            at("u1", events::DAILY_LOGIN, 5, 8),
            at("u1", events::DAILY_LOGIN, 3, 8),
            at("u1", events::DAILY_LOGIN, 5, 22),
            at("u1", events::JOB_OFFER_CREATED, 4, 8),
        ];
        let days = distinct_days(&records, events::DAILY_LOGIN);
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
            ]
        );
    }

    #[test]
    fn test_event_counts_serialize_as_map() {
        let counts: EventCounts = vec![("job_offer.created", 2u64)].into_iter().collect();
        let json = serde_json::to_string(&counts).unwrap();
        assert_eq!(json, r#"{"job_offer.created":2}"#);
    }
}
