//! Progression engine facade.
//!
//! Ties the ledger, the immutable rule set and the notifier together.
//! Writes go through `record_event`; every read is derived on demand from
//! the ledger, so nothing here needs a lock of its own.

use crate::aggregate::{EventCounts, UserTally};
use crate::badges::{self, BadgeCategory, BadgeDefinition, BadgeStatus, BadgeView};
use crate::error::{LedgerError, RecordError};
use crate::ledger::{EventLedger, EventRecord};
use crate::levels::UserProgression;
use crate::notifier::{self, NotificationIntent, Notifier};
use crate::rules::Rules;
use crate::snapshot::ProgressionSnapshot;
use crate::streaks::{calculate_streaks, run_ending_on, run_starting_on, StreakStats};
use crate::taxonomy::EventType;
use crate::xp::{breakdown, XpContribution};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a successful `record_event` did
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordReceipt {
    pub event: EventRecord,
    /// Streak milestone events appended alongside the event
    pub milestones: Vec<EventRecord>,
    /// Intents handed to the notifier
    pub intents: Vec<NotificationIntent>,
}

#[derive(Clone)]
pub struct ProgressionEngine {
    ledger: Arc<dyn EventLedger>,
    rules: Arc<Rules>,
    notifier: Notifier,
}

impl ProgressionEngine {
    pub fn new(ledger: Arc<dyn EventLedger>, rules: Arc<Rules>, notifier: Notifier) -> Self {
        Self {
            ledger,
            rules,
            notifier,
        }
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn ledger(&self) -> &Arc<dyn EventLedger> {
        &self.ledger
    }

    /// Record that `user_id` performed `event_type` just now.
    pub fn record_event(
        &self,
        user_id: &str,
        event_type: &str,
    ) -> Result<RecordReceipt, RecordError> {
        self.record_event_at(user_id, event_type, Utc::now())
    }

    /// Record an event with an explicit timestamp.
    ///
    /// The event is appended first; streak milestones, notification
    /// intents and sink delivery follow. Failures after the append are
    /// logged and never undo or fail the recorded event.
    ///
    /// A backdated streak-source event that fills a gap joins the runs on
    /// either side of it. Milestones the joined run completes are
    /// recorded, but not ones either side had already reached alone.
    ///
    /// Intents cover only this call's writes. Events other callers append
    /// for the same user in the meantime are left to their own receipts.
    pub fn record_event_at(
        &self,
        user_id: &str,
        event_type: &str,
        occurred_at: DateTime<Utc>,
    ) -> Result<RecordReceipt, RecordError> {
        if user_id.trim().is_empty() {
            return Err(RecordError::EmptyUser);
        }
        let event_type = EventType::parse(event_type)
            .ok_or_else(|| RecordError::InvalidEventType(event_type.to_string()))?;

        let record = EventRecord::at(user_id, event_type.as_str(), occurred_at);
        let transition = self.ledger.append(&record)?;
        debug!(
            "Recorded {} for {} ({} backend, new day: {})",
            record.event_type,
            record.user_id,
            self.ledger.backend(),
            transition.new_day
        );

        let before = transition.before;
        let mut after = transition.after;

        let mut milestones = Vec::new();
        if transition.new_day && record.event_type == self.rules.streaks.source {
            for (milestone, new_day) in self.append_streak_milestones(&record) {
                after.add(&milestone.event_type, new_day);
                milestones.push(milestone);
            }
        }

        let intents = self.intents_for(user_id, &before, &after);
        for intent in &intents {
            info!("{}", intent.summary());
        }
        self.notifier.dispatch(&intents);

        Ok(RecordReceipt {
            event: record,
            milestones,
            intents,
        })
    }

    /// Append the milestone events completed by the source event's day.
    /// Returns each appended milestone with its own `new_day` flag.
    fn append_streak_milestones(&self, source: &EventRecord) -> Vec<(EventRecord, bool)> {
        let day = source.day();
        let days = match self.ledger.active_days(&source.user_id, &source.event_type) {
            Ok(days) => days,
            Err(e) => {
                warn!("Streak check skipped for {}: {}", source.user_id, e);
                return Vec::new();
            }
        };
        let left = run_ending_on(&days, day).saturating_sub(1);
        let right = run_starting_on(&days, day).saturating_sub(1);

        let mut appended = Vec::new();
        for milestone in self.rules.streaks.completed_by_join(left, right) {
            let record = EventRecord::at(&source.user_id, &milestone.event, source.occurred_at);
            match self.ledger.append(&record) {
                Ok(transition) => {
                    info!(
                        "{} reached a {}-day streak ({})",
                        source.user_id, milestone.days, milestone.event
                    );
                    appended.push((record, transition.new_day));
                }
                Err(e) => warn!(
                    "Failed to record {} for {}: {}",
                    milestone.event, source.user_id, e
                ),
            }
        }
        appended
    }

    fn intents_for(
        &self,
        user_id: &str,
        before: &UserTally,
        after: &UserTally,
    ) -> Vec<NotificationIntent> {
        let before = ProgressionSnapshot::compute(&self.rules, before);
        let after = ProgressionSnapshot::compute(&self.rules, after);
        notifier::diff(user_id, &self.rules, &before, &after)
    }

    /// Effective count of every event type the user ever recorded
    pub fn event_counts(&self, user_id: &str) -> Result<EventCounts, LedgerError> {
        Ok(self.ledger.tally(user_id)?.effective_counts(&self.rules.taxonomy))
    }

    pub fn snapshot(&self, user_id: &str) -> Result<ProgressionSnapshot, LedgerError> {
        let tally = self.ledger.tally(user_id)?;
        Ok(ProgressionSnapshot::compute(&self.rules, &tally))
    }

    pub fn user_progression(&self, user_id: &str) -> Result<UserProgression, LedgerError> {
        Ok(self.snapshot(user_id)?.progression)
    }

    pub fn xp_breakdown(&self, user_id: &str) -> Result<Vec<XpContribution>, LedgerError> {
        Ok(breakdown(&self.event_counts(user_id)?, &self.rules.taxonomy))
    }

    /// Earned flag and progress of every badge, in catalog order
    pub fn badge_statuses(&self, user_id: &str) -> Result<Vec<BadgeStatus>, LedgerError> {
        Ok(self.snapshot(user_id)?.badges)
    }

    /// Full badge views (definition plus progress), in catalog order
    pub fn badge_views(&self, user_id: &str) -> Result<Vec<BadgeView>, LedgerError> {
        Ok(badges::views(&self.rules.badges, &self.event_counts(user_id)?))
    }

    pub fn closest_badges(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<BadgeView>, LedgerError> {
        Ok(badges::closest(&self.rules.badges, &self.event_counts(user_id)?, limit))
    }

    /// Streak of the configured source event, relative to `today`
    pub fn streak_on(&self, user_id: &str, today: NaiveDate) -> Result<StreakStats, LedgerError> {
        let days = self.ledger.active_days(user_id, &self.rules.streaks.source)?;
        Ok(calculate_streaks(&days, today))
    }

    pub fn streak(&self, user_id: &str) -> Result<StreakStats, LedgerError> {
        self.streak_on(user_id, Utc::now().date_naive())
    }

    pub fn badge(&self, id: &str) -> Option<&BadgeDefinition> {
        self.rules.badges.get(id)
    }

    pub fn all_badges(&self) -> &[BadgeDefinition] {
        self.rules.badges.all()
    }

    pub fn badges_by_category(&self, category: BadgeCategory) -> Vec<&BadgeDefinition> {
        self.rules.badges.by_category(category)
    }
}
