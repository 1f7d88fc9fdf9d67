//! Streak calculation over distinct activity days.
//!
//! Streaks are computed from the sorted distinct UTC days on which the
//! streak source event (`daily.login` by default) was recorded, never from
//! raw event counts. When a new day extends the run to a milestone length,
//! the engine records the milestone's event (`streak.7_days`, ...).

use crate::error::ConfigError;
use crate::taxonomy::{events, is_well_formed};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Streak statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakStats {
    /// Consecutive days ending today or yesterday (0 if broken)
    pub current: u32,
    /// Longest run ever
    pub best: u32,
    /// Distinct days with activity
    pub active_days: u32,
}

/// Calculate streak statistics from distinct days
pub fn calculate_streaks(days: &[NaiveDate], today: NaiveDate) -> StreakStats {
    let mut days = days.to_vec();
    days.sort();
    days.dedup();

    let Some(&last_day) = days.last() else {
        return StreakStats::default();
    };

    let mut best = 1u32;
    let mut run = 1u32;
    for window in days.windows(2) {
        if window[0].succ_opt() == Some(window[1]) {
            run += 1;
            best = best.max(run);
        } else {
            run = 1;
        }
    }

    // The trailing run only counts if it reaches today or yesterday
    let current = if last_day == today || last_day.succ_opt() == Some(today) {
        run
    } else {
        0
    };

    StreakStats {
        current,
        best,
        active_days: days.len() as u32,
    }
}

/// Length of the consecutive run that ends exactly on `day`.
///
/// `days` must be sorted and distinct. Returns 0 when `day` is absent.
pub fn run_ending_on(days: &[NaiveDate], day: NaiveDate) -> u32 {
    let Ok(mut idx) = days.binary_search(&day) else {
        return 0;
    };
    let mut run = 1u32;
    while idx > 0 && days[idx - 1].succ_opt() == Some(days[idx]) {
        run += 1;
        idx -= 1;
    }
    run
}

/// Length of the consecutive run that starts exactly on `day`.
///
/// Same input contract as [`run_ending_on`].
pub fn run_starting_on(days: &[NaiveDate], day: NaiveDate) -> u32 {
    let Ok(mut idx) = days.binary_search(&day) else {
        return 0;
    };
    let mut run = 1u32;
    while idx + 1 < days.len() && days[idx].succ_opt() == Some(days[idx + 1]) {
        run += 1;
        idx += 1;
    }
    run
}

/// A streak length that triggers a milestone event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakMilestone {
    pub days: u32,
    pub event: String,
}

/// Which event feeds streaks and which milestones it produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakPolicy {
    pub source: String,
    pub milestones: Vec<StreakMilestone>,
}

impl Default for StreakPolicy {
    fn default() -> Self {
        Self {
            source: events::DAILY_LOGIN.to_string(),
            milestones: vec![
                StreakMilestone {
                    days: 7,
                    event: events::STREAK_7_DAYS.to_string(),
                },
                StreakMilestone {
                    days: 30,
                    event: events::STREAK_30_DAYS.to_string(),
                },
            ],
        }
    }
}

impl StreakPolicy {
    /// Reject malformed identifiers, zero-length or duplicate milestones,
    /// and milestones that would feed the source back into itself.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_well_formed(&self.source) {
            return Err(ConfigError::InvalidEventType(self.source.clone()));
        }
        let mut seen = Vec::new();
        for milestone in &self.milestones {
            if milestone.days == 0 {
                return Err(ConfigError::InvalidStreak(format!(
                    "milestone '{}' has zero days",
                    milestone.event
                )));
            }
            if !is_well_formed(&milestone.event) {
                return Err(ConfigError::InvalidEventType(milestone.event.clone()));
            }
            if milestone.event == self.source {
                return Err(ConfigError::InvalidStreak(format!(
                    "milestone event '{}' is the streak source",
                    milestone.event
                )));
            }
            if seen.contains(&milestone.days) {
                return Err(ConfigError::InvalidStreak(format!(
                    "duplicate milestone for {} days",
                    milestone.days
                )));
            }
            seen.push(milestone.days);
        }
        Ok(())
    }

    /// Milestones first completed when a new active day joins a run of
    /// `left` days before it and `right` days after it.
    ///
    /// A milestone either side already reached on its own is not repeated.
    pub fn completed_by_join(
        &self,
        left: u32,
        right: u32,
    ) -> impl Iterator<Item = &StreakMilestone> {
        let joined = left + 1 + right;
        self.milestones
            .iter()
            .filter(move |m| left < m.days && right < m.days && joined >= m.days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    #[test]
    fn test_empty_streaks() {
        let stats = calculate_streaks(&[], d(10));
        assert_eq!(stats, StreakStats::default());
    }

    #[test]
    fn test_single_day_streak() {
        let stats = calculate_streaks(&[d(10)], d(10));
        assert_eq!(stats.active_days, 1);
        assert_eq!(stats.best, 1);
        assert_eq!(stats.current, 1);
    }

    #[test]
    fn test_consecutive_days() {
        let stats = calculate_streaks(&[d(8), d(9), d(10)], d(10));
        assert_eq!(stats.active_days, 3);
        assert_eq!(stats.best, 3);
        assert_eq!(stats.current, 3);
    }

    #[test]
    fn test_streak_alive_until_end_of_next_day() {
        let stats = calculate_streaks(&[d(8), d(9)], d(10));
        assert_eq!(stats.current, 2);
    }

    #[test]
    fn test_broken_streak() {
        let stats = calculate_streaks(&[d(1), d(2), d(3), d(6)], d(20));
        assert_eq!(stats.active_days, 4);
        assert_eq!(stats.best, 3);
        assert_eq!(stats.current, 0);
    }

    #[test]
    fn test_duplicates_and_order_ignored() {
        let stats = calculate_streaks(&[d(3), d(1), d(2), d(2)], d(3));
        assert_eq!(stats.active_days, 3);
        assert_eq!(stats.current, 3);
    }

    #[test]
    fn test_run_ending_on() {
        let days = [d(1), d(2), d(3), d(5), d(6)];
        assert_eq!(run_ending_on(&days, d(3)), 3);
        assert_eq!(run_ending_on(&days, d(6)), 2);
        assert_eq!(run_ending_on(&days, d(4)), 0);
    }

    #[test]
    fn test_run_starting_on() {
        let days = [d(1), d(2), d(3), d(5), d(6)];
        assert_eq!(run_starting_on(&days, d(1)), 3);
        assert_eq!(run_starting_on(&days, d(5)), 2);
        assert_eq!(run_starting_on(&days, d(6)), 1);
        assert_eq!(run_starting_on(&days, d(4)), 0);
    }

    #[test]
    fn test_month_boundary() {
        let days = [
            NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        ];
        assert_eq!(run_ending_on(&days, days[1]), 2);
    }

    #[test]
    fn test_default_policy_valid() {
        let policy = StreakPolicy::default();
        policy.validate().unwrap();
        // Extending a 6-day run forward
        assert_eq!(policy.completed_by_join(6, 0).count(), 1);
        assert_eq!(policy.completed_by_join(7, 0).count(), 0);
        // Backfilled gap between 3 and 6 days gives 10
        let joined: Vec<_> = policy.completed_by_join(3, 6).map(|m| m.days).collect();
        assert_eq!(joined, vec![7]);
        // The right side had already reached 7 by itself
        assert_eq!(policy.completed_by_join(2, 7).count(), 0);
    }

    #[test]
    fn test_policy_rejects_zero_and_duplicates() {
        let mut policy = StreakPolicy::default();
        policy.milestones.push(StreakMilestone {
            days: 7,
            event: "streak.week_again".to_string(),
        });
        assert!(matches!(policy.validate(), Err(ConfigError::InvalidStreak(_))));

        let mut policy = StreakPolicy::default();
        policy.milestones[0].days = 0;
        assert!(matches!(policy.validate(), Err(ConfigError::InvalidStreak(_))));
    }

    #[test]
    fn test_policy_rejects_self_feeding() {
        let mut policy = StreakPolicy::default();
        policy.milestones[0].event = policy.source.clone();
        assert!(policy.validate().is_err());
    }
}
