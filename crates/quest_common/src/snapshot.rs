//! Progression snapshots: level plus badge statuses at one point in time.

use crate::aggregate::{EventCounts, UserTally};
use crate::badges::{evaluate_all, BadgeStatus};
use crate::levels::UserProgression;
use crate::rules::Rules;
use crate::xp::total_xp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionSnapshot {
    pub counts: EventCounts,
    pub progression: UserProgression,
    pub badges: Vec<BadgeStatus>,
}

impl ProgressionSnapshot {
    /// Derive a snapshot from a raw tally. Pure.
    pub fn compute(rules: &Rules, tally: &UserTally) -> Self {
        let counts = tally.effective_counts(&rules.taxonomy);
        let xp = total_xp(&counts, &rules.taxonomy);
        Self {
            progression: rules.levels.resolve(xp),
            badges: evaluate_all(&rules.badges, &counts),
            counts,
        }
    }

    pub fn earned_ids(&self) -> BTreeSet<&str> {
        self.badges
            .iter()
            .filter(|b| b.earned)
            .map(|b| b.badge_id.as_str())
            .collect()
    }

    pub fn total_xp(&self) -> u64 {
        self.progression.total_xp
    }
}
