//! XP derivation.
//!
//! Total XP is the sum over event types of `effective count * XP per count`.
//! It is never stored: since counts only grow, XP only grows.

use crate::aggregate::EventCounts;
use crate::taxonomy::EventTaxonomy;
use serde::{Deserialize, Serialize};

/// XP contributed by one event type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpContribution {
    pub event_type: String,
    pub count: u64,
    pub xp_each: u64,
    pub xp: u64,
}

/// Total XP for a set of effective counts
pub fn total_xp(counts: &EventCounts, taxonomy: &EventTaxonomy) -> u64 {
    counts.iter().fold(0u64, |acc, (event_type, count)| {
        acc.saturating_add(count.saturating_mul(taxonomy.xp_for(event_type)))
    })
}

/// Per-type breakdown, largest contribution first. Zero-XP types omitted.
pub fn breakdown(counts: &EventCounts, taxonomy: &EventTaxonomy) -> Vec<XpContribution> {
    let mut parts: Vec<XpContribution> = counts
        .iter()
        .filter_map(|(event_type, count)| {
            let xp_each = taxonomy.xp_for(event_type);
            let xp = count.saturating_mul(xp_each);
            (xp > 0).then(|| XpContribution {
                event_type: event_type.to_string(),
                count,
                xp_each,
                xp,
            })
        })
        .collect();
    parts.sort_by(|a, b| b.xp.cmp(&a.xp).then_with(|| a.event_type.cmp(&b.event_type)));
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::events;

    #[test]
    fn test_total_xp_sums_known_types() {
        let taxonomy = EventTaxonomy::builtin();
        let counts: EventCounts = vec![
            (events::JOB_OFFER_CREATED, 3u64),
            (events::APPLICATION_INTERVIEW_SCHEDULED, 1),
            ("labs.unknown", 50),
        ]
        .into_iter()
        .collect();

        let expected = 3 * taxonomy.xp_for(events::JOB_OFFER_CREATED)
            + taxonomy.xp_for(events::APPLICATION_INTERVIEW_SCHEDULED);
        assert_eq!(total_xp(&counts, &taxonomy), expected);
    }

    #[test]
    fn test_empty_counts_zero_xp() {
        assert_eq!(total_xp(&EventCounts::new(), &EventTaxonomy::builtin()), 0);
    }

    #[test]
    fn test_breakdown_sorted_and_filtered() {
        let taxonomy = EventTaxonomy::builtin();
        let counts: EventCounts = vec![
            (events::JOB_OFFER_UPDATED, 1u64),
            (events::APPLICATION_OFFER_ACCEPTED, 1),
            ("labs.unknown", 9),
        ]
        .into_iter()
        .collect();

        let parts = breakdown(&counts, &taxonomy);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].event_type, events::APPLICATION_OFFER_ACCEPTED);
        assert_eq!(parts.iter().map(|p| p.xp).sum::<u64>(), total_xp(&counts, &taxonomy));
    }
}
