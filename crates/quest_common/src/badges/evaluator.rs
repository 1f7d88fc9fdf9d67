//! Badge evaluation against effective event counts.
//!
//! Progress of an unearned badge is the UNWEIGHTED mean of each
//! requirement's clamped ratio. One satisfied requirement out of two reads
//! 50% no matter how large either threshold is. UI sorting depends on this;
//! do not turn it into a magnitude-weighted average.

use super::catalog::{BadgeCatalog, BadgeCategory, BadgeDefinition};
use crate::aggregate::EventCounts;
use serde::{Deserialize, Serialize};

/// Largest f64 below 1.0
const JUST_BELOW_ONE: f64 = 1.0 - f64::EPSILON / 2.0;

/// Earned flag and overall progress for one badge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeStatus {
    pub badge_id: String,
    pub earned: bool,
    pub progress_fraction: f64,
}

/// Per-requirement breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementProgress {
    pub event_type: String,
    pub current: u64,
    pub required: u64,
    pub progress_fraction: f64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
}

/// Everything a dashboard needs to draw one badge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: BadgeCategory,
    pub earned: bool,
    pub progress_fraction: f64,
    /// Sum over requirements of `min(current, required)`
    pub current: u64,
    /// Sum over requirements of `required`
    pub required: u64,
    pub requirements: Vec<RequirementProgress>,
}

/// True iff every requirement's count meets its threshold
pub fn is_earned(badge: &BadgeDefinition, counts: &EventCounts) -> bool {
    badge
        .requirements
        .iter()
        .all(|req| counts.get(&req.event_type) >= req.required_count)
}

fn ratio(current: u64, required: u64) -> f64 {
    if required == 0 {
        return 1.0;
    }
    (current as f64 / required as f64).min(1.0)
}

/// 1.0 when earned, otherwise the unweighted mean of clamped ratios.
///
/// Unearned progress is always strictly below 1.0, even when float
/// rounding would push a near-complete ratio to 1.0.
pub fn progress(badge: &BadgeDefinition, counts: &EventCounts) -> f64 {
    if is_earned(badge, counts) {
        return 1.0;
    }
    if badge.requirements.is_empty() {
        return 0.0;
    }

    let sum: f64 = badge
        .requirements
        .iter()
        .map(|req| ratio(counts.get(&req.event_type), req.required_count))
        .sum();
    (sum / badge.requirements.len() as f64).min(JUST_BELOW_ONE)
}

pub fn progress_details(badge: &BadgeDefinition, counts: &EventCounts) -> Vec<RequirementProgress> {
    badge
        .requirements
        .iter()
        .map(|req| {
            let current = counts.get(&req.event_type);
            RequirementProgress {
                event_type: req.event_type.clone(),
                current,
                required: req.required_count,
                progress_fraction: ratio(current, req.required_count),
                placeholder: req.is_placeholder(),
            }
        })
        .collect()
}

pub fn status(badge: &BadgeDefinition, counts: &EventCounts) -> BadgeStatus {
    BadgeStatus {
        badge_id: badge.id.clone(),
        earned: is_earned(badge, counts),
        progress_fraction: progress(badge, counts),
    }
}

/// Status of every badge, in catalog order
pub fn evaluate_all(catalog: &BadgeCatalog, counts: &EventCounts) -> Vec<BadgeStatus> {
    catalog.all().iter().map(|b| status(b, counts)).collect()
}

pub fn view(badge: &BadgeDefinition, counts: &EventCounts) -> BadgeView {
    let requirements = progress_details(badge, counts);
    BadgeView {
        id: badge.id.clone(),
        name: badge.name.clone(),
        description: badge.description.clone(),
        icon: badge.icon.clone(),
        category: badge.category,
        earned: is_earned(badge, counts),
        progress_fraction: progress(badge, counts),
        current: requirements.iter().map(|r| r.current.min(r.required)).sum(),
        required: requirements.iter().map(|r| r.required).sum(),
        requirements,
    }
}

/// Views of every badge, in catalog order
pub fn views(catalog: &BadgeCatalog, counts: &EventCounts) -> Vec<BadgeView> {
    catalog.all().iter().map(|b| view(b, counts)).collect()
}

/// Unearned badges closest to completion. Ties keep catalog order.
pub fn closest(catalog: &BadgeCatalog, counts: &EventCounts, limit: usize) -> Vec<BadgeView> {
    let mut pending: Vec<BadgeView> = views(catalog, counts)
        .into_iter()
        .filter(|v| !v.earned)
        .collect();
    // Stable sort keeps catalog order among equal progress
    pending.sort_by(|a, b| b.progress_fraction.total_cmp(&a.progress_fraction));
    pending.truncate(limit);
    pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badges::catalog::Requirement;
    use crate::taxonomy::events;

    fn badge(requirements: Vec<Requirement>) -> BadgeDefinition {
        BadgeDefinition {
            id: "test".to_string(),
            name: "Test".to_string(),
            description: String::new(),
            icon: String::new(),
            category: BadgeCategory::Cv,
            requirements,
        }
    }

    fn counts(pairs: &[(&str, u64)]) -> EventCounts {
        pairs.iter().map(|&(k, v)| (k, v)).collect()
    }

    #[test]
    fn test_primera_oferta_scenario() {
        let catalog = BadgeCatalog::builtin();
        let badge = catalog.get("primera_oferta").unwrap();

        let before = status(badge, &EventCounts::new());
        assert!(!before.earned);
        assert_eq!(before.progress_fraction, 0.0);

        let after = status(badge, &counts(&[(events::JOB_OFFER_CREATED, 1)]));
        assert!(after.earned);
        assert_eq!(after.progress_fraction, 1.0);
    }

    #[test]
    fn test_cv_completo_half_way() {
        let catalog = BadgeCatalog::builtin();
        let badge = catalog.get("cv_completo").unwrap();
        assert_eq!(badge.requirements.len(), 6);

        let c = counts(&[
            (events::CV_EXPERIENCE_ADDED, 1),
            (events::CV_EDUCATION_ADDED, 1),
            (events::CV_LANGUAGE_ADDED, 1),
        ]);
        assert!(!is_earned(badge, &c));
        assert!((progress(badge, &c) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_unweighted_average_ignores_magnitude() {
        let b = badge(vec![
            Requirement::new("a.small", 1),
            Requirement::new("a.huge", 1_000),
        ]);
        // Small one done, huge one untouched: exactly half
        assert_eq!(progress(&b, &counts(&[("a.small", 1)])), 0.5);
        // Huge one nearly done, small one untouched: still under half
        let p = progress(&b, &counts(&[("a.huge", 999)]));
        assert!((p - 0.4995).abs() < 1e-12);
    }

    #[test]
    fn test_overshoot_is_clamped_per_requirement() {
        let b = badge(vec![Requirement::new("a.x", 2), Requirement::new("a.y", 2)]);
        // 10/2 clamps to 1.0, not 5.0
        assert_eq!(progress(&b, &counts(&[("a.x", 10)])), 0.5);
    }

    #[test]
    fn test_unearned_never_reports_one() {
        let b = badge(vec![Requirement::new("a.x", u64::MAX)]);
        let p = progress(&b, &counts(&[("a.x", u64::MAX - 1)]));
        assert!(p < 1.0);
        assert!(p > 0.99);
    }

    #[test]
    fn test_progress_details() {
        let b = badge(vec![
            Requirement::new("a.x", 4),
            Requirement::placeholder("a.y", 1, "stand-in"),
        ]);
        let details = progress_details(&b, &counts(&[("a.x", 1)]));
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].current, 1);
        assert_eq!(details[0].required, 4);
        assert_eq!(details[0].progress_fraction, 0.25);
        assert!(!details[0].placeholder);
        assert!(details[1].placeholder);
    }

    #[test]
    fn test_view_sums_capped_current() {
        let b = badge(vec![Requirement::new("a.x", 2), Requirement::new("a.y", 3)]);
        let v = view(&b, &counts(&[("a.x", 5), ("a.y", 1)]));
        assert_eq!(v.current, 3);
        assert_eq!(v.required, 5);
        assert!(!v.earned);
    }

    #[test]
    fn test_closest_excludes_earned_and_sorts() {
        let catalog = BadgeCatalog::builtin();
        let c = counts(&[
            (events::JOB_OFFER_CREATED, 9),
            (events::AI_INSIGHTS_GENERATED, 1),
        ]);
        let closest = closest(&catalog, &c, 3);

        assert_eq!(closest.len(), 3);
        assert!(closest.iter().all(|v| !v.earned));
        assert!(closest.iter().all(|v| v.id != "primera_oferta"));
        assert_eq!(closest[0].id, "cazador_ofertas");
        assert!(closest
            .windows(2)
            .all(|w| w[0].progress_fraction >= w[1].progress_fraction));
    }

    #[test]
    fn test_evaluate_all_in_catalog_order() {
        let catalog = BadgeCatalog::builtin();
        let statuses = evaluate_all(&catalog, &EventCounts::new());
        assert_eq!(statuses.len(), catalog.len());
        assert_eq!(statuses[0].badge_id, catalog.all()[0].id);
        assert!(statuses.iter().all(|s| !s.earned && s.progress_fraction == 0.0));
    }
}
