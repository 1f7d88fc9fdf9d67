//! The immutable rule set: taxonomy, level curve, badge catalog, streaks.
//!
//! Built once at startup (from defaults or config) and shared by `Arc`.
//! Nothing here changes while the process runs.

use crate::badges::BadgeCatalog;
use crate::error::ConfigError;
use crate::levels::LevelCurve;
use crate::streaks::StreakPolicy;
use crate::taxonomy::{CountMode, EventTaxonomy};

#[derive(Debug, Clone)]
pub struct Rules {
    pub taxonomy: EventTaxonomy,
    pub levels: LevelCurve,
    pub badges: BadgeCatalog,
    pub streaks: StreakPolicy,
}

impl Default for Rules {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Rules {
    pub fn builtin() -> Self {
        Self {
            taxonomy: EventTaxonomy::builtin(),
            levels: LevelCurve::builtin(),
            badges: BadgeCatalog::builtin(),
            streaks: StreakPolicy::default(),
        }
    }

    /// Assemble and validate. The streak source is forced to count
    /// distinct days.
    pub fn new(
        taxonomy: EventTaxonomy,
        levels: LevelCurve,
        badges: BadgeCatalog,
        streaks: StreakPolicy,
    ) -> Result<Self, ConfigError> {
        streaks.validate()?;
        let taxonomy = if taxonomy.mode_for(&streaks.source) == CountMode::DistinctDays {
            taxonomy
        } else {
            taxonomy.with_mode(&streaks.source, CountMode::DistinctDays)?
        };

        Ok(Self {
            taxonomy,
            levels,
            badges,
            streaks,
        })
    }

    /// Badge requirements on event types the taxonomy does not know.
    /// Not an error (the vocabulary is open) but worth a warning at startup.
    pub fn unknown_requirement_types(&self) -> Vec<&str> {
        self.badges
            .referenced_event_types()
            .into_iter()
            .filter(|t| !self.taxonomy.is_known(t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaks::StreakMilestone;

    #[test]
    fn test_builtin_rules_reference_known_types() {
        let rules = Rules::builtin();
        assert!(rules.unknown_requirement_types().is_empty());
    }

    #[test]
    fn test_new_forces_streak_source_to_days() {
        let streaks = StreakPolicy {
            source: "app.opened".to_string(),
            milestones: vec![StreakMilestone {
                days: 3,
                event: "streak.3_days".to_string(),
            }],
        };
        let rules = Rules::new(
            EventTaxonomy::builtin(),
            LevelCurve::builtin(),
            BadgeCatalog::builtin(),
            streaks,
        )
        .unwrap();
        assert_eq!(rules.taxonomy.mode_for("app.opened"), CountMode::DistinctDays);
    }

    #[test]
    fn test_new_rejects_bad_streaks() {
        let streaks = StreakPolicy {
            source: "bad".to_string(),
            milestones: vec![],
        };
        assert!(Rules::new(
            EventTaxonomy::builtin(),
            LevelCurve::builtin(),
            BadgeCatalog::builtin(),
            streaks,
        )
        .is_err());
    }
}
