//! Level curve: ordered XP thresholds.
//!
//! A user is at the highest level whose threshold is <= their total XP
//! (inclusive lower bound). The table is validated when built; a malformed
//! table never reaches `resolve`.
//!
//! Default curve:
//!
//! | Level | XP required |
//! |-------|-------------|
//! | 1     | 0           |
//! | 2     | 100         |
//! | 3     | 300         |
//! | 4     | 600         |
//! | 5     | 1,000       |
//! | 6     | 1,500       |
//! | 7     | 2,200       |
//! | 8     | 3,000       |
//! | 9     | 4,000       |
//! | 10    | 5,500       |

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Built-in curve: (order, xp required)
pub const DEFAULT_LEVELS: &[(u32, u64)] = &[
    (1, 0),
    (2, 100),
    (3, 300),
    (4, 600),
    (5, 1_000),
    (6, 1_500),
    (7, 2_200),
    (8, 3_000),
    (9, 4_000),
    (10, 5_500),
];

/// One row of the level table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDefinition {
    pub order: u32,
    pub xp_required: u64,
}

impl LevelDefinition {
    pub const fn new(order: u32, xp_required: u64) -> Self {
        Self { order, xp_required }
    }
}

/// Computed progression for a total XP value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgression {
    #[serde(rename = "xp")]
    pub total_xp: u64,
    pub level: LevelDefinition,
    pub next_level: Option<LevelDefinition>,
    /// Progress toward `next_level` in [0, 1]; 1.0 at max level
    pub progress_fraction: f64,
}

impl UserProgression {
    /// XP still missing to reach the next level (0 at max level)
    pub fn xp_to_next(&self) -> u64 {
        self.next_level
            .map(|next| next.xp_required.saturating_sub(self.total_xp))
            .unwrap_or(0)
    }

    pub fn is_max_level(&self) -> bool {
        self.next_level.is_none()
    }

    /// Progress as whole percent (0-100)
    pub fn progress_percent(&self) -> u8 {
        (self.progress_fraction * 100.0).floor() as u8
    }
}

/// Validated, immutable level table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelCurve {
    levels: Vec<LevelDefinition>,
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LevelCurve {
    /// Validate and build a curve.
    ///
    /// Rules: non-empty, first row is order 1 at 0 XP, orders are
    /// consecutive, thresholds strictly increase.
    pub fn new(levels: Vec<LevelDefinition>) -> Result<Self, ConfigError> {
        let first = levels.first().ok_or(ConfigError::EmptyLevelTable)?;
        if first.order != 1 || first.xp_required != 0 {
            return Err(ConfigError::BadFirstLevel {
                order: first.order,
                xp_required: first.xp_required,
            });
        }

        for pair in levels.windows(2) {
            let (prev, cur) = (pair[0], pair[1]);
            if cur.order != prev.order + 1 {
                return Err(ConfigError::LevelOrderGap {
                    expected: prev.order + 1,
                    found: cur.order,
                });
            }
            if cur.xp_required <= prev.xp_required {
                return Err(ConfigError::NonIncreasingXp {
                    order: cur.order,
                    xp_required: cur.xp_required,
                    previous: prev.xp_required,
                });
            }
        }

        Ok(Self { levels })
    }

    /// The default curve
    pub fn builtin() -> Self {
        Self {
            levels: DEFAULT_LEVELS
                .iter()
                .map(|&(order, xp)| LevelDefinition::new(order, xp))
                .collect(),
        }
    }

    pub fn levels(&self) -> &[LevelDefinition] {
        &self.levels
    }

    pub fn max_level(&self) -> LevelDefinition {
        // Non-empty by construction
        self.levels[self.levels.len() - 1]
    }

    /// Resolve total XP to level, next level and progress.
    pub fn resolve(&self, total_xp: u64) -> UserProgression {
        // Index of the first level above total_xp; level 1 (0 XP) always qualifies
        let above = self.levels.partition_point(|l| l.xp_required <= total_xp);
        let idx = above.saturating_sub(1);
        let level = self.levels[idx];
        let next_level = self.levels.get(idx + 1).copied();

        let progress_fraction = match next_level {
            None => 1.0,
            Some(next) => {
                let span = (next.xp_required - level.xp_required) as f64;
                let gained = total_xp.saturating_sub(level.xp_required) as f64;
                (gained / span).clamp(0.0, 1.0)
            }
        };

        UserProgression {
            total_xp,
            level,
            next_level,
            progress_fraction,
        }
    }

    /// Levels strictly above `from_order` up to and including `to_order`.
    pub fn crossed(&self, from_order: u32, to_order: u32) -> Vec<LevelDefinition> {
        self.levels
            .iter()
            .filter(|l| l.order > from_order && l.order <= to_order)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_curve() -> LevelCurve {
        LevelCurve::new(vec![
            LevelDefinition::new(1, 0),
            LevelDefinition::new(2, 100),
            LevelDefinition::new(3, 300),
        ])
        .unwrap()
    }

    #[test]
    fn test_builtin_curve_is_valid() {
        let levels = LevelCurve::builtin().levels().to_vec();
        assert!(LevelCurve::new(levels).is_ok());
    }

    #[test]
    fn test_resolve_mid_level() {
        let p = small_curve().resolve(250);
        assert_eq!(p.level.order, 2);
        assert_eq!(p.next_level.map(|l| l.order), Some(3));
        assert!((p.progress_fraction - 0.75).abs() < 1e-9);
        assert_eq!(p.xp_to_next(), 50);
    }

    #[test]
    fn test_resolve_zero() {
        let p = small_curve().resolve(0);
        assert_eq!(p.level.order, 1);
        assert_eq!(p.progress_fraction, 0.0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let curve = small_curve();
        assert_eq!(curve.resolve(99).level.order, 1);
        assert_eq!(curve.resolve(100).level.order, 2);
        assert_eq!(curve.resolve(100).progress_fraction, 0.0);
        assert_eq!(curve.resolve(300).level.order, 3);
    }

    #[test]
    fn test_max_level_progress_is_one() {
        let p = small_curve().resolve(10_000);
        assert_eq!(p.level.order, 3);
        assert!(p.next_level.is_none());
        assert!(p.is_max_level());
        assert_eq!(p.progress_fraction, 1.0);
        assert_eq!(p.xp_to_next(), 0);
    }

    #[test]
    fn test_rejects_empty_table() {
        assert!(matches!(LevelCurve::new(vec![]), Err(ConfigError::EmptyLevelTable)));
    }

    #[test]
    fn test_rejects_bad_first_level() {
        let err = LevelCurve::new(vec![LevelDefinition::new(1, 10)]).unwrap_err();
        assert!(matches!(err, ConfigError::BadFirstLevel { .. }));
        let err = LevelCurve::new(vec![LevelDefinition::new(0, 0)]).unwrap_err();
        assert!(matches!(err, ConfigError::BadFirstLevel { .. }));
    }

    #[test]
    fn test_rejects_non_increasing() {
        let err = LevelCurve::new(vec![
            LevelDefinition::new(1, 0),
            LevelDefinition::new(2, 100),
            LevelDefinition::new(3, 100),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::NonIncreasingXp { order: 3, .. }));
    }

    #[test]
    fn test_rejects_unsorted_orders() {
        let err = LevelCurve::new(vec![
            LevelDefinition::new(1, 0),
            LevelDefinition::new(3, 300),
            LevelDefinition::new(2, 100),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::LevelOrderGap { expected: 2, found: 3 }));
    }

    #[test]
    fn test_crossed_levels() {
        let curve = LevelCurve::builtin();
        let crossed: Vec<u32> = curve.crossed(1, 4).iter().map(|l| l.order).collect();
        assert_eq!(crossed, vec![2, 3, 4]);
        assert!(curve.crossed(3, 3).is_empty());
    }

    #[test]
    fn test_progression_serializes_contract_shape() {
        let json = serde_json::to_value(small_curve().resolve(250)).unwrap();
        assert_eq!(json["xp"], 250);
        assert_eq!(json["level"]["order"], 2);
        assert_eq!(json["nextLevel"]["xpRequired"], 300);
        assert_eq!(json["progressFraction"], 0.75);
    }
}
