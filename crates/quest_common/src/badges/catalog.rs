//! Badge definitions and the validated catalog registry.

use super::defaults;
use crate::error::ConfigError;
use crate::taxonomy::is_well_formed;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

/// Badge grouping for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCategory {
    Profile,
    Cv,
    JobOffers,
    Applications,
    Ai,
    Streaks,
    Community,
}

impl BadgeCategory {
    pub const ALL: [BadgeCategory; 7] = [
        BadgeCategory::Profile,
        BadgeCategory::Cv,
        BadgeCategory::JobOffers,
        BadgeCategory::Applications,
        BadgeCategory::Ai,
        BadgeCategory::Streaks,
        BadgeCategory::Community,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeCategory::Profile => "profile",
            BadgeCategory::Cv => "cv",
            BadgeCategory::JobOffers => "job_offers",
            BadgeCategory::Applications => "applications",
            BadgeCategory::Ai => "ai",
            BadgeCategory::Streaks => "streaks",
            BadgeCategory::Community => "community",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == raw)
    }
}

impl fmt::Display for BadgeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `count(event_type) >= required_count`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    #[serde(alias = "event_type")]
    pub event_type: String,
    #[serde(alias = "required_count")]
    pub required_count: u64,
    /// Set when `event_type` stands in for an event that does not exist yet.
    /// The note says what the real event should be.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl Requirement {
    pub fn new(event_type: &str, required_count: u64) -> Self {
        Self {
            event_type: event_type.to_string(),
            required_count,
            placeholder: None,
        }
    }

    pub fn placeholder(event_type: &str, required_count: u64, note: &str) -> Self {
        Self {
            placeholder: Some(note.to_string()),
            ..Self::new(event_type, required_count)
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder.is_some()
    }
}

/// A badge: all requirements must hold for it to be earned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: BadgeCategory,
    pub requirements: Vec<Requirement>,
}

#[derive(Deserialize)]
struct CatalogFile {
    badges: Vec<BadgeDefinition>,
}

/// Immutable, validated set of badges. Built once at startup and shared.
#[derive(Debug, Clone)]
pub struct BadgeCatalog {
    badges: Vec<BadgeDefinition>,
    index: HashMap<String, usize>,
}

impl Default for BadgeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl BadgeCatalog {
    /// Validate definitions and build the lookup index.
    pub fn new(badges: Vec<BadgeDefinition>) -> Result<Self, ConfigError> {
        let mut index = HashMap::with_capacity(badges.len());

        for (pos, badge) in badges.iter().enumerate() {
            validate_badge(badge)?;
            if index.insert(badge.id.clone(), pos).is_some() {
                return Err(ConfigError::DuplicateBadge(badge.id.clone()));
            }
        }

        Ok(Self { badges, index })
    }

    /// The built-in catalog
    pub fn builtin() -> Self {
        let badges = defaults::builtin_badges();
        let index = badges
            .iter()
            .enumerate()
            .map(|(pos, b)| (b.id.clone(), pos))
            .collect();
        Self { badges, index }
    }

    /// Parse a TOML catalog (`[[badges]]` tables)
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = toml::from_str(contents)?;
        Self::new(file.badges)
    }

    /// Load a TOML catalog from disk
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn get(&self, id: &str) -> Option<&BadgeDefinition> {
        self.index.get(id).map(|&pos| &self.badges[pos])
    }

    /// All badges in catalog order
    pub fn all(&self) -> &[BadgeDefinition] {
        &self.badges
    }

    pub fn by_category(&self, category: BadgeCategory) -> Vec<&BadgeDefinition> {
        self.badges.iter().filter(|b| b.category == category).collect()
    }

    /// Requirements keyed to stand-in event types, for later swapping.
    pub fn placeholders(&self) -> Vec<(&BadgeDefinition, &Requirement)> {
        self.badges
            .iter()
            .flat_map(|b| {
                b.requirements
                    .iter()
                    .filter(|r| r.is_placeholder())
                    .map(move |r| (b, r))
            })
            .collect()
    }

    /// Every event type some badge depends on
    pub fn referenced_event_types(&self) -> BTreeSet<&str> {
        self.badges
            .iter()
            .flat_map(|b| b.requirements.iter().map(|r| r.event_type.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.badges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.badges.is_empty()
    }
}

fn validate_badge(badge: &BadgeDefinition) -> Result<(), ConfigError> {
    if badge.id.trim().is_empty() {
        return Err(ConfigError::EmptyBadgeId);
    }
    if badge.requirements.is_empty() {
        return Err(ConfigError::EmptyRequirements(badge.id.clone()));
    }

    let mut seen = BTreeSet::new();
    for req in &badge.requirements {
        if !is_well_formed(&req.event_type) {
            return Err(ConfigError::InvalidRequirementType {
                badge: badge.id.clone(),
                event_type: req.event_type.clone(),
            });
        }
        if req.required_count == 0 {
            return Err(ConfigError::NonPositiveCount {
                badge: badge.id.clone(),
                event_type: req.event_type.clone(),
            });
        }
        if !seen.insert(req.event_type.as_str()) {
            return Err(ConfigError::DuplicateRequirement {
                badge: badge.id.clone(),
                event_type: req.event_type.clone(),
            });
        }
    }
    Ok(())
}
