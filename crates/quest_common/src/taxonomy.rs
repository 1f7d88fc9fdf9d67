//! Event taxonomy: the namespaced vocabulary of user actions.
//!
//! Event types are dot-namespaced identifiers (`domain.action`). The set is
//! open: any well-formed identifier may be recorded, and only the known
//! types below carry a label, an XP award and a counting mode.
//!
//! | Domain        | Examples                                              |
//! |---------------|-------------------------------------------------------|
//! | `profile`     | `profile.completed`, `profile.avatar_uploaded`        |
//! | `cv`          | `cv.section_added`, `cv.experience_added`             |
//! | `job_offer`   | `job_offer.created`, `job_offer.status_updated`       |
//! | `application` | `application.interview_scheduled`                     |
//! | `ai`          | `ai.insights_generated`, `ai.section_improved`        |
//! | `streak`      | `streak.7_days`, `streak.30_days`                     |
//! | `daily`       | `daily.login` (counted once per calendar day)         |

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Known event type identifiers.
pub mod events {
    pub const PROFILE_COMPLETED: &str = "profile.completed";
    pub const PROFILE_UPDATED: &str = "profile.updated";
    pub const PROFILE_AVATAR_UPLOADED: &str = "profile.avatar_uploaded";

    pub const CV_SECTION_ADDED: &str = "cv.section_added";
    pub const CV_EXPERIENCE_ADDED: &str = "cv.experience_added";
    pub const CV_EDUCATION_ADDED: &str = "cv.education_added";
    pub const CV_CERTIFICATION_ADDED: &str = "cv.certification_added";
    pub const CV_LANGUAGE_ADDED: &str = "cv.language_added";
    pub const CV_PROJECT_ADDED: &str = "cv.project_added";
    pub const CV_VOLUNTEERING_ADDED: &str = "cv.volunteering_added";

    pub const JOB_OFFER_CREATED: &str = "job_offer.created";
    pub const JOB_OFFER_UPDATED: &str = "job_offer.updated";
    pub const JOB_OFFER_STATUS_UPDATED: &str = "job_offer.status_updated";
    pub const JOB_OFFER_NOTE_ADDED: &str = "job_offer.note_added";
    pub const JOB_OFFER_CV_SECTIONS_SELECTED: &str = "job_offer.cv_sections_selected";
    pub const JOB_OFFER_CV_DOWNLOADED: &str = "job_offer.cv_downloaded";

    pub const APPLICATION_INTERVIEW_SCHEDULED: &str = "application.interview_scheduled";
    pub const APPLICATION_OFFER_RECEIVED: &str = "application.offer_received";
    pub const APPLICATION_OFFER_ACCEPTED: &str = "application.offer_accepted";

    pub const AI_INSIGHTS_GENERATED: &str = "ai.insights_generated";
    pub const AI_SECTION_IMPROVED: &str = "ai.section_improved";
    pub const AI_CV_SECTIONS_SUGGESTED: &str = "ai.cv_sections_suggested";

    pub const STREAK_7_DAYS: &str = "streak.7_days";
    pub const STREAK_30_DAYS: &str = "streak.30_days";
    pub const DAILY_LOGIN: &str = "daily.login";

    pub const NETWORK_CONNECTION_MADE: &str = "network.connection_made";
}

/// How occurrences of an event type are turned into a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CountMode {
    /// Every recorded event counts once.
    #[default]
    Occurrences,
    /// Only distinct UTC calendar days count.
    DistinctDays,
}

/// Built-in taxonomy: (event type, label, counting mode, XP per count)
pub const BUILTIN_EVENTS: &[(&str, &str, CountMode, u64)] = &[
    (events::PROFILE_COMPLETED, "Completed profile", CountMode::Occurrences, 50),
    (events::PROFILE_UPDATED, "Updated profile", CountMode::Occurrences, 5),
    (events::PROFILE_AVATAR_UPLOADED, "Uploaded avatar", CountMode::Occurrences, 10),
    (events::CV_SECTION_ADDED, "Added CV section", CountMode::Occurrences, 10),
    (events::CV_EXPERIENCE_ADDED, "Added experience", CountMode::Occurrences, 15),
    (events::CV_EDUCATION_ADDED, "Added education", CountMode::Occurrences, 15),
    (events::CV_CERTIFICATION_ADDED, "Added certification", CountMode::Occurrences, 15),
    (events::CV_LANGUAGE_ADDED, "Added language", CountMode::Occurrences, 10),
    (events::CV_PROJECT_ADDED, "Added project", CountMode::Occurrences, 15),
    (events::CV_VOLUNTEERING_ADDED, "Added volunteering", CountMode::Occurrences, 15),
    (events::JOB_OFFER_CREATED, "Created job offer", CountMode::Occurrences, 10),
    (events::JOB_OFFER_UPDATED, "Updated job offer", CountMode::Occurrences, 2),
    (events::JOB_OFFER_STATUS_UPDATED, "Updated offer status", CountMode::Occurrences, 5),
    (events::JOB_OFFER_NOTE_ADDED, "Added offer note", CountMode::Occurrences, 3),
    (events::JOB_OFFER_CV_SECTIONS_SELECTED, "Tailored CV for offer", CountMode::Occurrences, 5),
    (events::JOB_OFFER_CV_DOWNLOADED, "Downloaded CV", CountMode::Occurrences, 5),
    (events::APPLICATION_INTERVIEW_SCHEDULED, "Scheduled interview", CountMode::Occurrences, 30),
    (events::APPLICATION_OFFER_RECEIVED, "Received offer", CountMode::Occurrences, 100),
    (events::APPLICATION_OFFER_ACCEPTED, "Accepted offer", CountMode::Occurrences, 200),
    (events::AI_INSIGHTS_GENERATED, "Generated AI insights", CountMode::Occurrences, 10),
    (events::AI_SECTION_IMPROVED, "Improved section with AI", CountMode::Occurrences, 10),
    (events::AI_CV_SECTIONS_SUGGESTED, "AI-suggested CV sections", CountMode::Occurrences, 10),
    (events::STREAK_7_DAYS, "7-day streak", CountMode::Occurrences, 70),
    (events::STREAK_30_DAYS, "30-day streak", CountMode::Occurrences, 300),
    (events::DAILY_LOGIN, "Daily login", CountMode::DistinctDays, 5),
    (events::NETWORK_CONNECTION_MADE, "Made a connection", CountMode::Occurrences, 5),
];

/// A validated event type identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventType(String);

impl EventType {
    /// Parse an identifier. Unknown types are fine; only the shape is checked.
    pub fn parse(raw: &str) -> Option<Self> {
        if is_well_formed(raw) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The namespace before the first dot (e.g. `cv` for `cv.section_added`)
    pub fn domain(&self) -> &str {
        self.0.split('.').next().unwrap_or_default()
    }
}

impl TryFrom<String> for EventType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_well_formed(&value) {
            Ok(Self(value))
        } else {
            Err(format!("invalid event type '{}'", value))
        }
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EventType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// `domain.action[.more]`, each segment non-empty `[a-z0-9_]`.
pub fn is_well_formed(raw: &str) -> bool {
    let mut segments = 0;
    for segment in raw.split('.') {
        if segment.is_empty()
            || !segment
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
        {
            return false;
        }
        segments += 1;
    }
    segments >= 2
}

/// Metadata for one known event type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSpec {
    pub event_type: String,
    pub label: String,
    pub mode: CountMode,
    pub xp: u64,
}

/// Registry of known event types.
#[derive(Debug, Clone)]
pub struct EventTaxonomy {
    specs: HashMap<String, EventSpec>,
}

impl Default for EventTaxonomy {
    fn default() -> Self {
        Self::builtin()
    }
}

impl EventTaxonomy {
    /// The built-in vocabulary
    pub fn builtin() -> Self {
        let specs = BUILTIN_EVENTS
            .iter()
            .map(|&(event_type, label, mode, xp)| {
                (
                    event_type.to_string(),
                    EventSpec {
                        event_type: event_type.to_string(),
                        label: label.to_string(),
                        mode,
                        xp,
                    },
                )
            })
            .collect();
        Self { specs }
    }

    /// Apply per-type XP overrides from configuration.
    ///
    /// Overrides for types outside the built-in vocabulary register them
    /// as plain occurrence-counted types.
    pub fn with_xp_overrides(mut self, overrides: &BTreeMap<String, u64>) -> Result<Self, ConfigError> {
        for (event_type, &xp) in overrides {
            if !is_well_formed(event_type) {
                return Err(ConfigError::InvalidEventType(event_type.clone()));
            }
            self.specs
                .entry(event_type.clone())
                .and_modify(|spec| spec.xp = xp)
                .or_insert_with(|| EventSpec {
                    event_type: event_type.clone(),
                    label: event_type.clone(),
                    mode: CountMode::Occurrences,
                    xp,
                });
        }
        Ok(self)
    }

    /// Override the counting mode of a type (used for streak sources).
    pub fn with_mode(mut self, event_type: &str, mode: CountMode) -> Result<Self, ConfigError> {
        if !is_well_formed(event_type) {
            return Err(ConfigError::InvalidEventType(event_type.to_string()));
        }
        self.specs
            .entry(event_type.to_string())
            .and_modify(|spec| spec.mode = mode)
            .or_insert_with(|| EventSpec {
                event_type: event_type.to_string(),
                label: event_type.to_string(),
                mode,
                xp: 0,
            });
        Ok(self)
    }

    pub fn get(&self, event_type: &str) -> Option<&EventSpec> {
        self.specs.get(event_type)
    }

    pub fn is_known(&self, event_type: &str) -> bool {
        self.specs.contains_key(event_type)
    }

    /// Counting mode; unknown types count occurrences.
    pub fn mode_for(&self, event_type: &str) -> CountMode {
        self.specs.get(event_type).map(|s| s.mode).unwrap_or_default()
    }

    /// XP per count; unknown types award nothing.
    pub fn xp_for(&self, event_type: &str) -> u64 {
        self.specs.get(event_type).map(|s| s.xp).unwrap_or(0)
    }

    /// All known specs sorted by event type
    pub fn specs(&self) -> Vec<&EventSpec> {
        let mut specs: Vec<_> = self.specs.values().collect();
        specs.sort_by(|a, b| a.event_type.cmp(&b.event_type));
        specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
