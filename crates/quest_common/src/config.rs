//! Quest configuration.
//!
//! Config file search order:
//! 1. Explicit path (`--config`)
//! 2. `$QUEST_CONFIG`
//! 3. /etc/quest/config.toml
//! 4. Built-in defaults
//!
//! Every section is optional. The file is read once at startup and turned
//! into an immutable `Rules` value plus a ledger handle.

use crate::badges::BadgeCatalog;
use crate::error::{ConfigError, LedgerError};
use crate::ledger::{EventLedger, JsonlLedger, MemoryLedger, SqliteLedger};
use crate::levels::{LevelCurve, LevelDefinition};
use crate::rules::Rules;
use crate::streaks::StreakPolicy;
use crate::taxonomy::EventTaxonomy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const CONFIG_ENV: &str = "QUEST_CONFIG";
pub const SYSTEM_CONFIG_PATH: &str = "/etc/quest/config.toml";
pub const DEFAULT_JSONL_PATH: &str = "/var/lib/quest/ledger.jsonl";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:7870";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    #[default]
    Sqlite,
    Jsonl,
    Memory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub backend: LedgerBackend,

    /// Ledger file; each backend has its own default
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl LedgerConfig {
    pub fn effective_path(&self) -> Option<PathBuf> {
        match self.backend {
            LedgerBackend::Memory => None,
            LedgerBackend::Sqlite => Some(
                self.path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(crate::ledger::sqlite::LEDGER_DB_PATH)),
            ),
            LedgerBackend::Jsonl => Some(
                self.path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_JSONL_PATH)),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bounded queue between the engine and the dispatch task
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_capacity: default_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressionConfig {
    /// Replaces the built-in level curve
    #[serde(default)]
    pub levels: Option<Vec<LevelDefinition>>,

    /// XP per event type, on top of the built-in table
    #[serde(default)]
    pub xp: BTreeMap<String, u64>,

    /// External badge catalog (`[[badges]]`), replaces the built-in one
    #[serde(default)]
    pub badges_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub progression: ProgressionConfig,

    #[serde(default)]
    pub streaks: Option<StreakPolicy>,

    /// File the config was read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

fn pick_path(explicit: Option<&Path>, env: Option<PathBuf>, system: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env.filter(|p| !p.as_os_str().is_empty()) {
        return Some(path);
    }
    system.exists().then(|| system.to_path_buf())
}

impl QuestConfig {
    /// Which file `load` would read, if any
    pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
        pick_path(
            explicit,
            std::env::var_os(CONFIG_ENV).map(PathBuf::from),
            Path::new(SYSTEM_CONFIG_PATH),
        )
    }

    /// Load configuration following the search order.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match Self::config_path(explicit) {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Badge file path, relative paths resolved against the config file
    pub fn badges_path(&self) -> Option<PathBuf> {
        let file = self.progression.badges_file.as_ref()?;
        if file.is_absolute() {
            return Some(file.clone());
        }
        let base = self.source.as_ref().and_then(|s| s.parent());
        Some(match base {
            Some(dir) => dir.join(file),
            None => file.clone(),
        })
    }

    /// Build and validate the immutable rule set.
    pub fn build_rules(&self) -> Result<Rules, ConfigError> {
        let taxonomy = EventTaxonomy::builtin().with_xp_overrides(&self.progression.xp)?;

        let levels = match &self.progression.levels {
            Some(levels) => LevelCurve::new(levels.clone())?,
            None => LevelCurve::builtin(),
        };

        let badges = match self.badges_path() {
            Some(path) => BadgeCatalog::load(&path)?,
            None => BadgeCatalog::builtin(),
        };

        let streaks = self.streaks.clone().unwrap_or_default();

        Rules::new(taxonomy, levels, badges, streaks)
    }

    /// Open the configured ledger backend.
    pub fn open_ledger(&self) -> Result<Arc<dyn EventLedger>, LedgerError> {
        let ledger: Arc<dyn EventLedger> = match (self.ledger.backend, self.ledger.effective_path()) {
            (LedgerBackend::Sqlite, Some(path)) => Arc::new(SqliteLedger::open_at(path)?),
            (LedgerBackend::Jsonl, Some(path)) => Arc::new(JsonlLedger::new(path)),
            _ => Arc::new(MemoryLedger::new()),
        };
        info!("Using {} ledger", ledger.backend());
        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::events;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_is_default() {
        let config = QuestConfig::from_toml_str("").unwrap();
        assert_eq!(config, QuestConfig::default());
        assert_eq!(config.ledger.backend, LedgerBackend::Sqlite);
        assert_eq!(config.server.listen, DEFAULT_LISTEN);
        assert!(config.notifications.enabled);
        assert_eq!(config.notifications.queue_capacity, 256);
    }

    #[test]
    fn test_full_config_parses() {
        let config = QuestConfig::from_toml_str(
            r#"
[ledger]
backend = "jsonl"
path = "/tmp/quest.jsonl"

[server]
listen = "0.0.0.0:9000"

[notifications]
enabled = false

[progression]
levels = [
    { order = 1, xpRequired = 0 },
    { order = 2, xpRequired = 100 },
    { order = 3, xpRequired = 300 },
]

[progression.xp]
"job_offer.created" = 25
"labs.beta_feedback" = 40

[streaks]
source = "daily.login"
milestones = [{ days = 3, event = "streak.3_days" }]
"#,
        )
        .unwrap();

        assert_eq!(config.ledger.backend, LedgerBackend::Jsonl);
        assert_eq!(config.ledger.effective_path(), Some(PathBuf::from("/tmp/quest.jsonl")));
        assert_eq!(config.server.listen, "0.0.0.0:9000");
        assert!(!config.notifications.enabled);

        let rules = config.build_rules().unwrap();
        assert_eq!(rules.levels.max_level().order, 3);
        assert_eq!(rules.taxonomy.xp_for(events::JOB_OFFER_CREATED), 25);
        assert_eq!(rules.taxonomy.xp_for("labs.beta_feedback"), 40);
        assert_eq!(rules.streaks.milestones[0].days, 3);
    }

    #[test]
    fn test_bad_level_table_is_fatal() {
        let config = QuestConfig::from_toml_str(
            r#"
[progression]
levels = [{ order = 1, xpRequired = 0 }, { order = 2, xpRequired = 0 }]
"#,
        )
        .unwrap();
        assert!(matches!(
            config.build_rules(),
            Err(ConfigError::NonIncreasingXp { .. })
        ));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(QuestConfig::from_toml_str("[ledger]\nbackend = \"redis\"").is_err());
    }

    #[test]
    fn test_badges_file_relative_to_config() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("badges.toml"),
            r#"
[[badges]]
id = "solo"
name = "Solo"
description = "One offer"
icon = "star"
category = "job_offers"
requirements = [{ eventType = "job_offer.created", requiredCount = 1 }]
"#,
        )
        .unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[progression]\nbadges_file = \"badges.toml\"\n").unwrap();

        let config = QuestConfig::load_from(&config_path).unwrap();
        let rules = config.build_rules().unwrap();
        assert_eq!(rules.badges.len(), 1);
        assert!(rules.badges.get("solo").is_some());
    }

    #[test]
    fn test_invalid_badge_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("badges.toml"),
            r#"
[[badges]]
id = "empty"
name = "Empty"
description = ""
icon = ""
category = "cv"
requirements = []
"#,
        )
        .unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[progression]\nbadges_file = \"badges.toml\"\n").unwrap();

        let config = QuestConfig::load_from(&config_path).unwrap();
        assert!(matches!(
            config.build_rules(),
            Err(ConfigError::EmptyRequirements(_))
        ));
    }

    #[test]
    fn test_search_order() {
        let dir = TempDir::new().unwrap();
        let system = dir.path().join("system.toml");
        let explicit = PathBuf::from("/explicit.toml");
        let env = PathBuf::from("/env.toml");

        assert_eq!(
            pick_path(Some(explicit.as_path()), Some(env.clone()), &system),
            Some(explicit)
        );
        assert_eq!(pick_path(None, Some(env.clone()), &system), Some(env));
        assert_eq!(pick_path(None, Some(PathBuf::new()), &system), None);

        fs::write(&system, "").unwrap();
        assert_eq!(pick_path(None, None, &system), Some(system));
    }

    #[test]
    fn test_open_memory_and_sqlite_ledgers() {
        let memory = QuestConfig::from_toml_str("[ledger]\nbackend = \"memory\"").unwrap();
        assert_eq!(memory.open_ledger().unwrap().backend(), "memory");

        let dir = TempDir::new().unwrap();
        let mut sqlite = QuestConfig::default();
        sqlite.ledger.path = Some(dir.path().join("nested").join("ledger.db"));
        assert_eq!(sqlite.open_ledger().unwrap().backend(), "sqlite");
    }
}
