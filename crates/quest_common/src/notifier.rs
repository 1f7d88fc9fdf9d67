//! Progression notifier.
//!
//! Diffs the snapshot before an event against the snapshot after it and
//! turns every transition into a notification intent:
//! - one `level_up` intent per level crossed, lowest first (90 -> 350 XP
//!   on the default curve yields intents for levels 2 and 3)
//! - one `badge_earned` intent per badge that went from unearned to earned
//!
//! Intents go to a one-way `NotificationSink`. Sink failures are logged
//! and dropped; they never reach the caller that recorded the event.

use crate::badges::BadgeDefinition;
use crate::error::SinkError;
use crate::rules::Rules;
use crate::snapshot::ProgressionSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelUpPayload {
    pub order: u32,
    pub xp_required: u64,
    pub total_xp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeEarnedPayload {
    pub badge_id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
}

impl From<&BadgeDefinition> for BadgeEarnedPayload {
    fn from(badge: &BadgeDefinition) -> Self {
        Self {
            badge_id: badge.id.clone(),
            name: badge.name.clone(),
            description: badge.description.clone(),
            icon: badge.icon.clone(),
        }
    }
}

/// What happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Notification {
    LevelUp(LevelUpPayload),
    BadgeEarned(BadgeEarnedPayload),
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::LevelUp(_) => "level_up",
            Notification::BadgeEarned(_) => "badge_earned",
        }
    }
}

/// `{userId, kind, payload}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationIntent {
    pub user_id: String,
    #[serde(flatten)]
    pub notification: Notification,
}

impl NotificationIntent {
    pub fn kind(&self) -> &'static str {
        self.notification.kind()
    }

    /// One-line description for logs
    pub fn summary(&self) -> String {
        match &self.notification {
            Notification::LevelUp(p) => {
                format!("{} reached level {} ({} XP)", self.user_id, p.order, p.total_xp)
            }
            Notification::BadgeEarned(p) => {
                format!("{} earned badge {} ({})", self.user_id, p.name, p.badge_id)
            }
        }
    }
}

/// Compute intents for the transition `before -> after`.
pub fn diff(
    user_id: &str,
    rules: &Rules,
    before: &ProgressionSnapshot,
    after: &ProgressionSnapshot,
) -> Vec<NotificationIntent> {
    let mut intents = Vec::new();

    for level in rules
        .levels
        .crossed(before.progression.level.order, after.progression.level.order)
    {
        intents.push(NotificationIntent {
            user_id: user_id.to_string(),
            notification: Notification::LevelUp(LevelUpPayload {
                order: level.order,
                xp_required: level.xp_required,
                total_xp: after.total_xp(),
            }),
        });
    }

    let already = before.earned_ids();
    for status in after.badges.iter().filter(|s| s.earned) {
        if already.contains(status.badge_id.as_str()) {
            continue;
        }
        if let Some(badge) = rules.badges.get(&status.badge_id) {
            intents.push(NotificationIntent {
                user_id: user_id.to_string(),
                notification: Notification::BadgeEarned(badge.into()),
            });
        }
    }

    intents
}

/// One-way delivery of intents (email, toast, queue, ...)
pub trait NotificationSink: Send + Sync {
    fn notify(&self, intent: &NotificationIntent) -> Result<(), SinkError>;

    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Drops everything (notifications disabled)
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _intent: &NotificationIntent) -> Result<(), SinkError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

/// Writes intents to the log
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, intent: &NotificationIntent) -> Result<(), SinkError> {
        info!("[NOTIFY] {}: {}", intent.kind(), intent.summary());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

/// Hands intents to an async consumer without ever blocking.
pub struct ChannelSink {
    tx: mpsc::Sender<NotificationIntent>,
}

impl ChannelSink {
    /// Bounded channel; a full queue is reported as a sink failure
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<NotificationIntent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, intent: &NotificationIntent) -> Result<(), SinkError> {
        self.tx.try_send(intent.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}

/// Keeps every intent in memory
#[derive(Default)]
pub struct RecordingSink {
    intents: Mutex<Vec<NotificationIntent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intents(&self) -> Vec<NotificationIntent> {
        self.intents.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn take(&self) -> Vec<NotificationIntent> {
        self.intents
            .lock()
            .map(|mut v| std::mem::take(&mut *v))
            .unwrap_or_default()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, intent: &NotificationIntent) -> Result<(), SinkError> {
        self.intents
            .lock()
            .map_err(|_| SinkError::Other("recording sink poisoned".to_string()))?
            .push(intent.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Delivers to several sinks; one failing does not stop the others.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

impl NotificationSink for FanoutSink {
    fn notify(&self, intent: &NotificationIntent) -> Result<(), SinkError> {
        let failed: Vec<String> = self
            .sinks
            .iter()
            .filter_map(|sink| {
                sink.notify(intent)
                    .err()
                    .map(|e| format!("{}: {}", sink.name(), e))
            })
            .collect();

        if failed.is_empty() {
            Ok(())
        } else {
            Err(SinkError::Other(failed.join("; ")))
        }
    }

    fn name(&self) -> &'static str {
        "fanout"
    }
}

/// Dispatches intents and swallows sink failures
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(NullSink))
    }

    /// Deliver all intents. Returns how many the sink accepted.
    pub fn dispatch(&self, intents: &[NotificationIntent]) -> usize {
        let mut delivered = 0;
        for intent in intents {
            match self.sink.notify(intent) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    "Notification sink '{}' dropped {} for {}: {}",
                    self.sink.name(),
                    intent.kind(),
                    intent.user_id,
                    e
                ),
            }
        }
        delivered
    }
}
