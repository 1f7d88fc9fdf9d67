//! Notification dispatch task.
//!
//! The engine hands intents to a bounded channel without blocking; this
//! task drains it and forwards each intent to the downstream sink.

use quest_common::{NotificationIntent, NotificationSink};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Forward intents until every sender is dropped. Returns how many were
/// delivered.
pub async fn drain(
    mut rx: mpsc::Receiver<NotificationIntent>,
    downstream: Arc<dyn NotificationSink>,
) -> usize {
    let mut delivered = 0;
    while let Some(intent) = rx.recv().await {
        match downstream.notify(&intent) {
            Ok(()) => {
                delivered += 1;
                debug!("  Dispatched {} for {}", intent.kind(), intent.user_id);
            }
            Err(e) => warn!(
                "  Downstream sink '{}' failed for {}: {}",
                downstream.name(),
                intent.user_id,
                e
            ),
        }
    }
    info!("  Notification channel closed after {} deliveries", delivered);
    delivered
}
