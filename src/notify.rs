use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::sleep;

/// How long an entry stays visible after insertion.
pub const DISPLAY_TTL: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

/// Short-lived feedback messages. Each entry expires on its own timer
/// `ttl` after insertion; nothing else removes or mutates it, and there
/// is no capacity limit.
#[derive(Clone)]
pub struct NotificationQueue {
    entries: Arc<Mutex<Vec<Notification>>>,
    next_id: Arc<AtomicU64>,
    ttl: Duration,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::with_ttl(DISPLAY_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(0)),
            ttl,
        }
    }

    /// Must run inside a tokio runtime; the expiry timer is a spawned task.
    pub fn push(&self, message: impl Into<String>, kind: NotificationKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let notification = Notification {
            id,
            message: message.into(),
            kind,
            created_at: Utc::now(),
        };
        self.entries
            .lock()
            .expect("notification queue lock")
            .push(notification);

        let entries = Arc::clone(&self.entries);
        let ttl = self.ttl;
        tokio::spawn(async move {
            sleep(ttl).await;
            entries
                .lock()
                .expect("notification queue lock")
                .retain(|entry| entry.id != id);
        });

        id
    }

    pub fn active(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .expect("notification queue lock")
            .clone()
    }
}
