use std::{
    fmt,
    sync::{Mutex, PoisonError},
};

use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// Transient feedback for one finished operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Keeps notifications until the front end drains them.
#[derive(Default)]
pub struct NotificationLog {
    entries: Mutex<Vec<Notification>>,
}

impl NotificationLog {
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NotificationSink for NotificationLog {
    fn notify(&self, notification: Notification) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

/// Fans notifications out to any number of subscribers. Having none is fine.
impl NotificationSink for broadcast::Sender<Notification> {
    fn notify(&self, notification: Notification) {
        let _ = self.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_drains_in_order() {
        let log = NotificationLog::default();
        log.notify(Notification::success("Member Registered", "Abebe Kebede"));
        log.notify(Notification::error("Update Failed", "Failed to update member"));

        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].kind, NotificationKind::Success);
        assert_eq!(drained[1].to_string(), "Update Failed: Failed to update member");
        assert!(log.snapshot().is_empty());
    }

    #[tokio::test]
    async fn broadcast_sink_reaches_subscribers() {
        let (tx, mut rx) = broadcast::channel(16);
        tx.notify(Notification::success("Staff Deleted", "Staff member deleted successfully"));
        let received = rx.recv().await.expect("notification");
        assert_eq!(received.title, "Staff Deleted");
    }
}
