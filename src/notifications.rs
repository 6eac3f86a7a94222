use std::sync::Mutex;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Short user-facing message. No codes, just text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Toast sink. Receives one notice per user-visible outcome, success or soft failure.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn info(n: &dyn Notifier, message: impl Into<String>) {
    n.notify(Notice { level: NoticeLevel::Info, message: message.into() });
}

pub fn success(n: &dyn Notifier, message: impl Into<String>) {
    n.notify(Notice { level: NoticeLevel::Success, message: message.into() });
}

pub fn warning(n: &dyn Notifier, message: impl Into<String>) {
    n.notify(Notice { level: NoticeLevel::Warning, message: message.into() });
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Writes notices to stderr, keeping stdout clean for JSON output.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        let tag = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        eprintln!("[{tag}] {}", notice.message);
    }
}

/// Collects notices in memory. Used by embedders that render their own toasts, and by tests.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    pub fn count(&self, level: NoticeLevel) -> usize {
        self.notices().iter().filter(|n| n.level == level).count()
    }

    /// Drain everything collected so far.
    pub fn take(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|mut n| std::mem::take(&mut *n))
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}
