//! User-facing notices.
//!
//! Classification and escalation only ever talk to the [`Notifier`] trait.
//! How a notice is rendered is up to the host; [`NoticeBoard`] keeps the
//! currently visible notices with their expiry so a UI layer can draw them.

pub mod board;

pub use board::{ActiveNotice, NoticeBoard, DEFAULT_NOTICE_DURATION};

use serde::{Deserialize, Serialize};

/// Notice level, from least to most alarming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Violation,
}

/// A message to surface to the test-taker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NoticeLevel::Info,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NoticeLevel::Warning,
        }
    }

    pub fn violation(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NoticeLevel::Violation,
        }
    }
}

/// Sink for user-facing notices.
///
/// Implementations must return promptly; `show` is called inline while an
/// occurrence is being processed.
pub trait Notifier: Send + Sync {
    fn show(&self, notice: Notice);
}

/// Notifier that only writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => tracing::info!(message = %notice.message, "notice"),
            NoticeLevel::Warning => tracing::warn!(message = %notice.message, "warning notice"),
            NoticeLevel::Violation => {
                tracing::warn!(message = %notice.message, "violation notice")
            }
        }
    }
}
