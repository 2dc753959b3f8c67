//! In-memory board of transient notices.

use super::{Notice, Notifier};
use crate::core::event::Millis;
use crate::signals::clock::Clock;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

/// How long a notice stays up unless dismissed.
pub const DEFAULT_NOTICE_DURATION: Duration = Duration::from_secs(5);

/// A notice currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveNotice {
    pub id: Uuid,
    pub notice: Notice,
    pub shown_at: Millis,
    pub expires_at: Millis,
}

/// Tracks visible notices and expires them after a fixed duration.
pub struct NoticeBoard {
    clock: Arc<dyn Clock>,
    duration_ms: Millis,
    notices: Mutex<Vec<ActiveNotice>>,
}

impl NoticeBoard {
    pub fn new(clock: Arc<dyn Clock>, duration: Duration) -> Self {
        Self {
            clock,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            notices: Mutex::new(Vec::new()),
        }
    }

    /// Notices still visible now, oldest first.
    pub fn active(&self) -> Vec<ActiveNotice> {
        let now = self.clock.now_ms();
        let mut notices = self.lock();
        notices.retain(|n| n.expires_at > now);
        notices.clone()
    }

    /// Dismiss a notice manually. Returns false if it was already gone.
    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut notices = self.lock();
        let before = notices.len();
        notices.retain(|n| n.id != id);
        notices.len() != before
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ActiveNotice>> {
        // Poisoned lock still holds a valid list
        self.notices.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Notifier for NoticeBoard {
    fn show(&self, notice: Notice) {
        let now = self.clock.now_ms();
        tracing::debug!(level = ?notice.level, message = %notice.message, "showing notice");
        let mut notices = self.lock();
        notices.retain(|n| n.expires_at > now);
        notices.push(ActiveNotice {
            id: Uuid::new_v4(),
            notice,
            shown_at: now,
            expires_at: now.saturating_add(self.duration_ms),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NoticeLevel;
    use crate::signals::clock::ManualClock;

    fn board() -> (Arc<ManualClock>, NoticeBoard) {
        let clock = Arc::new(ManualClock::new(0));
        let board = NoticeBoard::new(clock.clone(), DEFAULT_NOTICE_DURATION);
        (clock, board)
    }

    #[test]
    fn test_notice_expires_after_duration() {
        let (clock, board) = board();
        board.show(Notice::warning("Paste operation detected and logged."));

        clock.set(4_999);
        assert_eq!(board.active().len(), 1);

        clock.set(5_000);
        assert!(board.active().is_empty());
    }

    #[test]
    fn test_manual_dismissal() {
        let (_clock, board) = board();
        board.show(Notice::info("first"));
        board.show(Notice::violation("second"));

        let active = board.active();
        assert_eq!(active.len(), 2);
        assert_eq!(active[1].notice.level, NoticeLevel::Violation);

        assert!(board.dismiss(active[0].id));
        assert!(!board.dismiss(active[0].id));
        assert_eq!(board.active().len(), 1);
    }
}
