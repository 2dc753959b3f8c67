//! Violation escalation.
//!
//! The [`Escalator`] counts violations while the session is active and
//! reports the moment the configured limit is reached. Submitting the
//! assessment is left to a [`SubmissionHook`], which guarantees the host
//! callback runs at most once however many times it is fired.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Escalation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationState {
    Active,
    Disabled,
}

/// Result of registering a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Counted, still below the limit (or already past it)
    Counted { count: u32 },
    /// This violation reached the limit; auto-submission should be scheduled
    ThresholdReached { count: u32 },
    /// The engine is disabled; nothing was counted
    Ignored,
}

/// Violation counter with a one-shot threshold.
#[derive(Debug)]
pub struct Escalator {
    state: EscalationState,
    violation_count: u32,
    limit: u32,
    threshold_reported: bool,
}

impl Escalator {
    pub fn new(limit: u32) -> Self {
        Self {
            state: EscalationState::Active,
            violation_count: 0,
            limit,
            threshold_reported: false,
        }
    }

    /// Count a violation.
    ///
    /// `ThresholdReached` is returned exactly once per session, for the
    /// violation that first brings the count to the limit.
    pub fn register_violation(&mut self) -> Escalation {
        if self.state == EscalationState::Disabled {
            return Escalation::Ignored;
        }

        self.violation_count = self.violation_count.saturating_add(1);
        let count = self.violation_count;

        if count >= self.limit && !self.threshold_reported {
            self.threshold_reported = true;
            return Escalation::ThresholdReached { count };
        }
        Escalation::Counted { count }
    }

    /// Move to `Disabled`. There is no way back.
    ///
    /// Returns false if already disabled.
    pub fn disable(&mut self) -> bool {
        let was_active = self.state == EscalationState::Active;
        self.state = EscalationState::Disabled;
        was_active
    }

    pub fn state(&self) -> EscalationState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == EscalationState::Active
    }

    pub fn violation_count(&self) -> u32 {
        self.violation_count
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn threshold_reached(&self) -> bool {
        self.threshold_reported
    }
}

/// Host callback that submits the assessment.
#[derive(Clone)]
pub struct SubmissionHook {
    callback: Arc<dyn Fn() + Send + Sync>,
    fired: Arc<AtomicBool>,
}

impl SubmissionHook {
    pub fn new(callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Hook that does nothing when fired.
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Invoke the callback unless it already ran. Returns whether it ran.
    pub fn fire(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        (self.callback)();
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for SubmissionHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionHook")
            .field("fired", &self.has_fired())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_threshold_reported_once() {
        let mut escalator = Escalator::new(3);
        assert_eq!(escalator.register_violation(), Escalation::Counted { count: 1 });
        assert_eq!(escalator.register_violation(), Escalation::Counted { count: 2 });
        assert_eq!(
            escalator.register_violation(),
            Escalation::ThresholdReached { count: 3 }
        );
        assert_eq!(escalator.register_violation(), Escalation::Counted { count: 4 });
        assert!(escalator.threshold_reached());
    }

    #[test]
    fn test_disabled_counts_nothing() {
        let mut escalator = Escalator::new(2);
        escalator.register_violation();
        assert!(escalator.disable());
        assert!(!escalator.disable());

        assert_eq!(escalator.register_violation(), Escalation::Ignored);
        assert_eq!(escalator.violation_count(), 1);
        assert_eq!(escalator.state(), EscalationState::Disabled);
    }

    #[test]
    fn test_hook_runs_at_most_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let hook = SubmissionHook::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let clone = hook.clone();
        assert!(hook.fire());
        assert!(!clone.fire());
        assert!(!hook.fire());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(clone.has_fired());
    }
}
