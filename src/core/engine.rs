//! The proctoring engine.
//!
//! One [`Engine`] exists per assessment session. It consumes stamped
//! occurrences strictly in order and, for each one that classifies to an
//! event, runs the pipeline:
//!
//! 1. update the per-category counters
//! 2. buffer the event and start delivery
//! 3. show the rule's notice, if any
//! 4. on a violation, escalate; at the limit, warn and schedule submission
//!
//! All bookkeeping for an occurrence is finished before any scheduled
//! submission can run.

use crate::core::buffer::EventBuffer;
use crate::core::classifier::{Classification, Classifier};
use crate::core::escalation::{Escalation, Escalator, SubmissionHook};
use crate::core::event::{Event, EventKind, Millis, Suspicion};
use crate::dispatch::Dispatcher;
use crate::notify::{Notice, NoticeLevel, Notifier};
use crate::policy::Policy;
use crate::report::{Counters, ViolationSummary};
use crate::signals::types::Stamped;
use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Shown when the violation limit is reached.
pub const AUTO_SUBMIT_MESSAGE: &str =
    "Too many violations detected. Assessment will be auto-submitted.";

/// What happened to one occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub event: Event,
    pub violation: bool,
    pub escalation: Option<Escalation>,
}

/// Per-session proctoring engine.
pub struct Engine {
    started_at: DateTime<Utc>,
    policy: Arc<Policy>,
    classifier: Classifier,
    escalator: Escalator,
    dispatcher: Dispatcher,
    notifier: Arc<dyn Notifier>,
    hook: SubmissionHook,
    counters: Counters,
    violations: Vec<Event>,
    last_timestamp: Millis,
    pending_submission: Option<JoinHandle<()>>,
}

impl Engine {
    /// Create an engine. `now` is the session clock reading at creation and
    /// seeds the inactivity timer.
    pub fn new(
        policy: Arc<Policy>,
        dispatcher: Dispatcher,
        notifier: Arc<dyn Notifier>,
        hook: SubmissionHook,
        now: Millis,
    ) -> Self {
        tracing::info!(
            session = %dispatcher.session_id(),
            violation_limit = policy.violation_limit,
            key_rules = policy.key_rules.len(),
            "proctoring engine activated"
        );
        Self {
            started_at: Utc::now(),
            classifier: Classifier::new(Arc::clone(&policy), now),
            escalator: Escalator::new(policy.violation_limit),
            policy,
            dispatcher,
            notifier,
            hook,
            counters: Counters::default(),
            violations: Vec::new(),
            last_timestamp: now,
            pending_submission: None,
        }
    }

    /// Process one occurrence.
    ///
    /// Must be called from within a tokio runtime. Returns `None` when the
    /// engine is disabled or the occurrence produced no event.
    pub fn process(&mut self, stamped: Stamped) -> Option<Outcome> {
        if !self.escalator.is_active() {
            return None;
        }

        // Keep buffered timestamps monotonic even if a producer stamped late
        let at = stamped.at.max(self.last_timestamp);
        self.last_timestamp = at;

        let Classification {
            event,
            violation,
            notice,
        } = self.classifier.classify(&stamped.occurrence, at)?;

        match event.kind() {
            EventKind::TabSwitch => self.counters.tab_switches += 1,
            EventKind::CopyPaste => self.counters.copy_paste_events += 1,
            _ => {}
        }
        // Raised by rapid pointer movement and by every violation notice a
        // rule shows; console output and inactivity are logged only
        let rapid_pointer = event.suspicion() == Some(Suspicion::RapidMouseMovement.as_str());
        let flagged = notice
            .as_ref()
            .is_some_and(|n| n.level == NoticeLevel::Violation);
        if rapid_pointer || flagged {
            self.counters.suspicious_activities += 1;
        }

        tracing::debug!(
            kind = %event.kind(),
            severity = %event.severity(),
            violation,
            at,
            "classified occurrence"
        );

        self.dispatcher.record(event.clone(), violation);

        if let Some(notice) = notice {
            self.notifier.show(notice);
        }

        let escalation = violation.then(|| self.escalate(&event));
        Some(Outcome {
            event,
            violation,
            escalation,
        })
    }

    /// Process everything currently queued, in order. Returns the number of
    /// occurrences consumed.
    pub fn drain(&mut self, receiver: &Receiver<Stamped>) -> usize {
        let mut consumed = 0;
        while let Ok(stamped) = receiver.try_recv() {
            self.process(stamped);
            consumed += 1;
        }
        consumed
    }

    fn escalate(&mut self, event: &Event) -> Escalation {
        self.violations.push(event.clone());
        let escalation = self.escalator.register_violation();

        match escalation {
            Escalation::ThresholdReached { count } => {
                tracing::warn!(
                    count,
                    limit = self.escalator.limit(),
                    grace_ms = self.policy.grace_delay_ms,
                    "violation limit reached; scheduling auto-submission"
                );
                self.notifier.show(Notice::violation(AUTO_SUBMIT_MESSAGE));
                self.schedule_submission();
            }
            Escalation::Counted { count } => {
                tracing::warn!(count, kind = %event.kind(), "violation recorded");
            }
            Escalation::Ignored => {}
        }
        escalation
    }

    fn schedule_submission(&mut self) {
        let hook = self.hook.clone();
        // Deadline is fixed now, not when the task is first polled
        let grace = tokio::time::sleep(self.policy.grace_delay());
        self.pending_submission = Some(tokio::spawn(async move {
            grace.await;
            if hook.fire() {
                tracing::warn!("assessment auto-submitted");
            }
        }));
    }

    /// Disable the engine for the rest of the session.
    ///
    /// Cancels a pending auto-submission and detaches in-flight deliveries.
    /// Later occurrences are ignored.
    pub fn disable(&mut self) {
        if !self.escalator.disable() {
            return;
        }
        if let Some(pending) = self.pending_submission.take() {
            pending.abort();
        }
        self.dispatcher.detach();
        tracing::info!(
            violations = self.escalator.violation_count(),
            "proctoring engine deactivated"
        );
    }

    /// Wait for in-flight deliveries and a pending auto-submission.
    pub async fn settle(&mut self) {
        self.dispatcher.settle().await;
        if let Some(pending) = self.pending_submission.take() {
            if let Err(e) = pending.await {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "submission task failed");
                }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.escalator.is_active()
    }

    pub fn violation_count(&self) -> u32 {
        self.escalator.violation_count()
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn buffer(&self) -> &EventBuffer {
        self.dispatcher.buffer()
    }

    pub fn last_activity_at(&self) -> Millis {
        self.classifier.last_activity_at()
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn session_id(&self) -> Uuid {
        self.dispatcher.session_id()
    }

    pub fn summary(&self) -> ViolationSummary {
        ViolationSummary {
            session_id: self.session_id(),
            started_at: self.started_at,
            state: self.escalator.state(),
            total_violations: self.escalator.violation_count(),
            violation_limit: self.escalator.limit(),
            counters: self.counters,
            auto_submitted: self.hook.has_fired(),
            violations: self.violations.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::LogSink;
    use crate::signals::types::{KeyStroke, Occurrence, ViewportSize};
    use crate::storage::MemorySlot;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collecting(Mutex<Vec<Notice>>);

    impl Notifier for Collecting {
        fn show(&self, notice: Notice) {
            self.0.lock().unwrap().push(notice);
        }
    }

    fn engine(policy: Policy) -> (Engine, Arc<Collecting>) {
        let notices = Arc::new(Collecting::default());
        let dispatcher = Dispatcher::new(
            Uuid::new_v4(),
            Arc::new(LogSink),
            Arc::new(MemorySlot::new()),
        );
        let engine = Engine::new(
            Arc::new(policy),
            dispatcher,
            notices.clone(),
            SubmissionHook::noop(),
            0,
        );
        (engine, notices)
    }

    #[tokio::test]
    async fn test_counters_track_categories() {
        let (mut engine, _) = engine(Policy::default());
        engine.process(Stamped::new(1, Occurrence::VisibilityChange { hidden: true }));
        engine.process(Stamped::new(2, Occurrence::Copy { selection: "a".into() }));
        engine.process(Stamped::new(3, Occurrence::Paste { text: "b".into() }));
        engine.process(Stamped::new(4, Occurrence::ConsoleOutput));
        engine.process(Stamped::new(5, Occurrence::WindowBlur));

        let counters = engine.counters();
        assert_eq!(counters.tab_switches, 1);
        assert_eq!(counters.copy_paste_events, 2);
        assert_eq!(counters.suspicious_activities, 0);
        assert_eq!(engine.violation_count(), 3);
        assert_eq!(engine.buffer().len(), 5);
    }

    #[tokio::test]
    async fn test_suspicious_count_follows_violation_notices() {
        let (mut engine, _) = engine(Policy {
            violation_limit: 100,
            inactivity_threshold_ms: 1_000,
            ..Policy::default()
        });
        let docked = ViewportSize {
            outer_width: 1600,
            outer_height: 1000,
            inner_width: 1000,
            inner_height: 1000,
        };

        // Logged but never surfaced as a violation notice
        engine.process(Stamped::new(1, Occurrence::ConsoleOutput));
        engine.process(Stamped::new(5_000, Occurrence::InactivityCheck));
        engine.process(Stamped::new(5_001, Occurrence::VisibilityChange { hidden: true }));
        assert_eq!(engine.counters().suspicious_activities, 0);

        engine.process(Stamped::new(5_002, Occurrence::KeyDown(KeyStroke::new("F12"))));
        engine.process(Stamped::new(5_003, Occurrence::Viewport(docked)));
        assert_eq!(engine.counters().suspicious_activities, 2);

        let mut at = 6_000;
        for i in 0..10 {
            at += 10;
            engine.process(Stamped::new(
                at,
                Occurrence::PointerMove {
                    x: f64::from(i) * 500.0,
                    y: 0.0,
                },
            ));
        }
        assert_eq!(engine.counters().suspicious_activities, 3);
    }

    #[tokio::test]
    async fn test_threshold_notice_and_violation_notices() {
        let (mut engine, notices) = engine(Policy {
            violation_limit: 2,
            ..Policy::default()
        });
        engine.process(Stamped::new(1, Occurrence::KeyDown(KeyStroke::new("F12"))));
        let outcome = engine
            .process(Stamped::new(2, Occurrence::KeyDown(KeyStroke::new("F12"))))
            .unwrap();
        assert_eq!(
            outcome.escalation,
            Some(Escalation::ThresholdReached { count: 2 })
        );

        let shown = notices.0.lock().unwrap();
        assert_eq!(shown.len(), 3);
        assert_eq!(shown[2].message, AUTO_SUBMIT_MESSAGE);
        assert!(shown.iter().all(|n| n.level == NoticeLevel::Violation));
    }

    #[tokio::test]
    async fn test_disabled_engine_ignores_everything() {
        let (mut engine, _) = engine(Policy::default());
        engine.process(Stamped::new(1, Occurrence::VisibilityChange { hidden: true }));
        engine.disable();

        assert!(engine
            .process(Stamped::new(2, Occurrence::VisibilityChange { hidden: true }))
            .is_none());
        assert_eq!(engine.violation_count(), 1);
        assert!(!engine.is_active());
        assert_eq!(engine.buffer().len(), 1);
    }

    #[tokio::test]
    async fn test_timestamps_stay_monotonic() {
        let (mut engine, _) = engine(Policy::default());
        engine.process(Stamped::new(100, Occurrence::WindowBlur));
        let late = engine.process(Stamped::new(40, Occurrence::WindowFocus)).unwrap();
        assert_eq!(late.event.timestamp(), 100);
    }

    #[tokio::test]
    async fn test_drain_preserves_order() {
        let (mut engine, _) = engine(Policy::default());
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(Stamped::new(1, Occurrence::WindowBlur)).unwrap();
        tx.send(Stamped::new(2, Occurrence::WindowFocus)).unwrap();
        tx.send(Stamped::new(3, Occurrence::FullscreenExit)).unwrap();

        assert_eq!(engine.drain(&rx), 3);
        let kinds: Vec<EventKind> = engine.buffer().iter().map(Event::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::WindowBlur,
                EventKind::WindowFocus,
                EventKind::FullscreenExit
            ]
        );
    }
}
