//! End-to-end scenarios for the proctoring engine.

use assessment_proctor::core::{Engine, Escalation, EventKind, Severity, SubmissionHook, TRIM_TO};
use assessment_proctor::notify::{Notice, Notifier};
use assessment_proctor::policy::{KeyRule, Policy};
use assessment_proctor::signals::{Gesture, KeyStroke, Occurrence, Stamped};
use assessment_proctor::sink::{AutoSavePayload, EventPayload, RemoteSink, SinkError, SinkFuture};
use assessment_proctor::storage::{MemorySlot, PendingStore};
use assessment_proctor::Dispatcher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

#[derive(Default)]
struct Recording {
    events: Mutex<Vec<EventPayload>>,
    fail: bool,
}

impl RemoteSink for Recording {
    fn send_event(&self, payload: EventPayload) -> SinkFuture<'_> {
        Box::pin(async move {
            self.events.lock().unwrap().push(payload);
            if self.fail {
                Err(SinkError::Server {
                    status: 502,
                    message: "bad gateway".into(),
                })
            } else {
                Ok(())
            }
        })
    }

    fn save_code(&self, _payload: AutoSavePayload) -> SinkFuture<'_> {
        Box::pin(async { Ok(()) })
    }
}

struct Silent;

impl Notifier for Silent {
    fn show(&self, _notice: Notice) {}
}

struct Harness {
    engine: Engine,
    sink: Arc<Recording>,
    store: Arc<MemorySlot>,
    submissions: Arc<AtomicUsize>,
}

fn harness(policy: Policy, sink: Recording) -> Harness {
    let sink = Arc::new(sink);
    let store = Arc::new(MemorySlot::new());
    let submissions = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&submissions);
    let hook = SubmissionHook::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let dispatcher = Dispatcher::new(Uuid::new_v4(), sink.clone(), store.clone());
    let engine = Engine::new(Arc::new(policy), dispatcher, Arc::new(Silent), hook, 0);

    Harness {
        engine,
        sink,
        store,
        submissions,
    }
}

fn tab_hidden(at: u64) -> Stamped {
    Stamped::new(at, Occurrence::VisibilityChange { hidden: true })
}

#[tokio::test(start_paused = true)]
async fn test_five_tab_switches_submit_once_after_grace() {
    let policy = Policy {
        violation_limit: 5,
        allow_tab_switch: false,
        ..Policy::default()
    };
    let mut h = harness(policy, Recording::default());

    for i in 0..5 {
        h.engine.process(tab_hidden(100 * (i + 1)));
    }
    assert_eq!(h.engine.violation_count(), 5);
    assert_eq!(h.engine.counters().tab_switches, 5);
    assert_eq!(h.engine.buffer().len(), 5);

    tokio::time::sleep(Duration::from_millis(2_999)).await;
    assert_eq!(h.submissions.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(h.submissions.load(Ordering::SeqCst), 1);

    // Further violations keep counting but never resubmit
    let outcome = h.engine.process(tab_hidden(900)).unwrap();
    assert_eq!(outcome.escalation, Some(Escalation::Counted { count: 6 }));
    tokio::time::sleep(Duration::from_secs(10)).await;
    h.engine.settle().await;
    assert_eq!(h.submissions.load(Ordering::SeqCst), 1);
    assert!(h.engine.summary().auto_submitted);
}

#[tokio::test(start_paused = true)]
async fn test_disable_cancels_pending_submission() {
    let policy = Policy {
        violation_limit: 2,
        ..Policy::default()
    };
    let mut h = harness(policy, Recording::default());

    h.engine.process(tab_hidden(1));
    h.engine.process(tab_hidden(2));
    h.engine.disable();

    tokio::time::sleep(Duration::from_secs(5)).await;
    h.engine.settle().await;
    assert_eq!(h.submissions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failing_sink_overwrites_slot() {
    let mut h = harness(
        Policy::default(),
        Recording {
            fail: true,
            ..Recording::default()
        },
    );

    h.engine.process(tab_hidden(10));
    h.engine.settle().await;
    let first = h.store.load().unwrap().unwrap();
    assert_eq!(first.events.len(), 1);
    assert_eq!(first.events[0].timestamp(), 10);

    h.engine
        .process(Stamped::new(20, Occurrence::Paste { text: "x".into() }));
    h.engine.settle().await;
    let second = h.store.load().unwrap().unwrap();
    assert_eq!(second.events.len(), 2);
    assert_eq!(second.events[1].kind(), EventKind::CopyPaste);
    assert!(second.sequence > first.sequence);

    assert_eq!(h.sink.events.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_inactivity_boundaries() {
    let threshold = 300_000;
    let policy = Policy {
        inactivity_threshold_ms: threshold,
        ..Policy::default()
    };

    let mut h = harness(policy.clone(), Recording::default());
    assert!(h
        .engine
        .process(Stamped::new(threshold - 1, Occurrence::InactivityCheck))
        .is_none());

    let outcome = h
        .engine
        .process(Stamped::new(threshold + 1, Occurrence::InactivityCheck))
        .unwrap();
    assert_eq!(outcome.event.suspicion(), Some("prolonged_inactivity"));
    assert_eq!(outcome.event.severity(), Severity::Medium);
    assert!(!outcome.violation);

    let mut h = harness(policy, Recording::default());
    h.engine.process(Stamped::new(
        1_000,
        Occurrence::Activity {
            gesture: Gesture::Scroll,
        },
    ));
    assert!(h
        .engine
        .process(Stamped::new(threshold + 1, Occurrence::InactivityCheck))
        .is_none());
    assert_eq!(h.engine.last_activity_at(), 1_000);
}

#[tokio::test]
async fn test_copy_paste_toggle() {
    let mut allowed = harness(
        Policy {
            allow_copy_paste: true,
            ..Policy::default()
        },
        Recording::default(),
    );
    let outcome = allowed
        .engine
        .process(Stamped::new(5, Occurrence::Paste { text: "answer".into() }))
        .unwrap();
    assert_eq!(outcome.event.severity(), Severity::High);
    assert!(!outcome.violation);
    assert_eq!(allowed.engine.violation_count(), 0);
    assert_eq!(allowed.engine.counters().copy_paste_events, 1);

    let mut blocked = harness(Policy::default(), Recording::default());
    let outcome = blocked
        .engine
        .process(Stamped::new(5, Occurrence::Paste { text: "answer".into() }))
        .unwrap();
    assert!(outcome.violation);
    assert_eq!(blocked.engine.violation_count(), 1);
}

#[tokio::test]
async fn test_first_matching_key_rule_wins() {
    let policy = Policy {
        key_rules: vec![
            KeyRule::new("I", Severity::Medium).ctrl(),
            KeyRule::new("I", Severity::High).ctrl().shift(),
        ],
        ..Policy::default()
    };
    let mut h = harness(policy, Recording::default());

    let outcome = h
        .engine
        .process(Stamped::new(
            1,
            Occurrence::KeyDown(KeyStroke::new("I").with_ctrl().with_shift()),
        ))
        .unwrap();
    assert_eq!(outcome.event.kind(), EventKind::KeyCombination);
    assert_eq!(outcome.event.severity(), Severity::Medium);
    assert!(!outcome.violation);

    assert!(h
        .engine
        .process(Stamped::new(2, Occurrence::KeyDown(KeyStroke::new("F12"))))
        .is_none());
    assert_eq!(h.engine.buffer().len(), 1);
}

#[tokio::test]
async fn test_buffer_keeps_latest_after_overflow() {
    let policy = Policy {
        violation_limit: 100,
        ..Policy::default()
    };
    let mut h = harness(policy, Recording::default());

    for i in 1..=11 {
        h.engine.process(Stamped::new(i, Occurrence::WindowBlur));
        assert!(h.engine.buffer().len() <= 10);
    }
    let kept: Vec<u64> = h.engine.buffer().iter().map(|e| e.timestamp()).collect();
    assert_eq!(kept.len(), TRIM_TO);
    assert_eq!(kept, vec![7, 8, 9, 10, 11]);

    h.engine.settle().await;
    assert_eq!(h.sink.events.lock().unwrap().len(), 11);
}
