//! Async session driver.
//!
//! [`SessionBuilder::start`] wires signal sources, the engine and its
//! collaborators together and spawns one driver task that owns the engine.
//! The driver drains the occurrence queue and runs the periodic viewport and
//! inactivity sources until [`SessionHandle::stop`] is called.

use crate::autosave::AutoSaver;
use crate::config::Config;
use crate::core::engine::Engine;
use crate::core::escalation::SubmissionHook;
use crate::dispatch::Dispatcher;
use crate::notify::{NoticeBoard, Notifier};
use crate::policy::{Policy, PolicyError};
use crate::report::ViolationSummary;
use crate::signals::clock::{Clock, MonotonicClock};
use crate::signals::hub::{SignalError, SignalHub, Sources};
use crate::signals::types::ViewportSize;
use crate::sink::{LogSink, RemoteSink};
use crate::storage::{FileSlot, PendingStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use uuid::Uuid;

/// Shortest timer period the driver accepts.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Measures the host window for docked tool pane detection.
pub trait ViewportProbe: Send + Sync {
    /// Current dimensions, or `None` when they cannot be read.
    fn measure(&self) -> Option<ViewportSize>;
}

/// Session errors.
#[derive(Debug)]
pub enum SessionError {
    Policy(PolicyError),
    Signal(SignalError),
    /// The driver task ended abnormally
    Driver(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Policy(e) => write!(f, "Policy error: {e}"),
            SessionError::Signal(e) => write!(f, "Signal error: {e}"),
            SessionError::Driver(e) => write!(f, "Session driver error: {e}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<PolicyError> for SessionError {
    fn from(e: PolicyError) -> Self {
        SessionError::Policy(e)
    }
}

impl From<SignalError> for SessionError {
    fn from(e: SignalError) -> Self {
        SessionError::Signal(e)
    }
}

/// Builder for a proctored session.
pub struct SessionBuilder {
    policy: Policy,
    config: Config,
    sink: Option<Arc<dyn RemoteSink>>,
    store: Option<Arc<dyn PendingStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    clock: Option<Arc<dyn Clock>>,
    probe: Option<Arc<dyn ViewportProbe>>,
    hook: SubmissionHook,
    assessment_id: Option<String>,
}

impl SessionBuilder {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            config: Config::default(),
            sink: None,
            store: None,
            notifier: None,
            clock: None,
            probe: None,
            hook: SubmissionHook::noop(),
            assessment_id: None,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn RemoteSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn store(mut self, store: Arc<dyn PendingStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn viewport_probe(mut self, probe: Arc<dyn ViewportProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Callback invoked at most once when the violation limit is reached.
    pub fn on_submit(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.hook = SubmissionHook::new(callback);
        self
    }

    pub fn assessment_id(mut self, id: impl Into<String>) -> Self {
        self.assessment_id = Some(id.into());
        self
    }

    /// Start the session. Must be called from within a tokio runtime.
    pub fn start(self) -> Result<SessionHandle, SessionError> {
        self.policy.validate()?;

        let policy = Arc::new(self.policy);
        let config = self.config;
        let sink = self.sink.unwrap_or_else(|| Arc::new(LogSink));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(FileSlot::in_dir(&config.pending_dir)));
        let clock = self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let (notifier, notices) = match self.notifier {
            Some(notifier) => (notifier, None),
            None => {
                let board = Arc::new(NoticeBoard::new(
                    Arc::clone(&clock),
                    config.notice_duration,
                ));
                (Arc::clone(&board) as Arc<dyn Notifier>, Some(board))
            }
        };

        let session_id = Uuid::new_v4();
        let mut dispatcher = Dispatcher::new(session_id, Arc::clone(&sink), store)
            .with_timeout(config.sink_timeout);
        if let Some(id) = &self.assessment_id {
            dispatcher = dispatcher.with_assessment(id.clone());
        }

        let engine = Engine::new(
            Arc::clone(&policy),
            dispatcher,
            notifier,
            self.hook,
            clock.now_ms(),
        );

        let hub = SignalHub::new(policy, clock);
        hub.start()?;
        let sources = hub.sources();

        let (commands, inbox) = mpsc::unbounded_channel();
        let driver = tokio::spawn(drive(engine, hub, self.probe, config.clone(), inbox));

        Ok(SessionHandle {
            session_id,
            sources,
            autosaver: AutoSaver::new(sink, config.autosave_quiet_period),
            notices,
            commands,
            driver,
        })
    }
}

enum Command {
    Summary(oneshot::Sender<ViolationSummary>),
    Stop,
}

/// Handle to a running session.
pub struct SessionHandle {
    session_id: Uuid,
    sources: Sources,
    autosaver: AutoSaver,
    notices: Option<Arc<NoticeBoard>>,
    commands: mpsc::UnboundedSender<Command>,
    driver: JoinHandle<ViolationSummary>,
}

impl SessionHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Producer handle for wiring host events.
    pub fn sources(&self) -> Sources {
        self.sources.clone()
    }

    /// Built-in notice board, present unless a notifier was supplied.
    pub fn notices(&self) -> Option<&Arc<NoticeBoard>> {
        self.notices.as_ref()
    }

    /// Editor content changed; schedules a debounced auto-save.
    pub fn content_changed(&mut self, question_id: Option<&str>, code: &str) {
        self.autosaver.content_changed(question_id, code);
    }

    /// Current violation summary.
    pub async fn summary(&self) -> Result<ViolationSummary, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Summary(reply))
            .map_err(|_| SessionError::Driver("session already stopped".into()))?;
        response
            .await
            .map_err(|_| SessionError::Driver("session ended before replying".into()))
    }

    /// Stop the session and return the final summary.
    ///
    /// Timers and listeners stop, a pending auto-submission is cancelled and
    /// in-flight deliveries finish without further side effects.
    pub async fn stop(mut self) -> Result<ViolationSummary, SessionError> {
        self.autosaver.cancel();
        let _ = self.commands.send(Command::Stop);
        (&mut self.driver)
            .await
            .map_err(|e| SessionError::Driver(e.to_string()))
    }
}

async fn drive(
    mut engine: Engine,
    hub: SignalHub,
    probe: Option<Arc<dyn ViewportProbe>>,
    config: Config,
    mut inbox: mpsc::UnboundedReceiver<Command>,
) -> ViolationSummary {
    let sources = hub.sources();
    let start = Instant::now();
    let viewport_period = config.viewport_poll_interval.max(MIN_PERIOD);
    let inactivity_period = config.inactivity_check_interval.max(MIN_PERIOD);

    let mut pump = interval(config.queue_poll_interval.max(MIN_PERIOD));
    pump.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut viewport = interval_at(start + viewport_period, viewport_period);
    let mut inactivity = interval_at(start + inactivity_period, inactivity_period);

    tracing::info!(session = %engine.session_id(), "session started");

    loop {
        tokio::select! {
            biased;

            command = inbox.recv() => match command {
                Some(Command::Summary(reply)) => {
                    engine.drain(hub.receiver());
                    let _ = reply.send(engine.summary());
                }
                Some(Command::Stop) | None => break,
            },
            _ = pump.tick() => {
                engine.drain(hub.receiver());
            }
            _ = viewport.tick(), if probe.is_some() => {
                if let Some(size) = probe.as_ref().and_then(|p| p.measure()) {
                    sources.viewport(size);
                }
            }
            _ = inactivity.tick() => {
                sources.inactivity_check();
            }
        }
    }

    hub.stop();
    engine.drain(hub.receiver());
    engine.disable();
    engine.settle().await;

    let summary = engine.summary();
    tracing::info!(
        session = %summary.session_id,
        violations = summary.total_violations,
        auto_submitted = summary.auto_submitted,
        "session stopped"
    );
    summary
}
