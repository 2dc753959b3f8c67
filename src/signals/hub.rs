//! Signal hub: named producers feeding one ordered queue.
//!
//! Each source method stamps the occurrence with the session clock and pushes
//! it onto a bounded channel drained by the engine. Sources that must suppress
//! the platform's default action decide synchronously and return a
//! [`Disposition`]; classification still happens downstream.

use crate::policy::Policy;
use crate::signals::clock::Clock;
use crate::signals::types::{
    Disposition, Gesture, KeyStroke, Occurrence, Stamped, ViewportSize,
};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Capacity of the occurrence queue.
pub const QUEUE_CAPACITY: usize = 10_000;

/// Signal errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    AlreadyListening,
    /// The hub is not listening; the occurrence was dropped
    NotListening,
    /// The queue is at capacity; the occurrence was dropped
    QueueFull,
    /// The consumer side is gone
    Disconnected,
}

impl std::fmt::Display for SignalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalError::AlreadyListening => write!(f, "Signal hub is already listening"),
            SignalError::NotListening => write!(f, "Signal hub is not listening"),
            SignalError::QueueFull => write!(f, "Occurrence queue is full"),
            SignalError::Disconnected => write!(f, "Occurrence queue is disconnected"),
        }
    }
}

impl std::error::Error for SignalError {}

/// Owns the occurrence queue and the listening switch.
pub struct SignalHub {
    sender: Sender<Stamped>,
    receiver: Receiver<Stamped>,
    listening: Arc<AtomicBool>,
    policy: Arc<Policy>,
    clock: Arc<dyn Clock>,
}

impl SignalHub {
    pub fn new(policy: Arc<Policy>, clock: Arc<dyn Clock>) -> Self {
        let (sender, receiver) = bounded(QUEUE_CAPACITY);
        Self {
            sender,
            receiver,
            listening: Arc::new(AtomicBool::new(false)),
            policy,
            clock,
        }
    }

    /// Start accepting occurrences.
    pub fn start(&self) -> Result<(), SignalError> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return Err(SignalError::AlreadyListening);
        }
        tracing::debug!("signal sources attached");
        Ok(())
    }

    /// Stop accepting occurrences. Already queued ones stay queued.
    pub fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            tracing::debug!("signal sources detached");
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Producer handle for hosts to wire into their event listeners.
    pub fn sources(&self) -> Sources {
        Sources {
            sender: self.sender.clone(),
            listening: Arc::clone(&self.listening),
            policy: Arc::clone(&self.policy),
            clock: Arc::clone(&self.clock),
        }
    }

    pub fn receiver(&self) -> &Receiver<Stamped> {
        &self.receiver
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Number of occurrences waiting to be processed.
    pub fn queued(&self) -> usize {
        self.receiver.len()
    }
}

/// Cloneable producer handle.
///
/// Every method is cheap and never blocks; when the hub is not listening
/// the occurrence is dropped and defaults are allowed.
#[derive(Clone)]
pub struct Sources {
    sender: Sender<Stamped>,
    listening: Arc<AtomicBool>,
    policy: Arc<Policy>,
    clock: Arc<dyn Clock>,
}

impl Sources {
    /// Push an already stamped occurrence.
    pub fn push(&self, stamped: Stamped) -> Result<(), SignalError> {
        if !self.listening.load(Ordering::SeqCst) {
            return Err(SignalError::NotListening);
        }
        self.sender.try_send(stamped).map_err(|e| match e {
            TrySendError::Full(_) => SignalError::QueueFull,
            TrySendError::Disconnected(_) => SignalError::Disconnected,
        })
    }

    fn emit(&self, occurrence: Occurrence) -> bool {
        let stamped = Stamped::new(self.clock.now_ms(), occurrence);
        match self.push(stamped) {
            Ok(()) => true,
            Err(SignalError::NotListening) => false,
            Err(e) => {
                tracing::warn!(error = %e, "dropping occurrence");
                false
            }
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    pub fn visibility_changed(&self, hidden: bool) {
        self.emit(Occurrence::VisibilityChange { hidden });
    }

    pub fn window_blurred(&self) {
        self.emit(Occurrence::WindowBlur);
    }

    pub fn window_focused(&self) {
        self.emit(Occurrence::WindowFocus);
    }

    pub fn copied(&self, selection: impl Into<String>) {
        self.emit(Occurrence::Copy {
            selection: selection.into(),
        });
    }

    pub fn pasted(&self, text: impl Into<String>) {
        self.emit(Occurrence::Paste { text: text.into() });
    }

    /// Right click. The context menu is always suppressed while listening.
    pub fn context_menu(&self, x: i32, y: i32, target: impl Into<String>) -> Disposition {
        if !self.is_listening() {
            return Disposition::Allow;
        }
        self.emit(Occurrence::ContextMenu {
            x,
            y,
            target: target.into(),
        });
        Disposition::Suppress
    }

    /// Key press. Suppressed iff a key rule matches.
    pub fn key_down(&self, stroke: KeyStroke) -> Disposition {
        if !self.is_listening() {
            return Disposition::Allow;
        }
        let blocked = self.policy.match_key(&stroke).is_some();
        self.emit(Occurrence::KeyDown(stroke));
        if blocked {
            Disposition::Suppress
        } else {
            Disposition::Allow
        }
    }

    pub fn resized(&self, width: u32, height: u32) {
        self.emit(Occurrence::Resize { width, height });
    }

    pub fn fullscreen_exited(&self) {
        self.emit(Occurrence::FullscreenExit);
    }

    pub fn pointer_moved(&self, x: f64, y: f64) {
        self.emit(Occurrence::PointerMove { x, y });
    }

    /// Activity gesture, captured before inner handlers run.
    pub fn gesture(&self, gesture: Gesture) {
        self.emit(Occurrence::Activity { gesture });
    }

    pub fn viewport(&self, size: ViewportSize) {
        self.emit(Occurrence::Viewport(size));
    }

    pub fn console_output(&self) {
        self.emit(Occurrence::ConsoleOutput);
    }

    pub fn inactivity_check(&self) {
        self.emit(Occurrence::InactivityCheck);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::clock::ManualClock;

    fn hub() -> (SignalHub, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let hub = SignalHub::new(Arc::new(Policy::default()), clock.clone());
        (hub, clock)
    }

    #[test]
    fn test_start_twice_fails() {
        let (hub, _) = hub();
        assert!(hub.start().is_ok());
        assert_eq!(hub.start(), Err(SignalError::AlreadyListening));
        hub.stop();
        assert!(!hub.is_listening());
    }

    #[test]
    fn test_occurrences_are_stamped_in_order() {
        let (hub, clock) = hub();
        hub.start().unwrap();
        let sources = hub.sources();

        sources.window_blurred();
        clock.advance(25);
        sources.pasted("hello");

        let first = hub.receiver().try_recv().unwrap();
        let second = hub.receiver().try_recv().unwrap();
        assert_eq!(first, Stamped::new(0, Occurrence::WindowBlur));
        assert_eq!(second.at, 25);
        assert_eq!(
            second.occurrence,
            Occurrence::Paste {
                text: "hello".into()
            }
        );
    }

    #[test]
    fn test_suppression_decisions() {
        let (hub, _) = hub();
        hub.start().unwrap();
        let sources = hub.sources();

        assert!(sources.context_menu(10, 20, "DIV").is_suppressed());
        assert!(sources
            .key_down(KeyStroke::new("I").with_ctrl().with_shift())
            .is_suppressed());
        assert_eq!(sources.key_down(KeyStroke::new("a")), Disposition::Allow);
        // Unmatched keys are still queued for activity tracking
        assert_eq!(hub.queued(), 3);
    }

    #[test]
    fn test_stopped_hub_drops_and_allows() {
        let (hub, _) = hub();
        let sources = hub.sources();

        sources.window_blurred();
        assert_eq!(sources.context_menu(0, 0, "BODY"), Disposition::Allow);
        assert_eq!(sources.key_down(KeyStroke::new("F12")), Disposition::Allow);
        assert_eq!(hub.queued(), 0);
        assert_eq!(
            sources.push(Stamped::new(0, Occurrence::WindowFocus)),
            Err(SignalError::NotListening)
        );
    }
}
