//! Diagnostic output interception.
//!
//! [`ConsoleTap`] wraps the host's diagnostic log. Every call reports a
//! console usage occurrence and then forwards to the wrapped log unchanged.

use crate::signals::hub::Sources;

/// A diagnostic output primitive.
pub trait DiagnosticLog: Send + Sync {
    fn log(&self, message: &str);
}

/// Diagnostic log writing to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl DiagnosticLog for TracingLog {
    fn log(&self, message: &str) {
        tracing::info!(target: "proctor::console", "{message}");
    }
}

/// Decorator that reports every call before delegating.
pub struct ConsoleTap<L> {
    inner: L,
    sources: Sources,
}

impl<L: DiagnosticLog> ConsoleTap<L> {
    pub fn new(inner: L, sources: Sources) -> Self {
        Self { inner, sources }
    }

    /// Take back the wrapped log.
    pub fn into_inner(self) -> L {
        self.inner
    }
}

impl<L: DiagnosticLog> DiagnosticLog for ConsoleTap<L> {
    fn log(&self, message: &str) {
        self.sources.console_output();
        self.inner.log(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Policy;
    use crate::signals::clock::ManualClock;
    use crate::signals::hub::SignalHub;
    use crate::signals::types::Occurrence;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Lines(Mutex<Vec<String>>);

    impl DiagnosticLog for Arc<Lines> {
        fn log(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn test_tap_reports_and_delegates() {
        let hub = SignalHub::new(Arc::new(Policy::default()), Arc::new(ManualClock::new(7)));
        hub.start().unwrap();
        let lines = Arc::new(Lines::default());
        let tap = ConsoleTap::new(Arc::clone(&lines), hub.sources());

        tap.log("first");
        tap.log("second");

        assert_eq!(*lines.0.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(hub.queued(), 2);
        let stamped = hub.receiver().try_recv().unwrap();
        assert_eq!(stamped.occurrence, Occurrence::ConsoleOutput);
        assert_eq!(stamped.at, 7);
    }

    #[test]
    fn test_tap_still_delegates_when_stopped() {
        let hub = SignalHub::new(Arc::new(Policy::default()), Arc::new(ManualClock::new(0)));
        let lines = Arc::new(Lines::default());
        let tap = ConsoleTap::new(Arc::clone(&lines), hub.sources());

        tap.log("quiet");
        assert_eq!(lines.0.lock().unwrap().len(), 1);
        assert_eq!(hub.queued(), 0);
    }
}
