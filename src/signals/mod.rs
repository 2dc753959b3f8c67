//! Signal sources for the proctoring engine.
//!
//! Hosts translate their platform events into calls on [`Sources`]; the
//! engine drains the resulting queue in observation order.

pub mod clock;
pub mod console;
pub mod hub;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use console::{ConsoleTap, DiagnosticLog, TracingLog};
pub use hub::{SignalError, SignalHub, Sources, QUEUE_CAPACITY};
pub use types::{Disposition, Gesture, KeyStroke, Occurrence, Stamped, ViewportSize};
