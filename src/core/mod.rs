//! Core functionality for the assessment proctor.
//!
//! This module contains:
//! - The event model and classification rules
//! - Pointer speed analysis and the bounded event buffer
//! - Violation escalation and the per-session engine

pub mod buffer;
pub mod classifier;
pub mod engine;
pub mod escalation;
pub mod event;
pub mod motion;

// Re-export commonly used types
pub use buffer::{EventBuffer, BUFFER_CAPACITY, TRIM_TO};
pub use classifier::{Classification, Classifier};
pub use engine::{Engine, Outcome, AUTO_SUBMIT_MESSAGE};
pub use escalation::{Escalation, EscalationState, Escalator, SubmissionHook};
pub use event::{Event, EventData, EventKind, Millis, Scalar, Severity, Suspicion};
pub use motion::{PointerSample, PointerTrail};
