//! Assessment Proctor - client-side integrity monitoring for online assessments.
//!
//! This library observes platform-level occurrences during a timed
//! assessment, classifies them into typed events, ships every event to a
//! remote collector and escalates repeated policy violations into an
//! automatic submission.
//!
//! # Guarantees
//!
//! - **Ordered**: occurrences are classified and buffered in observation order
//! - **Non-blocking**: delivery never holds up classification
//! - **Durable fallback**: a failed delivery leaves the latest buffer in a local slot
//! - **At most once**: the submission hook fires at most once per session
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Assessment Proctor                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │   Sources   │──▶│ Classifier  │──▶│ Dispatcher  │──▶ Sink │
//! │  │ (SignalHub) │   │  (Policy)   │   │  (buffer)   │         │
//! │  └─────────────┘   └─────────────┘   └─────────────┘         │
//! │                           │                 │                │
//! │                           ▼                 ▼                │
//! │                    ┌─────────────┐   ┌─────────────┐         │
//! │                    │  Escalator  │   │ Local slot  │         │
//! │                    │  (→ submit) │   │ (fallback)  │         │
//! │                    └─────────────┘   └─────────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use assessment_proctor::{Policy, SessionBuilder};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let session = SessionBuilder::new(Policy::default())
//!     .assessment_id("A-42")
//!     .on_submit(|| println!("submitting"))
//!     .start()?;
//!
//! let sources = session.sources();
//! sources.visibility_changed(true);
//!
//! let summary = session.stop().await?;
//! println!("{}", summary.render());
//! # Ok(())
//! # }
//! ```

pub mod autosave;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod notify;
pub mod policy;
pub mod report;
pub mod session;
pub mod signals;
pub mod sink;
pub mod storage;

// Re-export key types at crate root for convenience
pub use autosave::AutoSaver;
pub use config::{Config, ConfigError};
pub use core::{Engine, Event, EventKind, Outcome, Severity, SubmissionHook, Suspicion};
pub use dispatch::Dispatcher;
pub use notify::{Notice, NoticeBoard, NoticeLevel, Notifier, TracingNotifier};
pub use policy::{KeyRule, Policy, PolicyError};
pub use report::{Counters, ViolationSummary};
pub use session::{SessionBuilder, SessionError, SessionHandle, ViewportProbe};
pub use signals::{Clock, Disposition, KeyStroke, Occurrence, SignalHub, Sources, Stamped};
pub use sink::{LogSink, RemoteSink, SinkConfig, SinkError};
pub use storage::{FileSlot, MemorySlot, PendingSnapshot, PendingStore, StorageError};

#[cfg(feature = "http")]
pub use sink::HttpSink;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
