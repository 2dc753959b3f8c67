//! Event buffering and delivery.
//!
//! [`Dispatcher::record`] appends to the bounded buffer and spawns an
//! independent delivery task; the caller never waits on the network. A
//! delivery that fails or exceeds the timeout writes the buffer snapshot taken
//! at record time to the local slot.

use crate::core::buffer::EventBuffer;
use crate::core::event::Event;
use crate::sink::{EventPayload, RemoteSink, SinkError};
use crate::storage::{PendingSnapshot, PendingStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Default bound on a single delivery.
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(10);

/// Buffers events and ships them to the remote sink.
pub struct Dispatcher {
    session_id: Uuid,
    assessment_id: Option<String>,
    sink: Arc<dyn RemoteSink>,
    store: Arc<dyn PendingStore>,
    timeout: Duration,
    buffer: EventBuffer,
    sequence: u64,
    /// Highest sequence written to the slot. Held across the write so
    /// concurrent failures reach the slot in sequence order.
    persisted: Arc<Mutex<u64>>,
    live: Arc<AtomicBool>,
    in_flight: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn new(session_id: Uuid, sink: Arc<dyn RemoteSink>, store: Arc<dyn PendingStore>) -> Self {
        Self {
            session_id,
            assessment_id: None,
            sink,
            store,
            timeout: DEFAULT_SINK_TIMEOUT,
            buffer: EventBuffer::new(),
            sequence: 0,
            persisted: Arc::new(Mutex::new(0)),
            live: Arc::new(AtomicBool::new(true)),
            in_flight: Vec::new(),
        }
    }

    /// Attach the assessment identifier sent with every event.
    pub fn with_assessment(mut self, assessment_id: impl Into<String>) -> Self {
        self.assessment_id = Some(assessment_id.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Buffer an event and start delivering it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn record(&mut self, event: Event, is_violation: bool) {
        let payload = EventPayload::from_event(&event, is_violation, self.assessment_id.clone());
        let dropped = self.buffer.push(event);
        if dropped > 0 {
            tracing::debug!(dropped, kept = self.buffer.len(), "event buffer trimmed");
        }

        self.sequence += 1;
        let sequence = self.sequence;
        let snapshot = self.buffer.snapshot();
        let session_id = self.session_id;
        let sink = Arc::clone(&self.sink);
        let store = Arc::clone(&self.store);
        let persisted = Arc::clone(&self.persisted);
        let live = Arc::clone(&self.live);
        let timeout = self.timeout;

        self.in_flight.retain(|handle| !handle.is_finished());
        self.in_flight.push(tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, sink.send_event(payload)).await {
                Ok(result) => result,
                Err(_) => Err(SinkError::Timeout(timeout)),
            };

            let Err(error) = result else {
                return;
            };

            if !live.load(Ordering::SeqCst) {
                tracing::debug!(%error, sequence, "delivery failed after shutdown; not persisting");
                return;
            }

            // An older failure finishing late must not replace a newer snapshot
            let mut last = persisted.lock().unwrap_or_else(|e| e.into_inner());
            if *last > sequence {
                tracing::debug!(%error, sequence, newer = *last, "newer snapshot already persisted");
                return;
            }

            tracing::warn!(%error, sequence, events = snapshot.len(), "event delivery failed; storing buffer locally");
            let pending = PendingSnapshot::new(session_id, sequence, snapshot);
            match store.save(&pending) {
                Ok(()) => *last = sequence,
                Err(e) => tracing::warn!(error = %e, "could not persist pending events"),
            }
        }));
    }

    /// Stop side effects from deliveries still in flight.
    pub fn detach(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    /// Wait for every in-flight delivery to finish.
    pub async fn settle(&mut self) {
        for handle in self.in_flight.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "delivery task failed");
            }
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.iter().filter(|h| !h.is_finished()).count()
    }

    pub fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn assessment_id(&self) -> Option<&str> {
        self.assessment_id.as_deref()
    }
}
