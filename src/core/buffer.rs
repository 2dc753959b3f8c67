//! Bounded buffer of the most recent events.

use crate::core::event::Event;

/// Events held before the buffer overflows.
pub const BUFFER_CAPACITY: usize = 10;

/// Events kept after an overflow.
pub const TRIM_TO: usize = 5;

/// Recent-event buffer.
///
/// Overflow is handled by an aggressive trim: pushing the eleventh event
/// keeps only the five most recent, rather than dropping one at a time.
#[derive(Debug, Clone, Default)]
pub struct EventBuffer {
    events: Vec<Event>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(BUFFER_CAPACITY + 1),
        }
    }

    /// Append an event, trimming on overflow.
    ///
    /// Returns the number of events dropped.
    pub fn push(&mut self, event: Event) -> usize {
        self.events.push(event);
        if self.events.len() > BUFFER_CAPACITY {
            let dropped = self.events.len() - TRIM_TO;
            self.events.drain(..dropped);
            return dropped;
        }
        0
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Event> {
        self.events.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn latest(&self) -> Option<&Event> {
        self.events.last()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
