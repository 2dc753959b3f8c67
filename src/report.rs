//! End-of-session violation summary.

use crate::core::escalation::EscalationState;
use crate::core::event::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-category counters, incremented regardless of violation status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub tab_switches: u32,
    pub copy_paste_events: u32,
    /// Rapid pointer movement plus every violation notice shown
    pub suspicious_activities: u32,
}

/// Snapshot of what the engine observed during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub state: EscalationState,
    pub total_violations: u32,
    pub violation_limit: u32,
    #[serde(flatten)]
    pub counters: Counters,
    pub auto_submitted: bool,
    pub violations: Vec<Event>,
}

impl ViolationSummary {
    /// Get a summary string for display.
    pub fn render(&self) -> String {
        let session_secs = (Utc::now() - self.started_at).num_seconds().max(0);
        let mut out = format!(
            "Session Summary:\n\
             - Violations: {} of {} allowed\n\
             - Tab switches: {}\n\
             - Copy/paste events: {}\n\
             - Suspicious activities: {}\n\
             - Auto-submitted: {}\n\
             - Session duration: {} seconds",
            self.total_violations,
            self.violation_limit,
            self.counters.tab_switches,
            self.counters.copy_paste_events,
            self.counters.suspicious_activities,
            if self.auto_submitted { "yes" } else { "no" },
            session_secs,
        );

        if !self.violations.is_empty() {
            out.push_str("\n\nViolations:");
            for event in &self.violations {
                out.push_str(&format!(
                    "\n  [{:>8}ms] {} ({})",
                    event.timestamp(),
                    event.suspicion().unwrap_or(event.kind().as_str()),
                    event.severity()
                ));
            }
        }
        out
    }
}
