//! Occurrence classification.
//!
//! Maps raw occurrences to typed events against the session policy. The
//! classifier owns the small amount of context some rules need: the pointer
//! trail for velocity analysis, the edge state of the viewport heuristic, and
//! the time of the last qualifying input gesture.

use crate::core::event::{Event, EventKind, Millis, Severity, Suspicion};
use crate::core::motion::{PointerSample, PointerTrail};
use crate::notify::Notice;
use crate::policy::Policy;
use crate::signals::types::{KeyStroke, Occurrence, ViewportSize};
use std::sync::Arc;

/// Clipboard and selection excerpts are cut to this many characters.
pub const EXCERPT_CHARS: usize = 100;

/// Result of classifying one occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub event: Event,
    pub violation: bool,
    /// Notice to surface, if the rule calls for one
    pub notice: Option<Notice>,
}

/// Policy-driven classifier.
#[derive(Debug)]
pub struct Classifier {
    policy: Arc<Policy>,
    trail: PointerTrail,
    tool_pane_open: bool,
    last_activity_at: Millis,
}

impl Classifier {
    /// Create a classifier whose inactivity timer starts at `started_at`.
    pub fn new(policy: Arc<Policy>, started_at: Millis) -> Self {
        Self {
            policy,
            trail: PointerTrail::new(),
            tool_pane_open: false,
            last_activity_at: started_at,
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn last_activity_at(&self) -> Millis {
        self.last_activity_at
    }

    pub fn pointer_samples(&self) -> usize {
        self.trail.len()
    }

    /// Classify an occurrence observed at `at`.
    ///
    /// Returns `None` for occurrences that only update context (activity
    /// gestures, unmatched keys, slow pointer movement).
    pub fn classify(&mut self, occurrence: &Occurrence, at: Millis) -> Option<Classification> {
        self.note_activity(occurrence, at);

        let (event, notice) = match occurrence {
            Occurrence::VisibilityChange { hidden: true } => (
                Event::new(EventKind::TabSwitch, Severity::High, at).with("action", "tab_hidden"),
                Some(Notice::warning(
                    "Tab switching detected! This action has been logged.",
                )),
            ),
            Occurrence::VisibilityChange { hidden: false } => (
                Event::new(EventKind::WindowFocus, Severity::Medium, at)
                    .with("action", "tab_visible"),
                None,
            ),
            Occurrence::WindowBlur => (Event::new(EventKind::WindowBlur, Severity::Medium, at), None),
            Occurrence::WindowFocus => (Event::new(EventKind::WindowFocus, Severity::Low, at), None),
            Occurrence::Copy { selection } => (
                Event::new(EventKind::CopyPaste, Severity::Medium, at)
                    .with("action", "copy")
                    .with("selection", excerpt(selection)),
                None,
            ),
            Occurrence::Paste { text } => (
                Event::new(EventKind::CopyPaste, Severity::High, at)
                    .with("action", "paste")
                    .with("data", excerpt(text)),
                Some(Notice::warning("Paste operation detected and logged.")),
            ),
            Occurrence::ContextMenu { x, y, target } => (
                Event::new(EventKind::RightClick, Severity::Medium, at)
                    .with("x", *x)
                    .with("y", *y)
                    .with("target", target.as_str()),
                Some(Notice::warning(
                    "Right-click is disabled during the assessment.",
                )),
            ),
            Occurrence::KeyDown(stroke) => self.classify_key(stroke, at)?,
            Occurrence::Resize { width, height } => (
                Event::new(EventKind::WindowResize, Severity::Low, at)
                    .with("width", *width)
                    .with("height", *height),
                None,
            ),
            Occurrence::FullscreenExit => {
                (Event::new(EventKind::FullscreenExit, Severity::Medium, at), None)
            }
            Occurrence::PointerMove { x, y } => self.classify_pointer(*x, *y, at)?,
            Occurrence::Viewport(size) => self.classify_viewport(size, at)?,
            Occurrence::ConsoleOutput => (
                Event::suspicious(Suspicion::ConsoleUsage, Severity::Medium, at),
                None,
            ),
            Occurrence::InactivityCheck => self.classify_inactivity(at)?,
            Occurrence::Activity { .. } => return None,
        };

        let violation = self.is_violation(&event);
        Some(Classification {
            event,
            violation,
            notice,
        })
    }

    /// Whether an event breaks policy.
    ///
    /// Copy/paste and tab switches are governed by their allow flags alone;
    /// everything else is a violation exactly when it is high severity.
    pub fn is_violation(&self, event: &Event) -> bool {
        match event.kind() {
            EventKind::CopyPaste => !self.policy.allow_copy_paste,
            EventKind::TabSwitch => !self.policy.allow_tab_switch,
            _ => event.severity() == Severity::High,
        }
    }

    fn note_activity(&mut self, occurrence: &Occurrence, at: Millis) {
        if matches!(
            occurrence,
            Occurrence::Activity { .. } | Occurrence::PointerMove { .. } | Occurrence::KeyDown(_)
        ) {
            self.last_activity_at = self.last_activity_at.max(at);
        }
    }

    fn classify_key(&self, stroke: &KeyStroke, at: Millis) -> Option<(Event, Option<Notice>)> {
        let rule = self.policy.match_key(stroke)?;
        let event = Event::new(EventKind::KeyCombination, rule.severity, at)
            .with("key", rule.key.as_str())
            .with("ctrl", rule.ctrl.unwrap_or(false))
            .with("shift", rule.shift.unwrap_or(false))
            .with("alt", rule.alt.unwrap_or(false));
        let notice = (rule.severity == Severity::High)
            .then(|| Notice::violation(format!("Blocked key combination: {}", rule.label())));
        Some((event, notice))
    }

    fn classify_pointer(&mut self, x: f64, y: f64, at: Millis) -> Option<(Event, Option<Notice>)> {
        let speed = self.trail.push(PointerSample { x, y, at })?;
        if speed <= self.policy.mouse_speed_threshold_px_per_sec {
            return None;
        }
        let event = Event::suspicious(Suspicion::RapidMouseMovement, Severity::High, at)
            .with("avg_speed", speed);
        Some((event, None))
    }

    fn classify_viewport(
        &mut self,
        size: &ViewportSize,
        at: Millis,
    ) -> Option<(Event, Option<Notice>)> {
        if !size.gap_exceeds(self.policy.viewport_gap_threshold_px) {
            self.tool_pane_open = false;
            return None;
        }
        if self.tool_pane_open {
            return None;
        }
        self.tool_pane_open = true;
        let event = Event::suspicious(Suspicion::DevtoolsDetected, Severity::High, at)
            .with("method", "window_size_detection");
        Some((event, Some(Notice::violation("Developer tools detected!"))))
    }

    fn classify_inactivity(&self, at: Millis) -> Option<(Event, Option<Notice>)> {
        let idle = at.saturating_sub(self.last_activity_at);
        if idle <= self.policy.inactivity_threshold_ms {
            return None;
        }
        let event = Event::suspicious(Suspicion::ProlongedInactivity, Severity::Medium, at)
            .with("duration", idle);
        Some((event, None))
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}
