//! Raw occurrences observed by the signal sources.
//!
//! These are platform-level happenings before any classification. They carry
//! only what the classifier needs; judgment happens downstream.

use crate::core::event::Millis;
use serde::{Deserialize, Serialize};

/// A key press with its modifier state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStroke {
    /// Logical key name as reported by the platform (`"F12"`, `"I"`, `"Tab"`)
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
}

impl KeyStroke {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: false,
            shift: false,
            alt: false,
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }
}

/// Input gestures that count as user activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    PointerDown,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
}

/// Outer and inner viewport dimensions, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub outer_width: u32,
    pub outer_height: u32,
    pub inner_width: u32,
    pub inner_height: u32,
}

impl ViewportSize {
    /// Whether the outer/inner gap on either axis exceeds `threshold_px`.
    ///
    /// A docked tool pane shrinks the inner viewport without changing the
    /// outer window.
    pub fn gap_exceeds(&self, threshold_px: u32) -> bool {
        let width_gap = i64::from(self.outer_width) - i64::from(self.inner_width);
        let height_gap = i64::from(self.outer_height) - i64::from(self.inner_height);
        let threshold = i64::from(threshold_px);
        width_gap > threshold || height_gap > threshold
    }
}

/// A raw platform occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Occurrence {
    /// Page visibility changed
    VisibilityChange { hidden: bool },
    WindowBlur,
    WindowFocus,
    /// Clipboard copy with the selected text
    Copy { selection: String },
    /// Clipboard paste with the pasted text
    Paste { text: String },
    /// Context menu request (right click)
    ContextMenu { x: i32, y: i32, target: String },
    KeyDown(KeyStroke),
    Resize { width: u32, height: u32 },
    FullscreenExit,
    /// Pointer position in client coordinates
    PointerMove { x: f64, y: f64 },
    /// Periodic viewport poll
    Viewport(ViewportSize),
    /// A call to the intercepted diagnostic log
    ConsoleOutput,
    /// Periodic inactivity watch tick
    InactivityCheck,
    /// Activity gesture captured before inner handlers run
    Activity { gesture: Gesture },
}

/// An occurrence with the time it was observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamped {
    pub at: Millis,
    #[serde(flatten)]
    pub occurrence: Occurrence,
}

impl Stamped {
    pub fn new(at: Millis, occurrence: Occurrence) -> Self {
        Self { at, occurrence }
    }
}

/// What the host should do with the platform's default action.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Allow,
    Suppress,
}

impl Disposition {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Disposition::Suppress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_gap_detection() {
        let docked = ViewportSize {
            outer_width: 1400,
            outer_height: 900,
            inner_width: 1400,
            inner_height: 500,
        };
        assert!(docked.gap_exceeds(160));

        let normal = ViewportSize {
            outer_width: 1400,
            outer_height: 900,
            inner_width: 1390,
            inner_height: 800,
        };
        assert!(!normal.gap_exceeds(160));

        // Inner larger than outer (zoomed) never counts as a gap
        let zoomed = ViewportSize {
            outer_width: 800,
            outer_height: 600,
            inner_width: 1600,
            inner_height: 1200,
        };
        assert!(!zoomed.gap_exceeds(160));
    }

    #[test]
    fn test_stamped_json_shape() {
        let line = r#"{"at":120,"type":"key_down","key":"I","ctrl":true,"shift":true}"#;
        let stamped: Stamped = serde_json::from_str(line).unwrap();
        assert_eq!(stamped.at, 120);
        assert_eq!(
            stamped.occurrence,
            Occurrence::KeyDown(KeyStroke::new("I").with_ctrl().with_shift())
        );

        let line = r#"{"at":5,"type":"visibility_change","hidden":true}"#;
        let stamped: Stamped = serde_json::from_str(line).unwrap();
        assert_eq!(stamped.occurrence, Occurrence::VisibilityChange { hidden: true });
    }
}
