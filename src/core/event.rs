//! Classified proctoring events.
//!
//! An [`Event`] is the typed record derived from a raw occurrence. Events are
//! immutable once built: the builder methods consume `self` and there are no
//! setters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Monotonic timestamp in milliseconds since session start.
pub type Millis = u64;

/// Payload attached to an event.
pub type EventData = BTreeMap<String, Scalar>;

/// Graduated severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a classified event, mirroring the event types the sink accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TabSwitch,
    CopyPaste,
    WindowBlur,
    WindowFocus,
    WindowResize,
    FullscreenExit,
    RightClick,
    KeyCombination,
    SuspiciousActivity,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TabSwitch => "tab_switch",
            EventKind::CopyPaste => "copy_paste",
            EventKind::WindowBlur => "window_blur",
            EventKind::WindowFocus => "window_focus",
            EventKind::WindowResize => "window_resize",
            EventKind::FullscreenExit => "fullscreen_exit",
            EventKind::RightClick => "right_click",
            EventKind::KeyCombination => "key_combination",
            EventKind::SuspiciousActivity => "suspicious_activity",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-type carried in the `type` field of `suspicious_activity` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suspicion {
    RapidMouseMovement,
    DevtoolsDetected,
    ConsoleUsage,
    ProlongedInactivity,
}

impl Suspicion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Suspicion::RapidMouseMovement => "rapid_mouse_movement",
            Suspicion::DevtoolsDetected => "devtools_detected",
            Suspicion::ConsoleUsage => "console_usage",
            Suspicion::ProlongedInactivity => "prolonged_inactivity",
        }
    }
}

/// A scalar value inside an event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(i64::from(v))
    }
}

impl From<u32> for Scalar {
    fn from(v: u32) -> Self {
        Scalar::Int(i64::from(v))
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Scalar::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

/// A classified event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "event_type")]
    kind: EventKind,
    #[serde(rename = "event_data")]
    data: EventData,
    severity: Severity,
    timestamp: Millis,
}

impl Event {
    pub fn new(kind: EventKind, severity: Severity, timestamp: Millis) -> Self {
        Self {
            kind,
            data: EventData::new(),
            severity,
            timestamp,
        }
    }

    /// Create a `suspicious_activity` event tagged with its sub-type.
    pub fn suspicious(suspicion: Suspicion, severity: Severity, timestamp: Millis) -> Self {
        Self::new(EventKind::SuspiciousActivity, severity, timestamp).with("type", suspicion.as_str())
    }

    /// Attach a payload field.
    pub fn with(mut self, key: &str, value: impl Into<Scalar>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.data.get(key)
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn timestamp(&self) -> Millis {
        self.timestamp
    }

    /// The `suspicious_activity` sub-type, if any.
    pub fn suspicion(&self) -> Option<&str> {
        match self.kind {
            EventKind::SuspiciousActivity => self.get("type").and_then(Scalar::as_str),
            _ => None,
        }
    }
}
