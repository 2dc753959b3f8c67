//! Session proctoring policy.
//!
//! A [`Policy`] is supplied by the assessment and stays read-only for the
//! session. Every field is optional on the wire; anything left out falls back
//! to the most restrictive value (allow flags off).

use crate::core::event::Severity;
use crate::signals::types::KeyStroke;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// A blocked key combination.
///
/// Unset modifier constraints match either modifier state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRule {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrl: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<bool>,
    #[serde(default = "most_restrictive_severity")]
    pub severity: Severity,
}

fn most_restrictive_severity() -> Severity {
    Severity::High
}

impl KeyRule {
    pub fn new(key: impl Into<String>, severity: Severity) -> Self {
        Self {
            key: key.into(),
            ctrl: None,
            shift: None,
            alt: None,
            severity,
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = Some(true);
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = Some(true);
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = Some(true);
        self
    }

    /// Check a key stroke against this rule.
    pub fn matches(&self, stroke: &KeyStroke) -> bool {
        fn constraint(rule: Option<bool>, actual: bool) -> bool {
            rule.map_or(true, |expected| expected == actual)
        }

        stroke.key == self.key
            && constraint(self.ctrl, stroke.ctrl)
            && constraint(self.shift, stroke.shift)
            && constraint(self.alt, stroke.alt)
    }

    /// Human-readable label, e.g. `Ctrl+Shift+I`.
    pub fn label(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if self.ctrl == Some(true) {
            parts.push("Ctrl");
        }
        if self.shift == Some(true) {
            parts.push("Shift");
        }
        if self.alt == Some(true) {
            parts.push("Alt");
        }
        parts.push(&self.key);
        parts.join("+")
    }
}

/// Key table applied when the assessment does not supply its own.
pub fn default_key_rules() -> Vec<KeyRule> {
    vec![
        KeyRule::new("F12", Severity::High),
        KeyRule::new("F5", Severity::Medium),
        KeyRule::new("I", Severity::High).ctrl().shift(),
        KeyRule::new("C", Severity::High).ctrl().shift(),
        KeyRule::new("J", Severity::High).ctrl().shift(),
        KeyRule::new("U", Severity::High).ctrl(),
        // Save is allowed but logged
        KeyRule::new("S", Severity::Low).ctrl(),
        KeyRule::new("Tab", Severity::High).alt(),
    ]
}

/// Proctoring policy for one assessment session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub allow_copy_paste: bool,
    #[serde(alias = "allow_tab_switching")]
    pub allow_tab_switch: bool,
    /// Blocked key combinations, first match wins
    pub key_rules: Vec<KeyRule>,
    pub mouse_speed_threshold_px_per_sec: f64,
    pub inactivity_threshold_ms: u64,
    /// Violations that trigger auto-submission
    pub violation_limit: u32,
    /// Delay between the final warning and auto-submission
    pub grace_delay_ms: u64,
    /// Outer/inner viewport gap that indicates a docked tool pane
    pub viewport_gap_threshold_px: u32,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allow_copy_paste: false,
            allow_tab_switch: false,
            key_rules: default_key_rules(),
            mouse_speed_threshold_px_per_sec: 2000.0,
            inactivity_threshold_ms: 5 * 60 * 1000,
            violation_limit: 5,
            grace_delay_ms: 3000,
            viewport_gap_threshold_px: 160,
        }
    }
}

impl Policy {
    /// Parse a policy from JSON, filling absent fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let policy: Policy =
            serde_json::from_str(json).map_err(|e| PolicyError::Parse(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load a policy file.
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| PolicyError::Io(e.to_string()))?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if !self.mouse_speed_threshold_px_per_sec.is_finite()
            || self.mouse_speed_threshold_px_per_sec < 0.0
        {
            return Err(PolicyError::Invalid(format!(
                "mouse_speed_threshold_px_per_sec must be a non-negative number, got {}",
                self.mouse_speed_threshold_px_per_sec
            )));
        }
        if self.violation_limit == 0 {
            return Err(PolicyError::Invalid(
                "violation_limit must be at least 1".into(),
            ));
        }
        if let Some(rule) = self.key_rules.iter().find(|r| r.key.is_empty()) {
            return Err(PolicyError::Invalid(format!(
                "key rule with severity {} has an empty key",
                rule.severity
            )));
        }
        Ok(())
    }

    /// First key rule matching `stroke`, in policy order.
    pub fn match_key(&self, stroke: &KeyStroke) -> Option<&KeyRule> {
        self.key_rules.iter().find(|rule| rule.matches(stroke))
    }

    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms)
    }
}

/// Policy errors.
#[derive(Debug)]
pub enum PolicyError {
    Io(String),
    Parse(String),
    Invalid(String),
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyError::Io(e) => write!(f, "IO error: {e}"),
            PolicyError::Parse(e) => write!(f, "Parse error: {e}"),
            PolicyError::Invalid(e) => write!(f, "Invalid policy: {e}"),
        }
    }
}

impl std::error::Error for PolicyError {}
