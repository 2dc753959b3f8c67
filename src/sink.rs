//! Remote event sink.
//!
//! The engine ships every event to a collector endpoint and auto-saves editor
//! content to a second one. Transport lives behind the [`RemoteSink`] trait so
//! hosts can plug in their own client; an HTTP implementation is available
//! with the `http` feature.

use crate::core::event::{Event, EventData, EventKind, Millis, Severity};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Base URL of the assessment server
    pub base_url: String,
    /// Path receiving one POST per event
    pub event_path: String,
    /// Path receiving debounced editor content
    pub autosave_path: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            event_path: "/api/proctoring-event".to_string(),
            autosave_path: "/api/auto-save".to_string(),
        }
    }
}

impl SinkConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Get the event endpoint URL.
    pub fn event_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.event_path)
    }

    /// Get the auto-save endpoint URL.
    pub fn autosave_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.autosave_path)
    }
}

/// Sink error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// Configuration error
    Config(String),
    /// Network/HTTP error
    Network(String),
    /// Server returned an error response
    Server { status: u16, message: String },
    /// JSON serialization error
    Serialization(String),
    /// No response within the dispatch timeout
    Timeout(Duration),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Config(msg) => write!(f, "Sink config error: {msg}"),
            SinkError::Network(msg) => write!(f, "Sink network error: {msg}"),
            SinkError::Server { status, message } => {
                write!(f, "Sink server error ({status}): {message}")
            }
            SinkError::Serialization(msg) => write!(f, "Sink serialization error: {msg}"),
            SinkError::Timeout(after) => write!(f, "Sink timed out after {after:?}"),
        }
    }
}

impl std::error::Error for SinkError {}

/// Body of one event delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    pub event_type: EventKind,
    pub event_data: EventData,
    pub severity: Severity,
    pub is_violation: bool,
    pub timestamp: Millis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment_id: Option<String>,
}

impl EventPayload {
    pub fn from_event(event: &Event, is_violation: bool, assessment_id: Option<String>) -> Self {
        Self {
            event_type: event.kind(),
            event_data: event.data().clone(),
            severity: event.severity(),
            is_violation,
            timestamp: event.timestamp(),
            assessment_id,
        }
    }
}

/// Body of one auto-save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSavePayload {
    pub question_id: String,
    pub code: String,
}

/// Boxed delivery future.
pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>>;

/// Remote collector for events and editor content.
pub trait RemoteSink: Send + Sync {
    fn send_event(&self, payload: EventPayload) -> SinkFuture<'_>;

    fn save_code(&self, payload: AutoSavePayload) -> SinkFuture<'_>;
}

/// Sink that only logs what it would have sent.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl RemoteSink for LogSink {
    fn send_event(&self, payload: EventPayload) -> SinkFuture<'_> {
        Box::pin(async move {
            let body = serde_json::to_string(&payload)
                .map_err(|e| SinkError::Serialization(e.to_string()))?;
            tracing::info!(target: "proctor::sink", %body, "proctoring event");
            Ok(())
        })
    }

    fn save_code(&self, payload: AutoSavePayload) -> SinkFuture<'_> {
        Box::pin(async move {
            tracing::info!(
                target: "proctor::sink",
                question_id = %payload.question_id,
                bytes = payload.code.len(),
                "auto-save"
            );
            Ok(())
        })
    }
}

/// HTTP sink posting JSON bodies.
#[cfg(feature = "http")]
pub struct HttpSink {
    config: SinkConfig,
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpSink {
    /// Create a new HTTP sink. `timeout` bounds each request.
    pub fn new(config: SinkConfig, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    async fn post<T: Serialize + Sync>(&self, url: String, body: &T) -> Result<(), SinkError> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| SinkError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SinkError::Server {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

#[cfg(feature = "http")]
impl RemoteSink for HttpSink {
    fn send_event(&self, payload: EventPayload) -> SinkFuture<'_> {
        Box::pin(async move { self.post(self.config.event_url(), &payload).await })
    }

    fn save_code(&self, payload: AutoSavePayload) -> SinkFuture<'_> {
        Box::pin(async move { self.post(self.config.autosave_url(), &payload).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::Suspicion;

    #[test]
    fn test_sink_config_urls() {
        let config = SinkConfig::new("http://127.0.0.1:8080/");
        assert_eq!(config.event_url(), "http://127.0.0.1:8080/api/proctoring-event");
        assert_eq!(config.autosave_url(), "http://127.0.0.1:8080/api/auto-save");
    }

    #[test]
    fn test_payload_shape() {
        let event = Event::suspicious(Suspicion::DevtoolsDetected, Severity::High, 900);
        let payload = EventPayload::from_event(&event, true, None);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["event_type"], "suspicious_activity");
        assert_eq!(json["severity"], "high");
        assert_eq!(json["event_data"]["type"], "devtools_detected");
        assert_eq!(json["is_violation"], true);
        assert!(json.get("assessment_id").is_none());

        let payload = EventPayload::from_event(&event, true, Some("A-17".into()));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["assessment_id"], "A-17");
    }

    #[test]
    fn test_sink_error_display() {
        let err = SinkError::Server {
            status: 503,
            message: "unavailable".into(),
        };
        assert_eq!(err.to_string(), "Sink server error (503): unavailable");
        assert!(SinkError::Timeout(Duration::from_secs(10))
            .to_string()
            .contains("10s"));
    }

    #[tokio::test]
    async fn test_log_sink_accepts_everything() {
        let event = Event::new(EventKind::WindowBlur, Severity::Medium, 1);
        let sink = LogSink;
        assert!(sink
            .send_event(EventPayload::from_event(&event, false, None))
            .await
            .is_ok());
        assert!(sink
            .save_code(AutoSavePayload {
                question_id: "q1".into(),
                code: "fn main() {}".into(),
            })
            .await
            .is_ok());
    }
}
