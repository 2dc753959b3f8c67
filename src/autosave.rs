//! Debounced editor auto-save.
//!
//! Each content change restarts the quiet period; only the last content seen
//! before the editor goes quiet is sent. Failures are logged and dropped.

use crate::sink::{AutoSavePayload, RemoteSink};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default quiet period before content is saved.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(3);

pub struct AutoSaver {
    sink: Arc<dyn RemoteSink>,
    quiet_period: Duration,
    pending: Option<JoinHandle<()>>,
}

impl AutoSaver {
    pub fn new(sink: Arc<dyn RemoteSink>, quiet_period: Duration) -> Self {
        Self {
            sink,
            quiet_period,
            pending: None,
        }
    }

    /// Note an editor change.
    ///
    /// Cancels the save scheduled by the previous change. Nothing is scheduled
    /// when there is no question id or the code is blank. Must be called from
    /// within a tokio runtime.
    pub fn content_changed(&mut self, question_id: Option<&str>, code: &str) {
        self.cancel();

        let Some(question_id) = question_id.filter(|id| !id.is_empty()) else {
            return;
        };
        if code.trim().is_empty() {
            return;
        }

        let payload = AutoSavePayload {
            question_id: question_id.to_string(),
            code: code.to_string(),
        };
        let sink = Arc::clone(&self.sink);
        let quiet = tokio::time::sleep(self.quiet_period);
        self.pending = Some(tokio::spawn(async move {
            quiet.await;
            let question_id = payload.question_id.clone();
            match sink.save_code(payload).await {
                Ok(()) => tracing::debug!(%question_id, "code auto-saved"),
                Err(e) => tracing::warn!(%question_id, error = %e, "auto-save failed"),
            }
        }));
    }

    /// Drop a scheduled save.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    /// Whether a save is scheduled or running.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for AutoSaver {
    fn drop(&mut self) {
        self.cancel();
    }
}
