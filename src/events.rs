// events.rs — progress events for the CLI spinner and the SSE bridge.
//
// Purely observational: emitting never blocks or fails the pipeline, and
// having no subscribers is fine.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Started,
    Completed,
    Failed,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Machine-readable step id (`render`, `module`, `manifest`, ...).
    pub step: String,
    /// Human-readable label for display.
    pub label: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Fan-out of pipeline progress to all listeners.
#[derive(Clone)]
pub struct ProgressBroadcaster {
    tx: broadcast::Sender<ProgressEvent>,
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    pub fn emit(&self, step: &str, label: &str, status: StepStatus, detail: Option<String>) {
        // Ignore errors — no subscribers is fine
        let _ = self.tx.send(ProgressEvent {
            step: step.to_string(),
            label: label.to_string(),
            status,
            detail,
        });
    }

    pub fn started(&self, step: &str, label: &str) {
        self.emit(step, label, StepStatus::Started, None);
    }

    pub fn completed(&self, step: &str, label: &str) {
        self.emit(step, label, StepStatus::Completed, None);
    }

    pub fn failed(&self, step: &str, label: &str, detail: String) {
        self.emit(step, label, StepStatus::Failed, Some(detail));
    }

    pub fn warning(&self, step: &str, label: &str, detail: String) {
        self.emit(step, label, StepStatus::Warning, Some(detail));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }
}
