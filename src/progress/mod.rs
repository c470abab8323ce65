//! Per-run progress events
//!
//! A [`ProgressPublisher`] is created for every research run and cloned into
//! each component that reports progress. Subscribers receive events in
//! emission order through their own unbounded channel, so a slow or absent
//! subscriber never stalls research. Events emitted before a subscriber
//! registers are not replayed.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Kind of progress event. Serialized in kebab-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    PlanStart,
    PlanSection,
    PlanEnd,
    ResearchStart,
    IterationStart,
    Thought,
    Task,
    Action,
    ToolDispatchProgress,
    ToolError,
    Findings,
    SectionComplete,
    ReportDraft,
    ReportComplete,
    Error,
    Info,
}

impl EventType {
    /// Wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PlanStart => "plan-start",
            EventType::PlanSection => "plan-section",
            EventType::PlanEnd => "plan-end",
            EventType::ResearchStart => "research-start",
            EventType::IterationStart => "iteration-start",
            EventType::Thought => "thought",
            EventType::Task => "task",
            EventType::Action => "action",
            EventType::ToolDispatchProgress => "tool-dispatch-progress",
            EventType::ToolError => "tool-error",
            EventType::Findings => "findings",
            EventType::SectionComplete => "section-complete",
            EventType::ReportDraft => "report-draft",
            EventType::ReportComplete => "report-complete",
            EventType::Error => "error",
            EventType::Info => "info",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single progress notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub event_type: EventType,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
}

/// Append-only event channel for one research run.
///
/// Cloning is cheap; all clones share the subscriber list and correlation id.
#[derive(Clone)]
pub struct ProgressPublisher {
    correlation_id: Uuid,
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<ProgressEvent>>>>,
}

impl Default for ProgressPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressPublisher {
    /// Create a publisher with a fresh correlation id.
    pub fn new() -> Self {
        Self::with_correlation_id(Uuid::new_v4())
    }

    /// Create a publisher for an existing correlation id.
    pub fn with_correlation_id(correlation_id: Uuid) -> Self {
        Self {
            correlation_id,
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Register a subscriber. Only events published after this call are
    /// delivered.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ProgressEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    /// Publish an event. Never blocks; closed subscribers are pruned.
    pub fn publish(&self, event_type: EventType, message: impl Into<String>) {
        let event = ProgressEvent {
            event_type,
            message: message.into(),
            timestamp: Utc::now(),
            correlation_id: self.correlation_id,
        };

        tracing::debug!(
            correlation_id = %self.correlation_id,
            event = %event_type,
            "{}",
            event.message
        );

        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Drop every subscriber sender, ending their streams. Called when the
    /// run completes.
    pub fn close(&self) {
        self.subscribers.lock().clear();
    }
}
