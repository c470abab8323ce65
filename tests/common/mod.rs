//! Shared test doubles for the research integration tests.
//!
//! [`ScriptedDecider`] answers every decision from a closure and records the
//! contexts it was given. The capabilities below stand in for web search and
//! crawling with fixed text, delays or faults.

#![allow(dead_code)]

use async_trait::async_trait;
use deep_research::decision::{Decider, DecisionFailure, DecisionKind, DecisionPayload, ParseFailure};
use deep_research::progress::{EventType, ProgressEvent};
use deep_research::tools::registry::Capability;
use deep_research::types::{AppError, CapabilityResult, CapabilityTask, GapEvaluation, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

type Responder =
    dyn Fn(DecisionKind, &str) -> std::result::Result<DecisionPayload, DecisionFailure> + Send + Sync;
type DelayFn = dyn Fn(DecisionKind, &str) -> Duration + Send + Sync;

/// Decider driven by a closure, with an optional per-call delay.
pub struct ScriptedDecider {
    respond: Box<Responder>,
    delay: Option<Box<DelayFn>>,
    calls: Mutex<Vec<(DecisionKind, String)>>,
}

impl ScriptedDecider {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(DecisionKind, &str) -> std::result::Result<DecisionPayload, DecisionFailure>
            + Send
            + Sync
            + 'static,
    {
        Self {
            respond: Box::new(respond),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering, per kind and context.
    pub fn with_delay<F>(mut self, delay: F) -> Self
    where
        F: Fn(DecisionKind, &str) -> Duration + Send + Sync + 'static,
    {
        self.delay = Some(Box::new(delay));
        self
    }

    /// Every (kind, context) pair seen so far, in call order.
    pub fn calls(&self) -> Vec<(DecisionKind, String)> {
        self.calls.lock().clone()
    }

    pub fn count(&self, kind: DecisionKind) -> usize {
        self.calls.lock().iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn contexts(&self, kind: DecisionKind) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, c)| c.clone())
            .collect()
    }
}

#[async_trait]
impl Decider for ScriptedDecider {
    async fn decide(
        &self,
        context: &str,
        kind: DecisionKind,
    ) -> std::result::Result<DecisionPayload, DecisionFailure> {
        self.calls.lock().push((kind, context.to_string()));
        if let Some(delay) = &self.delay {
            let wait = delay(kind, context);
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }
        (self.respond)(kind, context)
    }
}

pub fn reflection(text: &str) -> std::result::Result<DecisionPayload, DecisionFailure> {
    Ok(DecisionPayload::Reflection(text.to_string()))
}

pub fn complete() -> std::result::Result<DecisionPayload, DecisionFailure> {
    Ok(DecisionPayload::Gaps(GapEvaluation {
        research_complete: true,
        outstanding_gaps: Vec::new(),
    }))
}

pub fn incomplete(gap: &str) -> std::result::Result<DecisionPayload, DecisionFailure> {
    Ok(DecisionPayload::Gaps(GapEvaluation {
        research_complete: false,
        outstanding_gaps: vec![gap.to_string()],
    }))
}

pub fn tasks(tasks: Vec<CapabilityTask>) -> std::result::Result<DecisionPayload, DecisionFailure> {
    Ok(DecisionPayload::Tasks(tasks))
}

pub fn synthesis(text: &str) -> std::result::Result<DecisionPayload, DecisionFailure> {
    Ok(DecisionPayload::Synthesis(text.to_string()))
}

pub fn parse_failure(kind: DecisionKind) -> DecisionFailure {
    DecisionFailure::Parse {
        kind,
        source: ParseFailure::new("no JSON object found", "I think the research is fine"),
    }
}

pub fn unavailable(kind: DecisionKind) -> DecisionFailure {
    DecisionFailure::Unavailable {
        kind,
        message: "model offline".to_string(),
    }
}

/// Returns `"{name}: {query}"` with the query as its only source.
pub struct EchoCapability {
    pub name: &'static str,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl EchoCapability {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Capability for EchoCapability {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Echoes the query back"
    }

    async fn execute(&self, task: &CapabilityTask) -> Result<CapabilityResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(CapabilityResult::new(
            format!("{}: {}", self.name, task.query),
            vec![format!("https://{}.test/{}", self.name, task.query.replace(' ', "-"))],
        ))
    }
}

/// Always fails with a capability error.
pub struct FailingCapability;

#[async_trait]
impl Capability for FailingCapability {
    fn name(&self) -> &str {
        "failing"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    async fn execute(&self, _task: &CapabilityTask) -> Result<CapabilityResult> {
        Err(AppError::Capability("upstream returned 503".to_string()))
    }
}

/// Panics on every call.
pub struct PanickingCapability;

#[async_trait]
impl Capability for PanickingCapability {
    fn name(&self) -> &str {
        "panicking"
    }

    fn description(&self) -> &str {
        "Panics"
    }

    async fn execute(&self, _task: &CapabilityTask) -> Result<CapabilityResult> {
        panic!("capability exploded");
    }
}

/// Collect every event until the publisher closes.
pub async fn drain(mut events: mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut collected = Vec::new();
    while let Some(event) = events.recv().await {
        collected.push(event);
    }
    collected
}

/// Collect the events already delivered, without waiting for close.
pub fn drain_now(events: &mut mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}

pub fn of_type(events: &[ProgressEvent], event_type: EventType) -> Vec<&ProgressEvent> {
    events.iter().filter(|e| e.event_type == event_type).collect()
}
