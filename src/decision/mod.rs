//! Decision Collaborator
//!
//! Everything that requires judgement (the report plan, whether research is
//! complete, which capabilities to call, prose) is delegated to a
//! [`Decider`]. The research core treats it as a black box: it sends a
//! context string and a [`DecisionKind`] and gets back a typed
//! [`DecisionPayload`] or a [`DecisionFailure`].
//!
//! [`DecisionFailure::Parse`] is always recoverable from the caller's point
//! of view; see the convergence loop for the fallbacks it applies.
//!
//! The typed helpers (`decide_plan`, `decide_gaps`, ...) unwrap the payload
//! variant that matches the requested kind.

/// LLM-backed decider.
pub mod llm;
/// Pure output parsers.
pub mod parse;
/// Instructions sent to the model for each decision kind.
pub mod prompts;

pub use llm::{LlmDecider, ModelTiers};
pub use parse::{OutputParser, ParseFailure};

use crate::types::{CapabilityTask, GapEvaluation, ReportPlan, WrittenSection};
use async_trait::async_trait;
use std::fmt;

/// The kinds of decision the core asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionKind {
    /// Report outline and background context
    Plan,
    /// Free-text reflection over the research transcript
    Reflection,
    /// Completeness check and outstanding gaps
    GapEvaluation,
    /// Capability tasks for the active gap
    ToolSelection,
    /// Final prose over all findings of a loop
    Synthesis,
    /// Polished section with local references
    SectionWrite,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Plan => "plan",
            DecisionKind::Reflection => "reflection",
            DecisionKind::GapEvaluation => "gap-evaluation",
            DecisionKind::ToolSelection => "tool-selection",
            DecisionKind::Synthesis => "synthesis",
            DecisionKind::SectionWrite => "section-write",
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed result of a decision.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionPayload {
    Plan(ReportPlan),
    Reflection(String),
    Gaps(GapEvaluation),
    Tasks(Vec<CapabilityTask>),
    Synthesis(String),
    Section(WrittenSection),
}

impl DecisionPayload {
    /// The kind this payload answers.
    pub fn kind(&self) -> DecisionKind {
        match self {
            DecisionPayload::Plan(_) => DecisionKind::Plan,
            DecisionPayload::Reflection(_) => DecisionKind::Reflection,
            DecisionPayload::Gaps(_) => DecisionKind::GapEvaluation,
            DecisionPayload::Tasks(_) => DecisionKind::ToolSelection,
            DecisionPayload::Synthesis(_) => DecisionKind::Synthesis,
            DecisionPayload::Section(_) => DecisionKind::SectionWrite,
        }
    }
}

/// Why a decision could not be produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecisionFailure {
    /// The collaborator answered, but not in the expected shape
    #[error("could not parse {kind} decision: {source}")]
    Parse {
        kind: DecisionKind,
        #[source]
        source: ParseFailure,
    },

    /// The collaborator could not be reached or refused
    #[error("{kind} decision unavailable: {message}")]
    Unavailable { kind: DecisionKind, message: String },

    /// The collaborator answered a different kind than was asked
    #[error("expected a {expected} decision, got {actual}")]
    UnexpectedPayload {
        expected: DecisionKind,
        actual: DecisionKind,
    },
}

impl DecisionFailure {
    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            DecisionFailure::Parse { .. } | DecisionFailure::UnexpectedPayload { .. }
        )
    }
}

impl From<DecisionFailure> for crate::types::AppError {
    fn from(failure: DecisionFailure) -> Self {
        crate::types::AppError::Decision(failure.to_string())
    }
}

/// Opaque decision interface.
#[async_trait]
pub trait Decider: Send + Sync {
    /// Produce a decision of `kind` from `context`.
    async fn decide(
        &self,
        context: &str,
        kind: DecisionKind,
    ) -> Result<DecisionPayload, DecisionFailure>;
}

fn unexpected(expected: DecisionKind, payload: &DecisionPayload) -> DecisionFailure {
    DecisionFailure::UnexpectedPayload {
        expected,
        actual: payload.kind(),
    }
}

pub async fn decide_plan(
    decider: &dyn Decider,
    context: &str,
) -> Result<ReportPlan, DecisionFailure> {
    match decider.decide(context, DecisionKind::Plan).await? {
        DecisionPayload::Plan(plan) => Ok(plan),
        other => Err(unexpected(DecisionKind::Plan, &other)),
    }
}

pub async fn decide_reflection(
    decider: &dyn Decider,
    context: &str,
) -> Result<String, DecisionFailure> {
    match decider.decide(context, DecisionKind::Reflection).await? {
        DecisionPayload::Reflection(text) => Ok(text),
        other => Err(unexpected(DecisionKind::Reflection, &other)),
    }
}

pub async fn decide_gaps(
    decider: &dyn Decider,
    context: &str,
) -> Result<GapEvaluation, DecisionFailure> {
    match decider.decide(context, DecisionKind::GapEvaluation).await? {
        DecisionPayload::Gaps(evaluation) => Ok(evaluation),
        other => Err(unexpected(DecisionKind::GapEvaluation, &other)),
    }
}

pub async fn decide_tasks(
    decider: &dyn Decider,
    context: &str,
) -> Result<Vec<CapabilityTask>, DecisionFailure> {
    match decider.decide(context, DecisionKind::ToolSelection).await? {
        DecisionPayload::Tasks(tasks) => Ok(tasks),
        other => Err(unexpected(DecisionKind::ToolSelection, &other)),
    }
}

pub async fn decide_synthesis(
    decider: &dyn Decider,
    context: &str,
) -> Result<String, DecisionFailure> {
    match decider.decide(context, DecisionKind::Synthesis).await? {
        DecisionPayload::Synthesis(text) => Ok(text),
        other => Err(unexpected(DecisionKind::Synthesis, &other)),
    }
}

pub async fn decide_section(
    decider: &dyn Decider,
    context: &str,
) -> Result<WrittenSection, DecisionFailure> {
    match decider.decide(context, DecisionKind::SectionWrite).await? {
        DecisionPayload::Section(section) => Ok(section),
        other => Err(unexpected(DecisionKind::SectionWrite, &other)),
    }
}
