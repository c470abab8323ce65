use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ============= Plan Types =============

/// A single section of the report outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SectionSpec {
    /// Section title as it appears in the table of contents
    pub title: String,
    /// The question the section's research loop must answer
    pub key_question: String,
}

/// Output of the planning stage. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReportPlan {
    /// Short supporting context shared read-only with every section
    #[serde(default)]
    pub background_context: String,
    /// Ordered list of sections
    pub report_outline: Vec<SectionSpec>,
    /// Report title used as the top-level heading
    pub report_title: String,
}

// ============= Research Loop Types =============

/// Result of a knowledge-gap evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GapEvaluation {
    /// Whether the findings are complete enough to end the loop
    pub research_complete: bool,
    /// Up to three outstanding gaps, most important first
    #[serde(default)]
    pub outstanding_gaps: Vec<String>,
}

/// A single information-gathering task chosen by tool selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CapabilityTask {
    /// Registry name of the capability to run (e.g. `web_search`)
    #[serde(alias = "agent")]
    pub capability: String,
    /// Short query for the capability
    pub query: String,
    /// Optional website or domain that scopes the task
    #[serde(default, alias = "entity_website", skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// The knowledge gap this task addresses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<String>,
}

impl CapabilityTask {
    /// Create a task without scope or gap.
    pub fn new(capability: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            query: query.into(),
            scope: None,
            gap: None,
        }
    }

    /// Attach a scope (website/domain).
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Attach the gap being addressed.
    pub fn with_gap(mut self, gap: impl Into<String>) -> Self {
        self.gap = Some(gap.into());
        self
    }
}

impl fmt::Display for CapabilityTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Capability] {} [Query] {} [Scope] {}",
            self.capability,
            self.query,
            self.scope.as_deref().unwrap_or("null")
        )
    }
}

/// Output of a capability. Failures are carried in `text`, never thrown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CapabilityResult {
    /// Summary text or a human-readable error
    pub text: String,
    /// URLs backing the text; empty on failure
    #[serde(default)]
    pub sources: Vec<String>,
}

impl CapabilityResult {
    /// A successful result.
    pub fn new(text: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            text: text.into(),
            sources,
        }
    }

    /// A failed result with no sources.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            sources: Vec::new(),
        }
    }
}

// ============= Report Types =============

/// A polished section with citations local to that section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDraft {
    /// Section title
    pub title: String,
    /// Markdown body with `[n]` citation markers
    pub markdown: String,
    /// Local reference list, one `"[n] url"` string per entry
    pub references: Vec<String>,
}

/// Structured output of the section-writing decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WrittenSection {
    /// Final markdown for the section
    pub next_section_markdown: String,
    /// References as `"[n] url"` strings
    #[serde(default)]
    pub references: Vec<String>,
}

/// Which pipeline a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchMode {
    /// Plan, research every section concurrently, assemble a cited report
    #[default]
    Deep,
    /// Single convergence loop over the query
    Simple,
}

/// Bounds applied to every convergence loop of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopBounds {
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Wall-clock budget checked at the top of each iteration
    pub max_time: Duration,
}

impl Default for LoopBounds {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            max_time: Duration::from_secs(10 * 60),
        }
    }
}

/// What to research and how.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// The research query
    pub query: String,
    /// Pipeline selector
    pub mode: ResearchMode,
    /// Loop bounds
    pub bounds: LoopBounds,
    /// Desired length of the output, e.g. "5 pages" (simple mode)
    pub output_length: Option<String>,
    /// Extra instructions for the final output (simple mode)
    pub output_instructions: Option<String>,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Decision error: {0}")]
    Decision(String),

    #[error("Capability error: {0}")]
    Capability(String),

    #[error("Citation error: {0}")]
    Citation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
