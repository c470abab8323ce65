//! # deep-research
//!
//! Iterative web research that turns a single query into a cited Markdown
//! report.
//!
//! ## Overview
//!
//! A run goes through these stages:
//!
//! 1. **Plan** - the reasoning model drafts a report title, background context
//!    and an outline of sections, each with a key question.
//! 2. **Research** - every section gets its own bounded convergence loop.
//!    The loop reflects on what it has learned, names the next knowledge gap,
//!    picks capabilities (web search, site crawl) to close it and runs them
//!    concurrently. Sections are researched in parallel.
//! 3. **Write** - each section is rewritten against the report drafted so far
//!    and its local citations are renumbered into one global reference list.
//!
//! Simple mode skips planning and runs one loop over the whole query.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use deep_research::decision::{LlmDecider, ModelTiers};
//! use deep_research::tools::search::{SearchOptions, WebSearchCapability};
//! use deep_research::{CapabilityRegistry, ProgressPublisher, Provider, WorkflowCoordinator};
//! use std::sync::Arc;
//!
//! let client = Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3.2".to_string(),
//! }
//! .create_client()?;
//!
//! let mut registry = CapabilityRegistry::new();
//! registry.register(Arc::new(WebSearchCapability::new(SearchOptions::default())));
//!
//! let decider = LlmDecider::new(ModelTiers::single(client), registry.infos(), 3);
//! let coordinator = WorkflowCoordinator::new(
//!     Arc::new(decider),
//!     Arc::new(registry),
//!     ProgressPublisher::new(),
//!     Default::default(),
//! );
//! let report = coordinator.run(options).await?;
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//!
//! OpenAI-compatible endpoints are always available.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line parsing and terminal output.
pub mod cli;
/// Decisions delegated to language models.
pub mod decision;
/// LLM provider clients and abstractions.
pub mod llm;
/// Per-run progress events.
pub mod progress;
/// Citation reconciliation and report assembly.
pub mod report;
/// Research loops and workflow coordination.
pub mod research;
/// Research capabilities (web search, site crawl).
pub mod tools;
/// Core types (plans, tasks, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use decision::{Decider, LlmDecider, ModelTiers};
pub use llm::{LLMClient, Provider};
pub use progress::{EventType, ProgressEvent, ProgressPublisher};
pub use research::{WorkflowCoordinator, WorkflowSettings};
pub use tools::registry::{Capability, CapabilityRegistry};
pub use types::{AppError, Result, RunOptions};
pub use utils::toml_config::ResearchConfig;
