//! Information-Gathering Capabilities
//!
//! Capabilities are the only way the research loop touches the outside world.
//! Each one receives a [`CapabilityTask`](crate::types::CapabilityTask) and
//! produces a [`CapabilityResult`](crate::types::CapabilityResult) with
//! summary text and the URLs that back it.
//!
//! # Module Structure
//!
//! - [`registry`](crate::tools::registry) - Name to capability lookup
//! - [`search`](crate::tools::search) - Web search (DuckDuckGo via daedra)
//! - [`crawl`](crate::tools::crawl) - Same-domain website crawl
//!
//! # Registry
//!
//! ```ignore
//! let mut registry = CapabilityRegistry::new();
//! registry.register(Arc::new(WebSearchCapability::new(SearchOptions::default())));
//! let result = registry.execute(&CapabilityTask::new("web_search", "tokio runtime")).await;
//! ```
//!
//! The registry never returns an error: unknown capabilities and failed
//! executions come back as results whose text explains the failure.

/// Breadth-first website crawler.
pub mod crawl;
/// Capability registry for managing available capabilities.
pub mod registry;
/// Web search capability using DuckDuckGo.
pub mod search;

/// Keep at most `limit` characters of `text`.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
