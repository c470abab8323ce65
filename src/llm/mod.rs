//! LLM Provider Clients and Abstractions
//!
//! This module provides a unified interface for the language models that back
//! the decision collaborator. Provider-specific code lives behind the
//! [`LLMClient`] trait so the research core can run against any of them.
//!
//! # Supported Providers
//!
//! - OpenAI-compatible `/chat/completions` endpoints (always available)
//! - `ollama` - Local Ollama server (Cargo feature, on by default)
//!
//! # Example
//!
//! ```ignore
//! use deep_research::llm::Provider;
//!
//! let client = Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3.2".to_string(),
//! }
//! .create_client()?;
//!
//! let response = client.generate("What is 2+2?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;
/// OpenAI-compatible client built on `async-openai`.
pub mod openai;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use client::{LLMClient, Provider};
