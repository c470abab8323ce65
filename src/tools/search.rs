//! Web search capability using daedra
//!
//! Searches DuckDuckGo through the daedra crate, fetches the top result
//! pages as markdown and, when a summarizer model is configured, condenses
//! them into a short cited summary.

use crate::llm::LLMClient;
use crate::tools::registry::Capability;
use crate::tools::truncate_chars;
use crate::types::{AppError, CapabilityResult, CapabilityTask, Result};
use async_trait::async_trait;
use std::sync::Arc;

const SUMMARY_INSTRUCTIONS: &str = "You are a research assistant. Summarize the search results below \
in 2-3 paragraphs, keeping only facts relevant to the query. Put the URL of the page each fact \
comes from in brackets next to the fact, and do not invent sources.";

/// A fetched search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
}

/// Options for the web search capability.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub max_results: usize,
    pub content_length_limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            content_length_limit: 10_000,
        }
    }
}

pub struct WebSearchCapability {
    options: SearchOptions,
    summarizer: Option<Arc<dyn LLMClient>>,
}

impl WebSearchCapability {
    pub fn new(options: SearchOptions) -> Self {
        Self {
            options,
            summarizer: None,
        }
    }

    /// Summarize fetched pages with the given model instead of returning them raw.
    pub fn with_summarizer(mut self, client: Arc<dyn LLMClient>) -> Self {
        self.summarizer = Some(client);
        self
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let search_args = daedra::SearchArgs {
            query: query.to_string(),
            options: Some(daedra::SearchOptions {
                num_results: self.options.max_results,
                ..Default::default()
            }),
        };

        let response = daedra::tools::search::perform_search(&search_args)
            .await
            .map_err(|e| AppError::Capability(format!("Search failed: {}", e)))?;

        let mut hits = Vec::new();
        for result in response.data.iter().take(self.options.max_results) {
            let fetch_args = daedra::VisitPageArgs {
                url: result.url.clone(),
                include_images: false,
                selector: None,
            };

            // Fall back to the search snippet when a page cannot be fetched
            let content = match daedra::tools::fetch::fetch_page(&fetch_args).await {
                Ok(page) => page.content,
                Err(e) => {
                    tracing::debug!(url = %result.url, "Failed to fetch page: {}", e);
                    result.description.clone()
                }
            };

            hits.push(SearchHit {
                title: result.title.clone(),
                url: result.url.clone(),
                content: truncate_chars(&content, self.options.content_length_limit),
            });
        }

        Ok(hits)
    }
}

/// Numbered markdown listing of hits, the numbering matching `sources`.
pub fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("[{}] {}\nURL: {}\n{}", i + 1, hit.title, hit.url, hit.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Capability for WebSearchCapability {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for a short query and summarize the most relevant pages"
    }

    async fn execute(&self, task: &CapabilityTask) -> Result<CapabilityResult> {
        if task.query.trim().is_empty() {
            return Err(AppError::InvalidInput("Missing search query".to_string()));
        }

        let query = match &task.scope {
            Some(scope) => format!("{} site:{}", task.query, scope),
            None => task.query.clone(),
        };

        let hits = self.search(&query).await?;
        if hits.is_empty() {
            return Ok(CapabilityResult::failure(format!(
                "No search results found for '{}'",
                query
            )));
        }

        let sources: Vec<String> = hits.iter().map(|h| h.url.clone()).collect();
        let listing = format_hits(&hits);

        let text = match &self.summarizer {
            Some(client) => {
                let prompt = format!("QUERY: {}\n\nSEARCH RESULTS:\n{}", task.query, listing);
                client
                    .generate_with_system(SUMMARY_INSTRUCTIONS, &prompt)
                    .await?
            }
            None => listing,
        };

        Ok(CapabilityResult::new(text, sources))
    }
}
