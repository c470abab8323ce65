//! Website crawl capability
//!
//! Starting from the task's scope, visits pages of the same site breadth
//! first. Links found in `<nav>` and `<header>` elements are queued ahead of
//! links in the page body. The text of every visited page is collected and,
//! when a summarizer model is configured, condensed into a cited summary.

use crate::llm::LLMClient;
use crate::tools::registry::Capability;
use crate::tools::search::{format_hits, SearchHit};
use crate::tools::truncate_chars;
use crate::types::{AppError, CapabilityResult, CapabilityTask, Result};
use async_trait::async_trait;
use reqwest::Url;
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

const SUMMARY_INSTRUCTIONS: &str = "You are a website research assistant. Using the crawled pages \
below, write a summary of at least 3 paragraphs that answers the query. Put the URL of the page each \
fact comes from in brackets next to the fact. If nothing relevant was found, say so.";

/// Links and text extracted from one HTML page.
#[derive(Debug, Default, PartialEq)]
pub struct ParsedPage {
    pub title: String,
    pub text: String,
    pub nav_links: Vec<String>,
    pub body_links: Vec<String>,
}

pub struct SiteCrawlCapability {
    client: reqwest::Client,
    max_pages: usize,
    content_length_limit: usize,
    summarizer: Option<Arc<dyn LLMClient>>,
}

impl SiteCrawlCapability {
    pub fn new(max_pages: usize, content_length_limit: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("deep-research/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_pages: max_pages.max(1),
            content_length_limit,
            summarizer: None,
        })
    }

    /// Summarize crawled pages with the given model instead of returning them raw.
    pub fn with_summarizer(mut self, client: Arc<dyn LLMClient>) -> Self {
        self.summarizer = Some(client);
        self
    }

    async fn fetch(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url, "Failed to fetch page: {}", e);
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::debug!(url, status = %response.status(), "Skipping page");
            return None;
        }
        response.text().await.ok()
    }

    /// Breadth-first crawl from `start`, returning visited pages in visit order.
    pub async fn crawl(&self, start: &str) -> Result<Vec<SearchHit>> {
        let start_url = parse_start_url(start)?;
        let start = normalize_link(start_url);

        let mut queue: VecDeque<String> = VecDeque::from([start.clone()]);
        let mut next_level: VecDeque<String> = VecDeque::new();
        let mut seen: HashSet<String> = HashSet::from([start]);
        let mut pages = Vec::new();

        while let Some(current) = queue.pop_front() {
            if let Some(html) = self.fetch(&current).await {
                let parsed = match Url::parse(&current) {
                    Ok(url) => parse_page(&html, &url),
                    Err(_) => ParsedPage::default(),
                };

                // Navigation links stay on the current level, body links wait
                for link in parsed.nav_links {
                    if seen.len() < self.max_pages && seen.insert(link.clone()) {
                        queue.push_back(link);
                    }
                }
                for link in parsed.body_links {
                    if seen.len() < self.max_pages && seen.insert(link.clone()) {
                        next_level.push_back(link);
                    }
                }

                pages.push(SearchHit {
                    title: parsed.title,
                    url: current,
                    content: truncate_chars(&parsed.text, self.content_length_limit),
                });
            }

            if queue.is_empty() {
                std::mem::swap(&mut queue, &mut next_level);
            }
        }

        Ok(pages)
    }
}

fn parse_start_url(start: &str) -> Result<Url> {
    let start = start.trim();
    let with_scheme = if start.starts_with("http://") || start.starts_with("https://") {
        start.to_string()
    } else {
        format!("http://{}", start)
    };
    Url::parse(&with_scheme)
        .map_err(|e| AppError::InvalidInput(format!("Invalid starting URL '{}': {}", start, e)))
}

fn normalize_link(mut url: Url) -> String {
    url.set_fragment(None);
    url.as_str().trim_end_matches('/').to_string()
}

fn same_site(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

fn selector(css: &'static str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Extract the title, visible text and same-site links of a page.
pub fn parse_page(html: &str, page_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);
    let mut page = ParsedPage::default();

    if let Some(title) = selector("title") {
        if let Some(element) = document.select(&title).next() {
            page.title = element.text().collect::<String>().trim().to_string();
        }
    }

    if let Some(body) = selector("body") {
        let mut chunks = Vec::new();
        for root in document.select(&body) {
            for node in root.descendants() {
                let Some(text) = node.value().as_text() else {
                    continue;
                };
                let hidden = node
                    .parent()
                    .and_then(|parent| parent.value().as_element().map(|e| e.name().to_string()))
                    .map(|name| matches!(name.as_str(), "script" | "style" | "noscript"))
                    .unwrap_or(false);
                let text = text.trim();
                if !hidden && !text.is_empty() {
                    chunks.push(text.to_string());
                }
            }
        }
        page.text = chunks.join(" ");
    }

    let resolve = |href: &str| -> Option<String> {
        let link = page_url.join(href).ok()?;
        if !matches!(link.scheme(), "http" | "https") || !same_site(&link, page_url) {
            return None;
        }
        Some(normalize_link(link))
    };

    let mut nav_seen = HashSet::new();
    if let Some(nav) = selector("nav a[href], header a[href]") {
        for anchor in document.select(&nav) {
            if let Some(link) = anchor.value().attr("href").and_then(resolve) {
                if nav_seen.insert(link.clone()) {
                    page.nav_links.push(link);
                }
            }
        }
    }

    let mut body_seen = HashSet::new();
    if let Some(anchors) = selector("a[href]") {
        for anchor in document.select(&anchors) {
            if let Some(link) = anchor.value().attr("href").and_then(resolve) {
                if !nav_seen.contains(&link) && body_seen.insert(link.clone()) {
                    page.body_links.push(link);
                }
            }
        }
    }

    page
}

#[async_trait]
impl Capability for SiteCrawlCapability {
    fn name(&self) -> &str {
        "crawl_website"
    }

    fn description(&self) -> &str {
        "Crawl the pages of a specific website (given as scope) and summarize what they say about the query"
    }

    async fn execute(&self, task: &CapabilityTask) -> Result<CapabilityResult> {
        let start = task
            .scope
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                AppError::InvalidInput("crawl_website needs a website as scope".to_string())
            })?;

        let pages = self.crawl(start).await?;
        if pages.is_empty() {
            return Ok(CapabilityResult::failure(format!(
                "No pages could be fetched from {}",
                start
            )));
        }

        let sources: Vec<String> = pages.iter().map(|p| p.url.clone()).collect();
        let listing = format_hits(&pages);

        let text = match &self.summarizer {
            Some(client) => {
                let prompt = format!("QUERY: {}\n\nCRAWLED PAGES:\n{}", task.query, listing);
                client
                    .generate_with_system(SUMMARY_INSTRUCTIONS, &prompt)
                    .await?
            }
            None => listing,
        };

        Ok(CapabilityResult::new(text, sources))
    }
}
