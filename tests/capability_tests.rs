//! Capability tests against a mocked website
//!
//! The crawler is pointed at a wiremock server serving a tiny site.

use async_trait::async_trait;
use deep_research::llm::LLMClient;
use deep_research::tools::crawl::SiteCrawlCapability;
use deep_research::tools::registry::{Capability, CapabilityRegistry};
use deep_research::types::{AppError, CapabilityTask, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============= Helper Functions =============

fn html(title: &str, nav: &[&str], body: &[&str], text: &str) -> String {
    let anchors = |links: &[&str]| {
        links
            .iter()
            .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
            .collect::<String>()
    };
    format!(
        "<html><head><title>{}</title></head><body><nav>{}</nav><p>{}</p>{}</body></html>",
        title,
        anchors(nav),
        text,
        anchors(body)
    )
}

async fn serve(server: &MockServer, route: &str, page: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(page),
        )
        .mount(server)
        .await;
}

/// Home links /about from its nav, /deep and /missing from its body;
/// /about links /team from its body. /missing is not served.
async fn site() -> MockServer {
    let server = MockServer::start().await;
    serve(
        &server,
        "/",
        html("Home", &["/about"], &["/deep", "/missing", "https://elsewhere.test/"], "Welcome home."),
    )
    .await;
    serve(&server, "/about", html("About", &[], &["/team", "/"], "About us.")).await;
    serve(&server, "/deep", html("Deep", &[], &[], "Deep content.")).await;
    serve(&server, "/team", html("Team", &[], &[], "The team.")).await;
    server
}

struct RecordingSummarizer {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl LLMClient for RecordingSummarizer {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        Ok("Summary".to_string())
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        Ok("The team is small [1].".to_string())
    }

    fn model_name(&self) -> &str {
        "recording"
    }
}

// ============= Crawl Tests =============

#[tokio::test]
async fn test_crawl_visits_nav_links_before_body_links() {
    let server = site().await;
    let crawler = SiteCrawlCapability::new(10, 1_000).unwrap();

    let pages = crawler.crawl(&server.uri()).await.unwrap();
    let urls: Vec<String> = pages.iter().map(|p| p.url.clone()).collect();

    assert_eq!(
        urls,
        vec![
            server.uri(),
            format!("{}/about", server.uri()),
            format!("{}/deep", server.uri()),
            format!("{}/team", server.uri()),
        ]
    );
    assert_eq!(pages[0].title, "Home");
    assert!(pages[0].content.contains("Welcome home."));
}

#[tokio::test]
async fn test_crawl_respects_page_limit() {
    let server = site().await;
    let crawler = SiteCrawlCapability::new(2, 1_000).unwrap();

    let pages = crawler.crawl(&server.uri()).await.unwrap();
    let titles: Vec<&str> = pages.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Home", "About"]);
}

#[tokio::test]
async fn test_crawl_truncates_page_text() {
    let server = site().await;
    let crawler = SiteCrawlCapability::new(1, 4).unwrap();

    let pages = crawler.crawl(&server.uri()).await.unwrap();
    assert_eq!(pages.len(), 1);
    assert!(pages[0].content.chars().count() <= 4);
}

#[tokio::test]
async fn test_crawl_capability_lists_pages_with_sources() {
    let server = site().await;
    let crawler = SiteCrawlCapability::new(10, 1_000).unwrap();
    let task = CapabilityTask::new("crawl_website", "who works here").with_scope(server.uri());

    let result = crawler.execute(&task).await.unwrap();

    assert_eq!(result.sources.len(), 4);
    assert_eq!(result.sources[1], format!("{}/about", server.uri()));
    assert!(result.text.starts_with(&format!("[1] Home\nURL: {}\n", server.uri())));
    assert!(result.text.contains("[4] Team"));
}

#[tokio::test]
async fn test_crawl_capability_summarizes_when_configured() {
    let server = site().await;
    let summarizer = Arc::new(RecordingSummarizer {
        prompts: Mutex::new(Vec::new()),
    });
    let crawler = SiteCrawlCapability::new(10, 1_000)
        .unwrap()
        .with_summarizer(summarizer.clone());
    let task = CapabilityTask::new("crawl_website", "who works here").with_scope(server.uri());

    let result = crawler.execute(&task).await.unwrap();

    assert_eq!(result.text, "The team is small [1].");
    assert_eq!(result.sources.len(), 4);
    let prompts = summarizer.prompts.lock();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with("QUERY: who works here"));
    assert!(prompts[0].contains("The team."));
}

#[tokio::test]
async fn test_crawl_capability_requires_scope() {
    let crawler = SiteCrawlCapability::new(10, 1_000).unwrap();
    let err = crawler
        .execute(&CapabilityTask::new("crawl_website", "anything"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn test_unreachable_site_is_a_readable_failure() {
    let server = MockServer::start().await;
    let crawler = SiteCrawlCapability::new(10, 1_000).unwrap();
    let task = CapabilityTask::new("crawl_website", "anything").with_scope(server.uri());

    let result = crawler.execute(&task).await.unwrap();
    assert!(result.text.starts_with("No pages could be fetched"));
    assert!(result.sources.is_empty());
}

#[tokio::test]
async fn test_registry_turns_missing_scope_into_text() {
    let mut registry = CapabilityRegistry::new();
    registry.register(Arc::new(SiteCrawlCapability::new(10, 1_000).unwrap()));

    let result = registry
        .execute(&CapabilityTask::new("crawl_website", "team").with_gap("staff size"))
        .await;

    assert!(result
        .text
        .starts_with("Error executing crawl_website for gap 'staff size'"));
    assert!(result.sources.is_empty());
}
