use std::time::Duration;

use anyhow::{Context, Result};
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::config::{ScrapeConfig, SourceConfig};

/// One headline pulled from a news source.
#[derive(Debug, Clone, PartialEq)]
pub struct Headline {
    pub title: String,
    pub source: String,
    pub url: String,
}

/// Fetches headline rosters from the configured news sites.
pub struct Scraper {
    client: reqwest::Client,
    max_per_source: usize,
}

impl Scraper {
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0")
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .context("Failed to build scrape HTTP client")?;
        Ok(Self {
            client,
            max_per_source: config.max_per_source,
        })
    }

    /// Fetch every source in turn. A source that fails to load or parse is
    /// logged and skipped; the run continues with whatever the rest yield.
    pub async fn fetch_all(&self, sources: &[SourceConfig]) -> Vec<Headline> {
        let mut headlines = Vec::new();
        for source in sources {
            match self.fetch_source(source).await {
                Ok(found) => {
                    debug!("{}: {} headlines", source.name, found.len());
                    headlines.extend(found);
                }
                Err(e) => warn!("Scraping error from {}: {:#}", source.name, e),
            }
        }
        headlines
    }

    async fn fetch_source(&self, source: &SourceConfig) -> Result<Vec<Headline>> {
        let response = self
            .client
            .get(&source.url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", source.url))?;
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read body from {}", source.url))?;
        extract_headlines(&body, source, self.max_per_source)
    }
}

/// Pull headlines out of an HTML document with the source's CSS selector.
fn extract_headlines(body: &str, source: &SourceConfig, max: usize) -> Result<Vec<Headline>> {
    let document = Html::parse_document(body);
    let selector = Selector::parse(&source.selector)
        .map_err(|e| anyhow::anyhow!("Invalid selector '{}': {}", source.selector, e))?;

    let mut headlines = Vec::new();
    for element in document.select(&selector).take(max) {
        let title = clean_text(&element.text().collect::<String>());
        if title.is_empty() {
            continue;
        }
        let href = element.value().attr("href");
        headlines.push(Headline {
            title,
            source: source.name.clone(),
            url: resolve_link(&source.url, href),
        });
    }
    Ok(headlines)
}

/// Collapse whitespace, strip non-ASCII, cap at 200 chars.
pub fn clean_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let ascii: String = collapsed.chars().filter(char::is_ascii).collect();
    if ascii.len() > 200 {
        format!("{}...", &ascii[..200])
    } else {
        ascii
    }
}

/// Absolute hrefs pass through; relative ones are joined to the page URL;
/// a missing or empty href falls back to the page itself.
pub fn resolve_link(page_url: &str, href: Option<&str>) -> String {
    match href.filter(|h| !h.is_empty()) {
        Some(h) if h.starts_with("http") => h.to_string(),
        Some(h) => format!(
            "{}/{}",
            page_url.trim_end_matches('/'),
            h.trim_start_matches('/')
        ),
        None => page_url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(selector: &str) -> SourceConfig {
        SourceConfig {
            name: "Test Source".to_string(),
            url: "https://example.com/news".to_string(),
            selector: selector.to_string(),
        }
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  New   metro\n\tline  "), "New metro line");
    }

    #[test]
    fn clean_text_strips_non_ascii() {
        assert_eq!(clean_text("Deal worth \u{20B9}500 crore"), "Deal worth 500 crore");
    }

    #[test]
    fn clean_text_truncates_long_titles() {
        let long = "a".repeat(250);
        let cleaned = clean_text(&long);
        assert_eq!(cleaned.len(), 203);
        assert!(cleaned.ends_with("..."));
    }

    #[test]
    fn resolve_link_variants() {
        let page = "https://example.com/news";
        assert_eq!(
            resolve_link(page, Some("https://other.com/story")),
            "https://other.com/story"
        );
        assert_eq!(
            resolve_link(page, Some("/story/1")),
            "https://example.com/news/story/1"
        );
        assert_eq!(resolve_link(page, Some("")), page);
        assert_eq!(resolve_link(page, None), page);
    }

    #[test]
    fn extract_headlines_matches_selector() {
        let html = r#"
            <html><body>
              <h3><a href="/a">First story</a></h3>
              <h3><a href="https://x.com/b">Second story</a></h3>
              <h2><a href="/ignored">Wrong tag</a></h2>
            </body></html>
        "#;
        let found = extract_headlines(html, &source("h3 a"), 10).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].title, "First story");
        assert_eq!(found[0].url, "https://example.com/news/a");
        assert_eq!(found[1].url, "https://x.com/b");
        assert_eq!(found[0].source, "Test Source");
    }

    #[test]
    fn extract_headlines_respects_max() {
        let html: String = (0..20)
            .map(|i| format!("<h3><a href=\"/{i}\">Story {i}</a></h3>"))
            .collect();
        let found = extract_headlines(&html, &source("h3 a"), 10).unwrap();
        assert_eq!(found.len(), 10);
    }

    #[test]
    fn extract_headlines_skips_empty_titles() {
        let html = r#"<h3><a href="/a">   </a></h3><h3><a href="/b">Real</a></h3>"#;
        let found = extract_headlines(html, &source("h3 a"), 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Real");
    }

    #[test]
    fn extract_headlines_without_href_falls_back_to_page() {
        let html = r#"<div class="page-title"><h1>Press note</h1></div>"#;
        let found = extract_headlines(html, &source("div.page-title h1"), 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "https://example.com/news");
    }

    #[test]
    fn invalid_selector_is_an_error() {
        assert!(extract_headlines("<p></p>", &source("[[["), 10).is_err());
    }
}
