//! HTTP page source.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::structure::extract_page_structure;
use crate::error::{ScrapeError, ScrapeResult};
use crate::traits::source::PageSource;
use crate::types::page::{to_indented_json, ScrapedPage};

const DEFAULT_USER_AGENT: &str = "PageSummarizer/0.1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches pages with a plain GET and extracts their heading structure.
///
/// No JavaScript rendering; use for static HTML pages.
///
/// # Example
///
/// ```rust,ignore
/// use summary_expert::{HttpScraper, PageSource};
///
/// let scraper = HttpScraper::new()?;
/// let page = scraper.fetch_page("https://example.com/docs").await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpScraper {
    client: reqwest::Client,
}

impl HttpScraper {
    /// Create a scraper with a 30 second timeout.
    pub fn new() -> ScrapeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(DEFAULT_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(ScrapeError::Client)?;

        Ok(Self { client })
    }

    /// Use a custom HTTP client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch_html(&self, url: &str) -> ScrapeResult<String> {
        let parsed = Url::parse(url).map_err(|_| ScrapeError::InvalidUrl {
            url: url.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScrapeError::InvalidUrl {
                url: url.to_string(),
            });
        }

        debug!(url = %url, "HTTP fetch starting");
        let response = self.client.get(parsed).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "HTTP request failed");
            ScrapeError::Http {
                url: url.to_string(),
                source: e,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "HTTP fetch returned error status");
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| ScrapeError::Http {
            url: url.to_string(),
            source: e,
        })
    }
}

#[async_trait]
impl PageSource for HttpScraper {
    async fn fetch_page(&self, url: &str) -> ScrapeResult<ScrapedPage> {
        let html = self.fetch_html(url).await?;
        let page = ScrapedPage::new(url, extract_page_structure(&html));

        match to_indented_json(&page.content) {
            Ok(structure) => info!("Extracted content from {}: {}", url, structure),
            Err(e) => warn!(url = %url, error = %e, "Failed to encode extracted content"),
        }
        debug!(
            url = %url,
            sections = page.section_count(),
            fragments = page.fragment_count(),
            "Page scraped"
        );

        Ok(page)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::page::Fragment;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DOC: &str = "<html><body><h1>Guide</h1><p>Read me</p></body></html>";

    #[tokio::test]
    async fn test_fetch_page_extracts_structure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/guide"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DOC))
            .mount(&server)
            .await;

        let scraper = HttpScraper::new().unwrap();
        let url = format!("{}/guide", server.uri());
        let page = scraper.fetch_page(&url).await.unwrap();

        assert_eq!(page.url, url);
        assert_eq!(page.content["Guide"], vec![Fragment::P("Read me".into())]);
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let scraper = HttpScraper::new().unwrap();
        let err = scraper
            .fetch_page(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        let scraper = HttpScraper::new().unwrap();

        let err = scraper.fetch_page("not a url").await.unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidUrl { .. }));

        let err = scraper.fetch_page("ftp://example.com/file").await.unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_fetch_pages_stops_at_first_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DOC))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let scraper = HttpScraper::new().unwrap();
        let urls = vec![
            format!("{}/ok", server.uri()),
            format!("{}/broken", server.uri()),
        ];

        let err = scraper.fetch_pages(&urls).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Status { status: 500, .. }));
    }
}
