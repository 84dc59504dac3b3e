//! Page source trait for fetching structured page content.

use async_trait::async_trait;

use crate::error::ScrapeResult;
use crate::types::page::ScrapedPage;

/// Fetches pages and extracts their heading structure.
///
/// [`crate::scraping::HttpScraper`] fetches over HTTP; tests use
/// [`crate::testing::MockPageSource`].
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page.
    async fn fetch_page(&self, url: &str) -> ScrapeResult<ScrapedPage>;

    /// Fetch pages in order, stopping at the first failure.
    async fn fetch_pages(&self, urls: &[String]) -> ScrapeResult<Vec<ScrapedPage>> {
        let mut pages = Vec::with_capacity(urls.len());
        for url in urls {
            pages.push(self.fetch_page(url).await?);
        }
        Ok(pages)
    }

    /// Name used in logs.
    fn name(&self) -> &str {
        "source"
    }
}
