//! Page scraping: fetch HTML and group its content under headings.

pub mod http;
pub mod structure;

pub use http::HttpScraper;
pub use structure::{element_text, extract_page_structure};
