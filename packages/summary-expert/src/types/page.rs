//! Page types - structured content extracted from a web page.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One block of content under a heading.
///
/// Serializes as a single-key object named after the HTML element it came
/// from, e.g. `{"p": "text"}` or `{"ul": ["a", "b"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fragment {
    P(String),
    Pre(String),
    Code(String),
    Ul(Vec<String>),
    Ol(Vec<String>),
    Table(TableData),
}

impl Fragment {
    /// Text of a `pre` or `code` block.
    pub fn block_text(&self) -> Option<&str> {
        match self {
            Fragment::Pre(text) | Fragment::Code(text) => Some(text),
            _ => None,
        }
    }

    /// Items of an unordered list.
    pub fn unordered_items(&self) -> Option<&[String]> {
        match self {
            Fragment::Ul(items) => Some(items),
            _ => None,
        }
    }

    /// Items of an ordered list.
    pub fn ordered_items(&self) -> Option<&[String]> {
        match self {
            Fragment::Ol(items) => Some(items),
            _ => None,
        }
    }
}

/// Header cells and body rows of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Heading text mapped to the fragments under it, in document order.
pub type PageContent = IndexMap<String, Vec<Fragment>>;

/// A fetched page and its structured content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPage {
    /// URL the page was fetched from
    pub url: String,

    /// Sections keyed by heading
    pub content: PageContent,

    /// When the page was fetched
    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
}

impl ScrapedPage {
    pub fn new(url: impl Into<String>, content: PageContent) -> Self {
        Self {
            url: url.into(),
            content,
            fetched_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn section_count(&self) -> usize {
        self.content.len()
    }

    /// Total fragments across all sections.
    pub fn fragment_count(&self) -> usize {
        self.content.values().map(Vec::len).sum()
    }

    /// The whole page as indented JSON, used as conversion source text.
    pub fn source_text(&self) -> serde_json::Result<String> {
        to_indented_json(&self.content)
    }

    /// One single-line JSON object per section, `{heading: fragments}`.
    pub fn section_texts(&self) -> serde_json::Result<Vec<String>> {
        self.content
            .iter()
            .map(|(heading, fragments)| {
                let mut section = IndexMap::with_capacity(1);
                section.insert(heading, fragments);
                to_prompt_json(&section)
            })
            .collect()
    }
}

/// Serialize with four-space indentation, non-ASCII escaped.
pub fn to_indented_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    serialize_with(value, formatter)
}

/// Single-line JSON with `", "` and `": "` separators, non-ASCII escaped.
pub fn to_prompt_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serialize_with(value, SpacedFormatter)
}

fn serialize_with<T, F>(value: &T, formatter: F) -> serde_json::Result<String>
where
    T: Serialize + ?Sized,
    F: serde_json::ser::Formatter,
{
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only ever writes valid UTF-8
    Ok(escape_non_ascii(&String::from_utf8_lossy(&buf)))
}

struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + std::io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> std::io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + std::io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> std::io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + std::io::Write>(
        &mut self,
        writer: &mut W,
    ) -> std::io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Non-ASCII only occurs inside JSON strings, so every such char can be
/// replaced by its UTF-16 `\uXXXX` escapes.
pub(crate) fn escape_non_ascii(json: &str) -> String {
    if json.is_ascii() {
        return json.to_string();
    }

    let mut out = String::with_capacity(json.len() + 16);
    let mut units = [0u16; 2];
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}
