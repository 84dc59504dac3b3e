//! Heading-structured extraction from HTML.

use scraper::{ElementRef, Html, Selector};

use crate::types::page::{Fragment, PageContent, TableData};

const BLOCK_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p, ul, ol, pre, code, table";

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// All descendant text, each piece trimmed, empty pieces dropped, joined by a space.
pub fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn descendant_texts(element: &ElementRef<'_>, css: &Selector) -> Vec<String> {
    element.select(css).map(|el| element_text(&el)).collect()
}

fn is_heading(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Group the page's content blocks under the heading that precedes them.
///
/// Blocks before the first heading are dropped. A heading seen again
/// empties its section but keeps the section's original position.
pub fn extract_page_structure(html: &str) -> PageContent {
    let document = Html::parse_document(html);
    let blocks = selector(BLOCK_SELECTOR);
    let list_items = selector("li");
    let header_cells = selector("th");
    let table_rows = selector("tr");
    let row_cells = selector("td, th");

    let mut page = PageContent::new();
    let mut current: Option<String> = None;

    for element in document.select(&blocks) {
        let tag = element.value().name();

        if is_heading(tag) {
            let heading = element_text(&element);
            page.insert(heading.clone(), Vec::new());
            current = Some(heading);
            continue;
        }

        // An empty heading opens a section that never receives content.
        let Some(section) = current
            .as_deref()
            .filter(|heading| !heading.is_empty())
            .and_then(|heading| page.get_mut(heading))
        else {
            continue;
        };

        match tag {
            "p" => section.push(Fragment::P(element_text(&element))),
            "pre" | "code" => {
                let text = element_text(&element);
                if is_duplicate_block(section, &text) {
                    continue;
                }
                section.push(if tag == "pre" {
                    Fragment::Pre(text)
                } else {
                    Fragment::Code(text)
                });
            }
            "ul" | "ol" => {
                let items = descendant_texts(&element, &list_items);
                let ordered = tag == "ol";
                if is_duplicate_list(section, &items, ordered) {
                    continue;
                }
                section.push(if ordered {
                    Fragment::Ol(items)
                } else {
                    Fragment::Ul(items)
                });
            }
            "table" => {
                let headers = descendant_texts(&element, &header_cells);
                let rows = element
                    .select(&table_rows)
                    .map(|row| descendant_texts(&row, &row_cells))
                    .collect();
                section.push(Fragment::Table(TableData { headers, rows }));
            }
            _ => {}
        }
    }

    page
}

/// Every fragment lacks either `pre` or `code` text, and a missing block
/// compares as empty, so empty text duplicates any non-empty section.
fn is_duplicate_block(section: &[Fragment], text: &str) -> bool {
    (text.is_empty() && !section.is_empty())
        || section.iter().any(|fragment| fragment.block_text() == Some(text))
}

/// Fragments of the other kind compare as an empty list.
fn is_duplicate_list(section: &[Fragment], items: &[String], ordered: bool) -> bool {
    section.iter().any(|fragment| {
        let existing = if ordered {
            fragment.ordered_items()
        } else {
            fragment.unordered_items()
        };
        existing.unwrap_or(&[]) == items
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headings(page: &PageContent) -> Vec<&str> {
        page.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_groups_content_under_headings() {
        let html = r#"
            <html><body>
              <h1>Title</h1>
              <p>First   <b>bold</b> paragraph</p>
              <h2>Steps</h2>
              <ol><li>One</li><li> Two </li></ol>
            </body></html>
        "#;

        let page = extract_page_structure(html);

        assert_eq!(headings(&page), vec!["Title", "Steps"]);
        assert_eq!(
            page["Title"],
            vec![Fragment::P("First bold paragraph".into())]
        );
        assert_eq!(
            page["Steps"],
            vec![Fragment::Ol(vec!["One".into(), "Two".into()])]
        );
    }

    #[test]
    fn test_content_before_first_heading_is_dropped() {
        let html = "<p>orphan</p><ul><li>x</li></ul><h1>Start</h1><p>kept</p>";
        let page = extract_page_structure(html);

        assert_eq!(headings(&page), vec!["Start"]);
        assert_eq!(page["Start"], vec![Fragment::P("kept".into())]);
    }

    #[test]
    fn test_repeated_heading_resets_section_in_place() {
        let html = "<h1>A</h1><p>old</p><h1>B</h1><p>b</p><h1>A</h1><p>new</p>";
        let page = extract_page_structure(html);

        assert_eq!(headings(&page), vec!["A", "B"]);
        assert_eq!(page["A"], vec![Fragment::P("new".into())]);
    }

    #[test]
    fn test_nested_pre_code_is_deduplicated() {
        let html = "<h2>Example</h2><pre><code>let x = 1;</code></pre>";
        let page = extract_page_structure(html);

        assert_eq!(page["Example"], vec![Fragment::Pre("let x = 1;".into())]);
    }

    #[test]
    fn test_empty_block_in_nonempty_section_is_skipped() {
        let html = "<h2>S</h2><p>text</p><pre>  </pre>";
        let page = extract_page_structure(html);

        assert_eq!(page["S"], vec![Fragment::P("text".into())]);
    }

    #[test]
    fn test_empty_block_after_block_only_section_is_skipped() {
        let html = "<h2>S</h2><pre>x</pre><code>  </code>";
        let page = extract_page_structure(html);

        assert_eq!(page["S"], vec![Fragment::Pre("x".into())]);

        // The first block of a section is kept even when empty
        let page = extract_page_structure("<h2>T</h2><code> </code><pre></pre>");
        assert_eq!(page["T"], vec![Fragment::Code(String::new())]);
    }

    #[test]
    fn test_duplicate_lists_skipped_per_kind() {
        let html = r#"
            <h2>Lists</h2>
            <ul><li>a</li><li>b</li></ul>
            <ul><li>a</li><li>b</li></ul>
            <ol><li>a</li><li>b</li></ol>
        "#;
        let page = extract_page_structure(html);

        assert_eq!(
            page["Lists"],
            vec![
                Fragment::Ul(vec!["a".into(), "b".into()]),
                Fragment::Ol(vec!["a".into(), "b".into()]),
            ]
        );
    }

    #[test]
    fn test_nested_list_items_are_flattened() {
        let html = "<h2>N</h2><ul><li>outer<ul><li>inner</li></ul></li></ul>";
        let page = extract_page_structure(html);

        // The outer list sees both items; the inner one repeats a subset and is kept.
        assert_eq!(
            page["N"],
            vec![
                Fragment::Ul(vec!["outer inner".into(), "inner".into()]),
                Fragment::Ul(vec!["inner".into()]),
            ]
        );
    }

    #[test]
    fn test_tables_collect_headers_and_rows() {
        let html = r#"
            <h2>Limits</h2>
            <table>
              <tr><th>Name</th><th>Value</th></tr>
              <tr><td>max</td><td>10</td></tr>
            </table>
            <table>
              <tr><th>Name</th><th>Value</th></tr>
              <tr><td>max</td><td>10</td></tr>
            </table>
        "#;
        let page = extract_page_structure(html);

        let expected = Fragment::Table(TableData {
            headers: vec!["Name".into(), "Value".into()],
            rows: vec![
                vec!["Name".into(), "Value".into()],
                vec!["max".into(), "10".into()],
            ],
        });
        assert_eq!(page["Limits"], vec![expected.clone(), expected]);
    }

    #[test]
    fn test_empty_heading_receives_no_content() {
        let html = "<h1></h1><p>lost</p>";
        let page = extract_page_structure(html);

        assert_eq!(headings(&page), vec![""]);
        assert!(page[""].is_empty());
    }
}
