//! HTML parser for extracting outbound links
//!
//! Only `<a href="...">` anchors are followed. Each link is resolved against
//! the document URL (or the document's `<base href>`, when present) and
//! canonicalized; links that cannot be crawled are dropped.

use crate::crawler::Locator;
use crate::url::canonicalize_link;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use tracing::trace;
use url::Url;

/// Extracts the deduplicated, canonical outbound links of a document
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The URL the document was fetched from
///
/// # Example
///
/// ```
/// use hostfair_crawler::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<a href="/page">Link</a> <a href="/page#top">Again</a>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let links = extract_links(html, &base_url);
/// assert_eq!(links.len(), 1);
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> BTreeSet<Locator> {
    let document = Html::parse_document(html);
    let base_url = document_base(&document, base_url);
    let mut links = BTreeSet::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            match canonicalize_link(href, &base_url) {
                Ok(locator) => {
                    links.insert(locator);
                }
                Err(e) => trace!("Dropping link {:?}: {}", href, e),
            }
        }
    }

    links
}

/// Honors a `<base href>` element, falling back to the fetch URL
fn document_base(document: &Html, fetched_from: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|element| element.value().attr("href"))
                .and_then(|href| fetched_from.join(href.trim()).ok())
        })
        .unwrap_or_else(|| fetched_from.clone())
}
