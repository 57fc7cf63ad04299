use crate::crawler::Locator;
use crate::{UrlError, UrlResult};
use url::Url;

/// Canonicalizes an outbound link found in a document
///
/// # Canonicalization Steps
///
/// 1. Resolve `href` against the document URL `base`; reject if malformed
/// 2. Keep only http and https links
/// 3. Reject links that carry a non-default port
/// 4. Lowercase the host
/// 5. Drop the fragment; keep the query as part of the path
/// 6. An empty path becomes /
///
/// # Arguments
///
/// * `href` - The raw `href` attribute value
/// * `base` - The URL of the document the link was found in
///
/// # Returns
///
/// * `Ok(Locator)` - The canonical locator for the link
/// * `Err(UrlError)` - The link cannot be crawled
///
/// # Examples
///
/// ```
/// use hostfair_crawler::url::canonicalize_link;
/// use url::Url;
///
/// let base = Url::parse("http://example.com/docs/index.html").unwrap();
/// let locator = canonicalize_link("../about.html#team", &base).unwrap();
/// assert_eq!(locator.to_string(), "http://example.com/about.html");
/// ```
pub fn canonicalize_link(href: &str, base: &Url) -> UrlResult<Locator> {
    let url = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(e.to_string()))?;

    Locator::from_url(&url)
}
