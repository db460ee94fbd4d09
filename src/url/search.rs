use crate::config::SourceConfig;
use url::Url;

/// Builds the HTML search page URL for `query` and `page`
///
/// The `page` parameter is only present beyond the first page.
///
/// # Examples
///
/// ```
/// use listing_harvest::url::html_search_url;
/// use url::Url;
///
/// let origin = Url::parse("https://shophouzz.com").unwrap();
/// let url = html_search_url(&origin, "/search", "velvet sofa", 2).unwrap();
/// assert_eq!(url.as_str(), "https://shophouzz.com/search?q=velvet+sofa&page=2");
/// ```
pub fn html_search_url(
    origin: &Url,
    search_path: &str,
    query: &str,
    page: u32,
) -> Result<Url, url::ParseError> {
    let mut url = origin.join(search_path)?;

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        pairs.append_pair("q", query.trim());
        if page > 1 {
            pairs.append_pair("page", &page.to_string());
        }
    }

    Ok(url)
}

/// Identity parameters carried by every API search request
#[derive(Debug, Clone, Copy)]
pub struct SearchIdentity<'a> {
    /// Anonymous visitor id of the run
    pub visitor_id: &'a str,
    /// Request sequence number, strictly increasing within the run
    pub sequence: u64,
}

/// Builds the JSON search API URL
///
/// The encoded query becomes the last path segment of the endpoint; paging,
/// sorting, identity and client version travel as query parameters.
pub fn api_search_url(
    source: &SourceConfig,
    query: &str,
    identity: SearchIdentity<'_>,
    page: u32,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&source.api_endpoint)?;

    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithoutBase)?
        .pop_if_empty()
        .push(query.trim());

    url.query_pairs_mut()
        .clear()
        .append_pair("key", &source.api_key)
        .append_pair("i", identity.visitor_id)
        .append_pair("s", &identity.sequence.to_string())
        .append_pair("page", &page.to_string())
        .append_pair("num_results_per_page", &source.page_size.to_string())
        .append_pair("sort_by", &source.sort_by)
        .append_pair("sort_order", &source.sort_order)
        .append_pair("c", &source.client_version);

    Ok(url)
}
