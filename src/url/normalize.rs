use url::Url;

/// Resolves a link found on a page to an absolute product URL
///
/// # Rules
///
/// 1. Trim whitespace; empty hrefs resolve to nothing
/// 2. Skip `javascript:`, `mailto:`, `tel:` and `data:` links
/// 3. Resolve against `origin` (absolute hrefs are kept as-is)
/// 4. Accept only HTTP and HTTPS results
/// 5. Drop the fragment; the query string is part of the identity
///
/// Resolution failure yields `None`, which callers treat as "no URL".
///
/// # Examples
///
/// ```
/// use listing_harvest::url::resolve_absolute;
/// use url::Url;
///
/// let origin = Url::parse("https://shophouzz.com").unwrap();
/// let url = resolve_absolute("/products/oak-sofa#reviews", &origin).unwrap();
/// assert_eq!(url.as_str(), "https://shophouzz.com/products/oak-sofa");
/// ```
pub fn resolve_absolute(href: &str, origin: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let mut url = origin.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    url.set_fragment(None);
    Some(url)
}

/// Canonicalizes an image source into an absolute URL without a query string
///
/// - `//cdn.host/a.jpg` becomes `https://cdn.host/a.jpg`
/// - `/a.jpg` and `a.jpg` resolve against `origin`
/// - absolute URLs keep their scheme
/// - the query string and fragment are always stripped, since CDNs append
///   cache-busting and variant parameters
///
/// # Examples
///
/// ```
/// use listing_harvest::url::canonicalize_image_url;
/// use url::Url;
///
/// let origin = Url::parse("https://shophouzz.com").unwrap();
/// assert_eq!(
///     canonicalize_image_url("//cdn.example.com/img.jpg?v=2", &origin).as_deref(),
///     Some("https://cdn.example.com/img.jpg")
/// );
/// ```
pub fn canonicalize_image_url(src: &str, origin: &Url) -> Option<String> {
    let src = src.trim();

    if src.is_empty() || src.starts_with("data:") {
        return None;
    }

    let mut url = if let Some(rest) = src.strip_prefix("//") {
        Url::parse(&format!("https://{}", rest)).ok()?
    } else {
        match Url::parse(src) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let mut https_origin = origin.clone();
                if https_origin.scheme() != "https" {
                    // Only fails for cannot-be-a-base URLs, which the config rejects
                    let _ = https_origin.set_scheme("https");
                }
                https_origin.join(src).ok()?
            }
            Err(_) => return None,
        }
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://shophouzz.com").unwrap()
    }

    #[test]
    fn test_resolve_relative_path() {
        let url = resolve_absolute("/products/123", &origin()).unwrap();
        assert_eq!(url.as_str(), "https://shophouzz.com/products/123");
    }

    #[test]
    fn test_resolve_keeps_absolute() {
        let url = resolve_absolute("https://other.com/p/1?color=red", &origin()).unwrap();
        assert_eq!(url.as_str(), "https://other.com/p/1?color=red");
    }

    #[test]
    fn test_resolve_rejects_special_schemes() {
        assert!(resolve_absolute("javascript:void(0)", &origin()).is_none());
        assert!(resolve_absolute("mailto:a@b.com", &origin()).is_none());
        assert!(resolve_absolute("tel:+15551234", &origin()).is_none());
        assert!(resolve_absolute("   ", &origin()).is_none());
        assert!(resolve_absolute("#top", &origin()).is_none());
    }

    #[test]
    fn test_resolve_rejects_unparseable() {
        assert!(resolve_absolute("http://[::1", &origin()).is_none());
    }

    #[test]
    fn test_protocol_relative_image() {
        assert_eq!(
            canonicalize_image_url("//cdn.example.com/img.jpg?v=2", &origin()).as_deref(),
            Some("https://cdn.example.com/img.jpg")
        );
    }

    #[test]
    fn test_path_relative_image() {
        assert_eq!(
            canonicalize_image_url("/img.jpg", &origin()).as_deref(),
            Some("https://shophouzz.com/img.jpg")
        );
        assert_eq!(
            canonicalize_image_url("img/a.png?w=200", &origin()).as_deref(),
            Some("https://shophouzz.com/img/a.png")
        );
    }

    #[test]
    fn test_relative_image_upgrades_http_origin() {
        let origin = Url::parse("http://shophouzz.com").unwrap();
        assert_eq!(
            canonicalize_image_url("/img.jpg?x=1", &origin).as_deref(),
            Some("https://shophouzz.com/img.jpg")
        );
    }

    #[test]
    fn test_absolute_image_query_stripped() {
        assert_eq!(
            canonicalize_image_url("https://st.hzcdn.com/fimgs/a_9-1234.jpg?size=large#x", &origin())
                .as_deref(),
            Some("https://st.hzcdn.com/fimgs/a_9-1234.jpg")
        );
    }

    #[test]
    fn test_empty_and_data_images() {
        assert!(canonicalize_image_url("", &origin()).is_none());
        assert!(canonicalize_image_url("data:image/gif;base64,R0lGOD", &origin()).is_none());
    }
}
