use crate::extract::{clean_text, first_price, non_empty, parse_price_value};
use crate::product::candidate::{ApiCandidate, HtmlCandidate, RawCandidate};
use crate::product::{DetailFields, ProductRecord};
use crate::url::{canonicalize_image_url, resolve_absolute};
use url::Url;

/// Maps a raw candidate from either upstream into a canonical record
///
/// Returns `None` when the candidate has no resolvable absolute URL or no
/// title; such candidates never reach the sink.
pub fn normalize_candidate(candidate: RawCandidate, origin: &Url) -> Option<ProductRecord> {
    match candidate {
        RawCandidate::Html(card) => normalize_html(card, origin),
        RawCandidate::Api(entry) => normalize_api(entry, origin),
    }
}

fn normalize_html(card: HtmlCandidate, origin: &Url) -> Option<ProductRecord> {
    let url = resolve_absolute(&card.href, origin)?;
    let title = non_empty(&card.title)?;
    let (price, original_price) = price_pair(&card.price_tokens);

    Some(ProductRecord {
        title: Some(title),
        brand: card.brand.and_then(non_empty),
        price,
        original_price,
        image_url: card
            .image_src
            .and_then(|src| canonicalize_image_url(&src, origin)),
        ..ProductRecord::new(url.to_string())
    })
}

fn normalize_api(entry: ApiCandidate, origin: &Url) -> Option<ProductRecord> {
    let data = entry.data;
    let url = resolve_absolute(data.url.as_deref()?, origin)?;
    let title = non_empty(&entry.title)?;

    let price_value = data.price.filter(|p| *p >= 0.0);
    let original_price = match (price_value, data.compare_at_price) {
        (Some(price), Some(compare)) if compare > price => Some(format_price(compare)),
        _ => None,
    };

    Some(ProductRecord {
        title: Some(title),
        brand: data.brand.and_then(non_empty),
        price: price_value.map(format_price),
        original_price,
        image_url: data
            .image_url
            .and_then(|src| canonicalize_image_url(&src, origin)),
        rating: valid_rating(data.rating),
        review_count: data
            .review_count
            .filter(|n| *n >= 0.0 && *n <= f64::from(u32::MAX))
            .map(|n| n as u32),
        description: data.description.map(|d| clean_text(&d)).and_then(non_empty),
        sku: data.sku.and_then(non_empty),
        product_type: data.product_type.and_then(non_empty),
        ..ProductRecord::new(url.to_string())
    })
}

/// Formats a numeric price as `$` plus two decimals
///
/// ```
/// use listing_harvest::product::format_price;
///
/// assert_eq!(format_price(1299.0), "$1299.00");
/// assert_eq!(format_price(49.5), "$49.50");
/// ```
pub fn format_price(value: f64) -> String {
    format!("${:.2}", value)
}

/// Picks price and original price from text tokens
///
/// The first dollar amount is the price. The second is kept as the
/// original price only when it is numerically greater.
pub fn price_pair(tokens: &[String]) -> (Option<String>, Option<String>) {
    let mut amounts = tokens.iter().filter_map(|t| first_price(t));

    let Some(price) = amounts.next() else {
        return (None, None);
    };

    let original = amounts
        .next()
        .filter(|candidate| is_greater(candidate, &price));

    (Some(price), original)
}

fn is_greater(candidate: &str, price: &str) -> bool {
    match (parse_price_value(candidate), parse_price_value(price)) {
        (Some(c), Some(p)) => c > p,
        _ => false,
    }
}

fn valid_rating(rating: Option<f64>) -> Option<f64> {
    rating.filter(|r| (0.0..=5.0).contains(r))
}

/// Normalizes detail-page fields with the same rules as list candidates
///
/// The image is canonicalized, an out-of-range rating is dropped, and an
/// original price that does not exceed the price is dropped.
pub fn normalize_detail(detail: DetailFields, origin: &Url) -> DetailFields {
    let original_price = match (&detail.price, detail.original_price) {
        (Some(price), Some(original)) if is_greater(&original, price) => Some(original),
        _ => None,
    };

    DetailFields {
        title: detail.title.and_then(non_empty),
        brand: detail.brand.and_then(non_empty),
        price: detail.price,
        original_price,
        rating: valid_rating(detail.rating),
        review_count: detail.review_count,
        description: detail.description.and_then(non_empty),
        specifications: detail.specifications.and_then(non_empty),
        image_url: detail
            .image_url
            .and_then(|src| canonicalize_image_url(&src, origin)),
    }
}
