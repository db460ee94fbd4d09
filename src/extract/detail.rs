//! Product detail page extraction
//!
//! Each field has its own selector and fallback; a field that matches
//! nothing is left empty without affecting the others.

use crate::extract::text::{clean_text, element_text, find_prices, first_decimal, first_integer, non_empty};
use crate::product::DetailFields;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

struct DetailSelectors {
    heading: Selector,
    brand_link: Selector,
    price: Selector,
    rating: Selector,
    reviews: Selector,
    description: Selector,
    specifications: Selector,
    image: Selector,
}

static DETAIL_SELECTORS: OnceLock<DetailSelectors> = OnceLock::new();

fn selectors() -> &'static DetailSelectors {
    DETAIL_SELECTORS.get_or_init(|| DetailSelectors {
        heading: Selector::parse("h1").unwrap(),
        brand_link: Selector::parse(r#"a.u-link, a[class*="brand"]"#).unwrap(),
        price: Selector::parse(r#".product-price, [class*="price"]"#).unwrap(),
        rating: Selector::parse(r#"[class*="rating"], [class*="star"]"#).unwrap(),
        reviews: Selector::parse(r#"[class*="review"]"#).unwrap(),
        description: Selector::parse(
            r#"#product-description, .product-description, [class*="description"]"#,
        )
        .unwrap(),
        specifications: Selector::parse(r#"#specifications, .specifications, [class*="spec"]"#)
            .unwrap(),
        image: Selector::parse(r#"img[src*="product"], img[data-src*="product"]"#).unwrap(),
    })
}

/// Extracts supplementary fields from a detail page
///
/// Field sources, in order of preference:
/// - title: first `<h1>`
/// - brand: first brand link, else the first text node starting with "by "
/// - price: first price element containing `$`; a second amount in the same
///   element becomes the original price
/// - rating: first decimal in the first rating/star element
/// - review count: first integer in the first review element
/// - description and specifications: cleaned HTML of the first match
/// - image: first image whose source mentions "product"
pub fn extract_detail(html: &str) -> DetailFields {
    let document = Html::parse_document(html);
    let selectors = selectors();

    let (price, original_price) = extract_price(&document, selectors);

    DetailFields {
        title: first_text(&document, &selectors.heading),
        brand: extract_brand(&document, selectors),
        price,
        original_price,
        rating: document
            .select(&selectors.rating)
            .next()
            .and_then(|el| first_decimal(&element_text(el))),
        review_count: document
            .select(&selectors.reviews)
            .next()
            .and_then(|el| first_integer(&element_text(el))),
        description: first_cleaned(&document, &selectors.description),
        specifications: first_cleaned(&document, &selectors.specifications),
        image_url: extract_image(&document, selectors),
    }
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|el| non_empty(element_text(el)))
}

fn first_cleaned(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|el| non_empty(clean_text(&el.inner_html())))
}

fn extract_brand(document: &Html, selectors: &DetailSelectors) -> Option<String> {
    if let Some(brand) = first_text(document, &selectors.brand_link) {
        return Some(brand);
    }

    document
        .root_element()
        .descendants()
        .filter_map(|node| node.value().as_text())
        .find_map(|text| {
            let trimmed = text.trim();
            if trimmed.to_ascii_lowercase().starts_with("by ") {
                non_empty(&trimmed[3..])
            } else {
                None
            }
        })
}

fn extract_price(document: &Html, selectors: &DetailSelectors) -> (Option<String>, Option<String>) {
    let Some(text) = document
        .select(&selectors.price)
        .map(element_text)
        .find(|text| text.contains('$'))
    else {
        return (None, None);
    };

    let mut amounts = find_prices(&text).into_iter();
    (amounts.next(), amounts.next())
}

fn extract_image(document: &Html, selectors: &DetailSelectors) -> Option<String> {
    document.select(&selectors.image).find_map(|img: ElementRef<'_>| {
        let attrs = img.value();
        ["src", "data-src"]
            .into_iter()
            .filter_map(|name| attrs.attr(name))
            .find(|src| src.contains("product"))
            .and_then(non_empty)
    })
}
