//! Search-result page extraction
//!
//! Turns one page of search results into raw candidates plus whatever
//! pagination metadata the upstream reports.

use crate::config::SourceMode;
use crate::extract::text::{element_text, find_prices, non_empty};
use crate::product::{ApiCandidate, ApiProductData, HtmlCandidate, RawCandidate};
use crate::ExtractError;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;

/// Repeated product card on the HTML search page
pub const CARD_SELECTOR: &str = r#"div[class*="md:p-"]"#;

/// Title link inside a card; its text is the product title
pub const TITLE_LINK_SELECTOR: &str = r"a.hover\:underline";

/// Price tokens kept per card (price, then pre-discount price)
const MAX_PRICE_TOKENS: usize = 2;

struct ListSelectors {
    card: Selector,
    title_link: Selector,
    text_blocks: Selector,
    image: Selector,
}

static LIST_SELECTORS: OnceLock<ListSelectors> = OnceLock::new();

fn selectors() -> &'static ListSelectors {
    LIST_SELECTORS.get_or_init(|| ListSelectors {
        card: Selector::parse(CARD_SELECTOR).unwrap(),
        title_link: Selector::parse(TITLE_LINK_SELECTOR).unwrap(),
        text_blocks: Selector::parse("div, p, span").unwrap(),
        image: Selector::parse("img").unwrap(),
    })
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    /// Usable candidates in upstream order
    pub candidates: Vec<RawCandidate>,

    /// Total results reported by the upstream, if it reports one
    pub total_available: Option<u64>,

    /// Entries on the page before malformed ones were dropped
    pub item_count: usize,

    /// Entries dropped for lacking a URL or a title
    pub dropped: usize,
}

impl ListPage {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Extracts a list page in the representation `mode` expects
pub fn extract_list(mode: SourceMode, body: &str) -> Result<ListPage, ExtractError> {
    match mode {
        SourceMode::Html => Ok(extract_html_list(body)),
        SourceMode::Api => extract_api_list(body),
    }
}

/// Extracts product cards from a rendered search page
///
/// Per card:
/// - title and href from the first title link with text and an `href`
/// - brand from the first block whose text starts with `"by "`
/// - up to two dollar amounts from blocks whose text starts with `$`
/// - image from the first `<img>`, preferring `data-src` over `src`
///
/// Cards without a usable title link are dropped.
pub fn extract_html_list(html: &str) -> ListPage {
    let document = Html::parse_document(html);
    let selectors = selectors();
    let mut page = ListPage::default();

    for card in document.select(&selectors.card) {
        page.item_count += 1;

        match extract_card(card, selectors) {
            Some(candidate) => page.candidates.push(RawCandidate::Html(candidate)),
            None => page.dropped += 1,
        }
    }

    page
}

fn extract_card(card: ElementRef<'_>, selectors: &ListSelectors) -> Option<HtmlCandidate> {
    let (title, href) = card.select(&selectors.title_link).find_map(|link| {
        let href = non_empty(link.value().attr("href")?)?;
        let title = non_empty(element_text(link))?;
        Some((title, href))
    })?;

    let brand = card
        .select(&selectors.text_blocks)
        .map(element_text)
        .find_map(|text| text.strip_prefix("by ").and_then(non_empty));

    let mut price_tokens: Vec<String> = Vec::new();
    for block in card.select(&selectors.text_blocks) {
        let text = element_text(block);
        if !text.starts_with('$') {
            continue;
        }
        for amount in find_prices(&text) {
            if !price_tokens.contains(&amount) {
                price_tokens.push(amount);
            }
        }
        if price_tokens.len() >= MAX_PRICE_TOKENS {
            break;
        }
    }
    price_tokens.truncate(MAX_PRICE_TOKENS);

    let image_src = card.select(&selectors.image).next().and_then(|img| {
        let attrs = img.value();
        attrs
            .attr("data-src")
            .and_then(non_empty)
            .or_else(|| attrs.attr("src").and_then(non_empty))
    });

    Some(HtmlCandidate {
        title,
        href,
        brand,
        price_tokens,
        image_src,
    })
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    response: SearchResponse,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    total_num_results: Option<Value>,
}

/// Extracts results from a JSON search response
///
/// Expects `{ "response": { "results": [ { "value", "data" } ], "total_num_results" } }`.
/// Only a broken envelope is an error. Each result is read on its own, and
/// entries that are mistyped or lack a title or a URL are dropped and counted.
pub fn extract_api_list(body: &str) -> Result<ListPage, ExtractError> {
    let envelope: SearchEnvelope = serde_json::from_str(body)?;
    let response = envelope.response;

    let mut page = ListPage {
        total_available: response.total_num_results.as_ref().and_then(read_total),
        item_count: response.results.len(),
        ..ListPage::default()
    };

    for result in response.results {
        match read_result(result) {
            Some(candidate) => page.candidates.push(RawCandidate::Api(candidate)),
            None => page.dropped += 1,
        }
    }

    Ok(page)
}

fn read_result(result: Value) -> Option<ApiCandidate> {
    let Value::Object(mut fields) = result else {
        return None;
    };

    let title = match fields.remove("value") {
        Some(Value::String(value)) => non_empty(value)?,
        _ => return None,
    };

    let data: ApiProductData = match fields.remove("data") {
        Some(data @ Value::Object(_)) => serde_json::from_value(data).ok()?,
        _ => return None,
    };

    data.url
        .as_deref()
        .is_some_and(|u| !u.trim().is_empty())
        .then_some(ApiCandidate { title, data })
}

fn read_total(total: &Value) -> Option<u64> {
    match total {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
