//! Text helpers shared by the list and detail extractors
//!
//! Price, rating and count patterns plus HTML fragment cleaning.

use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::OnceLock;

static RE_PRICE: OnceLock<Regex> = OnceLock::new();
static RE_DECIMAL: OnceLock<Regex> = OnceLock::new();
static RE_INTEGER: OnceLock<Regex> = OnceLock::new();

/// Subtrees that never contribute visible text
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "iframe"];

fn price_pattern() -> &'static Regex {
    RE_PRICE.get_or_init(|| Regex::new(r"\$[\d,]+(?:\.\d{2})?").unwrap())
}

/// Returns every dollar amount in `text`, in order, as matched
///
/// ```
/// use listing_harvest::extract::find_prices;
///
/// assert_eq!(find_prices("Now $1,299.00 was $1,599"), vec!["$1,299.00", "$1,599"]);
/// ```
pub fn find_prices(text: &str) -> Vec<String> {
    price_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Returns the first dollar amount in `text`
pub fn first_price(text: &str) -> Option<String> {
    price_pattern().find(text).map(|m| m.as_str().to_string())
}

/// Parses a dollar string such as `"$1,299.00"` into its numeric value
pub fn parse_price_value(price: &str) -> Option<f64> {
    let digits: String = price
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// First decimal number in `text` (`"4.5 out of 5"` gives 4.5)
pub fn first_decimal(text: &str) -> Option<f64> {
    RE_DECIMAL
        .get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").unwrap())
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

/// First run of digits in `text` (`"(128 Reviews)"` gives 128)
pub fn first_integer(text: &str) -> Option<u32> {
    RE_INTEGER
        .get_or_init(|| Regex::new(r"\d+").unwrap())
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

/// Collapses whitespace runs to a single space and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Concatenated, whitespace-collapsed text of an element
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Converts an HTML fragment to plain text
///
/// Script, style, noscript and iframe subtrees are removed, the remaining
/// text nodes are concatenated, and whitespace is collapsed.
///
/// ```
/// use listing_harvest::extract::clean_text;
///
/// let html = "<p>Solid  oak.</p><script>track()</script> <p>Seats four.</p>";
/// assert_eq!(clean_text(html), "Solid oak. Seats four.");
/// ```
pub fn clean_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(html);
    let mut text = String::new();
    collect_visible_text(fragment.root_element(), &mut text);
    collapse_whitespace(&text)
}

fn collect_visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if !HIDDEN_TAGS.contains(&child_element.value().name()) {
                collect_visible_text(child_element, out);
            }
        }
    }
}

/// Trims `text` and returns it unless empty
pub fn non_empty(text: impl AsRef<str>) -> Option<String> {
    let trimmed = text.as_ref().trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_prices() {
        assert_eq!(find_prices("$499.99"), vec!["$499.99"]);
        assert_eq!(find_prices("Sale $1,200 Reg. $1,450.50"), vec!["$1,200", "$1,450.50"]);
        assert!(find_prices("Call for price").is_empty());
    }

    #[test]
    fn test_price_partial_cents_not_captured() {
        assert_eq!(first_price("$12.5 today").as_deref(), Some("$12"));
    }

    #[test]
    fn test_parse_price_value() {
        assert_eq!(parse_price_value("$1,299.00"), Some(1299.0));
        assert_eq!(parse_price_value("$45"), Some(45.0));
        assert_eq!(parse_price_value("$"), None);
    }

    #[test]
    fn test_first_decimal_and_integer() {
        assert_eq!(first_decimal("Rated 4.7 of 5"), Some(4.7));
        assert_eq!(first_decimal("5 stars"), Some(5.0));
        assert_eq!(first_decimal("no rating"), None);
        assert_eq!(first_integer("(1,024 reviews)"), Some(1));
        assert_eq!(first_integer("38 Reviews"), Some(38));
        assert_eq!(first_integer("Reviews"), None);
    }

    #[test]
    fn test_clean_text_removes_hidden_subtrees() {
        let html = r#"
            <div>Walnut finish<style>.a{color:red}</style>
              <noscript>Enable JS</noscript>
              <iframe src="x">frame</iframe>
              <span>  with   brass legs </span>
            </div>"#;
        assert_eq!(clean_text(html), "Walnut finish with brass legs");
    }

    #[test]
    fn test_clean_text_empty() {
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("   "), "");
        assert_eq!(clean_text("<script>only()</script>"), "");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("  x "), Some("x".to_string()));
        assert_eq!(non_empty("   "), None);
    }
}
