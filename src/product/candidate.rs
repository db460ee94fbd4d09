//! Raw candidates as they come out of a search-result page
//!
//! Each upstream has its own variant; nothing outside the normalizer looks
//! inside them.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A not-yet-normalized product entry
#[derive(Debug, Clone, PartialEq)]
pub enum RawCandidate {
    Html(HtmlCandidate),
    Api(ApiCandidate),
}

impl RawCandidate {
    /// The link the candidate points at, before resolution
    pub fn href(&self) -> Option<&str> {
        match self {
            Self::Html(card) => Some(card.href.as_str()),
            Self::Api(entry) => entry.data.url.as_deref(),
        }
    }
}

/// A product card scraped from an HTML search page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtmlCandidate {
    /// Visible text of the title link
    pub title: String,

    /// `href` of the title link, possibly relative
    pub href: String,

    /// Brand with the leading "by " removed
    pub brand: Option<String>,

    /// Dollar amounts in card order; first is the price, second the pre-discount price
    pub price_tokens: Vec<String>,

    /// Image source (lazy-load attribute preferred)
    pub image_src: Option<String>,
}

/// One entry of a JSON search response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCandidate {
    /// The entry's display value (product title)
    pub title: String,

    pub data: ApiProductData,
}

/// The flat `data` object of a JSON search result
///
/// Numeric fields accept numbers or numeric strings and text fields accept
/// strings or numbers; a value of any other shape is treated as absent
/// instead of failing the entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiProductData {
    #[serde(deserialize_with = "lenient_string")]
    pub url: Option<String>,

    #[serde(alias = "image", deserialize_with = "lenient_string")]
    pub image_url: Option<String>,

    #[serde(deserialize_with = "lenient_f64")]
    pub price: Option<f64>,

    #[serde(
        alias = "original_price",
        alias = "list_price",
        deserialize_with = "lenient_f64"
    )]
    pub compare_at_price: Option<f64>,

    #[serde(alias = "vendor", alias = "manufacturer", deserialize_with = "lenient_string")]
    pub brand: Option<String>,

    #[serde(alias = "average_rating", deserialize_with = "lenient_f64")]
    pub rating: Option<f64>,

    #[serde(
        alias = "num_reviews",
        alias = "reviews_count",
        deserialize_with = "lenient_f64"
    )]
    pub review_count: Option<f64>,

    #[serde(alias = "variation_id", deserialize_with = "lenient_string")]
    pub sku: Option<String>,

    #[serde(alias = "category", deserialize_with = "lenient_string")]
    pub product_type: Option<String>,

    #[serde(deserialize_with = "lenient_string")]
    pub description: Option<String>,
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let cleaned: String = s.chars().filter(|c| *c != '$' && *c != ',').collect();
            cleaned.trim().parse::<f64>().ok()
        }
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
