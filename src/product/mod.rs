//! Product records and the normalizer that produces them
//!
//! A record is born as a [`RawCandidate`] inside a list extractor, becomes a
//! [`ProductRecord`] in [`normalize_candidate`], is enriched at most once from
//! its detail page via [`ProductRecord::enrich`], and is then frozen and
//! handed to a sink.

mod candidate;
mod normalize;

pub use candidate::{ApiCandidate, ApiProductData, HtmlCandidate, RawCandidate};
pub use normalize::{format_price, normalize_candidate, normalize_detail, price_pair};

use serde::{Deserialize, Serialize};

/// Canonical output record
///
/// `url` is the identity key and is always an absolute URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub title: Option<String>,
    pub brand: Option<String>,
    pub price: Option<String>,

    /// Present only when numerically greater than `price`
    pub original_price: Option<String>,

    /// Absolute, query-free image URL
    pub image_url: Option<String>,

    /// In the range 0..=5
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub description: Option<String>,
    pub specifications: Option<String>,
    pub sku: Option<String>,
    pub product_type: Option<String>,
    pub url: String,
}

impl ProductRecord {
    /// Creates a record with only its identity set
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            title: None,
            brand: None,
            price: None,
            original_price: None,
            image_url: None,
            rating: None,
            review_count: None,
            description: None,
            specifications: None,
            sku: None,
            product_type: None,
            url: url.into(),
        }
    }

    /// Applies detail-page fields; detail values win where present
    ///
    /// Price and original price move together so the pair keeps its ordering
    /// invariant. The URL never changes.
    pub fn enrich(mut self, detail: DetailFields) -> Self {
        if detail.price.is_some() {
            self.price = detail.price;
            self.original_price = detail.original_price;
        }

        overwrite(&mut self.title, detail.title);
        overwrite(&mut self.brand, detail.brand);
        overwrite(&mut self.image_url, detail.image_url);
        overwrite(&mut self.rating, detail.rating);
        overwrite(&mut self.review_count, detail.review_count);
        overwrite(&mut self.description, detail.description);
        overwrite(&mut self.specifications, detail.specifications);
        self
    }
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Supplementary fields read from a product's detail page
///
/// Every field is independent; a selector that matches nothing leaves its
/// field empty without affecting the others.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailFields {
    pub title: Option<String>,
    pub brand: Option<String>,
    pub price: Option<String>,
    pub original_price: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub description: Option<String>,
    pub specifications: Option<String>,
    pub image_url: Option<String>,
}

impl DetailFields {
    /// Returns true if no field was extracted
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
