//! URL handling module for Listing-Harvest
//!
//! This module resolves product links to absolute URLs, canonicalizes image
//! sources, and builds the search request URLs for both upstream modes.

mod normalize;
mod search;

// Re-export main functions
pub use normalize::{canonicalize_image_url, resolve_absolute};
pub use search::{api_search_url, html_search_url, SearchIdentity};
