//! Field extraction from search and detail pages
//!
//! - [`list`]: search-result pages, HTML cards or JSON results
//! - [`detail`]: product detail pages
//! - [`text`]: price patterns and HTML cleaning shared by both

mod detail;
mod list;
mod text;

pub use detail::extract_detail;
pub use list::{
    extract_api_list, extract_html_list, extract_list, ListPage, CARD_SELECTOR,
    TITLE_LINK_SELECTOR,
};
pub use text::{
    clean_text, collapse_whitespace, element_text, find_prices, first_decimal, first_integer,
    first_price, non_empty, parse_price_value,
};
