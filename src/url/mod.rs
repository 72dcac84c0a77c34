//! URL handling module for brand-crawler
//!
//! This module provides visited-set normalization and the network-location
//! comparison used to keep a crawl on its root site.

mod domain;
mod normalize;

pub use domain::{is_same_site, netloc};
pub use normalize::normalize_url;
