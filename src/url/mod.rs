//! URL handling module for Driftnet
//!
//! Normalized URL strings are the frontier's dedup key and the key of every
//! stored page, link record and posting. The host is the unit of politeness.

mod domain;
mod normalize;

pub use domain::{domain_of, extract_domain, robots_url};
pub use normalize::{normalize_url, normalize_url_str};
