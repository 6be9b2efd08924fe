//! Per-domain crawl state
//!
//! - `DomainState`: cached robots rules plus the cooldown clock that paces
//!   requests to one domain

mod domain_state;

pub use domain_state::DomainState;
