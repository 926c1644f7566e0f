//! The upstream contract behind the cache layer.
//!
//! A source answers one request at a time and knows nothing about caching or
//! coalescing. Swapping the HTTP source for an in-memory one is how tests and
//! the synthetic CLI mode run without a network.

use super::error::DataError;
use super::request::{Payload, Request};
use crate::domain::ExchangeList;

pub trait MarketSource: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Fetch one payload. `Ok(None)` means the upstream confirmed the data
    /// does not exist.
    fn fetch(&self, request: &Request) -> Result<Option<Payload>, DataError>;

    /// The broker/symbol listing.
    fn exchange_info(&self) -> Result<ExchangeList, DataError>;
}
