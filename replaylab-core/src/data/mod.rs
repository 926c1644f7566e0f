//! Market-data access: cost-bounded cache, request coalescing, upstream
//! sources, and the block-scoped stores the replay engine reads from.

pub mod algorithms;
pub mod cache;
pub mod error;
pub mod flight;
pub mod http;
pub mod market;
pub mod memory_source;
pub mod provider;
pub mod request;
pub mod source;
pub mod store;
pub mod synthetic;

pub use algorithms::AlgorithmStore;
pub use cache::{CacheMode, CostCache, ABSENT_COST, DEFAULT_MAX_COST, LIVE_TTL, PAYLOAD_COST};
pub use error::DataError;
pub use flight::SingleFlight;
pub use http::{HttpSource, SourceUrls};
pub use market::MarketData;
pub use memory_source::MemorySource;
pub use provider::Provider;
pub use request::{Payload, Request, RequestKind};
pub use source::MarketSource;
pub use store::DataStore;
pub use synthetic::synthetic_candles;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock `mutex`, ignoring poisoning: every critical section here leaves the
/// protected data consistent even if a caller's closure panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
