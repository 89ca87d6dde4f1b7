//! Service layer
//!
//! Business logic that sits below the engine: the pseudonymizing data
//! fetcher and the node status tracker.

pub mod fetcher;
pub mod pseudonym;
mod status;

pub use fetcher::{DataFetcher, FetchError};
pub use status::StatusTracker;
