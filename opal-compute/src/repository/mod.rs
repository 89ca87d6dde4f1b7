//! Repository layer
//!
//! Repositories abstract every store and service the node talks to: the job
//! document store, the analytics event store, the algorithm-retrieval
//! service and the aggregation service. They carry no business logic.
//!
//! All repositories are trait-based so the engine can be tested in memory.

mod aggregation;
mod algorithms;
mod events;
mod jobs;

#[cfg(test)]
pub mod memory;

// Re-export traits
pub use aggregation::{AggregationService, AggregationSession};
pub use algorithms::AlgorithmRepository;
pub use events::EventRepository;
pub use jobs::JobRepository;

// Re-export implementations and records
pub use events::{EventRecord, PgEventRepository};
pub use jobs::PgJobRepository;
