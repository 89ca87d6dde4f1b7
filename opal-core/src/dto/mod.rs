//! Data Transfer Objects for inter-service communication
//!
//! Bodies exchanged with the compute node's control surface, the
//! algorithm-retrieval service and the aggregation service.

pub mod aggregation;
pub mod algorithm;
pub mod job;
pub mod node;
