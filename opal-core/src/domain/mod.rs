//! Core domain types
//!
//! These types are shared between the compute node (which mutates and
//! persists jobs) and the clients that submit or inspect them.

pub mod job;
pub mod node;
