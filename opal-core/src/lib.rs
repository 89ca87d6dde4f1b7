//! OPAL Core
//!
//! Core types shared by the OPAL compute node, its HTTP clients and the CLI.
//!
//! This crate contains:
//! - Domain types: the job document, its status history and the node status
//! - DTOs: request/response bodies exchanged with the compute node and its peers

pub mod domain;
pub mod dto;
