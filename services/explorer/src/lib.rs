//! services/explorer/src/lib.rs
//!
//! The report explorer client: HTTP and storage adapters, the state
//! controllers and the configuration they are built from.

pub mod adapters;
pub mod config;
pub mod error;
pub mod state;
