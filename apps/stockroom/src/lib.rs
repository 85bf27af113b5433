//! # Stockroom - Inventory Catalog Server
//!
//! Library surface of the Stockroom binary: the HTTP API and the CLI.
//! Exposed as a lib so integration tests can drive the router directly.

pub mod api;
pub mod cli;
