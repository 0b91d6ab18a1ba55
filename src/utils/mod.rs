//! Utility functions for the metasync engine.
//!
//! - [`conversion`] - Hex encoding and indexing API field parsing
//! - [`backoff`] - Bounded exponential reconnect backoff

mod backoff;
mod conversion;

pub use backoff::Backoff;
pub use conversion::{format_hex, hex_encode, parse_address, parse_b256, parse_bytes, parse_quantity};
