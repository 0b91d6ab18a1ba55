//! Hex encoding and parsing helpers.
//!
//! The indexing API hands every field back as a string, so these turn those
//! strings into alloy primitives and report the offending field on failure.

use alloy::primitives::{hex, Address, Bytes, B256};

use crate::error::DecodeError;

// ============================================
// Hex Encoding
// ============================================

/// Encode bytes as a lowercase hex string with 0x prefix.
pub fn hex_encode(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Prefix `0x` when missing.
pub fn format_hex(value: &str) -> String {
    if value.starts_with("0x") {
        value.to_string()
    } else {
        format!("0x{}", value)
    }
}

// ============================================
// Field Parsing
// ============================================

fn invalid(field: &'static str, value: &str) -> DecodeError {
    DecodeError::InvalidField {
        field,
        value: value.to_string(),
    }
}

/// Parse a quantity that is either 0x-hex or plain decimal.
///
/// A bare `"0x"` and an empty string both mean zero.
pub fn parse_quantity(field: &'static str, value: &str) -> Result<u64, DecodeError> {
    let value = value.trim();
    match value.strip_prefix("0x") {
        Some("") => Ok(0),
        Some(digits) => u64::from_str_radix(digits, 16).map_err(|_| invalid(field, value)),
        None if value.is_empty() => Ok(0),
        None => value.parse::<u64>().map_err(|_| invalid(field, value)),
    }
}

pub fn parse_address(field: &'static str, value: &str) -> Result<Address, DecodeError> {
    value.trim().parse::<Address>().map_err(|_| invalid(field, value))
}

pub fn parse_b256(field: &'static str, value: &str) -> Result<B256, DecodeError> {
    value.trim().parse::<B256>().map_err(|_| invalid(field, value))
}

pub fn parse_bytes(field: &'static str, value: &str) -> Result<Bytes, DecodeError> {
    let value = value.trim();
    if value.is_empty() || value == "0x" {
        return Ok(Bytes::new());
    }
    hex::decode(value)
        .map(Bytes::from)
        .map_err(|_| invalid(field, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity_accepts_hex_and_decimal() {
        assert_eq!(parse_quantity("blockNumber", "0x4b3a1").unwrap(), 0x4b3a1);
        assert_eq!(parse_quantity("blockNumber", "1000").unwrap(), 1000);
    }

    #[test]
    fn test_parse_quantity_bare_prefix_is_zero() {
        // Etherscan renders log index zero as "0x"
        assert_eq!(parse_quantity("logIndex", "0x").unwrap(), 0);
        assert_eq!(parse_quantity("logIndex", "").unwrap(), 0);
    }

    #[test]
    fn test_parse_quantity_reports_field() {
        let err = parse_quantity("blockNumber", "0xzz").unwrap_err();
        assert!(err.to_string().contains("blockNumber"));
    }

    #[test]
    fn test_parse_bytes() {
        assert_eq!(parse_bytes("data", "0x").unwrap(), Bytes::new());
        assert_eq!(
            parse_bytes("data", "0x0102").unwrap(),
            Bytes::from(vec![1u8, 2])
        );
        assert!(parse_bytes("data", "0x123").is_err());
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex("abcd"), "0xabcd");
        assert_eq!(format_hex("0xabcd"), "0xabcd");
    }
}
