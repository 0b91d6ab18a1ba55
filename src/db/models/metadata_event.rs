use alloy::primitives::{Address, Bytes, B256};

use crate::utils::hex_encode;

/// One decoded `NewMetadata` log.
///
/// Never persisted as-is: only its effect, the latest metadata per account,
/// survives in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEvent {
    pub account: Address,
    pub metadata: Bytes,
    pub block_number: u64,
    pub log_index: u64,
    pub tx_hash: Option<B256>,
}

impl MetadataEvent {
    /// EIP-55 checksummed account address, the key lookups use.
    pub fn cache_key(&self) -> String {
        self.account.to_checksum(None)
    }

    /// Lowercase 0x-prefixed metadata hex.
    pub fn cache_value(&self) -> String {
        hex_encode(&self.metadata)
    }

    pub fn cache_entry(&self) -> (String, String) {
        (self.cache_key(), self.cache_value())
    }

    /// Chain position used for ordering, `(block_number, log_index)`.
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}
