//! Log decoding for `NewMetadata` events.
//!
//! Both the indexing API (hex strings) and the websocket provider (typed
//! logs) feed into one [`RawLog`] shape, which is then decoded into a
//! [`MetadataEvent`]. Decoding is pure; it never touches the network or the
//! cache.

use alloy::{
    primitives::{Address, Bytes, LogData, B256},
    rpc::types::Log,
    sol_types::SolEvent,
};

use crate::{
    abis::NewMetadata,
    db::models::{LogRecord, MetadataEvent},
    error::{DecodeError, SyncError},
    utils::{hex_encode, parse_address, parse_b256, parse_bytes, parse_quantity},
};

/// Source-agnostic log as delivered by either sync path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: Option<u64>,
    pub log_index: Option<u64>,
    pub tx_hash: Option<B256>,
    /// Set by the node when the log was dropped by a reorg
    pub removed: bool,
}

impl RawLog {
    /// Short identity used in log lines and errors.
    pub fn id(&self) -> String {
        format!(
            "block={} log_index={} tx={}",
            self.block_number
                .map(|b| b.to_string())
                .unwrap_or_else(|| "?".to_string()),
            self.log_index
                .map(|i| i.to_string())
                .unwrap_or_else(|| "?".to_string()),
            self.tx_hash
                .map(|h| hex_encode(h.as_slice()))
                .unwrap_or_else(|| "?".to_string()),
        )
    }
}

impl TryFrom<&LogRecord> for RawLog {
    type Error = DecodeError;

    fn try_from(record: &LogRecord) -> Result<Self, Self::Error> {
        let topics = record
            .topics
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| parse_b256("topics", t))
            .collect::<Result<Vec<_>, _>>()?;

        let tx_hash = if record.transaction_hash.is_empty() {
            None
        } else {
            Some(parse_b256("transactionHash", &record.transaction_hash)?)
        };

        Ok(Self {
            address: parse_address("address", &record.address)?,
            topics,
            data: parse_bytes("data", &record.data)?,
            block_number: Some(parse_quantity("blockNumber", &record.block_number)?),
            log_index: Some(parse_quantity("logIndex", &record.log_index)?),
            tx_hash,
            removed: false,
        })
    }
}

impl From<&Log> for RawLog {
    fn from(log: &Log) -> Self {
        Self {
            address: log.address(),
            topics: log.topics().to_vec(),
            data: log.data().data.clone(),
            block_number: log.block_number,
            log_index: log.log_index,
            tx_hash: log.transaction_hash,
            removed: log.removed,
        }
    }
}

/// Decode one raw log into a metadata event.
///
/// Total over every log matching the subscription filter; anything else is a
/// [`DecodeError`].
pub fn parse_log(raw: &RawLog) -> Result<MetadataEvent, DecodeError> {
    let topic0 = raw.topics.first().ok_or(DecodeError::MissingTopic)?;
    if *topic0 != NewMetadata::SIGNATURE_HASH {
        return Err(DecodeError::UnexpectedTopic {
            expected: hex_encode(NewMetadata::SIGNATURE_HASH.as_slice()),
            found: hex_encode(topic0.as_slice()),
        });
    }

    let log_data = LogData::new(raw.topics.clone(), raw.data.clone())
        .ok_or(DecodeError::TooManyTopics(raw.topics.len()))?;
    let event = NewMetadata::decode_log_data(&log_data)?;

    Ok(MetadataEvent {
        account: event.account,
        metadata: event.metadata,
        block_number: raw
            .block_number
            .ok_or(DecodeError::MissingPosition("block number"))?,
        log_index: raw
            .log_index
            .ok_or(DecodeError::MissingPosition("log index"))?,
        tx_hash: raw.tx_hash,
    })
}

/// Decode an indexing API record, tagging failures with the record identity.
pub fn parse_record(record: &LogRecord) -> Result<MetadataEvent, SyncError> {
    let log_id = || {
        format!(
            "block={} log_index={} tx={}",
            record.block_number, record.log_index, record.transaction_hash
        )
    };
    let raw = RawLog::try_from(record).map_err(|source| SyncError::Decode {
        log_id: log_id(),
        source,
    })?;
    parse_log(&raw).map_err(|source| SyncError::Decode {
        log_id: log_id(),
        source,
    })
}

/// Decode a whole page, failing on the first bad record.
pub fn parse_records(records: &[LogRecord]) -> Result<Vec<MetadataEvent>, SyncError> {
    records.iter().map(parse_record).collect()
}
