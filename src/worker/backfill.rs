//! Historical backfill from an Etherscan-compatible indexing API.
//!
//! Pages through `getLogs` for a block range in ascending order, decoding
//! each page in full before writing it to the cache with a single `mset`.

use std::{sync::Arc, time::Duration};

use alloy::{primitives::Address, sol_types::SolEvent};
use log::{debug, info};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    abis::NewMetadata,
    config::IndexerSettings,
    db::{
        models::{ApiResponse, LogRecord, NO_RECORDS_FOUND},
        CacheStore,
    },
    error::SyncError,
    utils::hex_encode,
    worker::parser,
};

/// Outcome of one completed backfill pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackfillStats {
    pub pages: usize,
    pub events: usize,
}

pub struct BackfillFetcher {
    http: reqwest::Client,
    url: Url,
    api_key: String,
    contract: Address,
    page_size: usize,
    cache: Arc<dyn CacheStore>,
}

impl BackfillFetcher {
    pub fn new(
        settings: &IndexerSettings,
        contract: Address,
        cache: Arc<dyn CacheStore>,
    ) -> Result<Self, SyncError> {
        let url = Url::parse(&settings.url)
            .map_err(|e| SyncError::UpstreamQuery(format!("invalid indexing API URL: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url,
            api_key: settings.api_key.clone(),
            contract,
            page_size: settings.page_size.max(1),
            cache,
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetch one page of `NewMetadata` logs for `[from_block, to_block]`.
    ///
    /// "No records found" is an empty page, not an error.
    async fn fetch_page(
        &self,
        from_block: u64,
        to_block: u64,
        page: usize,
    ) -> Result<Vec<LogRecord>, SyncError> {
        let response = self
            .http
            .get(self.url.clone())
            .query(&[
                ("module", "logs".to_string()),
                ("action", "getLogs".to_string()),
                ("page", page.to_string()),
                ("offset", self.page_size.to_string()),
                ("fromBlock", from_block.to_string()),
                ("toBlock", to_block.to_string()),
                ("address", hex_encode(self.contract.as_slice())),
                ("topic0", hex_encode(NewMetadata::SIGNATURE_HASH.as_slice())),
                ("apikey", self.api_key.clone()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::UpstreamQuery(format!(
                "HTTP {} for page {} of blocks {}..={}",
                status, page, from_block, to_block
            )));
        }

        let body: ApiResponse = response.json().await?;

        if body.status == "0" {
            if body.message == NO_RECORDS_FOUND {
                return Ok(Vec::new());
            }
            let reason = match body.result {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            return Err(SyncError::UpstreamQuery(format!(
                "{} ({})",
                reason, body.message
            )));
        }

        serde_json::from_value(body.result).map_err(|e| {
            SyncError::UpstreamQuery(format!("unexpected getLogs result payload: {}", e))
        })
    }

    /// Replay every log in `[from_block, to_block]` into the cache.
    ///
    /// A page is only followed by another when it came back full. One
    /// undecodable log aborts the pass before its page is written. The
    /// shutdown token is checked between pages, never mid-page.
    pub async fn backfill(
        &self,
        from_block: u64,
        to_block: u64,
        shutdown: &CancellationToken,
    ) -> Result<BackfillStats, SyncError> {
        info!(
            "Backfilling NewMetadata events for blocks {}..={}",
            from_block, to_block
        );

        let mut stats = BackfillStats::default();
        let mut page = 1;

        loop {
            if shutdown.is_cancelled() {
                return Err(SyncError::Shutdown);
            }

            let records = self.fetch_page(from_block, to_block, page).await?;
            stats.pages += 1;

            let events = parser::parse_records(&records)?;
            if !events.is_empty() {
                let entries: Vec<(String, String)> =
                    events.iter().map(|e| e.cache_entry()).collect();
                for (account, metadata) in &entries {
                    debug!("======> {} <-> {}", account, metadata);
                }
                self.cache.mset(&entries).await?;
                stats.events += entries.len();
            }

            if records.len() < self.page_size {
                break;
            }
            page += 1;
        }

        info!(
            "Backfill of blocks {}..={} restored {} events over {} page(s)",
            from_block, to_block, stats.events, stats.pages
        );

        Ok(stats)
    }
}
