//! Read-only client for the Firestore-backed name registry.

use std::{collections::HashMap, time::Duration};

use alloy::primitives::{Address, B256};
use log::debug;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::{
    config::RegistrySettings,
    error::ResolveError,
    utils::{format_hex, hex_encode, parse_address},
};

const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";
const EMULATOR_URL: &str = "http://127.0.0.1:5002/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    fields: HashMap<String, FieldValue>,
}

#[derive(Debug, Deserialize)]
struct FieldValue {
    #[serde(rename = "stringValue")]
    string_value: Option<String>,
}

impl Document {
    fn string_field(&self, name: &str) -> Result<&str, ResolveError> {
        self.fields
            .get(name)
            .and_then(|v| v.string_value.as_deref())
            .ok_or_else(|| ResolveError::Registry(format!("document has no string field {}", name)))
    }
}

#[derive(Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    documents_url: String,
}

impl RegistryClient {
    pub fn new(settings: &RegistrySettings) -> Result<Self, ResolveError> {
        let base = if settings.dev { EMULATOR_URL } else { FIRESTORE_URL };
        Self::with_base_url(base, &settings.project_id)
    }

    pub fn with_base_url(base: &str, project_id: &str) -> Result<Self, ResolveError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents",
                base.trim_end_matches('/'),
                project_id
            ),
        })
    }

    async fn document(&self, collection: &str, id: &str) -> Result<Option<Document>, ResolveError> {
        let url = format!("{}/{}/{}", self.documents_url, collection, id);
        debug!("Fetching registry document {}/{}", collection, id);

        let response = self.http.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::OK => Ok(Some(response.json().await?)),
            status => Err(ResolveError::Registry(format!(
                "failed to fetch {}/{}: HTTP {}",
                collection, id, status
            ))),
        }
    }

    /// Owner address registered for a name hash, if any.
    pub async fn resolve_uid(&self, uid: B256) -> Result<Option<Address>, ResolveError> {
        let Some(doc) = self.document("mns", &hex_encode(uid.as_slice())).await? else {
            return Ok(None);
        };
        let raw = format_hex(doc.string_field("address")?);
        let address = parse_address("address", &raw)
            .map_err(|e| ResolveError::Registry(e.to_string()))?;
        Ok(Some(address))
    }

    /// Metadata the registry holds for `address`, 0x-prefixed.
    pub async fn metadata_of(&self, address: Address) -> Result<Option<String>, ResolveError> {
        let Some(doc) = self.document("users", &address.to_checksum(None)).await? else {
            return Ok(None);
        };
        Ok(Some(format_hex(doc.string_field("metadata")?)))
    }
}
