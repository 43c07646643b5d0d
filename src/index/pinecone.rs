//! Pinecone REST client.
//!
//! Talks to the data plane of a single index (`/vectors/upsert`, `/query`). The
//! index host is either configured directly or looked up once through the
//! control plane when the client is built.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{QueryMatch, VectorIndex};
use crate::document::{ChunkMetadata, IndexRecord};
use crate::error::ServiceError;

const SERVICE: &str = "Pinecone";

/// Control-plane base URL used to resolve index hosts.
pub const DEFAULT_CONTROL_URL: &str = "https://api.pinecone.io";

/// REST API version pinned for request/response shapes.
const API_VERSION: &str = "2024-07";

/// Connection settings for one index.
#[derive(Debug, Clone)]
pub struct PineconeSettings {
    /// Value of the `api-key` header.
    pub api_key: String,
    /// Index name, used to resolve the host when `host` is `None`.
    pub index_name: String,
    /// Data-plane host, with or without scheme.
    pub host: Option<String>,
    /// Control-plane base URL.
    pub control_url: String,
    /// Namespace for all reads and writes; the default namespace when `None`.
    pub namespace: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Blocking client bound to a single Pinecone index.
#[derive(Clone)]
pub struct PineconeIndex {
    client: Client,
    base_url: String,
    namespace: Option<String>,
}

impl PineconeIndex {
    /// Builds the client, resolving the index host if it was not supplied.
    pub fn connect(settings: PineconeSettings) -> Result<Self, ServiceError> {
        if settings.api_key.trim().is_empty() {
            return Err(ServiceError::config(SERVICE, "missing Pinecone API key"));
        }
        if settings.index_name.trim().is_empty() {
            return Err(ServiceError::config(SERVICE, "missing Pinecone index name"));
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            "api-key",
            HeaderValue::from_str(settings.api_key.trim())
                .map_err(|_| ServiceError::config(SERVICE, "invalid Pinecone API key"))?,
        );
        headers.insert(
            "x-pinecone-api-version",
            HeaderValue::from_static(API_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(settings.timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| ServiceError::transport(SERVICE, err))?;

        let host = match settings.host.filter(|host| !host.trim().is_empty()) {
            Some(host) => host,
            None => describe_index_host(&client, &settings.control_url, &settings.index_name)?,
        };
        let base_url = data_plane_url(&host);
        info!(index = %settings.index_name, host = %base_url, "connected to Pinecone index");
        Ok(Self {
            client,
            base_url,
            namespace: settings.namespace.filter(|ns| !ns.is_empty()),
        })
    }

    fn post<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::blocking::Response, ServiceError> {
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .map_err(|err| ServiceError::transport(SERVICE, err))?;
        if !resp.status().is_success() {
            return Err(ServiceError::from_response(SERVICE, resp));
        }
        Ok(resp)
    }
}

impl VectorIndex for PineconeIndex {
    fn upsert(&self, record: &IndexRecord) -> Result<(), ServiceError> {
        let request = UpsertRequest {
            vectors: vec![UpsertVector {
                id: &record.id,
                values: &record.vector,
                metadata: &record.metadata,
            }],
            namespace: self.namespace.as_deref(),
        };
        let resp = self.post("/vectors/upsert", &request)?;
        let parsed: UpsertResponse = resp
            .json()
            .map_err(|err| ServiceError::malformed(SERVICE, err.to_string()))?;
        debug!(id = %record.id, upserted = parsed.upserted_count, "upserted record");
        Ok(())
    }

    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>, ServiceError> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };
        let resp = self.post("/query", &request)?;
        let parsed: QueryResponse = resp
            .json()
            .map_err(|err| ServiceError::malformed(SERVICE, err.to_string()))?;
        debug!(matches = parsed.matches.len(), top_k, "queried index");
        Ok(parsed.matches)
    }
}

fn describe_index_host(
    client: &Client,
    control_url: &str,
    index_name: &str,
) -> Result<String, ServiceError> {
    let url = format!(
        "{}/indexes/{}",
        control_url.trim_end_matches('/'),
        index_name.trim()
    );
    let resp = client
        .get(&url)
        .send()
        .map_err(|err| ServiceError::transport(SERVICE, err))?;
    if !resp.status().is_success() {
        return Err(ServiceError::from_response(SERVICE, resp));
    }
    let described: DescribeIndexResponse = resp
        .json()
        .map_err(|err| ServiceError::malformed(SERVICE, err.to_string()))?;
    if described.host.trim().is_empty() {
        return Err(ServiceError::malformed(
            SERVICE,
            format!("index {index_name} has no host yet"),
        ));
    }
    Ok(described.host)
}

fn data_plane_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a ChunkMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct DescribeIndexResponse {
    host: String,
}
