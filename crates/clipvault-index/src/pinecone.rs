//! Pinecone data-plane index client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument};

use clipvault_core::{defaults, Error, Result, SearchMatch, VectorIndex, VectorRecord};

/// Default request timeout (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = defaults::INDEX_TIMEOUT_SECS;

/// Configuration for the Pinecone data-plane client.
#[derive(Debug, Clone)]
pub struct PineconeConfig {
    /// API key sent in the `Api-Key` header.
    pub api_key: String,
    /// Index name, used to synthesize the data-plane host.
    pub index_name: String,
    /// Project id, used to synthesize the data-plane host.
    pub project_id: String,
    /// Environment, e.g. `us-east-1-aws`.
    pub environment: String,
    /// Explicit data-plane host; overrides the synthesized one. May carry
    /// a scheme (used by tests to point at a local server).
    pub custom_host: Option<String>,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl PineconeConfig {
    /// Resolve the data-plane base URL: the custom host when set,
    /// otherwise `{index}-{project}.svc.{environment}.pinecone.io`.
    pub fn base_url(&self) -> String {
        match &self.custom_host {
            Some(host) if host.contains("://") => host.trim_end_matches('/').to_string(),
            Some(host) => format!("https://{}", host),
            None => format!(
                "https://{}-{}.svc.{}.pinecone.io",
                self.index_name, self.project_id, self.environment
            ),
        }
    }
}

/// Pinecone data-plane implementation of [`VectorIndex`].
pub struct PineconeIndex {
    client: Client,
    config: PineconeConfig,
    base_url: String,
    api_version: &'static str,
}

impl PineconeIndex {
    /// Create a new index client with the given configuration.
    pub fn new(config: PineconeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Request(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = config.base_url();
        info!("Initializing vector index client: host={}", base_url);

        Ok(Self {
            client,
            config,
            base_url,
            api_version: defaults::INDEX_API_VERSION,
        })
    }

    /// Get the current configuration.
    pub fn config(&self) -> &PineconeConfig {
        &self.config
    }

    fn request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, endpoint))
            .header("Api-Key", &self.config.api_key)
            .header("X-Pinecone-Api-Version", self.api_version)
    }

    async fn check(op: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(op, status = status.as_u16(), "index request rejected");
            return Err(Error::remote(status, body));
        }
        Ok(response)
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

#[derive(Deserialize, Default)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<SearchMatch>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [String],
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    #[instrument(skip(self, records), fields(subsystem = "index", component = "pinecone", op = "upsert", count = records.len()))]
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        let response = self
            .request("/vectors/upsert")
            .json(&UpsertRequest { vectors: records })
            .send()
            .await
            .map_err(|e| Error::Request(format!("Upsert request failed: {}", e)))?;

        Self::check("upsert", response).await?;
        debug!("Upsert acknowledged");
        Ok(())
    }

    #[instrument(skip(self, vector), fields(subsystem = "index", component = "pinecone", op = "query", top_k))]
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<SearchMatch>> {
        let response = self
            .request("/query")
            .json(&QueryRequest {
                vector,
                top_k,
                include_metadata,
            })
            .send()
            .await
            .map_err(|e| Error::Request(format!("Query request failed: {}", e)))?;

        let response = Self::check("query", response).await?;
        let result: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("Failed to parse query response: {}", e)))?;

        debug!(result_count = result.matches.len(), "Query complete");
        Ok(result.matches)
    }

    #[instrument(skip(self, ids), fields(subsystem = "index", component = "pinecone", op = "delete", count = ids.len()))]
    async fn delete(&self, ids: &[String]) -> Result<()> {
        let response = self
            .request("/vectors/delete")
            .json(&DeleteRequest { ids })
            .send()
            .await
            .map_err(|e| Error::Request(format!("Delete request failed: {}", e)))?;

        Self::check("delete", response).await?;
        debug!("Delete acknowledged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PineconeConfig {
        PineconeConfig {
            api_key: "index-key-0123456789".to_string(),
            index_name: "captures".to_string(),
            project_id: "ab12cd34".to_string(),
            environment: "us-east-1-aws".to_string(),
            custom_host: None,
            timeout_seconds: 5,
        }
    }

    #[test]
    fn test_synthesized_host() {
        assert_eq!(
            config().base_url(),
            "https://captures-ab12cd34.svc.us-east-1-aws.pinecone.io"
        );
    }

    #[test]
    fn test_custom_host_without_scheme_gets_https() {
        let mut c = config();
        c.custom_host = Some("captures-xyz.svc.aped-1234.pinecone.io".to_string());
        assert_eq!(
            c.base_url(),
            "https://captures-xyz.svc.aped-1234.pinecone.io"
        );
    }

    #[test]
    fn test_custom_host_with_scheme_is_used_verbatim() {
        let mut c = config();
        c.custom_host = Some("http://127.0.0.1:9000/".to_string());
        assert_eq!(c.base_url(), "http://127.0.0.1:9000");
    }
}
