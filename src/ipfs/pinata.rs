//! Pinata-backed [`ContentStore`].
//!
//! Uploads go through the Pinata pinning API with a bearer JWT; reads go
//! through an IPFS HTTP gateway.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::config::IpfsConfig;
use crate::ipfs::{ContentStore, IpfsError, IpfsResult};
use crate::observability::metrics;

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// Pinata pinning client.
#[derive(Clone)]
pub struct PinataStore {
    client: reqwest::Client,
    api_url: String,
    gateway_url: String,
    jwt: Option<String>,
}

impl PinataStore {
    pub fn new(config: &IpfsConfig, jwt: Option<String>, timeout: Duration) -> IpfsResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        if jwt.is_none() {
            tracing::warn!("Pinata JWT not set; message uploads will fail");
        }
        Ok(Self {
            client,
            api_url: config.pinata_api_url.trim_end_matches('/').to_string(),
            gateway_url: config.gateway_url.trim_end_matches('/').to_string(),
            jwt,
        })
    }
}

impl std::fmt::Debug for PinataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinataStore")
            .field("api_url", &self.api_url)
            .field("gateway_url", &self.gateway_url)
            .field("has_jwt", &self.jwt.is_some())
            .finish()
    }
}

#[async_trait]
impl ContentStore for PinataStore {
    async fn put_json(&self, name: &str, value: &serde_json::Value) -> IpfsResult<String> {
        let jwt = self.jwt.as_deref().ok_or(IpfsError::NotConfigured)?;

        let response = self
            .client
            .post(format!("{}/pinning/pinJSONToIPFS", self.api_url))
            .bearer_auth(jwt)
            .json(&json!({
                "pinataContent": value,
                "pinataMetadata": { "name": name },
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "Pinata upload failed");
            return Err(IpfsError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|e| IpfsError::Malformed(e.to_string()))?;
        tracing::debug!(cid = %pinned.ipfs_hash, name, "Pinned JSON to IPFS");
        Ok(pinned.ipfs_hash)
    }

    async fn get_json(&self, cid: &str) -> IpfsResult<Option<serde_json::Value>> {
        let response = match self
            .client
            .get(format!("{}/ipfs/{}", self.gateway_url, cid))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                metrics::record_ipfs_fetch("error");
                return Err(e.into());
            }
        };

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                metrics::record_ipfs_fetch("missing");
                Ok(None)
            }
            status if status.is_success() => {
                let value = response.json().await.map_err(|e| {
                    metrics::record_ipfs_fetch("error");
                    IpfsError::Malformed(e.to_string())
                })?;
                metrics::record_ipfs_fetch("hit");
                Ok(Some(value))
            }
            status => {
                metrics::record_ipfs_fetch("error");
                Err(IpfsError::Upstream {
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                })
            }
        }
    }
}
