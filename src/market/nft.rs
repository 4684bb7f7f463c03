//! Wallet NFT listing through an OpenSea-style API.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::NftConfig;

pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300?text=No+Image";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Nft {
    pub id: String,
    pub name: String,
    pub collection: String,
    pub image_url: String,
    pub image_hint: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawNft {
    #[serde(default)]
    contract: String,
    #[serde(default)]
    identifier: String,
    name: Option<String>,
    collection: Option<String>,
    image_url: Option<String>,
    display_image_url: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NftPage {
    #[serde(default)]
    nfts: Vec<RawNft>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl From<RawNft> for Nft {
    fn from(raw: RawNft) -> Self {
        Nft {
            id: format!("{}-{}", raw.contract, raw.identifier),
            name: non_empty(raw.name).unwrap_or_else(|| format!("#{}", raw.identifier)),
            collection: non_empty(raw.collection).unwrap_or_else(|| "Unknown Collection".to_string()),
            image_url: non_empty(raw.image_url)
                .or_else(|| non_empty(raw.display_image_url))
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            image_hint: non_empty(raw.description).unwrap_or_else(|| "NFT Image".to_string()),
        }
    }
}

#[derive(Clone)]
pub struct NftService {
    client: reqwest::Client,
    api_url: String,
    chain: String,
    api_key: Option<String>,
}

impl NftService {
    pub fn new(config: &NftConfig, api_key: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            chain: config.chain.clone(),
            api_key,
        })
    }

    pub async fn nfts(&self, address: &str) -> Vec<Nft> {
        let address = address.trim();
        if address.is_empty() {
            return Vec::new();
        }

        let mut request = self.client.get(format!(
            "{}/chain/{}/account/{}/nfts",
            self.api_url, self.chain, address
        ));
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = match request.send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(status = %r.status(), address = %address, "NFT API request failed");
                return Vec::new();
            }
            Err(e) => {
                tracing::error!(error = %e, address = %address, "Error fetching NFTs");
                return Vec::new();
            }
        };

        match response.json::<NftPage>().await {
            Ok(page) => page.nfts.into_iter().map(Nft::from).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "NFT API returned an unexpected body");
                Vec::new()
            }
        }
    }
}
