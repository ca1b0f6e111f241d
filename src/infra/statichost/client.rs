use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::fetch::{BasicClient, CacheBust, HttpClient, fetch_json};
use crate::services::DataHost;

/// [`DataHost`] implementation over a static file host.
///
/// All requests go through [`CacheBust`] so the CDN in front of the data
/// directory never serves a stale day file.
pub struct StaticDataClient<C = BasicClient> {
    base_url: String,
    http: CacheBust<C>,
}

impl StaticDataClient<BasicClient> {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, BasicClient::new())
    }
}

impl<C: HttpClient> StaticDataClient<C> {
    pub fn with_client(base_url: impl Into<String>, http: C) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: CacheBust::new(http),
        }
    }
}

#[async_trait]
impl<C: HttpClient> DataHost for StaticDataClient<C> {
    async fn fetch_index(&self) -> Result<Value> {
        fetch_json(&self.http, &format!("{}/index.json", self.base_url)).await
    }

    async fn fetch_day(&self, date: &str) -> Result<Value> {
        fetch_json(&self.http, &format!("{}/{}/leaderboard.json", self.base_url, date)).await
    }

    async fn fetch_snapshot(&self) -> Result<Value> {
        fetch_json(&self.http, &format!("{}/alltime.json", self.base_url)).await
    }
}
