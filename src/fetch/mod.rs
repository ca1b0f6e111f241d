mod basic;
mod cache_bust;
mod client;

pub use basic::BasicClient;
pub use cache_bust::CacheBust;
pub use client::HttpClient;

use anyhow::Result;
use serde_json::Value;

/// Fetches a JSON document, failing fast on non-success responses.
///
/// The error message carries the HTTP status and response body so a
/// missing day file (404) is distinguishable from a host outage.
pub async fn fetch_json<C: HttpClient>(client: &C, url: &str) -> Result<Value> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("GET {url} returned status {status}: {body}");
    }

    Ok(resp.json().await?)
}
