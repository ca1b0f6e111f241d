use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, HeaderValue};

/// An [`HttpClient`] wrapper that defeats intermediary caching.
///
/// The data host sits behind a CDN-style cache, so every request gets a
/// `v=<millis>` query parameter plus a `Cache-Control: no-store` header.
/// Stale day files would otherwise survive until the edge cache expires.
pub struct CacheBust<C> {
    pub inner: C,
}

impl<C> CacheBust<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for CacheBust<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let stamp = chrono::Utc::now().timestamp_millis().to_string();
        req.url_mut().query_pairs_mut().append_pair("v", &stamp);
        req.headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        self.inner.execute(req).await
    }
}
