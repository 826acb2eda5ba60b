// src/feed/mod.rs
pub mod signature;
pub mod types;

use anyhow::{anyhow, Context, Result};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};
use reqwest::Client;
use std::time::Duration;

use crate::config::{AppConfig, RetryPolicy, DETAIL_BASE_URL};
use crate::feed::types::{FeedResponse, FeedSource, Telegram};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// HTTP client for the telegraph endpoint. Stateless between calls; one
/// `fetch_latest` does the signed GET, bounded retries included.
pub struct FeedClient {
    client: Client,
    feed_url: String,
    app_params: Vec<(String, String)>,
    red_keywords: Vec<String>,
    retry: RetryPolicy,
}

impl FeedClient {
    pub fn new(cfg: &AppConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(cfg.request_timeout);
        if let Some(proxy) = &cfg.proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy).context("invalid proxy url")?);
        }

        Ok(Self {
            client: builder.build().context("building http client")?,
            feed_url: cfg.feed_url.clone(),
            app_params: cfg.app_params.clone(),
            red_keywords: cfg.red_keywords.clone(),
            retry: cfg.retry.clone(),
        })
    }

    fn signed_query(&self) -> Vec<(String, String)> {
        let mut params = self.app_params.clone();
        params.push(("sign".to_string(), signature::sign(&self.app_params)));
        params
    }

    async fn fetch_once(&self) -> Result<Vec<Telegram>> {
        let resp = self
            .client
            .get(&self.feed_url)
            .query(&self.signed_query())
            .send()
            .await
            .context("telegraph request failed")?
            .error_for_status()
            .context("telegraph non-2xx")?;

        let body: FeedResponse = resp.json().await.context("telegraph response not json")?;

        // Both the status discriminator and the item array must be present,
        // otherwise the attempt counts as a failure.
        if body.error != Some(0) {
            return Err(anyhow!("telegraph api error status: {:?}", body.error));
        }
        let raw = body
            .data
            .and_then(|d| d.roll_data)
            .ok_or_else(|| anyhow!("telegraph response missing roll_data"))?;

        let total = raw.len();
        let items: Vec<Telegram> = raw
            .iter()
            .filter_map(|r| r.normalize(&self.red_keywords, DETAIL_BASE_URL))
            .collect();
        tracing::info!(raw = total, kept = items.len(), "fetched telegraph batch");
        Ok(items)
    }

    fn backoff(&self) -> Duration {
        let jitter_ms = if self.retry.jitter.is_zero() {
            0
        } else {
            rand::rng().random_range(0..=self.retry.jitter.as_millis() as u64)
        };
        self.retry.delay + Duration::from_millis(jitter_ms)
    }
}

#[async_trait::async_trait]
impl FeedSource for FeedClient {
    /// Exhausting all retries is not an error the pipeline has to handle:
    /// it degrades to "no data this run" and returns an empty batch.
    async fn fetch_latest(&self) -> Result<Vec<Telegram>> {
        let attempts = self.retry.attempts.max(1);
        for attempt in 1..=attempts {
            match self.fetch_once().await {
                Ok(items) => return Ok(items),
                Err(e) => {
                    tracing::warn!(error = ?e, attempt, max = attempts, "telegraph fetch failed");
                    if attempt < attempts {
                        tokio::time::sleep(self.backoff()).await;
                    }
                }
            }
        }
        tracing::error!("telegraph fetch gave up after {attempts} attempts");
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "cailianpress"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> FeedClient {
        let cfg = AppConfig {
            feed_url: "http://example.invalid/feed".to_string(),
            app_params: vec![
                ("app_name".to_string(), "CailianpressWeb".to_string()),
                ("os".to_string(), "web".to_string()),
                ("sv".to_string(), "7.7.5".to_string()),
            ],
            red_keywords: vec![],
            output_dir: std::path::PathBuf::from("output"),
            webhook_url: None,
            proxy_url: None,
            request_timeout: Duration::from_millis(200),
            retry: RetryPolicy {
                attempts: 2,
                delay: Duration::from_millis(1),
                jitter: Duration::ZERO,
            },
            retention: 30,
        };
        FeedClient::new(&cfg).unwrap()
    }

    #[test]
    fn signed_query_appends_sign_parameter() {
        let q = client().signed_query();
        assert_eq!(q.len(), 4);
        let (k, v) = q.last().unwrap();
        assert_eq!(k, "sign");
        assert_eq!(v, "88238dfca952aac733c2a0b2418c634d");
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades_to_empty_batch() {
        let items = client().fetch_latest().await.unwrap();
        assert!(items.is_empty());
    }
}
