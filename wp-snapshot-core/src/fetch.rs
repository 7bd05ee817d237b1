//! WordPress REST page fetcher.
//!
//! Issues `GET {base}/posts?per_page=N&page=P&_embed=1` with the caller's
//! [`ClientIdentity`] headers and classifies the response into a
//! [`PageOutcome`]:
//!
//! - 403 / 429: [`PageOutcome::Blocked`]
//! - other non-2xx: [`PageOutcome::Fatal`]
//! - 2xx with an empty body, an empty list or a JSON object: [`PageOutcome::EndOfData`]
//! - 2xx with a non-empty list: [`PageOutcome::Posts`]
//!
//! Transport failures (timeouts, resets) come back as `Fatal(FetchError::Network)`;
//! the coordinator decides how long to back off before giving up.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::SourceConfig;
use crate::contract::{FetchError, PageFetcher, PageOutcome};
use crate::identity::ClientIdentity;

pub struct WordPressFetcher {
    client: Client,
    posts_url: String,
}

impl WordPressFetcher {
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        if config.accept_invalid_certs {
            warn!(
                base_url = %config.base_url,
                "Building content client with certificate verification disabled"
            );
        }
        let client = Client::builder()
            .timeout(config.request_timeout())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {e}")))?;
        let posts_url = format!("{}/posts", config.base_url.trim_end_matches('/'));
        info!(url = %posts_url, "Initialized WordPress fetcher");
        Ok(Self { client, posts_url })
    }

    pub fn posts_url(&self) -> &str {
        &self.posts_url
    }
}

/// Classify a 2xx body. Split out so it can be tested without a server.
pub fn classify_body(page: u32, body: &str) -> PageOutcome {
    if body.trim().is_empty() {
        debug!(page, "Empty response body");
        return PageOutcome::EndOfData;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Array(posts)) if posts.is_empty() => {
            debug!(page, "Empty post list");
            PageOutcome::EndOfData
        }
        Ok(serde_json::Value::Array(posts)) => PageOutcome::Posts(posts),
        Ok(other) => {
            // WordPress answers some out-of-range requests with an error object.
            debug!(page, body = %other, "Response is not a post list");
            PageOutcome::EndOfData
        }
        Err(e) => PageOutcome::Fatal(FetchError::Decode(e.to_string())),
    }
}

#[async_trait]
impl PageFetcher for WordPressFetcher {
    async fn fetch_page(
        &self,
        page: u32,
        per_page: u32,
        identity: &ClientIdentity,
    ) -> PageOutcome {
        let mut request = self.client.get(&self.posts_url).query(&[
            ("per_page", per_page.to_string()),
            ("page", page.to_string()),
            ("_embed", "1".to_string()),
        ]);
        for (name, value) in identity.headers() {
            request = request.header(*name, *value);
        }

        debug!(page, per_page, identity = identity.name, "Requesting page");
        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(page, error = %e, "Network error fetching page");
                return PageOutcome::Fatal(FetchError::Network(e.to_string()));
            }
        };

        let status = response.status();
        if status.as_u16() == 403 || status.as_u16() == 429 {
            warn!(page, status = status.as_u16(), identity = identity.name, "Request blocked");
            return PageOutcome::Blocked {
                status: status.as_u16(),
            };
        }

        let body = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(page, error = %e, "Failed to read page body");
                return PageOutcome::Fatal(FetchError::Network(e.to_string()));
            }
        };

        if !status.is_success() {
            warn!(page, status = status.as_u16(), "Unexpected HTTP status");
            return PageOutcome::Fatal(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        classify_body(page, &body)
    }
}
