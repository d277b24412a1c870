pub mod error;
pub mod types;

pub use error::{BananaPromptsError, Result};
pub use types::{Pagination, PromptPage, RawTags, SourcePrompt};

use std::time::Duration;

/// Public prompt feed.
pub const DEFAULT_FEED_URL: &str = "https://bananaprompts.fun/api/prompts";

pub struct BananaPromptsClient {
    client: reqwest::Client,
    base_url: String,
}

impl BananaPromptsClient {
    /// Build a client whose requests (headers and body) give up after `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetch one 1-based page of the feed.
    pub async fn fetch_page(&self, page: u32, limit: u32) -> Result<PromptPage> {
        tracing::debug!(url = %self.base_url, page, limit, "Requesting prompt page");

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("limit", limit), ("page", page)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BananaPromptsError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        // Read the body first so a malformed payload surfaces as Parse, not Network.
        let body = resp.text().await?;
        let page: PromptPage = serde_json::from_str(&body)?;
        Ok(page)
    }
}
