use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{Config, USER_AGENT};

/// GET with retries. A URL that keeps failing yields `None` instead of an error,
/// so one unreachable source never aborts a run.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            retries: config.fetch_retries.max(1),
            retry_delay: config.retry_delay,
        })
    }

    pub async fn fetch_text(&self, url: &str) -> Result<Option<String>> {
        for attempt in 0..self.retries {
            match self.try_fetch(url).await {
                Ok(body) => return Ok(Some(body)),
                Err(e) => {
                    if attempt + 1 == self.retries {
                        warn!("Failed to fetch {}... : {:#}", truncate(url, 80), e);
                        return Ok(None);
                    }
                    debug!(attempt, "retrying {}: {:#}", truncate(url, 80), e);
                    tokio::time::sleep(self.retry_delay * (attempt + 1)).await;
                }
            }
        }

        Ok(None)
    }

    async fn try_fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send HTTP request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP error: {}", status);
        }

        response.text().await.context("Failed to read response body")
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
