// SPDX-License-Identifier: GPL-3.0-only
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Archive downloader with bounded retries.
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    base_delay: Duration,
}

impl HttpClient {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300)) // 5 minute timeout for large downloads
            .user_agent(concat!("FlatrStore/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        })
    }

    /// Attempt `max_retries` times, sleeping `base_delay * 2^attempt`
    /// between attempts.
    pub fn with_retry_policy(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.base_delay = base_delay;
        self
    }

    pub async fn download_with_retry(&self, url: &str, output_path: &Path) -> anyhow::Result<()> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.download_once(url, output_path).await {
                Ok(()) => {
                    if attempt > 1 {
                        info!(url = %url, attempt, "Download succeeded after retry");
                    }
                    return Ok(());
                }
                Err(e) if is_client_error(&e) => {
                    warn!(url = %url, error = %e, "Download rejected by server, not retrying");
                    return Err(e);
                }
                Err(e) => {
                    warn!(url = %url, attempt, error = %e, "Download attempt failed");
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.base_delay * 2_u32.pow(attempt)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Download failed after {} attempts", self.max_retries)))
    }

    async fn download_once(&self, url: &str, output_path: &Path) -> anyhow::Result<()> {
        info!(url = %url, path = %output_path.display(), "Starting download");

        let mut response = self.client.get(url).send().await?.error_for_status()?;

        let mut file = tokio::fs::File::create(output_path).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!(url = %url, path = %output_path.display(), bytes = written, "Download completed");
        Ok(())
    }
}

/// 4xx responses will not change on retry.
fn is_client_error(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<reqwest::Error>()
        .and_then(reqwest::Error::status)
        .is_some_and(|status| status.is_client_error())
}
