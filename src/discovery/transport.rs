use crate::config::NetworkSettings;
use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Body of a binary download plus the server's declared content type.
#[derive(Debug, Clone, Default)]
pub struct Download {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Blocking GET seam shared by discovery and the deck builder.
pub trait Transport {
    /// Fetches a text body. Non-success statuses are errors.
    fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String>;

    /// Fetches a binary body. Non-success statuses are errors.
    fn get_bytes(&self, url: &str) -> Result<Download>;
}

/// reqwest-backed transport pausing between requests: before catalog pages, after downloads.
pub struct HttpTransport {
    client: Client,
    delay: Duration,
}

impl HttpTransport {
    pub fn new(settings: &NetworkSettings) -> Result<Self> {
        Self::with_timeout(settings, settings.timeout_secs)
    }

    /// Transport for asset downloads, which get a longer timeout than catalog pages.
    pub fn for_downloads(settings: &NetworkSettings, delay: Duration) -> Result<Self> {
        let mut transport = Self::with_timeout(settings, settings.download_timeout_secs)?;
        transport.delay = delay;
        Ok(transport)
    }

    fn with_timeout(settings: &NetworkSettings, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            delay: Duration::from_millis(settings.request_delay_ms),
        })
    }

    fn pause(&self) {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}

impl Transport for HttpTransport {
    fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        self.pause();
        debug!(url, ?query, "GET");
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .with_context(|| format!("Request to {url} failed"))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("HTTP {} from {}", status.as_u16(), url);
        }
        resp.text()
            .with_context(|| format!("Failed to read response body from {url}"))
    }

    fn get_bytes(&self, url: &str) -> Result<Download> {
        debug!(url, "GET (binary)");
        let resp = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Request to {url} failed"))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("HTTP {}", status.as_u16());
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp
            .bytes()
            .with_context(|| format!("Failed to read download body from {url}"))?
            .to_vec();
        self.pause();
        Ok(Download {
            content_type,
            bytes,
        })
    }
}
