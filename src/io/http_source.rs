//! HTTP page source
//!
//! Fetches `<base-url>/transactions/<n>.json` with a shared `reqwest::Client`.
//! The whole exchange, from sending the request to reading the last body
//! chunk, is raced against the cancellation token.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::traits::PageSource;
use crate::io::wire::decode_page;
use crate::types::{BalanceError, PageNumber, PageResponse};

/// Maximum number of body characters quoted in a transport error
const ERROR_BODY_LIMIT: usize = 200;

/// Page source backed by the transactions REST endpoint
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
    base_url: String,
}

impl HttpPageSource {
    /// Create a source for the given base URL
    ///
    /// # Arguments
    ///
    /// * `base_url` - Provider root, with or without a trailing slash
    /// * `timeout` - Per-request timeout covering connect and body read
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BalanceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BalanceError::invalid_config(&format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the given page
    pub fn page_url(&self, page_number: PageNumber) -> String {
        format!("{}/transactions/{}.json", self.base_url, page_number)
    }

    async fn fetch(&self, page_number: PageNumber, url: &str) -> Result<PageResponse, BalanceError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BalanceError::connection(url, &describe(&e)))?;

        let status = response.status();
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| BalanceError::connection(url, &describe(&e)))?
        {
            body.extend_from_slice(&chunk);
        }

        debug!(page = page_number, status = status.as_u16(), bytes = body.len(), "fetched page");

        if !status.is_success() {
            return Err(BalanceError::transport(
                status.as_u16(),
                url,
                &failure_message(status, &body),
            ));
        }

        decode_page(page_number, &body)
    }
}

impl PageSource for HttpPageSource {
    async fn fetch_page(
        &self,
        page_number: PageNumber,
        cancel: &CancellationToken,
    ) -> Result<PageResponse, BalanceError> {
        let url = self.page_url(page_number);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BalanceError::Cancelled),
            result = self.fetch(page_number, &url) => result,
        }
    }
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("timed out ({})", error)
    } else {
        error.to_string()
    }
}

fn failure_message(status: StatusCode, body: &[u8]) -> String {
    let reason = status.canonical_reason().unwrap_or("Unknown status");
    let text = String::from_utf8_lossy(body);
    let text = text.trim();

    if text.is_empty() {
        return reason.to_string();
    }

    let mut quoted: String = text.chars().take(ERROR_BODY_LIMIT).collect();
    if text.chars().count() > ERROR_BODY_LIMIT {
        quoted.push_str("...");
    }
    format!("{}: {}", reason, quoted)
}
