//! Rate-limited HTTPS fetcher (C1).
//!
//! Ported from the teacher's `SecEdgarCrawler::get_company_info`/
//! `download_filing_xbrl` request shape in `crawler.rs` (a `reqwest::Client`
//! built once with a fixed `User-Agent` header, a rate-limiter wait before
//! every request, streamed bodies), generalized into a standalone
//! `Fetcher` so every component that needs HTTP (C1, C2, C3's document
//! discovery) shares one rate-limited client instead of building its own.

use crate::rate::RateBudget;
use edgar_core::config::SecApiConfig;
use edgar_core::error::{EdgarError, EdgarResult};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

pub struct Fetcher {
    client: Client,
    budget: RateBudget,
}

impl Fetcher {
    /// Builds the shared HTTP client and rate budget from validated config.
    /// `AppConfig::validate` already enforces the identification-header
    /// shape (contains `@`, >= 10 characters) as a fatal startup check, so
    /// this constructor trusts the config it is given.
    pub fn new(config: &SecApiConfig) -> EdgarResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| EdgarError::config(format!("invalid user agent header: {e}")))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(EdgarError::Http)?;

        Ok(Fetcher {
            client,
            budget: RateBudget::new(config.rate_limit),
        })
    }

    /// Issues a rate-limited GET and returns the full body. HTTP status >=
    /// 400 raises a transport error carrying the status code; the caller
    /// (not this method) is responsible for retrying on timeout.
    pub async fn fetch(&self, url: &str) -> EdgarResult<Vec<u8>> {
        debug!("fetching {}", url);
        let _permit = self.budget.acquire().await;
        let response = self.client.get(url).send().await.map_err(EdgarError::Http)?;
        let status = response.status();
        if status.as_u16() >= 400 {
            warn!("GET {} failed with status {}", url, status);
            return Err(EdgarError::transport(
                Some(status.as_u16()),
                format!("GET {url} failed with status {status}"),
            ));
        }
        Ok(response.bytes().await.map_err(EdgarError::Http)?.to_vec())
    }

    /// Same as `fetch`, but streams the body directly to `path` rather than
    /// buffering it, per spec.md section 4.1's "stream bodies to disk".
    pub async fn fetch_to_file(&self, url: &str, path: &Path) -> EdgarResult<u64> {
        use futures::StreamExt;

        debug!("streaming {} to {}", url, path.display());
        let _permit = self.budget.acquire().await;
        let response = self.client.get(url).send().await.map_err(EdgarError::Http)?;
        let status = response.status();
        if status.as_u16() >= 400 {
            warn!("GET {} failed with status {}", url, status);
            return Err(EdgarError::transport(
                Some(status.as_u16()),
                format!("GET {url} failed with status {status}"),
            ));
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(EdgarError::Io)?;
        }
        let mut file = tokio::fs::File::create(path).await.map_err(EdgarError::Io)?;
        let mut stream = response.bytes_stream();
        let mut total_bytes = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(EdgarError::Http)?;
            total_bytes += chunk.len() as u64;
            file.write_all(&chunk).await.map_err(EdgarError::Io)?;
        }
        file.flush().await.map_err(EdgarError::Io)?;
        Ok(total_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(user_agent: &str) -> SecApiConfig {
        SecApiConfig {
            rate_limit: 8.0,
            timeout_secs: 30,
            user_agent: user_agent.to_string(),
            batch_success_threshold: 0.5,
        }
    }

    #[tokio::test]
    async fn fetch_returns_body_on_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/index.json")
            .with_status(200)
            .with_body("{\"ok\":true}")
            .create_async()
            .await;

        let fetcher = Fetcher::new(&config("Research Team contact@example.com")).unwrap();
        let url = format!("{}/index.json", server.url());
        let body = fetcher.fetch(&url).await.unwrap();
        assert_eq!(body, b"{\"ok\":true}".to_vec());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_raises_transport_error_on_4xx() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/missing.json").with_status(404).create_async().await;

        let fetcher = Fetcher::new(&config("Research Team contact@example.com")).unwrap();
        let url = format!("{}/missing.json", server.url());
        let err = fetcher.fetch(&url).await.unwrap_err();
        match err {
            EdgarError::Transport { status, .. } => assert_eq!(status, Some(404)),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_to_file_streams_body_to_disk() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/doc.xml")
            .with_status(200)
            .with_body("<xbrl></xbrl>")
            .create_async()
            .await;

        let fetcher = Fetcher::new(&config("Research Team contact@example.com")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.xml");
        let url = format!("{}/doc.xml", server.url());
        let bytes_written = fetcher.fetch_to_file(&url, &path).await.unwrap();
        assert_eq!(bytes_written, 13);
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "<xbrl></xbrl>");
    }
}
