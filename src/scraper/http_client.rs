use crate::config::ScraperConfig;
use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::debug;

/// One crawling identity: shared connection pool, cookie jar and
/// browser-like headers for the lifetime of the process.
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .default_headers(default_headers())
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            // Accept cookies so session-based pages work
            .cookie_store(true);

        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let inner = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { inner })
    }

    /// Fetch a URL as text. No retry: transport and status errors go to the caller.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);

        let resp = self
            .inner
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed: {}", url))?;
        ensure_success(resp.status(), url)?;

        resp.text().await.context("Failed to read response body")
    }
}

fn ensure_success(status: StatusCode, url: &str) -> Result<()> {
    if !status.is_success() {
        bail!("HTTP {} for {}", status, url);
    }
    Ok(())
}

// Accept-Encoding comes from reqwest itself once gzip/deflate are enabled.
fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.8"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_headers_are_set() {
        let headers = default_headers();
        assert_eq!(headers[header::CACHE_CONTROL], "max-age=0");
        assert_eq!(headers[header::ACCEPT_LANGUAGE], "en-US,en;q=0.8");
        assert!(headers[header::ACCEPT].to_str().unwrap().starts_with("text/html"));
    }

    #[test]
    fn error_status_is_named_in_the_message() {
        let err = ensure_success(StatusCode::NOT_FOUND, "https://example.test/lra").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("404"), "{}", msg);
        assert!(msg.contains("https://example.test/lra"), "{}", msg);
        assert!(ensure_success(StatusCode::OK, "https://example.test/lra").is_ok());
    }

    #[test]
    fn client_builds_from_default_config() {
        assert!(HttpClient::new(&ScraperConfig::default()).is_ok());
    }
}
