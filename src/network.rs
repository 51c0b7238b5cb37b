use std::time::Duration;

use tokio::time::timeout;
use url::Url;

const MAX_CONTENT_SIZE: usize = 10 * 1024 * 1024;
const MAX_REDIRECTS: usize = 10;

/// HTTP client shared by all crawl workers. Failed fetches are dropped by
/// the caller; there is no retry path.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout_duration: Duration,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!("Mozilla/5.0 (compatible; {user_agent})"))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .deflate(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            timeout_duration: Duration::from_secs(timeout_secs),
        }
    }

    /// Fetches a URL, following redirects, and returns the body together
    /// with the final URL the redirects landed on.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        let response = timeout(
            self.timeout_duration,
            self.client
                .get(url)
                .header(
                    "Accept",
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                )
                .header("Accept-Language", "en-US,en;q=0.5")
                .send(),
        )
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(Self::classify_error)?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());

        if let Some(length) = response.content_length() {
            if length as usize > MAX_CONTENT_SIZE {
                return Err(FetchError::ContentTooLarge(length as usize));
            }
        }

        let body = timeout(self.timeout_duration, response.text())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(|e| FetchError::Body(e.to_string()))?;

        if body.len() > MAX_CONTENT_SIZE {
            return Err(FetchError::ContentTooLarge(body.len()));
        }

        Ok(FetchResult {
            body,
            status,
            content_type,
            final_url,
        })
    }

    fn classify_error(error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(error.to_string())
        }
    }
}

/// Result of a successful HTTP fetch. A non-success status still lands
/// here; the worker decides what to do with it.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub body: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub final_url: Url,
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Request timeout")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Content too large: {0} bytes")]
    ContentTooLarge(usize),
}
