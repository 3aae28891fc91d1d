//! HTTP GET with retry for OAI-PMH requests.
//!
//! Uses async reqwest internally behind a shared runtime, but presents a
//! sync interface for the strictly sequential harvest loop.

use std::sync::LazyLock;
use std::time::Duration;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum retry attempts for rate limits and transient server errors
const MAX_RETRIES: u32 = 10;

/// Base delay for exponential backoff
const BASE_DELAY: Duration = Duration::from_secs(2);

/// Ceiling for a single backoff sleep
const MAX_DELAY: Duration = Duration::from_secs(60);

/// HTTP error with optional status code.
///
/// Retry for transient failures happens inside [`get_with_retry`]; an
/// `HttpError` reaching a caller is final for that request.
#[derive(Debug)]
pub struct HttpError {
    pub status: Option<u16>,
    pub message: String,
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(s) => write!(f, "HTTP {s}: {}", self.message),
            None => write!(f, "HTTP error: {}", self.message),
        }
    }
}

impl std::error::Error for HttpError {}

impl HttpError {
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        Self {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    /// Rate limits and server-side errors are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self.status, Some(429) | Some(500..=599))
    }
}

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(concat!("oaiharvest/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("failed to build HTTP client")
});

/// Get shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Exponential backoff: 2s, 4s, 8s, ... capped at [`MAX_DELAY`]
pub fn backoff_duration(attempt: u32) -> Duration {
    BASE_DELAY
        .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
        .min(MAX_DELAY)
}

/// HTTP GET returning the response body as text.
///
/// Retries 429 and 5xx responses with exponential backoff up to
/// [`MAX_RETRIES`]; anything else fails immediately.
pub fn get_with_retry(url: &str, params: &[(&str, &str)]) -> Result<String, HttpError> {
    let mut attempt = 0u32;
    loop {
        let result: Result<String, reqwest::Error> = SHARED_RUNTIME.handle().block_on(async {
            let resp = http_client()
                .get(url)
                .query(params)
                .send()
                .await?
                .error_for_status()?;
            resp.text().await
        });

        match result {
            Ok(text) => return Ok(text),
            Err(e) => {
                let err = HttpError::from_reqwest(&e);
                if err.is_retryable() && attempt < MAX_RETRIES {
                    attempt += 1;
                    let delay = backoff_duration(attempt);
                    log::warn!(
                        "request failed ({err}), retry {attempt}/{MAX_RETRIES} in {delay:?}"
                    );
                    std::thread::sleep(delay);
                } else {
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_err(status: u16) -> HttpError {
        HttpError {
            status: Some(status),
            message: "test".to_string(),
        }
    }

    #[test]
    fn http_429_retryable() {
        assert!(http_err(429).is_retryable());
    }

    #[test]
    fn http_500_retryable() {
        assert!(http_err(500).is_retryable());
    }

    #[test]
    fn http_503_retryable() {
        assert!(http_err(503).is_retryable());
    }

    #[test]
    fn http_404_not_retryable() {
        assert!(!http_err(404).is_retryable());
    }

    #[test]
    fn http_400_not_retryable() {
        assert!(!http_err(400).is_retryable());
    }

    #[test]
    fn no_status_not_retryable() {
        let err = HttpError {
            status: None,
            message: "connection refused".to_string(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn backoff_exponential() {
        assert_eq!(backoff_duration(1), Duration::from_secs(2));
        assert_eq!(backoff_duration(2), Duration::from_secs(4));
        assert_eq!(backoff_duration(3), Duration::from_secs(8));
    }

    #[test]
    fn backoff_capped() {
        assert_eq!(backoff_duration(10), MAX_DELAY);
        assert_eq!(backoff_duration(u32::MAX), MAX_DELAY);
    }

    #[test]
    fn display_with_status() {
        assert_eq!(format!("{}", http_err(503)), "HTTP 503: test");
    }
}
