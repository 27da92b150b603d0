//! Validated fetching of stored artifact bytes.

use std::time::Duration;

use async_trait::async_trait;
use bf_core::config::FetchConfig;
use bytes::Bytes;
use reqwest::redirect;

/// Why a fetch was rejected.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("rejected content type '{0}'")]
    ContentType(String),

    #[error("connection not established within {0:?}")]
    ConnectTimeout(Duration),

    #[error("response not complete within {0:?}")]
    ResponseTimeout(Duration),

    #[error("more than {0} redirects")]
    TooManyRedirects(usize),

    #[error("transport error: {0}")]
    Transport(String),
}

pub type FetchResult = std::result::Result<Bytes, FetchError>;

/// Source of artifact bytes.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult;
}

/// Whether a content type marks an error page rather than media.
pub fn is_rejected_content_type(content_type: &str) -> bool {
    let ct = content_type.trim().to_ascii_lowercase();
    ct.starts_with("text/") || ct.contains("html")
}

#[derive(Debug, thiserror::Error)]
#[error("redirect limit reached")]
struct RedirectLimit;

/// HTTP fetcher with a connect timeout, a whole-request deadline, and a
/// redirect bound.
#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    client: reqwest::Client,
    connect_timeout: Duration,
    response_timeout: Duration,
    max_redirects: usize,
}

impl RemoteFetcher {
    pub fn new(config: &FetchConfig) -> bf_core::Result<Self> {
        let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
        let response_timeout = Duration::from_secs(config.response_timeout_secs);
        Self::with_timeouts(connect_timeout, response_timeout, config.max_redirects)
    }

    pub fn with_timeouts(
        connect_timeout: Duration,
        response_timeout: Duration,
        max_redirects: usize,
    ) -> bf_core::Result<Self> {
        // `previous` already holds the original URL at the first hop, so
        // hop k sees k entries.
        let policy = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() > max_redirects {
                attempt.error(RedirectLimit)
            } else {
                attempt.follow()
            }
        });

        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .redirect(policy)
            .build()
            .map_err(|e| bf_core::Error::Internal(format!("failed to build fetch client: {e}")))?;

        Ok(Self {
            client,
            connect_timeout,
            response_timeout,
            max_redirects,
        })
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_redirect() {
            FetchError::TooManyRedirects(self.max_redirects)
        } else if e.is_connect() && e.is_timeout() {
            FetchError::ConnectTimeout(self.connect_timeout)
        } else if e.is_timeout() {
            FetchError::ResponseTimeout(self.response_timeout)
        } else {
            FetchError::Transport(e.to_string())
        }
    }

    async fn fetch_unbounded(&self, url: &str) -> FetchResult {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(ct) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if is_rejected_content_type(ct) {
                return Err(FetchError::ContentType(ct.to_string()));
            }
        }

        response.bytes().await.map_err(|e| self.classify(e))
    }
}

#[async_trait]
impl Fetch for RemoteFetcher {
    /// Fetch the full body. The deadline covers connect, headers, redirects,
    /// and the body read; on expiry the in-flight request is dropped.
    async fn fetch(&self, url: &str) -> FetchResult {
        match tokio::time::timeout(self.response_timeout, self.fetch_unbounded(url)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(FetchError::ResponseTimeout(self.response_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(max_redirects: usize) -> RemoteFetcher {
        RemoteFetcher::with_timeouts(Duration::from_secs(2), Duration::from_secs(5), max_redirects)
            .unwrap()
    }

    async fn mount_image(server: &MockServer, at: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"JPEGDATA".to_vec(), "image/jpeg"))
            .mount(server)
            .await;
    }

    /// `/hop/0 -> /hop/1 -> ... -> /hop/{hops}` where the last one serves an image.
    async fn mount_chain(server: &MockServer, hops: usize) {
        for i in 0..hops {
            Mock::given(method("GET"))
                .and(path(format!("/hop/{i}")))
                .respond_with(
                    ResponseTemplate::new(302).insert_header("location", format!("/hop/{}", i + 1)),
                )
                .mount(server)
                .await;
        }
        mount_image(server, &format!("/hop/{hops}")).await;
    }

    #[test]
    fn content_type_rules() {
        assert!(is_rejected_content_type("text/plain"));
        assert!(is_rejected_content_type("TEXT/XML; charset=utf-8"));
        assert!(is_rejected_content_type("application/xhtml+xml"));
        assert!(!is_rejected_content_type("image/jpeg"));
        assert!(!is_rejected_content_type("application/octet-stream"));
    }

    #[tokio::test]
    async fn fetches_image() {
        let server = MockServer::start().await;
        mount_image(&server, "/a.jpg").await;

        let bytes = fetcher(3)
            .fetch(&format!("{}/a.jpg", server.uri()))
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"JPEGDATA");
    }

    #[tokio::test]
    async fn rejects_html_error_page_at_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"<html>denied</html>".to_vec(), "text/html"),
            )
            .mount(&server)
            .await;

        let err = fetcher(3).fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, FetchError::ContentType(ct) if ct == "text/html"));
    }

    #[tokio::test]
    async fn rejects_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_raw(b"x".to_vec(), "image/jpeg"))
            .mount(&server)
            .await;

        let err = fetcher(3).fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
    }

    #[tokio::test]
    async fn follows_redirects_up_to_bound() {
        let server = MockServer::start().await;
        mount_chain(&server, 3).await;

        let bytes = fetcher(3)
            .fetch(&format!("{}/hop/0", server.uri()))
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"JPEGDATA");
    }

    #[tokio::test]
    async fn fails_one_hop_past_bound() {
        let server = MockServer::start().await;
        mount_chain(&server, 4).await;

        let err = fetcher(3)
            .fetch(&format!("{}/hop/0", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::TooManyRedirects(3)));
    }

    #[tokio::test]
    async fn slow_response_hits_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(b"late".to_vec(), "image/jpeg")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let f = RemoteFetcher::with_timeouts(
            Duration::from_secs(1),
            Duration::from_millis(300),
            3,
        )
        .unwrap();
        let err = f.fetch(&server.uri()).await.unwrap_err();
        assert!(matches!(err, FetchError::ResponseTimeout(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        let err = fetcher(3).fetch("http://127.0.0.1:1/x.jpg").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
