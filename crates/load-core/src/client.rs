use crate::payload::AuthorPayload;
use anyhow::Result;
use reqwest::header::CONTENT_TYPE;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Phase durations of one HTTP exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timings {
    /// Preparing and dispatching the request
    pub sending: Duration,
    /// Waiting for the response headers
    pub waiting: Duration,
    /// Reading the response body
    pub receiving: Duration,
}

impl Timings {
    pub fn total(&self) -> Duration {
        self.sending + self.waiting + self.receiving
    }
}

#[derive(Debug, Clone)]
pub struct AuthorResponse {
    pub status: u16,
    pub body: String,
    pub timings: Timings,
}

/// Trait for adapters that deliver an author payload to the endpoint.
pub trait AuthorClient: Send + Sync {
    fn name(&self) -> &'static str;

    /// Transport failures are returned as `Err`; any HTTP status is `Ok`.
    fn post_author<'a>(
        &'a self,
        payload: &'a AuthorPayload,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<AuthorResponse>> + Send + 'a>>;
}

/// Mock client for dry runs and tests: answers every request with a fixed
/// response after sleeping for the configured timings.
pub struct MockAuthorClient {
    status: u16,
    body: String,
    timings: Timings,
    received: Mutex<Vec<AuthorPayload>>,
}

impl MockAuthorClient {
    pub fn new(status: u16, body: impl Into<String>, timings: Timings) -> Self {
        Self {
            status,
            body: body.into(),
            timings,
            received: Mutex::new(Vec::new()),
        }
    }

    /// Payloads seen so far, in arrival order.
    pub fn received(&self) -> Vec<AuthorPayload> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl AuthorClient for MockAuthorClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn post_author<'a>(
        &'a self,
        payload: &'a AuthorPayload,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<AuthorResponse>> + Send + 'a>> {
        Box::pin(async move {
            self.received
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(payload.clone());

            let total = self.timings.total();
            if !total.is_zero() {
                sleep(total).await;
            }

            Ok(AuthorResponse {
                status: self.status,
                body: self.body.clone(),
                timings: self.timings,
            })
        })
    }
}

/// HTTP/JSON client backed by reqwest.
pub struct HttpAuthorClient {
    client: reqwest::Client,
    url: String,
}

impl HttpAuthorClient {
    /// `timeout_ms = None` keeps reqwest's default (no overall timeout).
    pub fn new(url: impl Into<String>, timeout_ms: Option<u64>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout_ms) = timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }

        Ok(Self {
            client: builder.build()?,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl AuthorClient for HttpAuthorClient {
    fn name(&self) -> &'static str {
        "http"
    }

    fn post_author<'a>(
        &'a self,
        payload: &'a AuthorPayload,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<AuthorResponse>> + Send + 'a>> {
        Box::pin(async move {
            // reqwest does not expose connection-level phases, so sending
            // covers serialization and request construction.
            let start = Instant::now();
            let body = serde_json::to_vec(payload)?;
            let request = self
                .client
                .post(&self.url)
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .build()?;
            let sending = start.elapsed();

            let dispatched = Instant::now();
            let response = self.client.execute(request).await?;
            let waiting = dispatched.elapsed();

            let status = response.status().as_u16();
            let headers_at = Instant::now();
            let body = response.text().await?;
            let receiving = headers_at.elapsed();

            Ok(AuthorResponse {
                status,
                body,
                timings: Timings {
                    sending,
                    waiting,
                    receiving,
                },
            })
        })
    }
}
