//! Transport layer for the events endpoint
//!
//! Abstracts the HTTP request for testability. Provides:
//! - EventSource trait: fetch one page of events at a cursor
//! - HttpEventSource: real HTTP polling via reqwest
//! - MockEventSource: scripted pages and failures for tests

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use joblog_protocol::{Cursor, DecodeError, EventsPage, CURSOR_QUERY_PARAM};
use reqwest::header::{HeaderValue, AUTHORIZATION};

/// Source of event pages
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch the page of events that starts at `cursor`.
    async fn fetch(&self, cursor: &Cursor) -> Result<EventsPage, TransportError>;
}

/// Transport errors. All of them are retried by the fetcher.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Unexpected response status: {0}")]
    Status(u16),

    #[error("Invalid response body: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if let Some(status) = e.status() {
            TransportError::Status(status.as_u16())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

/// HTTP source configuration
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Events endpoint URL
    pub url: String,
    /// Bearer token attached to every request, if any
    pub token: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

/// Polls the events endpoint over HTTP
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    client: reqwest::Client,
    url: reqwest::Url,
    authorization: Option<HeaderValue>,
}

impl HttpEventSource {
    pub fn new(config: &HttpSourceConfig) -> Result<Self, TransportError> {
        let url = reqwest::Url::parse(&config.url)
            .map_err(|e| TransportError::InvalidRequest(format!("bad events URL '{}': {}", config.url, e)))?;

        let authorization = match config.token.as_deref() {
            Some(token) if !token.is_empty() => {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| TransportError::InvalidRequest("token is not a valid header value".to_string()))?;
                value.set_sensitive(true);
                Some(value)
            }
            _ => None,
        };

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            url,
            authorization,
        })
    }

    /// Build the GET request for `cursor`.
    pub fn build_request(&self, cursor: &Cursor) -> Result<reqwest::Request, TransportError> {
        let mut builder = self
            .client
            .get(self.url.clone())
            .query(&[(CURSOR_QUERY_PARAM, cursor.as_str())]);

        if let Some(ref authorization) = self.authorization {
            builder = builder.header(AUTHORIZATION, authorization.clone());
        }

        Ok(builder.build()?)
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn fetch(&self, cursor: &Cursor) -> Result<EventsPage, TransportError> {
        let request = self.build_request(cursor)?;
        let response = self.client.execute(request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(EventsPage::from_slice(&body)?)
    }
}

/// Scripted response for the mock source
#[derive(Debug, Clone)]
pub enum MockResponse {
    Page(EventsPage),
    Status(u16),
    NetworkFailure,
}

impl MockResponse {
    fn into_result(self) -> Result<EventsPage, TransportError> {
        match self {
            MockResponse::Page(page) => Ok(page),
            MockResponse::Status(code) => Err(TransportError::Status(code)),
            MockResponse::NetworkFailure => {
                Err(TransportError::Network("connection refused".to_string()))
            }
        }
    }
}

/// Mock source for testing - replays a fixed script of responses
#[derive(Debug)]
pub struct MockEventSource {
    script: Mutex<VecDeque<MockResponse>>,
    when_exhausted: MockResponse,
    requests: Mutex<Vec<Cursor>>,
}

impl MockEventSource {
    /// Empty script. Once the script runs out the source serves a final,
    /// empty page.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            when_exhausted: MockResponse::Page(EventsPage::new(Vec::new(), None)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful page.
    pub fn with_page(self, page: EventsPage) -> Self {
        self.with_response(MockResponse::Page(page))
    }

    /// Queue a non-2xx response.
    pub fn with_status(self, code: u16) -> Self {
        self.with_response(MockResponse::Status(code))
    }

    /// Queue `count` network failures.
    pub fn with_network_failures(mut self, count: usize) -> Self {
        for _ in 0..count {
            self = self.with_response(MockResponse::NetworkFailure);
        }
        self
    }

    pub fn with_response(self, response: MockResponse) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
        self
    }

    /// Response served after the script runs out.
    pub fn when_exhausted(mut self, response: MockResponse) -> Self {
        self.when_exhausted = response;
        self
    }

    /// Cursors of every request made so far, in order.
    pub fn requests(&self) -> Vec<Cursor> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockEventSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSource for MockEventSource {
    async fn fetch(&self, cursor: &Cursor) -> Result<EventsPage, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(cursor.clone());

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        next.unwrap_or_else(|| self.when_exhausted.clone()).into_result()
    }
}
