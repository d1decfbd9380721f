//! Feed retrieval.
//!
//! One blocking GET per feed with the configured `User-Agent`. A non-success
//! status or a transport error becomes a [`FetchError`]; nothing is retried.

use std::error::Error;
use std::fmt;
use tracing::{debug, info};

/// Upper bound on a feed body. Delegation reports are several megabytes, well
/// above the transport's default body limit.
const MAX_FEED_BYTES: u64 = 256 * 1024 * 1024;

/// A feed could not be retrieved
#[derive(Debug)]
pub struct FetchError {
    /// Display name of the feed
    pub feed: String,
    pub url: String,
    cause: Box<dyn Error + Send + Sync + 'static>,
}

impl FetchError {
    pub fn new(
        feed: impl Into<String>,
        url: impl Into<String>,
        cause: impl Into<Box<dyn Error + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            feed: feed.into(),
            url: url.into(),
            cause: cause.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to fetch {} from {}", self.feed, self.url)
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

/// Source of raw feed text
pub trait FeedFetcher {
    /// Retrieve the body at `url` as text. `feed` names the source in errors.
    fn fetch(&self, feed: &str, url: &str) -> Result<String, FetchError>;
}

/// Blocking HTTP fetcher backed by `ureq`
pub struct HttpFetcher {
    agent: ureq::Agent,
    client_identifier: String,
}

impl HttpFetcher {
    pub fn new(client_identifier: impl Into<String>) -> Self {
        Self::with_agent(ureq::Agent::new_with_defaults(), client_identifier)
    }

    pub fn with_agent(agent: ureq::Agent, client_identifier: impl Into<String>) -> Self {
        Self {
            agent,
            client_identifier: client_identifier.into(),
        }
    }
}

impl FeedFetcher for HttpFetcher {
    fn fetch(&self, feed: &str, url: &str) -> Result<String, FetchError> {
        debug!("GET {} ({})", url, self.client_identifier);

        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", self.client_identifier.as_str())
            .call()
            .map_err(|e| FetchError::new(feed, url, e))?;

        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_FEED_BYTES)
            .read_to_string()
            .map_err(|e| FetchError::new(feed, url, e))?;

        info!("fetched {} - {} bytes", feed, body.len());
        Ok(body)
    }
}
