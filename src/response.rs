//! Successful responses with their transport details.

use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A decoded API response plus what it took to get it.
///
/// Dereferences to the decoded data, so `response.results` works directly on
/// a `Response<QueryResponse<T>>`.
///
/// # Examples
///
/// ```no_run
/// use vndb_kana::{Client, Stats};
///
/// # async fn example() -> Result<(), vndb_kana::Error> {
/// let client = Client::builder().build()?;
/// let stats = client.call::<(), Stats>(
///     vndb_kana::metadata::RequestMetadata::new(http::Method::GET, "/stats"),
///     None,
/// ).await?;
///
/// println!("{} visual novels", stats.vn);
/// println!("took {:?} over {} attempt(s)", stats.latency, stats.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded response body.
    pub data: T,

    /// The body exactly as received.
    pub raw_body: String,

    /// The HTTP status code.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from the first attempt until this response arrived, including
    /// retries and local rate-limit waits.
    pub latency: Duration,

    /// Attempts needed; `1` means no retry happened.
    pub attempts: usize,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: usize,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
            attempts,
        }
    }

    /// Transforms the data, keeping the transport details.
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Discards the transport details.
    pub fn into_data(self) -> T {
        self.data
    }

    /// Returns `true` if the request required retries.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
