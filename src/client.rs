//! HTTP client with retry logic and rich error handling.
//!
//! The [`Client`] type is the main entry point for talking to the API.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    metadata::RequestMetadata,
    rate_limit::{RateLimiter, RateLimiterConfig},
    retry::{self, RetryPolicy},
    Error, Response, Result,
};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Base URL of the public VNDB API.
pub const DEFAULT_BASE_URL: &str = "https://api.vndb.org/kana";

/// Environment variable read by [`ClientBuilder::from_env`] for the API token.
pub const TOKEN_ENV: &str = "VNDB_TOKEN";

/// Environment variable read by [`ClientBuilder::from_env`] for the base URL.
pub const BASE_URL_ENV: &str = "VNDB_API_URL";

const DEFAULT_USER_AGENT: &str = concat!("vndb-kana/", env!("CARGO_PKG_VERSION"));

/// A VNDB API client with retry logic and rich error handling.
///
/// Cloning is cheap; clones share the connection pool and rate limiter.
///
/// # Examples
///
/// ```no_run
/// use vndb_kana::{filter, fields, Client, Query};
///
/// # async fn example() -> Result<(), vndb_kana::Error> {
/// let client = Client::builder().build()?;
///
/// let page = client
///     .vn::<serde_json::Value>(
///         &Query::new()
///             .filters(filter::and([
///                 filter::language("en")?,
///                 filter::rating_between(80..)?,
///             ])?)
///             .fields(fields::vn::BASIC)
///             .sort("rating")
///             .reverse(true),
///     )
///     .await?;
///
/// for vn in &page.results {
///     println!("{}", vn["title"]);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: Url,
    default_headers: HeaderMap,
    retry_policy: RetryPolicy,
    rate_limiter: Option<RateLimiter>,
    timeout: Option<Duration>,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The API base URL this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The retry policy applied to every call.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.retry_policy
    }

    /// The local rate limiter, if enabled.
    pub fn rate_limiter(&self) -> Option<&RateLimiter> {
        self.inner.rate_limiter.as_ref()
    }

    /// Makes a typed API request under the client's retry policy.
    ///
    /// An empty success body (such as a `204 No Content`) decodes as JSON
    /// `null`, so `Res = ()` works for endpoints that return nothing.
    pub async fn call<Req, Res>(
        &self,
        metadata: RequestMetadata,
        body: Option<&Req>,
    ) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let start_time = Instant::now();
        let body = body
            .map(|b| serde_json::to_value(b).map_err(|e| Error::SerializationFailed(e.to_string())))
            .transpose()?;

        let mut attempts = 0;
        retry::retry(&self.inner.retry_policy, || {
            attempts += 1;
            self.attempt(&metadata, body.as_ref(), attempts, start_time)
        })
        .await
        .inspect_err(|e| {
            tracing::warn!(
                error = %e,
                method = %metadata.method,
                path = %metadata.path,
                "Request failed"
            );
        })
    }

    async fn attempt<Res>(
        &self,
        metadata: &RequestMetadata,
        body: Option<&serde_json::Value>,
        attempt: usize,
        start_time: Instant,
    ) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        if let Some(limiter) = &self.inner.rate_limiter {
            limiter.acquire().await;
        }

        let response = self.execute_request(metadata, body, attempt).await?;
        self.parse_response(response, start_time.elapsed(), attempt)
            .await
    }

    /// Builds the full URL for a path below the base URL.
    fn url_for(&self, metadata: &RequestMetadata) -> Url {
        let mut url = self.inner.base_url.clone();
        let base_path = url.path().trim_end_matches('/').to_string();
        let path = metadata.path.trim_start_matches('/');
        url.set_path(&format!("{}/{}", base_path, path));

        if !metadata.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &metadata.query_params {
                pairs.append_pair(key, value);
            }
        }
        url
    }

    /// Executes a single request attempt.
    async fn execute_request(
        &self,
        metadata: &RequestMetadata,
        body: Option<&serde_json::Value>,
        attempt: usize,
    ) -> Result<reqwest::Response> {
        let url = self.url_for(metadata);

        tracing::debug!(
            method = %metadata.method,
            url = %url,
            attempt = attempt,
            "Executing HTTP request"
        );

        let mut request = self
            .inner
            .http_client
            .request(metadata.method.clone(), url)
            .headers(self.inner.default_headers.clone());

        for (name, value) in &metadata.headers {
            request = request.header(name, value);
        }

        if let Some(timeout) = self.inner.timeout {
            request = request.timeout(timeout);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }

    /// Classifies failures and decodes successful bodies.
    async fn parse_response<Res>(
        &self,
        response: reqwest::Response,
        latency: Duration,
        attempts: usize,
    ) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        let status = response.status();
        let headers = response.headers().clone();

        tracing::info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            attempts = attempts,
            "Received HTTP response"
        );

        if !status.is_success() {
            let raw_response = response.text().await.unwrap_or_default();

            if status.is_client_error() {
                tracing::error!(
                    status = status.as_u16(),
                    response = %raw_response,
                    "Client error (4xx)"
                );
            } else if status.is_server_error() {
                tracing::warn!(
                    status = status.as_u16(),
                    response = %raw_response,
                    "Server error (5xx)"
                );
            }

            return Err(Error::classify_response(status, &headers, raw_response));
        }

        let raw_body = response.text().await?;
        let json = if raw_body.trim().is_empty() {
            "null"
        } else {
            raw_body.as_str()
        };

        match serde_json::from_str::<Res>(json) {
            Ok(data) => Ok(Response::new(
                data, raw_body, status, headers, latency, attempts,
            )),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    raw_response = %raw_body,
                    "Failed to deserialize response"
                );

                Err(Error::DeserializationFailed {
                    raw_response: raw_body,
                    serde_error: e.to_string(),
                    status,
                })
            }
        }
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// Defaults: the public API URL, no token, no timeout, the default
/// [`RetryPolicy`], and a local limit of 200 requests per 5 minutes.
///
/// # Examples
///
/// ```no_run
/// use vndb_kana::{ClientBuilder, RetryPolicy};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), vndb_kana::Error> {
/// let client = ClientBuilder::new()
///     .token("hsoo-ybws4-j8yb-qvlxl-iw1nr-w7q44")?
///     .timeout(Duration::from_secs(30))
///     .retry_policy(RetryPolicy::builder().max_retries(5).build()?)
///     .user_agent("my-app/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    retry_policy: RetryPolicy,
    rate_limiter: Option<RateLimiterConfig>,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            http::header::USER_AGENT,
            HeaderValue::from_static(DEFAULT_USER_AGENT),
        );

        Self {
            base_url: None,
            default_headers,
            retry_policy: RetryPolicy::default(),
            rate_limiter: Some(RateLimiterConfig::default()),
            timeout: None,
        }
    }

    /// Creates a builder configured from `VNDB_TOKEN` and `VNDB_API_URL`.
    ///
    /// Unset or empty variables are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if either variable holds an invalid value.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::new();

        if let Some(url) = env_var(BASE_URL_ENV) {
            builder = builder.base_url(url)?;
        }
        if let Some(token) = env_var(TOKEN_ENV) {
            builder = builder.token(token)?;
        }

        Ok(builder)
    }

    /// Sets the base URL for all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Authenticates every request with `Authorization: Token <token>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be used as a header value.
    pub fn token(self, token: impl AsRef<str>) -> Result<Self> {
        let token = token.as_ref().trim();
        if token.is_empty() {
            return Err(Error::ConfigurationError("API token is empty".to_string()));
        }
        self.default_header("Authorization", format!("Token {}", token))
    }

    /// Replaces the `User-Agent` header.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a valid header value.
    pub fn user_agent(self, user_agent: impl AsRef<str>) -> Result<Self> {
        self.default_header("User-Agent", user_agent)
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let mut value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        if name == http::header::AUTHORIZATION {
            value.set_sensitive(true);
        }
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the retry policy for failed requests.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the local rate limit.
    pub fn rate_limiter(mut self, config: RateLimiterConfig) -> Self {
        self.rate_limiter = Some(config);
        self
    }

    /// Disables the local rate limiter; only server 429s will slow requests.
    pub fn no_rate_limiter(mut self) -> Self {
        self.rate_limiter = None;
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn build(self) -> Result<Client> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };

        let http_client = reqwest::Client::builder().build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                default_headers: self.default_headers,
                retry_policy: self.retry_policy,
                rate_limiter: self.rate_limiter.map(RateLimiter::new),
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
