//! # vndb-kana - A typed client for the VNDB Kana API
//!
//! `vndb-kana` wraps the VNDB query API with a validated filter builder,
//! automatic retries with exponential backoff, error classification, and
//! pagination, on top of `reqwest`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use serde::Deserialize;
//! use vndb_kana::{fields, filter, Client, Query};
//!
//! #[derive(Debug, Deserialize)]
//! struct Vn {
//!     id: String,
//!     title: String,
//!     rating: Option<f64>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), vndb_kana::Error> {
//!     let client = Client::builder().build()?;
//!
//!     let filters = filter::and(vec![
//!         filter::language("ja")?,
//!         filter::rating_between(80..)?,
//!     ])?;
//!     let query = Query::new()
//!         .filters(filters)
//!         .fields(fields::vn::BASIC)
//!         .sort("rating")
//!         .reverse(true)
//!         .results(10);
//!
//!     let page = client.vn::<Vn>(&query).await?;
//!     for vn in &page.results {
//!         println!("{} {} {}", vn.id, vn.title, vndb_kana::format::format_rating(vn.rating));
//!     }
//!
//!     let stats = client.stats().await?;
//!     println!("{} visual novels in the database", stats.vn);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Filter builder** - Filters are checked when built, so malformed ones never reach the server
//! - **Retries** - Exponential backoff with optional jitter, honoring the server's `Retry-After`
//! - **Error classification** - One [`Error`] type with rate-limit, auth, client and server facets
//! - **Local rate limiting** - A sliding window that stays under the API's request quota
//! - **Pagination** - [`Client::query_all`] and [`query::paginate`] collect results across pages
//! - **Logging** - Structured `tracing` events for every request, retry and failure
//!
//! ## Error Handling
//!
//! ```no_run
//! use vndb_kana::{Client, Error, Query};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().build()?;
//! match client.vn::<serde_json::Value>(&Query::new()).await {
//!     Ok(page) => println!("{} results", page.results.len()),
//!     Err(e) if e.is_rate_limit() => eprintln!("throttled, retry in {:?}", e.retry_after()),
//!     Err(e @ Error::Api { .. }) => eprintln!("{}", e.friendly_message()),
//!     Err(e) => eprintln!("request failed: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Retry Policies
//!
//! ```no_run
//! use std::time::Duration;
//! use vndb_kana::retry::{OrPredicate, RetryOnRateLimit, RetryOnTimeout};
//! use vndb_kana::{Client, RetryPolicy};
//!
//! # fn example() -> Result<(), vndb_kana::Error> {
//! let policy = RetryPolicy::builder()
//!     .max_retries(5)
//!     .base_delay(Duration::from_millis(250))
//!     .jitter(true)
//!     .predicate(OrPredicate::new(vec![
//!         Box::new(RetryOnRateLimit),
//!         Box::new(RetryOnTimeout),
//!     ]))
//!     .build()?;
//!
//! let client = Client::builder().retry_policy(policy).build()?;
//! # Ok(())
//! # }
//! ```

mod client;
mod endpoints;
mod error;
pub mod fields;
pub mod filter;
pub mod format;
pub mod metadata;
mod models;
pub mod query;
pub mod rate_limit;
mod response;
pub mod retry;

pub use client::{Client, ClientBuilder, BASE_URL_ENV, DEFAULT_BASE_URL, TOKEN_ENV};
pub use error::{
    is_auth_error, is_classified_error, is_rate_limit_error, Error, Result, TransportKind,
};
pub use filter::Filter;
pub use models::{
    AuthInfo, Endpoint, ReleaseStatus, RlistPatch, Stats, UlistLabel, UlistLabels, UlistPatch,
    UserInfo, UserLookup,
};
pub use query::{Query, QueryResponse};
pub use response::Response;
pub use retry::{RetryPolicy, RetryPredicate};
