//! Query bodies, result pages and pagination.

use crate::filter::Filter;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// The JSON body posted to a query endpoint such as `/vn`.
///
/// Unset options are left out of the body so the server applies its own
/// defaults.
///
/// # Examples
///
/// ```
/// use vndb_kana::{filter, fields, Query};
///
/// let query = Query::new()
///     .filters(filter::search("steins;gate")?)
///     .fields(fields::vn::BASIC)
///     .sort("rating")
///     .reverse(true)
///     .results(10);
///
/// let body = serde_json::to_value(&query).unwrap();
/// assert_eq!(body["filters"], serde_json::json!(["search", "=", "steins;gate"]));
/// assert_eq!(body["results"], 10);
/// assert!(body.get("page").is_none());
/// # Ok::<(), vndb_kana::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Query {
    /// Filter expression; omitted means "everything".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Filter>,
    /// Comma-separated field paths to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<String>,
    /// Field to sort on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// Sort descending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse: Option<bool>,
    /// Page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<u32>,
    /// 1-based page number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// User id for user-relative fields and the `ulist` endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Ask for the total number of matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<bool>,
    /// Ask for the compact string form of the filters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compact_filters: Option<bool>,
    /// Ask for the normalized form of the filters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_filters: Option<bool>,
}

impl Query {
    /// An empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter expression.
    pub fn filters(mut self, filters: Filter) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Sets the fields to return.
    pub fn fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = Some(fields.into());
        self
    }

    /// Sets the sort field.
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Sorts descending when `true`.
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = Some(reverse);
        self
    }

    /// Sets the page size.
    pub fn results(mut self, results: u32) -> Self {
        self.results = Some(results);
        self
    }

    /// Sets the page number.
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets the user id.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Requests the total match count.
    pub fn count(mut self, count: bool) -> Self {
        self.count = Some(count);
        self
    }

    /// Requests the compact filter string in the response.
    pub fn compact_filters(mut self, compact: bool) -> Self {
        self.compact_filters = Some(compact);
        self
    }

    /// Requests the normalized filters in the response.
    pub fn normalized_filters(mut self, normalized: bool) -> Self {
        self.normalized_filters = Some(normalized);
        self
    }
}

/// One page of results from a query endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryResponse<T> {
    /// The matching records, in server order.
    pub results: Vec<T>,
    /// Whether another page exists.
    #[serde(default)]
    pub more: bool,
    /// Total number of matches, when requested.
    #[serde(default)]
    pub count: Option<u64>,
    /// Compact filter string, when requested.
    #[serde(default)]
    pub compact_filters: Option<String>,
    /// Normalized filters, when requested.
    #[serde(default)]
    pub normalized_filters: Option<serde_json::Value>,
}

/// Fetches consecutive pages and concatenates their results.
///
/// `fetch` is called with page numbers 1, 2, 3, ... until a page reports
/// `more == false` or `max_pages` pages have been fetched. The first error
/// stops pagination and is returned.
///
/// # Errors
///
/// Returns [`Error::Validation`] if `max_pages` is 0.
///
/// # Examples
///
/// ```
/// use vndb_kana::query::{paginate, QueryResponse};
///
/// # async fn example() -> Result<(), vndb_kana::Error> {
/// let all = paginate(
///     |page| async move {
///         Ok(QueryResponse {
///             results: vec![page],
///             more: page < 3,
///             count: None,
///             compact_filters: None,
///             normalized_filters: None,
///         })
///     },
///     10,
/// )
/// .await?;
/// assert_eq!(all, vec![1, 2, 3]);
/// # Ok(())
/// # }
/// ```
pub async fn paginate<T, F, Fut>(mut fetch: F, max_pages: u32) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<QueryResponse<T>>>,
{
    if max_pages == 0 {
        return Err(Error::validation("max_pages must be at least 1"));
    }

    let mut all = Vec::new();
    for page in 1..=max_pages {
        let response = fetch(page).await?;
        all.extend(response.results);

        if !response.more {
            return Ok(all);
        }
        if page == max_pages {
            tracing::debug!(max_pages, "Stopped paginating at page cap");
        }
    }
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn page(results: Vec<u32>, more: bool) -> QueryResponse<u32> {
        QueryResponse {
            results,
            more,
            count: None,
            compact_filters: None,
            normalized_filters: None,
        }
    }

    #[test]
    fn test_empty_query_serializes_to_empty_object() {
        assert_eq!(serde_json::to_value(Query::new()).unwrap(), json!({}));
    }

    #[test]
    fn test_full_query_body() {
        let query = Query::new()
            .filters(filter::by_ids(["v17", "v11"]).unwrap())
            .fields("title, rating")
            .sort("votecount")
            .reverse(true)
            .results(25)
            .page(2)
            .user("u1")
            .count(true)
            .compact_filters(true)
            .normalized_filters(false);

        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({
                "filters": ["or", ["id", "=", "v17"], ["id", "=", "v11"]],
                "fields": "title, rating",
                "sort": "votecount",
                "reverse": true,
                "results": 25,
                "page": 2,
                "user": "u1",
                "count": true,
                "compact_filters": true,
                "normalized_filters": false
            })
        );
    }

    #[test]
    fn test_response_defaults() {
        let response: QueryResponse<serde_json::Value> =
            serde_json::from_value(json!({"results": [{"id": "v17"}]})).unwrap();
        assert_eq!(response.results.len(), 1);
        assert!(!response.more);
        assert_eq!(response.count, None);
    }

    #[tokio::test]
    async fn test_paginate_stops_when_no_more() {
        let calls = AtomicU32::new(0);
        let all = paginate(
            |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(page(vec![n * 10, n * 10 + 1], n < 2)) }
            },
            5,
        )
        .await
        .unwrap();

        assert_eq!(all, vec![10, 11, 20, 21]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_paginate_respects_cap() {
        let all = paginate(|n| async move { Ok(page(vec![n], true)) }, 3)
            .await
            .unwrap();
        assert_eq!(all, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_paginate_propagates_errors() {
        let result = paginate(
            |n| async move {
                if n == 2 {
                    Err(Error::api(http::StatusCode::BAD_GATEWAY, "down"))
                } else {
                    Ok(page(vec![n], true))
                }
            },
            5,
        )
        .await;
        assert!(matches!(result, Err(Error::Api { .. })));
    }

    #[tokio::test]
    async fn test_paginate_rejects_zero_pages() {
        let result = paginate(|n| async move { Ok(page(vec![n], false)) }, 0).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
