//! Endpoint wrappers.
//!
//! Each method maps one API resource to one HTTP verb and goes through
//! [`Client::call`], so they all share the client's retry policy, rate
//! limiter and error classification.

use crate::format::parse_id;
use crate::metadata::RequestMetadata;
use crate::models::{
    AuthInfo, Endpoint, RlistPatch, Stats, UlistLabels, UlistPatch, UserLookup,
};
use crate::query::{paginate, Query, QueryResponse};
use crate::{Client, Error, Result};
use http::Method;
use serde::de::{DeserializeOwned, IgnoredAny};

impl Client {
    /// Posts `query` to a query endpoint and returns one page.
    pub async fn query<T>(&self, endpoint: Endpoint, query: &Query) -> Result<QueryResponse<T>>
    where
        T: DeserializeOwned,
    {
        let metadata = RequestMetadata::new(Method::POST, endpoint.path());
        Ok(self
            .call::<_, QueryResponse<T>>(metadata, Some(query))
            .await?
            .into_data())
    }

    /// Fetches up to `max_pages` pages of `query`, starting from page 1.
    ///
    /// Any `page` set on `query` is ignored.
    pub async fn query_all<T>(
        &self,
        endpoint: Endpoint,
        query: &Query,
        max_pages: u32,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        paginate(
            |page| {
                let query = query.clone().page(page);
                async move { self.query(endpoint, &query).await }
            },
            max_pages,
        )
        .await
    }

    /// Queries visual novels.
    pub async fn vn<T: DeserializeOwned>(&self, query: &Query) -> Result<QueryResponse<T>> {
        self.query(Endpoint::Vn, query).await
    }

    /// Queries releases.
    pub async fn release<T: DeserializeOwned>(&self, query: &Query) -> Result<QueryResponse<T>> {
        self.query(Endpoint::Release, query).await
    }

    /// Queries producers.
    pub async fn producer<T: DeserializeOwned>(&self, query: &Query) -> Result<QueryResponse<T>> {
        self.query(Endpoint::Producer, query).await
    }

    /// Queries characters.
    pub async fn character<T: DeserializeOwned>(&self, query: &Query) -> Result<QueryResponse<T>> {
        self.query(Endpoint::Character, query).await
    }

    /// Queries staff.
    pub async fn staff<T: DeserializeOwned>(&self, query: &Query) -> Result<QueryResponse<T>> {
        self.query(Endpoint::Staff, query).await
    }

    /// Queries tags.
    pub async fn tag<T: DeserializeOwned>(&self, query: &Query) -> Result<QueryResponse<T>> {
        self.query(Endpoint::Tag, query).await
    }

    /// Queries character traits.
    pub async fn traits<T: DeserializeOwned>(&self, query: &Query) -> Result<QueryResponse<T>> {
        self.query(Endpoint::Trait, query).await
    }

    /// Queries quotes.
    pub async fn quote<T: DeserializeOwned>(&self, query: &Query) -> Result<QueryResponse<T>> {
        self.query(Endpoint::Quote, query).await
    }

    /// Queries a user's visual novel list; set [`Query::user`] or
    /// authenticate with a token.
    pub async fn ulist<T: DeserializeOwned>(&self, query: &Query) -> Result<QueryResponse<T>> {
        self.query(Endpoint::Ulist, query).await
    }

    /// Fetches the API schema (`GET /schema`).
    pub async fn schema(&self) -> Result<serde_json::Value> {
        self.get("/schema").await
    }

    /// Fetches database totals (`GET /stats`).
    pub async fn stats(&self) -> Result<Stats> {
        self.get("/stats").await
    }

    /// Describes the configured token (`GET /authinfo`).
    pub async fn auth_info(&self) -> Result<AuthInfo> {
        self.get("/authinfo").await
    }

    /// Looks up users by name or id (`GET /user`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `names` is empty.
    pub async fn users<I, S>(&self, names: I, fields: Option<&str>) -> Result<UserLookup>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut metadata = RequestMetadata::new(Method::GET, "/user");
        for name in names {
            metadata = metadata.with_query_param("q", name);
        }
        if metadata.query_params.is_empty() {
            return Err(Error::validation("at least one user name or id is required"));
        }
        let metadata = metadata.with_optional_query_param("fields", fields);

        Ok(self.call::<(), UserLookup>(metadata, None).await?.into_data())
    }

    /// Lists a user's labels (`GET /ulist_labels`). Without `user`, the
    /// token owner's labels are returned.
    pub async fn ulist_labels(&self, user: Option<&str>, fields: Option<&str>) -> Result<UlistLabels> {
        let metadata = RequestMetadata::new(Method::GET, "/ulist_labels")
            .with_optional_query_param("user", user)
            .with_optional_query_param("fields", fields);

        Ok(self.call::<(), UlistLabels>(metadata, None).await?.into_data())
    }

    /// Adds or updates a visual novel in the token owner's list
    /// (`PATCH /ulist/<id>`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a malformed id or a vote outside
    /// 10–100.
    pub async fn update_ulist(&self, vn_id: &str, patch: &UlistPatch) -> Result<()> {
        check_id(vn_id, 'v')?;
        patch.validate()?;
        let metadata = RequestMetadata::new(Method::PATCH, format!("/ulist/{}", vn_id));
        self.call::<_, IgnoredAny>(metadata, Some(patch))
            .await
            .map(|_| ())
    }

    /// Removes a visual novel from the token owner's list (`DELETE /ulist/<id>`).
    pub async fn delete_ulist(&self, vn_id: &str) -> Result<()> {
        check_id(vn_id, 'v')?;
        let metadata = RequestMetadata::new(Method::DELETE, format!("/ulist/{}", vn_id));
        self.call::<(), IgnoredAny>(metadata, None)
            .await
            .map(|_| ())
    }

    /// Adds or updates a release in the token owner's list (`PATCH /rlist/<id>`).
    pub async fn update_rlist(&self, release_id: &str, patch: &RlistPatch) -> Result<()> {
        check_id(release_id, 'r')?;
        let metadata = RequestMetadata::new(Method::PATCH, format!("/rlist/{}", release_id));
        self.call::<_, IgnoredAny>(metadata, Some(patch))
            .await
            .map(|_| ())
    }

    /// Removes a release from the token owner's list (`DELETE /rlist/<id>`).
    pub async fn delete_rlist(&self, release_id: &str) -> Result<()> {
        check_id(release_id, 'r')?;
        let metadata = RequestMetadata::new(Method::DELETE, format!("/rlist/{}", release_id));
        self.call::<(), IgnoredAny>(metadata, None)
            .await
            .map(|_| ())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let metadata = RequestMetadata::new(Method::GET, path);
        Ok(self.call::<(), T>(metadata, None).await?.into_data())
    }
}

fn check_id(id: &str, prefix: char) -> Result<()> {
    let (found, _) = parse_id(id)?;
    if found != prefix {
        return Err(Error::validation(format!(
            "expected a '{}' id, got '{}'",
            prefix, id
        )));
    }
    Ok(())
}
