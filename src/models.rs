//! Typed request and response bodies for the non-query endpoints.
//!
//! Query endpoints return whatever fields were requested, so their records
//! are left generic (see [`crate::QueryResponse`]).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The entity collections that accept `POST` queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `/vn`
    Vn,
    /// `/release`
    Release,
    /// `/producer`
    Producer,
    /// `/character`
    Character,
    /// `/staff`
    Staff,
    /// `/tag`
    Tag,
    /// `/trait`
    Trait,
    /// `/quote`
    Quote,
    /// `/ulist`, a user's visual novel list
    Ulist,
}

impl Endpoint {
    /// The path below the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Vn => "/vn",
            Endpoint::Release => "/release",
            Endpoint::Producer => "/producer",
            Endpoint::Character => "/character",
            Endpoint::Staff => "/staff",
            Endpoint::Tag => "/tag",
            Endpoint::Trait => "/trait",
            Endpoint::Quote => "/quote",
            Endpoint::Ulist => "/ulist",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Database totals from `GET /stats`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Stats {
    /// Number of characters
    pub chars: u64,
    /// Number of producers
    pub producers: u64,
    /// Number of releases
    pub releases: u64,
    /// Number of staff entries
    pub staff: u64,
    /// Number of tags
    pub tags: u64,
    /// Number of character traits
    pub traits: u64,
    /// Number of visual novels
    pub vn: u64,
}

/// The token owner and its permissions, from `GET /authinfo`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthInfo {
    /// User id of the token owner, e.g. `"u2"`
    pub id: String,
    /// Username of the token owner
    pub username: String,
    /// Permissions granted to the token, such as `"listread"`
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl AuthInfo {
    /// Whether the token grants `permission`, e.g. `"listwrite"`.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// A user returned by `GET /user`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserInfo {
    /// User id, e.g. `"u2"`
    pub id: String,
    /// Username
    pub username: String,
    /// Number of play-time votes, when requested.
    #[serde(default)]
    pub lengthvotes: Option<u64>,
    /// Sum of play-time votes in minutes, when requested.
    #[serde(default)]
    pub lengthvotes_sum: Option<u64>,
}

/// Lookup results keyed by the query string; unknown users map to `None`.
pub type UserLookup = HashMap<String, Option<UserInfo>>;

/// A list label from `GET /ulist_labels`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UlistLabel {
    /// Label id; ids below 10 are the built-in labels
    pub id: u32,
    /// Whether the label is hidden from other users
    pub private: bool,
    /// Label name
    pub label: String,
    /// Number of entries with this label, when requested.
    #[serde(default)]
    pub count: Option<u64>,
}

/// Response body of `GET /ulist_labels`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UlistLabels {
    /// The user's labels
    pub labels: Vec<UlistLabel>,
}

/// Changes for `PATCH /ulist/<id>`. Unset fields are left untouched.
///
/// # Examples
///
/// ```
/// use vndb_kana::UlistPatch;
///
/// let patch = UlistPatch::new().vote(85).labels_set(vec![2]);
/// assert_eq!(
///     serde_json::to_value(&patch).unwrap(),
///     serde_json::json!({"vote": 85, "labels_set": [2]})
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UlistPatch {
    /// Vote on the 10–100 scale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote: Option<u8>,
    /// Free-form notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Start date, `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started: Option<String>,
    /// Finish date, `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished: Option<String>,
    /// Replaces all labels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<u32>>,
    /// Adds labels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels_set: Option<Vec<u32>>,
    /// Removes labels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels_unset: Option<Vec<u32>>,
}

impl UlistPatch {
    /// An empty patch, which only makes sure the entry exists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Vote on the 10–100 scale.
    pub fn vote(mut self, vote: u8) -> Self {
        self.vote = Some(vote);
        self
    }

    /// Free-form notes.
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Start date, `YYYY-MM-DD`.
    pub fn started(mut self, date: impl Into<String>) -> Self {
        self.started = Some(date.into());
        self
    }

    /// Finish date, `YYYY-MM-DD`.
    pub fn finished(mut self, date: impl Into<String>) -> Self {
        self.finished = Some(date.into());
        self
    }

    /// Replaces the entry's labels.
    pub fn labels(mut self, labels: Vec<u32>) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Adds labels to the entry.
    pub fn labels_set(mut self, labels: Vec<u32>) -> Self {
        self.labels_set = Some(labels);
        self
    }

    /// Removes labels from the entry.
    pub fn labels_unset(mut self, labels: Vec<u32>) -> Self {
        self.labels_unset = Some(labels);
        self
    }

    pub(crate) fn validate(&self) -> crate::Result<()> {
        if let Some(vote) = self.vote {
            if !(10..=100).contains(&vote) {
                return Err(crate::Error::validation(format!(
                    "vote must be between 10 and 100, got {}",
                    vote
                )));
            }
        }
        Ok(())
    }
}

/// Ownership status of a release in a user's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStatus {
    /// Status not set
    Unknown = 0,
    /// Ordered or otherwise on its way
    Pending = 1,
    /// In the user's possession
    Obtained = 2,
    /// Lent out to someone else
    OnLoan = 3,
    /// No longer owned
    Deleted = 4,
}

impl Serialize for ReleaseStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// Changes for `PATCH /rlist/<id>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RlistPatch {
    /// New ownership status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReleaseStatus>,
}

impl RlistPatch {
    /// A patch setting the ownership status.
    pub fn status(status: ReleaseStatus) -> Self {
        Self {
            status: Some(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(Endpoint::Vn.path(), "/vn");
        assert_eq!(Endpoint::Trait.to_string(), "/trait");
        assert_eq!(Endpoint::Ulist.path(), "/ulist");
    }

    #[test]
    fn test_user_lookup_with_unknown_user() {
        let lookup: UserLookup = serde_json::from_value(json!({
            "yorhel": {"id": "u2", "username": "yorhel"},
            "nobody": null
        }))
        .unwrap();
        assert_eq!(lookup["yorhel"].as_ref().unwrap().id, "u2");
        assert!(lookup["nobody"].is_none());
    }

    #[test]
    fn test_auth_info_permissions() {
        let info: AuthInfo = serde_json::from_value(json!({
            "id": "u2", "username": "yorhel", "permissions": ["listread"]
        }))
        .unwrap();
        assert!(info.has_permission("listread"));
        assert!(!info.has_permission("listwrite"));
    }

    #[test]
    fn test_patch_bodies() {
        assert_eq!(serde_json::to_value(UlistPatch::new()).unwrap(), json!({}));
        assert_eq!(
            serde_json::to_value(RlistPatch::status(ReleaseStatus::Obtained)).unwrap(),
            json!({"status": 2})
        );
        assert!(UlistPatch::new().vote(5).validate().is_err());
        assert!(UlistPatch::new().vote(100).validate().is_ok());
    }
}
