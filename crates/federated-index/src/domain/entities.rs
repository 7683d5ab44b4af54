//! # Domain Entities
//!
//! Index entries as stored, their typed values, and the enriched shapes the
//! federated reader hands back.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::errors::{FeedError, StoreError};
use super::invariants::effective_cursor;
use super::value_objects::OwnerId;

/// A (key, value) pair read from one sub-namespace of a store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreEntry {
    /// Store-local key (pure cursor or `<scope>:<cursor>`).
    pub key: String,
    /// Index-specific JSON value.
    pub value: serde_json::Value,
}

impl StoreEntry {
    /// Create an entry.
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Decode the value into its typed index shape.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, FeedError> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            FeedError::Decode(format!("entry {}: {}", self.key, e))
        })
    }
}

/// Value of a `notificationsIdx` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationIdxValue {
    /// URL of the item the notification is about.
    pub item_url: String,
    /// When the index recorded the notification. Missing or unparsable
    /// times decode as `None`; the entry itself is still served.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// Parse an RFC 3339 timestamp.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(parse_timestamp))
}

/// A decoded notification index entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationEntry {
    /// Store-local key as scanned.
    pub key: String,
    /// Decoded value.
    pub value: NotificationIdxValue,
}

impl NotificationEntry {
    /// Cursor portion of the key.
    pub fn cursor(&self) -> &str {
        effective_cursor(&self.key)
    }

    /// Logical identity used for deduplication.
    pub fn identity(&self) -> &str {
        &self.value.item_url
    }
}

impl TryFrom<&StoreEntry> for NotificationEntry {
    type Error = FeedError;

    fn try_from(entry: &StoreEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            key: entry.key.clone(),
            value: entry.decode()?,
        })
    }
}

/// Reference to an addressable item (post, comment, profile...).
///
/// Unknown fields written by the producer are carried through untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRef {
    /// Identity of the item.
    pub db_url: String,
    /// Author of the item, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<OwnerId>,
    /// Producer-specific extra fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ItemRef {
    /// A reference holding nothing but the item URL.
    pub fn bare(db_url: impl Into<String>) -> Self {
        Self {
            db_url: db_url.into(),
            author_id: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Value of a `reactionsIdx` entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReactionIdxValue {
    /// Subject descriptor as recorded by the indexer.
    pub subject: Option<ItemRef>,
    /// Reaction tag to voter URLs.
    pub reactions: BTreeMap<String, Vec<String>>,
}

/// Value of a `threadIdx` entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreadIdxValue {
    /// Replies in the order the indexer recorded them.
    pub items: Vec<ItemRef>,
}

/// Value of a `followsIdx` entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FollowsIdxValue {
    /// Owners following the subject.
    pub follower_ids: Vec<OwnerId>,
}

/// Community pointer inside a membership record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityRef {
    /// The community's owner id.
    pub user_id: OwnerId,
}

/// Value of a `memberships` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipValue {
    /// The community this owner belongs to.
    pub community: CommunityRef,
}

/// Value of the `profile` entry `self`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileValue {
    /// Human readable name.
    pub display_name: Option<String>,
}

/// A reactable / repliable entity as seen by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subject {
    /// Identity of the subject item.
    pub url: String,
    /// Author of the subject.
    pub author_id: Option<OwnerId>,
    /// Community the subject was posted in.
    pub community_id: Option<OwnerId>,
}

impl Subject {
    /// Subject posted outside any community.
    pub fn authored(url: impl Into<String>, author: impl Into<OwnerId>) -> Self {
        Self {
            url: url.into(),
            author_id: Some(author.into()),
            community_id: None,
        }
    }

    /// Subject posted in a community.
    pub fn in_community(
        url: impl Into<String>,
        author: impl Into<OwnerId>,
        community: impl Into<OwnerId>,
    ) -> Self {
        Self {
            url: url.into(),
            author_id: Some(author.into()),
            community_id: Some(community.into()),
        }
    }
}

/// The requesting viewer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewerInfo {
    /// Stable identity.
    pub user_id: OwnerId,
    /// URL of the viewer's own public database.
    pub db_url: String,
}

impl ViewerInfo {
    /// Create viewer info.
    pub fn new(user_id: impl Into<OwnerId>, db_url: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            db_url: db_url.into(),
        }
    }
}

/// Resolved author descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    /// Canonical owner URL.
    pub url: String,
    /// Stable identity.
    pub user_id: OwnerId,
    /// Display name, falling back to the id.
    pub display_name: String,
}

/// Caller-owned memo of resolved authors for one request.
#[derive(Debug, Default)]
pub struct AuthorCache {
    entries: HashMap<OwnerId, Author>,
}

impl AuthorCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a resolved author.
    pub fn get(&self, owner: &OwnerId) -> Option<&Author> {
        self.entries.get(owner)
    }

    /// Remember a resolved author.
    pub fn insert(&mut self, author: Author) {
        self.entries.insert(author.user_id.clone(), author);
    }

    /// Number of memoized authors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been memoized.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Author fields attached to a hydrated notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRef {
    /// Stable identity of the item's origin.
    pub user_id: OwnerId,
    /// Canonical owner URL.
    pub url: String,
}

/// A notification enriched with its referenced item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydratedNotification {
    /// Cursor portion of the index key.
    pub key: String,
    /// URL of the referenced item.
    pub item_url: String,
    /// Time the index recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Earlier of the recorded time and the item's own time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blended_created_at: Option<DateTime<Utc>>,
    /// Origin owner of the item.
    pub author: AuthorRef,
    /// The item value, when it could be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<serde_json::Value>,
}

/// Merged reactions for one subject.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReactionSummary {
    /// Subject descriptor.
    pub subject: ItemRef,
    /// Reaction tag to resolved voter ids.
    pub reactions: BTreeMap<String, Vec<OwnerId>>,
}

/// Result of reading one federated source.
///
/// Aggregation treats `Absent` and `SourceError` alike: the source
/// contributes nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome<T> {
    /// The source answered with a value.
    Found(T),
    /// The source, or the entry within it, does not exist.
    Absent,
    /// The source exists but failed to answer.
    SourceError(StoreError),
}

impl<T> SourceOutcome<T> {
    /// Fold a point lookup into an outcome.
    pub fn from_lookup(result: Result<Option<T>, StoreError>) -> Self {
        match result {
            Ok(Some(value)) => SourceOutcome::Found(value),
            Ok(None) => SourceOutcome::Absent,
            Err(StoreError::NotFound { .. }) => SourceOutcome::Absent,
            Err(e) => SourceOutcome::SourceError(e),
        }
    }

    /// The contribution of this source, if any.
    pub fn found(self) -> Option<T> {
        match self {
            SourceOutcome::Found(value) => Some(value),
            SourceOutcome::Absent | SourceOutcome::SourceError(_) => None,
        }
    }

    /// True when the source produced a value.
    pub fn is_found(&self) -> bool {
        matches!(self, SourceOutcome::Found(_))
    }

    /// Transform the found value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SourceOutcome<U> {
        match self {
            SourceOutcome::Found(value) => SourceOutcome::Found(f(value)),
            SourceOutcome::Absent => SourceOutcome::Absent,
            SourceOutcome::SourceError(e) => SourceOutcome::SourceError(e),
        }
    }

    /// Decode or otherwise fallibly transform the found value; a failure
    /// turns into a `SourceError`.
    pub fn and_then_decode<U>(
        self,
        f: impl FnOnce(T) -> Result<U, FeedError>,
    ) -> SourceOutcome<U> {
        match self {
            SourceOutcome::Found(value) => match f(value) {
                Ok(decoded) => SourceOutcome::Found(decoded),
                Err(e) => SourceOutcome::SourceError(StoreError::Decode(e.to_string())),
            },
            SourceOutcome::Absent => SourceOutcome::Absent,
            SourceOutcome::SourceError(e) => SourceOutcome::SourceError(e),
        }
    }
}
