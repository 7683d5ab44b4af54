//! # URL Helpers
//!
//! Owner URLs have the shape `hyper://<host>/`. Item URLs append a table
//! path and a key: `hyper://<host>/<schema>/<...>/<key>`.

use crate::domain::{FeedError, OwnerId};

/// Scheme used for canonical owner URLs.
pub const OWNER_URL_SCHEME: &str = "hyper://";

/// Canonical URL of an owner.
pub fn owner_url(owner: &OwnerId) -> String {
    format!("{OWNER_URL_SCHEME}{owner}/")
}

/// An item URL split into its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemUrl {
    /// `hyper://<host>/`
    pub origin: String,
    /// Table path, segments joined with `/`.
    pub schema_id: String,
    /// Key within the table.
    pub key: String,
}

fn split_url(url: &str) -> Result<(&str, &str), FeedError> {
    let (_, rest) = url
        .split_once("://")
        .ok_or_else(|| FeedError::MalformedReference(format!("{url}: missing scheme")))?;
    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let (authority, path) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    let host = authority.rsplit('@').next().unwrap_or(authority);
    let host = host.split(':').next().unwrap_or(host);
    if host.is_empty() {
        return Err(FeedError::MalformedReference(format!("{url}: missing host")));
    }
    Ok((host, path))
}

/// Host component of a URL.
pub fn address_host(url: &str) -> Result<&str, FeedError> {
    split_url(url).map(|(host, _)| host)
}

/// Host and percent-decoded, non-empty path segments of a URL.
pub fn path_segments(url: &str) -> Result<(&str, Vec<String>), FeedError> {
    let (host, path) = split_url(url)?;
    let segments = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(percent_decode)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((host, segments))
}

/// Split an item URL into origin, table path and key.
pub fn parse_item_url(url: &str) -> Result<ItemUrl, FeedError> {
    let (host, mut segments) = path_segments(url)?;
    if segments.len() < 2 {
        return Err(FeedError::MalformedReference(format!(
            "{url}: expected <schema>/<key> path"
        )));
    }
    let key = segments.pop().unwrap_or_default();
    Ok(ItemUrl {
        origin: format!("{OWNER_URL_SCHEME}{host}/"),
        schema_id: segments.join("/"),
        key,
    })
}

/// Key that scopes a subscriber's entries inside shared community indexes.
pub fn store_scope_key(db_url: &str) -> Result<String, FeedError> {
    address_host(db_url).map(str::to_string)
}

/// Decode `%XX` escapes.
pub fn percent_decode(segment: &str) -> Result<String, FeedError> {
    let raw = segment.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let escape = raw
                .get(i + 1..i + 3)
                .ok_or_else(|| FeedError::MalformedReference(format!("{segment}: truncated escape")))?;
            let byte = hex::decode(escape)
                .map_err(|e| FeedError::MalformedReference(format!("{segment}: {e}")))?;
            out.extend(byte);
            i += 3;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|e| FeedError::MalformedReference(format!("{segment}: {e}")))
}
