//! Reddit API response structures
//!
//! Listings wrap their items in `{kind, data}` envelopes. Comment trees mix
//! real comments (`t1`) with `more` placeholders, and a comment's `replies`
//! is either an empty string or a nested listing.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use crate::models::Post;
use crate::utils::decode_entities;

/// Generic listing envelope
#[derive(Debug, Clone, Deserialize)]
pub struct Listing<T> {
    pub data: ListingData<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingData<T> {
    #[serde(default = "Vec::new")]
    pub children: Vec<T>,

    #[serde(default)]
    pub after: Option<String>,
}

/// `{kind, data}` wrapper for a single object
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub kind: String,
    pub data: T,
}

/// Submission as returned by `/new`, `/top` and `/comments`
#[derive(Debug, Clone, Deserialize)]
pub struct RawPost {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub permalink: String,

    #[serde(default)]
    pub score: i64,

    #[serde(default)]
    pub num_comments: u64,

    pub created_utc: f64,
}

impl RawPost {
    /// Convert into the digest model, decoding HTML entities in the title
    pub fn into_post(self) -> Post {
        Post {
            url: self
                .url
                .map(|u| decode_entities(&u))
                .unwrap_or_else(|| format!("https://reddit.com{}", self.permalink)),
            title: decode_entities(&self.title),
            permalink: self.permalink,
            score: self.score,
            num_comments: self.num_comments,
            created_utc: epoch_to_datetime(self.created_utc),
            id: self.id,
        }
    }
}

/// Node of a comment tree
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum Thing {
    #[serde(rename = "t1")]
    Comment(RawComment),

    #[serde(rename = "more")]
    More(MoreChildren),
}

/// Comment data
#[derive(Debug, Clone, Deserialize)]
pub struct RawComment {
    pub id: String,

    /// Fullname of the parent (`t1_...` or `t3_...`)
    #[serde(default)]
    pub parent_id: String,

    #[serde(default = "deleted_author")]
    pub author: String,

    #[serde(default)]
    pub body: String,

    #[serde(default, deserialize_with = "deserialize_replies")]
    pub replies: Vec<Thing>,
}

/// Placeholder for comments not included in the response
#[derive(Debug, Clone, Deserialize)]
pub struct MoreChildren {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub parent_id: String,

    #[serde(default)]
    pub count: u64,

    /// Ids to request via `morechildren`; empty for "continue this thread"
    #[serde(default)]
    pub children: Vec<String>,
}

impl MoreChildren {
    /// A "continue this thread" link rather than a batch of ids
    pub fn is_continue_thread(&self) -> bool {
        self.children.is_empty()
    }
}

/// `/api/morechildren` response
#[derive(Debug, Clone, Deserialize)]
pub struct MoreChildrenResponse {
    pub json: MoreChildrenJson,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoreChildrenJson {
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,

    #[serde(default)]
    pub data: Option<MoreChildrenData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoreChildrenData {
    #[serde(default)]
    pub things: Vec<Thing>,
}

/// `/user/{name}/about` data
#[derive(Debug, Clone, Deserialize)]
pub struct UserAbout {
    #[serde(default)]
    pub name: String,

    /// Absent for suspended accounts
    #[serde(default)]
    pub created_utc: Option<f64>,
}

fn deleted_author() -> String {
    String::from("[deleted]")
}

fn deserialize_replies<'de, D>(deserializer: D) -> Result<Vec<Thing>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Replies {
        Listing(Listing<Thing>),
        Empty(String),
        Null(()),
    }

    Ok(match Replies::deserialize(deserializer)? {
        Replies::Listing(listing) => listing.data.children,
        Replies::Empty(_) | Replies::Null(()) => Vec::new(),
    })
}

/// Convert Reddit's fractional epoch seconds to a UTC timestamp
pub fn epoch_to_datetime(seconds: f64) -> DateTime<Utc> {
    let millis = (seconds * 1000.0).round() as i64;
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_post_listing() {
        let json = r#"{
            "kind": "Listing",
            "data": {
                "after": "t3_next",
                "children": [
                    {"kind": "t3", "data": {
                        "id": "abc", "title": "Rust &amp; you", "url": "https://example.com/a",
                        "permalink": "/r/rust/comments/abc/rust_you/", "score": 42,
                        "num_comments": 7, "created_utc": 1700000000.0
                    }}
                ]
            }
        }"#;

        let listing: Listing<Envelope<RawPost>> = serde_json::from_str(json).unwrap();
        assert_eq!(listing.data.after.as_deref(), Some("t3_next"));

        let post = listing.data.children[0].data.clone().into_post();
        assert_eq!(post.title, "Rust & you");
        assert_eq!(post.score, 42);
        assert_eq!(post.num_comments, 7);
        assert_eq!(post.created_utc.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_deserialize_comment_tree() {
        let json = r#"[
            {"kind": "t1", "data": {
                "id": "c1", "parent_id": "t3_abc", "author": "alice", "body": "top",
                "replies": {"kind": "Listing", "data": {"after": null, "children": [
                    {"kind": "t1", "data": {
                        "id": "c2", "parent_id": "t1_c1", "author": "bob", "body": "reply",
                        "replies": ""
                    }},
                    {"kind": "more", "data": {
                        "id": "c9", "parent_id": "t1_c1", "count": 2, "children": ["c9", "c10"]
                    }}
                ]}}
            }},
            {"kind": "more", "data": {"id": "_", "parent_id": "t1_c1", "count": 0, "children": []}}
        ]"#;

        let things: Vec<Thing> = serde_json::from_str(json).unwrap();
        assert_eq!(things.len(), 2);

        match &things[0] {
            Thing::Comment(c) => {
                assert_eq!(c.author, "alice");
                assert_eq!(c.replies.len(), 2);
                assert!(matches!(&c.replies[1], Thing::More(m) if m.children.len() == 2));
            }
            Thing::More(_) => panic!("expected comment"),
        }

        match &things[1] {
            Thing::More(m) => assert!(m.is_continue_thread()),
            Thing::Comment(_) => panic!("expected more"),
        }
    }

    #[test]
    fn test_missing_author_is_deleted() {
        let json = r#"{"kind": "t1", "data": {"id": "c1", "body": "x", "replies": ""}}"#;
        let thing: Thing = serde_json::from_str(json).unwrap();
        match thing {
            Thing::Comment(c) => assert_eq!(c.author, "[deleted]"),
            Thing::More(_) => panic!("expected comment"),
        }
    }

    #[test]
    fn test_user_about_suspended() {
        let json = r#"{"kind": "t2", "data": {"name": "gone", "is_suspended": true}}"#;
        let about: Envelope<UserAbout> = serde_json::from_str(json).unwrap();
        assert!(about.data.created_utc.is_none());
    }
}
