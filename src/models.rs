// Core data structures for the Hive exporter

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::utils::error::MetadataError;

/// A published Hive post as returned by `condenser_api`
///
/// Only the fields the exporter reasons about are typed. Everything else the
/// node sends is kept in `extra` so the cache stores the post verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub author: String,
    pub permlink: String,
    #[serde(with = "hive_timestamp")]
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub json_metadata: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Post {
    /// Build a post with only the core fields set
    pub fn new(author: &str, permlink: &str, created: DateTime<Utc>) -> Self {
        Self {
            author: author.to_string(),
            permlink: permlink.to_string(),
            created,
            title: String::new(),
            body: String::new(),
            json_metadata: String::new(),
            extra: Map::new(),
        }
    }

    /// Parse `json_metadata`, reporting why it could not be read
    pub fn try_metadata(&self) -> std::result::Result<PostMetadata, MetadataError> {
        let raw = self.json_metadata.trim();
        if raw.is_empty() {
            return Err(MetadataError::Missing);
        }

        let value: Value = serde_json::from_str(raw)?;
        match value {
            Value::Object(map) => Ok(PostMetadata::from_map(&map)),
            _ => Err(MetadataError::NotAnObject),
        }
    }

    /// Parse `json_metadata`, falling back to empty metadata
    pub fn metadata(&self) -> PostMetadata {
        self.try_metadata().unwrap_or_else(|e| {
            tracing::debug!(permlink = %self.permlink, error = %e, "Using empty metadata");
            PostMetadata::default()
        })
    }

    /// Calendar date of publication, `YYYY-MM-DD`
    pub fn created_date(&self) -> String {
        self.created.format("%Y-%m-%d").to_string()
    }
}

/// Structured view of a post's `json_metadata` sidecar
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostMetadata {
    pub tags: Vec<String>,
}

impl PostMetadata {
    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            tags: string_list(map.get("tags")),
        }
    }

    /// Tags joined for display
    pub fn tags_line(&self) -> String {
        self.tags.join(", ")
    }
}

/// Accept either a JSON array of strings or a single string
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Some nodes send `json_metadata` as an already-decoded object or `null`
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Pagination cursor: the `(author, permlink)` the next page starts from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor {
    pub author: String,
    pub permlink: String,
}

impl Cursor {
    pub fn new(author: &str, permlink: &str) -> Self {
        Self {
            author: author.to_string(),
            permlink: permlink.to_string(),
        }
    }

    pub fn from_post(post: &Post) -> Self {
        Self::new(&post.author, &post.permlink)
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}/{}", self.author, self.permlink)
    }
}

/// Trim and lowercase a username, rejecting empty input
pub fn normalize_username(raw: &str) -> Result<String> {
    let username = raw.trim().to_lowercase();
    if username.is_empty() {
        return Err(Error::InvalidUserInput("username must not be empty".to_string()));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(Error::InvalidUserInput(format!(
            "username must not contain whitespace: {username:?}"
        )));
    }
    Ok(username)
}

/// Sort newest first; ties broken by permlink so the order is total
pub fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        b.created
            .cmp(&a.created)
            .then_with(|| a.permlink.cmp(&b.permlink))
    });
}

/// Sort oldest first; ties broken by permlink so the order is total
pub fn sort_oldest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        a.created
            .cmp(&b.created)
            .then_with(|| a.permlink.cmp(&b.permlink))
    });
}

/// Hive timestamps: ISO-8601 without a zone suffix, always UTC
pub mod hive_timestamp {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(s, FORMAT)
            .map(|naive| naive.and_utc())
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .ok()
            })
    }

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&dt.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 5, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_post_deserialize_keeps_unknown_fields() {
        let raw = serde_json::json!({
            "author": "alice",
            "permlink": "hello-world",
            "created": "2023-05-01T12:00:00",
            "title": "Hello",
            "body": "Body",
            "json_metadata": "{\"tags\":[\"hive\"]}",
            "net_votes": 12
        });

        let post: Post = serde_json::from_value(raw).unwrap();
        assert_eq!(post.created, at(1));
        assert_eq!(post.extra.get("net_votes"), Some(&Value::from(12)));

        let back = serde_json::to_value(&post).unwrap();
        assert_eq!(back["created"], "2023-05-01T12:00:00");
        assert_eq!(back["net_votes"], 12);
    }

    #[test]
    fn test_metadata_tags() {
        let mut post = Post::new("alice", "p", at(1));
        post.json_metadata = r#"{"tags":["hive","photography"],"app":"peakd/2023"}"#.to_string();

        let meta = post.metadata();
        assert_eq!(meta.tags_line(), "hive, photography");
    }

    #[test]
    fn test_metadata_malformed_defaults_to_empty() {
        let mut post = Post::new("alice", "p", at(1));

        post.json_metadata = "{not json".to_string();
        assert!(matches!(post.try_metadata(), Err(MetadataError::Malformed(_))));
        assert_eq!(post.metadata(), PostMetadata::default());

        post.json_metadata = String::new();
        assert!(matches!(post.try_metadata(), Err(MetadataError::Missing)));

        post.json_metadata = "[1,2]".to_string();
        assert!(matches!(post.try_metadata(), Err(MetadataError::NotAnObject)));
        assert!(post.metadata().tags.is_empty());
    }

    #[test]
    fn test_metadata_null_and_object_forms() {
        let raw = serde_json::json!({
            "author": "alice",
            "permlink": "p",
            "created": "2023-05-01T12:00:00",
            "json_metadata": null
        });
        let post: Post = serde_json::from_value(raw).unwrap();
        assert_eq!(post.json_metadata, "");

        let raw = serde_json::json!({
            "author": "alice",
            "permlink": "p",
            "created": "2023-05-01T12:00:00",
            "json_metadata": {"tags": "single"}
        });
        let post: Post = serde_json::from_value(raw).unwrap();
        assert_eq!(post.metadata().tags, vec!["single".to_string()]);
    }

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("  Alice ").unwrap(), "alice");
        assert!(matches!(normalize_username("   "), Err(Error::InvalidUserInput(_))));
        assert!(normalize_username("bob smith").is_err());
    }

    #[test]
    fn test_sorting() {
        let mut posts = vec![
            Post::new("a", "two", at(2)),
            Post::new("a", "three", at(3)),
            Post::new("a", "one", at(1)),
        ];

        sort_newest_first(&mut posts);
        let order: Vec<_> = posts.iter().map(|p| p.permlink.as_str()).collect();
        assert_eq!(order, ["three", "two", "one"]);

        sort_oldest_first(&mut posts);
        let order: Vec<_> = posts.iter().map(|p| p.permlink.as_str()).collect();
        assert_eq!(order, ["one", "two", "three"]);
    }

    #[test]
    fn test_timestamp_accepts_rfc3339() {
        assert_eq!(hive_timestamp::parse("2023-05-01T12:00:00Z"), Some(at(1)));
        assert_eq!(hive_timestamp::parse("yesterday"), None);
    }
}
