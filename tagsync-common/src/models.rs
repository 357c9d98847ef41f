//! Entity models shared by the local mirror and the tagging server client
//!
//! The wire format of the tagging server and the local mirror schema use the
//! same snake_case field names, so one set of types serves both. Identity is
//! a server-assigned integer; the local mirror preserves server IDs when
//! cloning, while CSV-derived rows join to items by name only.

use serde::{Deserialize, Serialize};

fn default_item_type() -> String {
    "file".to_string()
}

/// A content unit being tagged (a music track on this server)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(rename = "type", default = "default_item_type")]
    #[sqlx(rename = "type")]
    pub item_type: String,
}

/// A named category of tags (e.g. "mood", "genre")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TagGroup {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A named value within a group, attachable to items
///
/// `group_id` is populated from the local schema; the server's flat tag list
/// omits it and carries group membership in `tag_group_tags` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A named collection of items (server-side concept)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Topic {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Item <-> Tag association (at most one edge per pair)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct ItemTag {
    pub item_id: i64,
    pub tag_id: i64,
}

/// TagGroup <-> Tag association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct TagGroupTag {
    pub tag_group_id: i64,
    pub tag_id: i64,
}

/// Topic <-> TagGroup association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct TopicTagGroup {
    pub topic_id: i64,
    pub tag_group_id: i64,
}

/// Topic <-> Item association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct TopicItem {
    pub topic_id: i64,
    pub item_id: i64,
}
