//! Tagging server API client
//!
//! Typed wrapper over the tagging server's REST resource model. Every call
//! is a stateless request with a fixed timeout; idempotent verbs (GET, PUT,
//! DELETE, and the conflict-tolerated association POSTs) go through the
//! retry policy, entity creates never do.
//!
//! Wire format: request bodies are camelCase, response entities snake_case.
//! Non-success statuses map to structured error variants (404 -> NotFound,
//! 409 -> Conflict) so callers never match on message text.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tagsync_common::models::{
    Item, ItemTag, Tag, TagGroup, TagGroupTag, Topic, TopicItem, TopicTagGroup,
};
use tagsync_common::{Error, Result};

use super::retry::{retry_request, RetryPolicy};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Item create/update payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    pub link: String,
    pub image_url: String,
    #[serde(rename = "type")]
    pub item_type: String,
}

/// Tag and tag-group create/update payload
#[derive(Debug, Clone, Serialize)]
pub struct NewName {
    pub name: String,
}

/// Topic create/update payload
#[derive(Debug, Clone, Serialize)]
pub struct NewTopic {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewItemTag {
    item_id: i64,
    tag_id: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewTagGroupTag {
    tag_group_id: i64,
    tag_id: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewTopicTagGroup {
    topic_id: i64,
    tag_group_id: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewTopicItem {
    topic_id: i64,
    item_id: i64,
}

/// A file entry on the tagging server
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFile {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// Tag group with its member tags (server-side view)
#[derive(Debug, Clone, Deserialize)]
pub struct TagGroupWithTags {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Item with its attached tags (server-side view)
#[derive(Debug, Clone, Deserialize)]
pub struct ItemWithTags {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Tagging server API client
pub struct TaggingClient {
    base_url: String,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl TaggingClient {
    /// Create a client against the given base URL (trailing slash stripped)
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_retry_policy(base_url, RetryPolicy::default())
    }

    pub fn with_retry_policy(base_url: &str, retry: RetryPolicy) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// One request attempt: send, map transport failures, classify status
    async fn send_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        query: Option<&[(&str, &str)]>,
    ) -> Result<reqwest::Response> {
        let mut request = self.http.request(method, self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(query) = query {
            request = request.query(query);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                Error::Connection(format!("{}: {}", path, e))
            } else {
                Error::Internal(format!("{}: {}", path, e))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(Error::NotFound(format!("{}: {}", path, detail))),
            StatusCode::CONFLICT => Err(Error::Conflict(format!("{}: {}", path, detail))),
            _ => Err(Error::Api(status.as_u16(), detail)),
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, path: &str) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("decode {}: {}", path, e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = retry_request(path, self.retry, || {
            self.send_once(Method::GET, path, None, None)
        })
        .await?;
        Self::decode(response, path).await
    }

    async fn get_json_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = retry_request(path, self.retry, || {
            self.send_once(Method::GET, path, None, Some(query))
        })
        .await?;
        Self::decode(response, path).await
    }

    async fn put_json(&self, path: &str, body: serde_json::Value) -> Result<()> {
        retry_request(path, self.retry, || {
            self.send_once(Method::PUT, path, Some(&body), None)
        })
        .await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        retry_request(path, self.retry, || {
            self.send_once(Method::DELETE, path, None, None)
        })
        .await?;
        Ok(())
    }

    /// POST for entity creates: never retried (not idempotent)
    async fn post_create(&self, path: &str, body: serde_json::Value) -> Result<()> {
        self.send_once(Method::POST, path, Some(&body), None).await?;
        Ok(())
    }

    /// POST for association creates: idempotent by construction, so retried
    async fn post_association(&self, path: &str, body: serde_json::Value) -> Result<()> {
        retry_request(path, self.retry, || {
            self.send_once(Method::POST, path, Some(&body), None)
        })
        .await?;
        Ok(())
    }

    // ---- status ----

    pub async fn get_status(&self) -> Result<serde_json::Value> {
        self.get_json("/api/status").await
    }

    pub async fn get_health(&self) -> Result<serde_json::Value> {
        self.get_json("/api/health").await
    }

    // ---- items ----

    pub async fn get_items(&self) -> Result<Vec<Item>> {
        self.get_json("/api/items").await
    }

    pub async fn get_item(&self, id: i64) -> Result<Item> {
        self.get_json(&format!("/api/items/{}", id)).await
    }

    pub async fn create_item(&self, item: &NewItem) -> Result<()> {
        self.post_create("/api/items", serde_json::to_value(item)?)
            .await
    }

    pub async fn update_item(&self, id: i64, item: &NewItem) -> Result<()> {
        self.put_json(&format!("/api/items/{}", id), serde_json::to_value(item)?)
            .await
    }

    pub async fn delete_item(&self, id: i64) -> Result<()> {
        self.delete(&format!("/api/items/{}", id)).await
    }

    pub async fn search_items(&self, query: &str) -> Result<Vec<Item>> {
        self.get_json_query("/api/items/search", &[("q", query)])
            .await
    }

    pub async fn get_unassigned_items(&self) -> Result<Vec<Item>> {
        self.get_json("/api/items/unassigned").await
    }

    // ---- tags ----

    pub async fn get_tags(&self) -> Result<Vec<Tag>> {
        self.get_json("/api/tags").await
    }

    pub async fn get_tag(&self, id: i64) -> Result<Tag> {
        self.get_json(&format!("/api/tags/{}", id)).await
    }

    pub async fn create_tag(&self, name: &str) -> Result<()> {
        let body = serde_json::to_value(NewName {
            name: name.to_string(),
        })?;
        self.post_create("/api/tags", body).await
    }

    pub async fn update_tag(&self, id: i64, name: &str) -> Result<()> {
        let body = serde_json::to_value(NewName {
            name: name.to_string(),
        })?;
        self.put_json(&format!("/api/tags/{}", id), body).await
    }

    pub async fn delete_tag(&self, id: i64) -> Result<()> {
        self.delete(&format!("/api/tags/{}", id)).await
    }

    // ---- tag groups ----

    pub async fn get_tag_groups(&self) -> Result<Vec<TagGroup>> {
        self.get_json("/api/tag-groups").await
    }

    pub async fn get_tag_group(&self, id: i64) -> Result<TagGroup> {
        self.get_json(&format!("/api/tag-groups/{}", id)).await
    }

    pub async fn create_tag_group(&self, name: &str) -> Result<()> {
        let body = serde_json::to_value(NewName {
            name: name.to_string(),
        })?;
        self.post_create("/api/tag-groups", body).await
    }

    pub async fn update_tag_group(&self, id: i64, name: &str) -> Result<()> {
        let body = serde_json::to_value(NewName {
            name: name.to_string(),
        })?;
        self.put_json(&format!("/api/tag-groups/{}", id), body).await
    }

    pub async fn delete_tag_group(&self, id: i64) -> Result<()> {
        self.delete(&format!("/api/tag-groups/{}", id)).await
    }

    // ---- tag-group <-> tag associations ----

    pub async fn get_tag_group_tags(&self) -> Result<Vec<TagGroupTag>> {
        self.get_json("/api/tag-group-tags").await
    }

    pub async fn get_tag_group_tag(&self, group_id: i64, tag_id: i64) -> Result<TagGroupTag> {
        self.get_json(&format!("/api/tag-group-tags/{}/{}", group_id, tag_id))
            .await
    }

    pub async fn create_tag_group_tag(&self, group_id: i64, tag_id: i64) -> Result<()> {
        let body = serde_json::to_value(NewTagGroupTag {
            tag_group_id: group_id,
            tag_id,
        })?;
        self.post_association("/api/tag-group-tags", body).await
    }

    pub async fn delete_tag_group_tag(&self, group_id: i64, tag_id: i64) -> Result<()> {
        self.delete(&format!("/api/tag-group-tags/{}/{}", group_id, tag_id))
            .await
    }

    // ---- topics ----

    pub async fn get_topics(&self) -> Result<Vec<Topic>> {
        self.get_json("/api/topics").await
    }

    pub async fn get_topic(&self, id: i64) -> Result<Topic> {
        self.get_json(&format!("/api/topics/{}", id)).await
    }

    pub async fn create_topic(&self, topic: &NewTopic) -> Result<()> {
        self.post_create("/api/topics", serde_json::to_value(topic)?)
            .await
    }

    pub async fn update_topic(&self, id: i64, topic: &NewTopic) -> Result<()> {
        self.put_json(&format!("/api/topics/{}", id), serde_json::to_value(topic)?)
            .await
    }

    pub async fn delete_topic(&self, id: i64) -> Result<()> {
        self.delete(&format!("/api/topics/{}", id)).await
    }

    pub async fn get_items_by_topic(&self, topic_id: i64) -> Result<Vec<Item>> {
        self.get_json(&format!("/api/topics/{}/items", topic_id))
            .await
    }

    // ---- topic <-> tag-group associations ----

    pub async fn get_topic_tag_groups(&self) -> Result<Vec<TopicTagGroup>> {
        self.get_json("/api/topic-tag-groups").await
    }

    pub async fn get_topic_tag_group(&self, topic_id: i64, group_id: i64) -> Result<TopicTagGroup> {
        self.get_json(&format!("/api/topic-tag-groups/{}/{}", topic_id, group_id))
            .await
    }

    pub async fn create_topic_tag_group(&self, topic_id: i64, group_id: i64) -> Result<()> {
        let body = serde_json::to_value(NewTopicTagGroup {
            topic_id,
            tag_group_id: group_id,
        })?;
        self.post_association("/api/topic-tag-groups", body).await
    }

    pub async fn delete_topic_tag_group(&self, topic_id: i64, group_id: i64) -> Result<()> {
        self.delete(&format!("/api/topic-tag-groups/{}/{}", topic_id, group_id))
            .await
    }

    // ---- topic <-> item associations ----

    pub async fn get_topic_items(&self) -> Result<Vec<TopicItem>> {
        self.get_json("/api/topic-items").await
    }

    pub async fn get_topic_item(&self, topic_id: i64, item_id: i64) -> Result<TopicItem> {
        self.get_json(&format!("/api/topic-items/{}/{}", topic_id, item_id))
            .await
    }

    pub async fn create_topic_item(&self, topic_id: i64, item_id: i64) -> Result<()> {
        let body = serde_json::to_value(NewTopicItem { topic_id, item_id })?;
        self.post_association("/api/topic-items", body).await
    }

    pub async fn delete_topic_item(&self, topic_id: i64, item_id: i64) -> Result<()> {
        self.delete(&format!("/api/topic-items/{}/{}", topic_id, item_id))
            .await
    }

    pub async fn add_item_to_topic(&self, topic_id: i64, item_id: i64) -> Result<()> {
        self.create_topic_item(topic_id, item_id).await
    }

    pub async fn remove_item_from_topic(&self, topic_id: i64, item_id: i64) -> Result<()> {
        self.delete_topic_item(topic_id, item_id).await
    }

    /// Move an item between topics
    ///
    /// Two dependent calls with no atomicity: if the create fails after the
    /// delete succeeded, the item is left in no topic until the move is
    /// re-run. Callers relying on the at-most-one-topic invariant must
    /// tolerate that transient state.
    pub async fn move_item(&self, from_topic_id: i64, to_topic_id: i64, item_id: i64) -> Result<()> {
        self.remove_item_from_topic(from_topic_id, item_id).await?;
        if let Err(e) = self.add_item_to_topic(to_topic_id, item_id).await {
            tracing::warn!(
                item_id,
                from_topic_id,
                to_topic_id,
                error = %e,
                "Item removed from old topic but not added to new one; re-run the move"
            );
            return Err(e);
        }
        Ok(())
    }

    pub async fn move_items(
        &self,
        from_topic_id: i64,
        to_topic_id: i64,
        item_ids: &[i64],
    ) -> Result<()> {
        for &item_id in item_ids {
            self.move_item(from_topic_id, to_topic_id, item_id).await?;
        }
        Ok(())
    }

    // ---- item <-> tag associations ----

    pub async fn get_item_tags(&self) -> Result<Vec<ItemTag>> {
        self.get_json("/api/item-tags").await
    }

    pub async fn get_item_tag(&self, item_id: i64, tag_id: i64) -> Result<ItemTag> {
        self.get_json(&format!("/api/item-tags/{}/{}", item_id, tag_id))
            .await
    }

    pub async fn create_item_tag(&self, item_id: i64, tag_id: i64) -> Result<()> {
        let body = serde_json::to_value(NewItemTag { item_id, tag_id })?;
        self.post_association("/api/item-tags", body).await
    }

    pub async fn delete_item_tag(&self, item_id: i64, tag_id: i64) -> Result<()> {
        self.delete(&format!("/api/item-tags/{}/{}", item_id, tag_id))
            .await
    }

    // ---- files ----

    pub async fn get_files(&self) -> Result<Vec<RemoteFile>> {
        self.get_json("/api/files").await
    }

    pub async fn get_file(&self, id: i64) -> Result<RemoteFile> {
        self.get_json(&format!("/api/files/{}", id)).await
    }

    pub async fn delete_file(&self, id: i64) -> Result<()> {
        self.delete(&format!("/api/files/{}", id)).await
    }

    pub async fn move_file(&self, id: i64, folder_name: &str) -> Result<()> {
        self.post_create(
            &format!("/api/files/move/{}/{}", id, folder_name),
            serde_json::json!({}),
        )
        .await
    }

    pub async fn move_multiple_files(&self, ids: &[i64], folder_name: &str) -> Result<()> {
        let id_list = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.post_create(
            &format!("/api/files/move-multiple/{}/{}", id_list, folder_name),
            serde_json::json!({}),
        )
        .await
    }

    pub async fn search_files_by_name(&self, name: &str) -> Result<Vec<RemoteFile>> {
        self.get_json(&format!("/api/files/search/{}", urlencoding::encode(name)))
            .await
    }

    pub async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<()> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.url("/api/files/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    Error::Connection(format!("/api/files/upload: {}", e))
                } else {
                    Error::Internal(format!("/api/files/upload: {}", e))
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let detail = response.text().await.unwrap_or_default();
            Err(Error::Api(status.as_u16(), detail))
        }
    }

    // ---- backup and views ----

    pub async fn backup(&self) -> Result<()> {
        self.post_create("/api/backup/backup", serde_json::json!({}))
            .await
    }

    pub async fn get_tag_groups_with_tags(&self) -> Result<Vec<TagGroupWithTags>> {
        self.get_json("/api/view/tag-groups").await
    }

    pub async fn get_topic_with_schema(&self, id: i64) -> Result<serde_json::Value> {
        self.get_json(&format!("/api/view/topics/{}/schema", id))
            .await
    }

    pub async fn get_item_with_tags(&self, id: i64) -> Result<ItemWithTags> {
        self.get_json(&format!("/api/view/items/{}/tags", id)).await
    }
}
