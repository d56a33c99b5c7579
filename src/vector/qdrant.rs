//! Qdrant-backed vector store, driven over its REST API. One logical
//! collection holds every guild's records; isolation is enforced by a
//! mandatory `guild_id` payload filter on every search and purge.

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{RecordMeta, ScoredRecord, VectorSearch};
use crate::config::Config;

pub struct QdrantStore {
    http: reqwest::Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
    retries: u32,
    collection_ready: OnceCell<()>,
}

impl QdrantStore {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.vector_timeout_secs))
            .build()
            .context("failed to build Qdrant HTTP client")?;

        Ok(Self {
            http,
            base_url: config.qdrant_url.trim_end_matches('/').to_string(),
            collection: config.qdrant_collection.clone(),
            api_key: config.qdrant_api_key.clone(),
            retries: config.vector_retries,
            collection_ready: OnceCell::new(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }
        builder
    }

    /// Send a JSON request; any non-success status is an error.
    async fn send_json(&self, method: Method, path: &str, body: &Value) -> anyhow::Result<Value> {
        let (status, value) = self.send_raw(method, path, body).await?;
        if !status.is_success() {
            anyhow::bail!(
                "Qdrant returned {} for {}: {}",
                status,
                path,
                describe_error(&value)
            );
        }
        Ok(value)
    }

    /// Send a JSON request, retrying transport failures up to the configured
    /// number of extra attempts. HTTP-level errors are handed back to the
    /// caller; they are not transient.
    async fn send_raw(
        &self,
        method: Method,
        path: &str,
        body: &Value,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let mut attempt = 0;
        loop {
            let result = self
                .request(method.clone(), path)
                .json(body)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    let value: Value = response
                        .json()
                        .await
                        .context("failed to parse Qdrant response body")?;
                    return Ok((status, value));
                }
                Err(err) if attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        "Qdrant request to {} failed ({}), retry {}/{}",
                        path, err, attempt, self.retries
                    );
                }
                Err(err) => {
                    return Err(anyhow::Error::new(err)
                        .context(format!("Qdrant request to {} failed", path)));
                }
            }
        }
    }

    /// Create the collection on first insert. The embedding dimension is only
    /// known once the first vector arrives.
    async fn ensure_collection(&self, dim: usize) -> anyhow::Result<()> {
        self.collection_ready
            .get_or_try_init(|| async {
                let path = format!("/collections/{}", self.collection);
                let exists = self
                    .request(Method::GET, &path)
                    .send()
                    .await
                    .map(|r| r.status().is_success())
                    .unwrap_or(false);
                if exists {
                    return Ok(());
                }

                debug!(
                    "Creating Qdrant collection '{}' with dim {}",
                    self.collection, dim
                );
                let body = json!({
                    "vectors": { "size": dim, "distance": "Cosine" }
                });
                self.send_json(Method::PUT, &path, &body).await.map(|_| ())
            })
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl VectorSearch for QdrantStore {
    async fn insert(
        &self,
        text: &str,
        meta: &RecordMeta,
        embedding: &[f32],
    ) -> anyhow::Result<()> {
        self.ensure_collection(embedding.len()).await?;

        let path = format!("/collections/{}/points?wait=true", self.collection);
        let body = json!({
            "points": [{
                "id": Uuid::new_v4().to_string(),
                "vector": embedding,
                "payload": {
                    "text": text,
                    "author": meta.author,
                    "posted_at": meta.posted_at.to_rfc3339(),
                    "channel_id": meta.channel_id,
                    "guild_id": meta.guild_id,
                },
            }]
        });
        self.send_json(Method::PUT, &path, &body).await?;
        Ok(())
    }

    async fn search(
        &self,
        embedding: &[f32],
        guild_id: u64,
        exclude_author: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<ScoredRecord>> {
        let path = format!("/collections/{}/points/search", self.collection);
        let body = json!({
            "vector": embedding,
            "limit": limit,
            "with_payload": true,
            "filter": build_search_filter(guild_id, exclude_author),
        });

        let (status, response) = self.send_raw(Method::POST, &path, &body).await?;
        if status == StatusCode::NOT_FOUND {
            // The collection only exists once something was embedded; until
            // then a search simply has no hits.
            debug!(
                "Search against absent collection '{}', returning no hits",
                self.collection
            );
            return Ok(Vec::new());
        }
        if !status.is_success() {
            anyhow::bail!(
                "Qdrant returned {} for {}: {}",
                status,
                path,
                describe_error(&response)
            );
        }
        Ok(parse_search_hits(&response))
    }

    async fn purge_guild(&self, guild_id: u64) -> anyhow::Result<()> {
        // Deleting from a collection that was never created is a no-op.
        if self.collection_ready.get().is_none() {
            let path = format!("/collections/{}", self.collection);
            let exists = self
                .request(Method::GET, &path)
                .send()
                .await
                .map(|r| r.status().is_success())
                .unwrap_or(false);
            if !exists {
                return Ok(());
            }
        }

        let path = format!("/collections/{}/points/delete?wait=true", self.collection);
        let body = json!({
            "filter": {
                "must": [
                    { "key": "guild_id", "match": { "value": guild_id } }
                ]
            }
        });
        self.send_json(Method::POST, &path, &body).await?;
        debug!("Purged vector records for guild {}", guild_id);
        Ok(())
    }
}

/// Every search pins the caller's guild and drops the bot's own replies so
/// guilds never see each other's messages and the bot never retrieves itself.
fn build_search_filter(guild_id: u64, exclude_author: &str) -> Value {
    json!({
        "must": [
            { "key": "guild_id", "match": { "value": guild_id } }
        ],
        "must_not": [
            { "key": "author", "match": { "value": exclude_author } }
        ]
    })
}

fn parse_search_hits(response: &Value) -> Vec<ScoredRecord> {
    let points = response
        .get("result")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    points
        .iter()
        .filter_map(|point| {
            let payload = point.get("payload")?;
            let posted_at = payload
                .get("posted_at")
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))?;

            Some(ScoredRecord {
                text: payload.get("text")?.as_str()?.to_string(),
                meta: RecordMeta {
                    author: payload.get("author")?.as_str()?.to_string(),
                    posted_at,
                    channel_id: payload.get("channel_id").and_then(Value::as_u64)?,
                    guild_id: payload.get("guild_id").and_then(Value::as_u64)?,
                },
                score: point.get("score").and_then(Value::as_f64).unwrap_or(0.0) as f32,
            })
        })
        .collect()
}

fn describe_error(value: &Value) -> String {
    value
        .get("status")
        .and_then(|s| s.get("error"))
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_pins_guild_and_excludes_bot() {
        let filter = build_search_filter(42, "LlamaBot");
        assert_eq!(filter["must"][0]["key"], "guild_id");
        assert_eq!(filter["must"][0]["match"]["value"], 42);
        assert_eq!(filter["must_not"][0]["key"], "author");
        assert_eq!(filter["must_not"][0]["match"]["value"], "LlamaBot");
    }

    #[test]
    fn parses_well_formed_hits() {
        let response = json!({
            "result": [
                {
                    "id": "abc",
                    "score": 0.91,
                    "payload": {
                        "text": "[01-01-2026 10:00:00] - @alice on #[general]: `menu is fixed now`",
                        "author": "alice",
                        "posted_at": "2026-01-01T10:00:00Z",
                        "channel_id": 10,
                        "guild_id": 1
                    }
                }
            ]
        });

        let hits = parse_search_hits(&response);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].meta.author, "alice");
        assert_eq!(hits[0].meta.guild_id, 1);
        assert!((hits[0].score - 0.91).abs() < 1e-6);
    }

    #[test]
    fn skips_hits_with_missing_or_malformed_payload() {
        let response = json!({
            "result": [
                { "id": "no-payload", "score": 0.9 },
                {
                    "id": "bad-date",
                    "score": 0.8,
                    "payload": {
                        "text": "x", "author": "a",
                        "posted_at": "yesterday-ish",
                        "channel_id": 1, "guild_id": 1
                    }
                },
                {
                    "id": "ok",
                    "score": 0.7,
                    "payload": {
                        "text": "fine", "author": "bob",
                        "posted_at": "2026-01-02T09:30:00Z",
                        "channel_id": 2, "guild_id": 3
                    }
                }
            ]
        });

        let hits = parse_search_hits(&response);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "fine");
    }

    #[test]
    fn empty_result_parses_to_empty() {
        assert!(parse_search_hits(&json!({ "result": [] })).is_empty());
        assert!(parse_search_hits(&json!({ "status": "error" })).is_empty());
    }

    #[tokio::test]
    async fn search_against_absent_collection_yields_no_hits() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // One-shot stub answering the way Qdrant does when the collection
        // was never created
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let body =
                r#"{"status":{"error":"Not found: Collection `memory` doesn't exist!"},"time":0.0}"#;
            let response = format!(
                "HTTP/1.1 404 Not Found\r\ncontent-type: application/json\r\n\
content-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
        });

        let store = QdrantStore {
            http: reqwest::Client::new(),
            base_url: format!("http://{}", addr),
            collection: "memory".to_string(),
            api_key: None,
            retries: 0,
            collection_ready: OnceCell::new(),
        };

        let hits = store.search(&[0.0, 0.1, 0.2], 7, "LlamaBot", 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn error_description_is_extracted() {
        let value = json!({ "status": { "error": "collection not found" } });
        assert_eq!(describe_error(&value), "collection not found");
        assert_eq!(describe_error(&json!({})), "unknown error");
    }
}
