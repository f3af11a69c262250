//! Index administration: the calls the indexing benchmark needs besides search.

use std::time::Duration;

use lookout_core::config::GatewayConfig;
use lookout_core::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::client::classify;
use crate::wire::rejection;

/// Answer to any write: the task the index queued for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Enqueued {
    #[serde(rename = "taskUid", alias = "uid")]
    pub task_uid: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Enqueued,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl TaskStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Canceled)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Task {
    pub uid: u64,
    pub status: TaskStatus,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub number_of_documents: u64,
    #[serde(default)]
    pub raw_document_db_size: u64,
}

impl IndexStats {
    pub fn size_mb(&self) -> f64 {
        self.raw_document_db_size as f64 / 1024.0 / 1024.0
    }
}

/// How long to wait on a queued task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskWait {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for TaskWait {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(60), interval: Duration::from_secs(1) }
    }
}

#[derive(Debug, Clone)]
pub struct MeiliAdmin {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl MeiliAdmin {
    /// Uploads can take far longer than a search, so only connecting is
    /// bounded by the gateway timeout.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout())
            .user_agent(concat!("lookout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("cannot build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: &GatewayConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    /// `Ok(None)` when the index did not exist.
    pub async fn delete_index(&self, index: &str) -> Result<Option<Enqueued>> {
        let builder = self.client.delete(format!("{}/indexes/{index}", self.endpoint));
        let response = self.authorize(builder).send().await.map_err(|e| classify(&e))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(target: "lookout::meili", %index, "index absent, nothing to delete");
            return Ok(None);
        }
        Self::decode(response).await.map(Some)
    }

    pub async fn create_index(&self, index: &str, primary_key: &str) -> Result<Enqueued> {
        let builder = self
            .client
            .post(format!("{}/indexes", self.endpoint))
            .json(&json!({ "uid": index, "primaryKey": primary_key }));
        self.send(builder).await
    }

    pub async fn add_documents<T: Serialize>(&self, index: &str, documents: &[T]) -> Result<Enqueued> {
        let builder = self.client.post(format!("{}/indexes/{index}/documents", self.endpoint)).json(documents);
        self.send(builder).await
    }

    pub async fn task(&self, uid: u64) -> Result<Task> {
        self.send(self.client.get(format!("{}/tasks/{uid}", self.endpoint))).await
    }

    /// Poll until the task finishes. `Ok(None)` when `wait.timeout` runs out
    /// first; the task may still complete in the background.
    pub async fn wait_for_task(&self, uid: u64, wait: TaskWait) -> Result<Option<Task>> {
        let deadline = Instant::now() + wait.timeout;
        loop {
            let task = self.task(uid).await?;
            if task.status.is_finished() {
                if task.status != TaskStatus::Succeeded {
                    warn!(target: "lookout::meili", uid, status = ?task.status, error = ?task.error, "task did not succeed");
                }
                return Ok(Some(task));
            }
            if Instant::now() + wait.interval > deadline {
                return Ok(None);
            }
            sleep(wait.interval).await;
        }
    }

    pub async fn stats(&self, index: &str) -> Result<IndexStats> {
        self.send(self.client.get(format!("{}/indexes/{index}/stats", self.endpoint))).await
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.api_key)
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<T> {
        let response = self.authorize(builder).send().await.map_err(|e| classify(&e))?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let text = response.text().await.map_err(|e| classify(&e))?;
        if !status.is_success() {
            return Err(rejection(status.as_u16(), &text).into());
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueued_accepts_both_task_id_spellings() {
        let current: Enqueued = serde_json::from_str(r#"{"taskUid": 7, "status": "enqueued"}"#).unwrap();
        let legacy: Enqueued = serde_json::from_str(r#"{"uid": 7}"#).unwrap();
        assert_eq!(current, legacy);
    }

    #[test]
    fn stats_convert_bytes_to_megabytes() {
        let stats: IndexStats =
            serde_json::from_str(r#"{"numberOfDocuments": 10, "rawDocumentDbSize": 3145728, "isIndexing": false}"#)
                .unwrap();
        assert_eq!(stats.number_of_documents, 10);
        assert!((stats.size_mb() - 3.0).abs() < f64::EPSILON);
        let older: IndexStats = serde_json::from_str(r#"{"numberOfDocuments": 0}"#).unwrap();
        assert_eq!(older.size_mb(), 0.0);
    }

    #[test]
    fn only_terminal_statuses_finish_a_wait() {
        let task: Task = serde_json::from_str(r#"{"uid": 3, "status": "processing"}"#).unwrap();
        assert!(!task.status.is_finished());
        let task: Task =
            serde_json::from_str(r#"{"uid": 3, "status": "failed", "error": {"code": "invalid_document_id"}}"#).unwrap();
        assert!(task.status.is_finished());
        assert!(task.error.is_some());
    }
}
