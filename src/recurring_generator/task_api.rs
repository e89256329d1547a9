//! The narrow interface the Recurring Generator uses to reach the
//! out-of-scope Task API: list templates due for a scan, check whether an
//! instance already exists for a given occurrence date, and request one.

use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::domain::{OwnerId, TaskId};

#[derive(Debug, Error)]
pub enum TaskApiError {
    #[error("task api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("task api returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("task api call timed out")]
    Timeout,
}

/// A recurrence template: a task with `recurrence_pattern` set and no
/// parent. Only the fields the generator needs to decide whether and what
/// to materialize today.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateTask {
    pub task_id: TaskId,
    pub owner_id: OwnerId,
    pub title: String,
    pub recurrence_pattern: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateInstanceRequest {
    pub parent_recurring_id: TaskId,
    pub owner_id: OwnerId,
    pub title: String,
    pub occurrence_date: NaiveDate,
}

/// The Task API is an external collaborator; this trait is the only path
/// the generator uses to reach it, so tests substitute an in-memory fake
/// rather than standing up the real service.
#[async_trait]
pub trait TaskApiClient: Send + Sync {
    /// Templates where `recurrence_pattern` is set, not completed,
    /// `parent_recurring_id` is null, and `recurrence_end` is null or in
    /// the future.
    async fn list_due_templates(&self) -> Result<Vec<TemplateTask>, TaskApiError>;

    async fn instance_exists(
        &self,
        template_id: TaskId,
        occurrence_date: NaiveDate,
    ) -> Result<bool, TaskApiError>;

    async fn create_instance(&self, request: CreateInstanceRequest) -> Result<TaskId, TaskApiError>;
}

/// Real deployments reach the Task API over HTTP, with bounded retry for
/// transient failures and a 10s deadline per call per the concurrency
/// model's outbound-call budget.
pub struct HttpTaskApiClient {
    client: reqwest::Client,
    base_url: String,
    call_timeout: Duration,
}

impl HttpTaskApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            call_timeout: Duration::from_secs(10),
        }
    }

    fn backoff(&self) -> backoff::ExponentialBackoff {
        backoff::ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(200))
            .with_max_interval(Duration::from_secs(2))
            .with_max_elapsed_time(Some(self.call_timeout))
            .build()
    }
}

#[async_trait]
impl TaskApiClient for HttpTaskApiClient {
    async fn list_due_templates(&self) -> Result<Vec<TemplateTask>, TaskApiError> {
        #[derive(serde::Deserialize)]
        struct Wire {
            task_id: TaskId,
            owner_id: OwnerId,
            title: String,
            recurrence_pattern: String,
            #[serde(with = "crate::domain::timestamp")]
            created_at: DateTime<Utc>,
        }

        let url = format!("{}/internal/tasks/recurring-templates", self.base_url);
        let mut backoff = self.backoff();
        loop {
            let attempt = tokio::time::timeout(self.call_timeout, self.client.get(&url).send()).await;
            match attempt {
                Ok(Ok(response)) if response.status().is_success() => {
                    let wire: Vec<Wire> = response.json().await?;
                    return Ok(wire
                        .into_iter()
                        .map(|w| TemplateTask {
                            task_id: w.task_id,
                            owner_id: w.owner_id,
                            title: w.title,
                            recurrence_pattern: w.recurrence_pattern,
                            created_at: w.created_at,
                        })
                        .collect());
                }
                Ok(Ok(response)) if response.status().is_server_error() => {
                    match backoff.next_backoff() {
                        Some(wait) => tokio::time::sleep(wait).await,
                        None => return Err(TaskApiError::Status(response.status())),
                    }
                }
                Ok(Ok(response)) => return Err(TaskApiError::Status(response.status())),
                Ok(Err(err)) => return Err(TaskApiError::Request(err)),
                Err(_) => return Err(TaskApiError::Timeout),
            }
        }
    }

    async fn instance_exists(
        &self,
        template_id: TaskId,
        occurrence_date: NaiveDate,
    ) -> Result<bool, TaskApiError> {
        let url = format!(
            "{}/internal/tasks/{}/instances/{}",
            self.base_url, template_id, occurrence_date
        );
        let response = tokio::time::timeout(self.call_timeout, self.client.get(&url).send())
            .await
            .map_err(|_| TaskApiError::Timeout)??;
        match response.status() {
            status if status.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            status => Err(TaskApiError::Status(status)),
        }
    }

    async fn create_instance(&self, request: CreateInstanceRequest) -> Result<TaskId, TaskApiError> {
        #[derive(serde::Serialize)]
        struct Wire {
            parent_recurring_id: TaskId,
            owner_id: OwnerId,
            title: String,
            occurrence_date: NaiveDate,
            reminder_offset: Option<String>,
        }
        #[derive(serde::Deserialize)]
        struct Created {
            task_id: TaskId,
        }

        let url = format!("{}/internal/tasks", self.base_url);
        let body = Wire {
            parent_recurring_id: request.parent_recurring_id,
            owner_id: request.owner_id,
            title: request.title,
            occurrence_date: request.occurrence_date,
            // Child instances never inherit reminder_offset.
            reminder_offset: None,
        };
        let response = tokio::time::timeout(
            self.call_timeout,
            self.client.post(&url).json(&body).send(),
        )
        .await
        .map_err(|_| TaskApiError::Timeout)??;

        if !response.status().is_success() {
            return Err(TaskApiError::Status(response.status()));
        }
        let created: Created = response.json().await?;
        Ok(created.task_id)
    }
}
