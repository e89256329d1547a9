//! The Recurring-Task Generator: every tick, materializes one child
//! instance per template whose pattern says today is an occurrence day and
//! that has no instance for today yet.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};

use crate::domain::EventEnvelope;
use crate::recurrence;

use super::task_api::{CreateInstanceRequest, TaskApiClient, TaskApiError};

pub struct RecurringGenerator {
    client: Arc<dyn TaskApiClient>,
    running: Arc<AtomicBool>,
    /// Coalesces missed runs: a tick that finds one already running skips
    /// rather than queuing a second.
    in_flight: Arc<AtomicBool>,
}

impl RecurringGenerator {
    pub fn new(client: Arc<dyn TaskApiClient>) -> Self {
        Self {
            client,
            running: Arc::new(AtomicBool::new(true)),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribed only as a hint per the spec -- the periodic scan is the
    /// authoritative trigger, so this just logs.
    pub fn handle_event(&self, envelope: &EventEnvelope) {
        tracing::debug!(
            task_id = %envelope.task_id,
            event = envelope.payload.event_type(),
            "recurring generator received hint event, scheduler remains authoritative"
        );
    }

    /// One scan: skipped entirely if a previous scan is still running.
    pub async fn tick(&self) {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("recurring generator tick skipped, previous scan still in flight");
            return;
        }
        self.scan_once(Utc::now().date_naive()).await;
        self.in_flight.store(false, Ordering::SeqCst);
    }

    async fn scan_once(&self, today: NaiveDate) -> usize {
        let templates = match self.client.list_due_templates().await {
            Ok(templates) => templates,
            Err(err) => {
                tracing::error!(error = %err, "failed to list recurring templates, skipping this tick");
                return 0;
            }
        };

        let mut materialized = 0;
        for template in &templates {
            match self.materialize_if_due(template, today).await {
                Ok(true) => materialized += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(
                        template_id = %template.task_id,
                        error = %err,
                        "skipping template due to error"
                    );
                }
            }
        }
        materialized
    }

    async fn materialize_if_due(
        &self,
        template: &super::task_api::TemplateTask,
        today: NaiveDate,
    ) -> Result<bool, TaskApiError> {
        let pattern = match recurrence::parse(&template.recurrence_pattern) {
            Ok(pattern) => pattern,
            Err(err) => {
                tracing::warn!(
                    template_id = %template.task_id,
                    pattern = %template.recurrence_pattern,
                    error = %err,
                    "template has an invalid recurrence pattern, skipping"
                );
                return Ok(false);
            }
        };

        if !recurrence::occurs_on(&pattern, template.created_at, today) {
            return Ok(false);
        }
        if self.client.instance_exists(template.task_id, today).await? {
            return Ok(false);
        }

        let title = format!("{} ({})", template.title, today.format("%Y-%m-%d"));
        self.client
            .create_instance(CreateInstanceRequest {
                parent_recurring_id: template.task_id,
                owner_id: template.owner_id,
                title,
                occurrence_date: today,
            })
            .await?;
        Ok(true)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// The periodic scan loop: every `tick`, materializes due instances.
    pub async fn run_scan_loop(self: Arc<Self>, tick: Duration) {
        while self.running.load(Ordering::SeqCst) {
            tokio::time::sleep(tick).await;
            self.tick().await;
        }
    }
}
