//! Recurring-Task Generator: periodically materializes child task
//! instances for every template task, via the narrow Task API interface.

mod service;
mod task_api;

pub use service::RecurringGenerator;
pub use task_api::{CreateInstanceRequest, HttpTaskApiClient, TaskApiClient, TaskApiError, TemplateTask};
