//! Integration tests for `HttpTaskApiClient` against a mock Task API,
//! grounded on the teacher's `tests/claude_client_integration_test.rs`
//! wiremock harness (including its retry-on-500 scenario).

use chrono::NaiveDate;
use taskwave::domain::{OwnerId, TaskId};
use taskwave::recurring_generator::{CreateInstanceRequest, HttpTaskApiClient, TaskApiClient, TaskApiError};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn list_due_templates_parses_the_response_body() {
    let mock_server = MockServer::start().await;
    let task_id = TaskId::new_v4();
    let owner_id = OwnerId::new_v4();
    Mock::given(method("GET"))
        .and(path("/internal/tasks/recurring-templates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "task_id": task_id,
            "owner_id": owner_id,
            "title": "water the plants",
            "recurrence_pattern": "daily",
            "created_at": "2025-01-01T00:00:00.000Z",
        }])))
        .mount(&mock_server)
        .await;

    let client = HttpTaskApiClient::new(mock_server.uri());
    let templates = client.list_due_templates().await.unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].task_id, task_id);
    assert_eq!(templates[0].recurrence_pattern, "daily");
}

#[tokio::test]
async fn list_due_templates_retries_on_server_error_then_succeeds() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/internal/tasks/recurring-templates"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/internal/tasks/recurring-templates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let client = HttpTaskApiClient::new(mock_server.uri());
    let templates = client.list_due_templates().await.unwrap();
    assert!(templates.is_empty());
}

#[tokio::test]
async fn instance_exists_maps_404_to_false_and_200_to_true() {
    let mock_server = MockServer::start().await;
    let template_id = TaskId::new_v4();
    let today = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
    Mock::given(method("GET"))
        .and(path_regex(r"^/internal/tasks/.+/instances/.+$"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = HttpTaskApiClient::new(mock_server.uri());
    assert!(!client.instance_exists(template_id, today).await.unwrap());
}

#[tokio::test]
async fn create_instance_posts_the_request_and_returns_the_new_task_id() {
    let mock_server = MockServer::start().await;
    let created_id = TaskId::new_v4();
    Mock::given(method("POST"))
        .and(path("/internal/tasks"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "task_id": created_id,
        })))
        .mount(&mock_server)
        .await;

    let client = HttpTaskApiClient::new(mock_server.uri());
    let result = client
        .create_instance(CreateInstanceRequest {
            parent_recurring_id: TaskId::new_v4(),
            owner_id: OwnerId::new_v4(),
            title: "water the plants (2025-01-05)".to_string(),
            occurrence_date: NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
        })
        .await
        .unwrap();
    assert_eq!(result, created_id);
}

#[tokio::test]
async fn create_instance_surfaces_a_permanent_client_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/internal/tasks"))
        .respond_with(ResponseTemplate::new(422))
        .mount(&mock_server)
        .await;

    let client = HttpTaskApiClient::new(mock_server.uri());
    let result = client
        .create_instance(CreateInstanceRequest {
            parent_recurring_id: TaskId::new_v4(),
            owner_id: OwnerId::new_v4(),
            title: "bad request".to_string(),
            occurrence_date: NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
        })
        .await;
    assert!(matches!(result, Err(TaskApiError::Status(status)) if status.as_u16() == 422));
}
