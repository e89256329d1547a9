//! Integration tests for the SQLite connection pool against a real,
//! file-backed database (rather than the in-memory pool the unit tests use
//! elsewhere), grounded on the teacher's use of `tempfile::TempDir` in
//! `tests/logging_integration_test.rs`.

use tempfile::TempDir;

#[tokio::test]
async fn connect_creates_the_database_file_and_migrates_it() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("worker.db");
    let url = format!("sqlite://{}", db_path.display());

    let pool = taskwave::infrastructure::db::connect(&url, 4).await.unwrap();
    taskwave::infrastructure::db::migrate(&pool).await.unwrap();

    assert!(db_path.exists());
    assert!(taskwave::infrastructure::db::is_healthy(&pool).await);

    sqlx::query("INSERT INTO task_events (event_id, event_type, task_id, owner_id, occurred_at, payload, partition_key) VALUES ('e1', 'task.created', 't1', 'u1', '2025-01-01T00:00:00Z', '{}', '2025-01-01')")
        .execute(&pool)
        .await
        .unwrap();

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM task_events")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 1);
}

#[tokio::test]
async fn a_pool_surviving_across_reconnects_sees_the_same_file() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("worker.db");
    let url = format!("sqlite://{}", db_path.display());

    {
        let pool = taskwave::infrastructure::db::connect(&url, 1).await.unwrap();
        taskwave::infrastructure::db::migrate(&pool).await.unwrap();
        sqlx::query(
            "INSERT INTO reminder_schedule \
             (reminder_id, task_id, owner_id, trigger_at, reminder_kind, task_title, status, updated_at) \
             VALUES ('r1', 't1', 'u1', '2099-01-01T00:00:00Z', 'due_date_reminder', 'buy milk', 'pending', '2025-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool.close().await;
    }

    let reopened = taskwave::infrastructure::db::connect(&url, 1).await.unwrap();
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reminder_schedule")
        .fetch_one(&reopened)
        .await
        .unwrap();
    assert_eq!(count.0, 1);
}
