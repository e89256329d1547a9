//! The Audit Ingestor binary: buffers incoming task events, flushes them
//! idempotently into the append-only store, and serves per-task history.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use taskwave::audit::AuditIngestor;
use taskwave::domain::TaskId;
use taskwave::infrastructure::config::{self, BrokerConfig, DatabaseConfig, HttpConfig, LoggingConfig};
use taskwave::infrastructure::http::{self, DaprSubscription, DispatchOutcome};
use taskwave::infrastructure::{db, logging};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    http: HttpConfig,
    database: DatabaseConfig,
    broker: BrokerConfig,
    logging: LoggingConfig,
    flush_tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig { port: 8083 },
            database: DatabaseConfig::default(),
            broker: BrokerConfig::default(),
            logging: LoggingConfig::default(),
            flush_tick_ms: 5_000,
        }
    }
}

impl Config {
    fn validate(&self) -> Result<(), config::ConfigError> {
        config::validate_common(&self.http, &self.database, &self.logging)?;
        config::validate_tick_ms(self.flush_tick_ms)
    }
}

#[derive(Clone)]
struct AppState {
    ingestor: Arc<AuditIngestor>,
    pool: SqlitePool,
}

fn subscriptions() -> Vec<DaprSubscription> {
    ["tasks.created", "tasks.updated", "tasks.completed", "tasks.deleted"]
        .iter()
        .map(|topic| {
            let route = format!("/dapr/subscribe/{}", topic.replace('.', "-"));
            DaprSubscription::new("taskwave-pubsub", topic, &route)
        })
        .collect()
}

async fn dapr_subscribe() -> Json<Vec<DaprSubscription>> {
    Json(subscriptions())
}

async fn dispatch(State(state): State<AppState>, body: String) -> DispatchOutcome {
    if let Some(envelope) = http::parse_envelope(&body) {
        state.ingestor.handle_event(&envelope).await;
    }
    DispatchOutcome::Acked
}

async fn ready(State(state): State<AppState>) -> StatusCode {
    if db::is_healthy(&state.pool).await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<i64>,
}

async fn task_history(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    match state.ingestor.task_history(task_id, params.limit).await {
        Ok(records) if records.is_empty() => StatusCode::NOT_FOUND.into_response(),
        Ok(records) => Json(records).into_response(),
        Err(err) => {
            tracing::error!(error = %err, task_id = %task_id, "failed to read audit history");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config: Config = config::load("AUDIT_INGESTOR_", "config/audit-ingestor.yaml")?;
    config.validate()?;
    logging::init(&config.logging.level, config.logging.format)?;

    let pool = db::connect(&config.database.path, config.database.max_connections).await?;
    db::migrate(&pool).await?;

    let ingestor = Arc::new(AuditIngestor::new(pool.clone()));
    let flush = tokio::spawn(
        ingestor
            .clone()
            .run_flush_loop(Duration::from_millis(config.flush_tick_ms)),
    );

    let state = AppState {
        ingestor: ingestor.clone(),
        pool: pool.clone(),
    };
    let app = Router::new()
        .route("/health/live", get(http::live))
        .route("/health/ready", get(ready))
        .route("/dapr/subscribe", get(dapr_subscribe))
        .route("/dapr/subscribe/tasks-created", post(dispatch))
        .route("/dapr/subscribe/tasks-updated", post(dispatch))
        .route("/dapr/subscribe/tasks-completed", post(dispatch))
        .route("/dapr/subscribe/tasks-deleted", post(dispatch))
        .route("/api/v1/audit/tasks/{task_id}", get(task_history))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "audit-ingestor listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ingestor.stop();
    flush.abort();
    ingestor.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received, flushing remaining audit records");
}
