//! The Recurring-Task Generator binary: periodically scans recurrence
//! templates via the Task API and materializes today's instance.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use taskwave::infrastructure::config::{self, DatabaseConfig, HttpConfig, LoggingConfig};
use taskwave::infrastructure::http::{self, DaprSubscription, DispatchOutcome};
use taskwave::infrastructure::{db, logging};
use taskwave::recurring_generator::{HttpTaskApiClient, RecurringGenerator, TaskApiClient};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    http: HttpConfig,
    database: DatabaseConfig,
    logging: LoggingConfig,
    task_api_base_url: String,
    scan_tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig { port: 8084 },
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            task_api_base_url: "http://localhost:8080".to_string(),
            scan_tick_ms: 300_000,
        }
    }
}

impl Config {
    fn validate(&self) -> Result<(), config::ConfigError> {
        config::validate_common(&self.http, &self.database, &self.logging)?;
        config::validate_tick_ms(self.scan_tick_ms)
    }
}

#[derive(Clone)]
struct AppState {
    generator: Arc<RecurringGenerator>,
    pool: SqlitePool,
}

fn subscriptions() -> Vec<DaprSubscription> {
    ["tasks.created", "tasks.updated"]
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
        state.generator.handle_event(&envelope);
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config: Config = config::load("RECURRING_GENERATOR_", "config/recurring-generator.yaml")?;
    config.validate()?;
    logging::init(&config.logging.level, config.logging.format)?;

    let pool = db::connect(&config.database.path, config.database.max_connections).await?;
    db::migrate(&pool).await?;

    let client: Arc<dyn TaskApiClient> = Arc::new(HttpTaskApiClient::new(config.task_api_base_url.clone()));
    let generator = Arc::new(RecurringGenerator::new(client));
    let scan = tokio::spawn(
        generator
            .clone()
            .run_scan_loop(Duration::from_millis(config.scan_tick_ms)),
    );

    let state = AppState {
        generator: generator.clone(),
        pool: pool.clone(),
    };
    let app = Router::new()
        .route("/health/live", get(http::live))
        .route("/health/ready", get(ready))
        .route("/dapr/subscribe", get(dapr_subscribe))
        .route("/dapr/subscribe/tasks-created", post(dispatch))
        .route("/dapr/subscribe/tasks-updated", post(dispatch))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "recurring-generator listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    generator.stop();
    scan.abort();
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
