//! The Reminder Engine binary: loads pending reminders from the snapshot
//! table, then runs the firing and persistence ticks alongside an HTTP
//! surface for health checks and Dapr event dispatch.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use taskwave::infrastructure::config::{self, BrokerConfig, DatabaseConfig, HttpConfig, LoggingConfig};
use taskwave::infrastructure::http::{self, DaprSubscription, DispatchOutcome};
use taskwave::infrastructure::{db, logging};
use taskwave::publisher::{DaprHttpBroker, NoopBroker, PubSubBroker, Publisher};
use taskwave::reminder_engine::ReminderEngine;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    http: HttpConfig,
    database: DatabaseConfig,
    broker: BrokerConfig,
    logging: LoggingConfig,
    firing_tick_ms: u64,
    persistence_tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig { port: 8081 },
            database: DatabaseConfig::default(),
            broker: BrokerConfig::default(),
            logging: LoggingConfig::default(),
            firing_tick_ms: 10_000,
            persistence_tick_ms: 300_000,
        }
    }
}

impl Config {
    fn validate(&self) -> Result<(), config::ConfigError> {
        config::validate_common(&self.http, &self.database, &self.logging)?;
        config::validate_tick_ms(self.firing_tick_ms)?;
        config::validate_tick_ms(self.persistence_tick_ms)
    }
}

#[derive(Clone)]
struct AppState {
    engine: Arc<ReminderEngine>,
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
        state.engine.handle_event(&envelope).await;
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
    let config: Config = config::load("REMINDER_ENGINE_", "config/reminder-engine.yaml")?;
    config.validate()?;
    logging::init(&config.logging.level, config.logging.format)?;

    let pool = db::connect(&config.database.path, config.database.max_connections).await?;
    db::migrate(&pool).await?;

    let broker: Arc<dyn PubSubBroker> = match config.broker.dapr_http_port {
        Some(port) => Arc::new(DaprHttpBroker::new(port, config.broker.pubsub_name.clone())),
        None => {
            tracing::warn!("no dapr_http_port configured, publishing reminder.triggered events to a no-op broker");
            Arc::new(NoopBroker)
        }
    };
    let publisher = Arc::new(Publisher::new(broker));
    let engine = Arc::new(ReminderEngine::new(publisher, pool.clone()));

    let loaded = engine.load_from_snapshot().await?;
    tracing::info!(loaded, "reloaded pending reminders from snapshot");

    let firing = tokio::spawn(
        engine
            .clone()
            .run_firing_loop(Duration::from_millis(config.firing_tick_ms)),
    );
    let persistence = tokio::spawn(
        engine
            .clone()
            .run_persistence_loop(Duration::from_millis(config.persistence_tick_ms)),
    );

    let state = AppState {
        engine: engine.clone(),
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
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "reminder-engine listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engine.stop();
    firing.abort();
    persistence.abort();
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received, draining");
}
