//! The Notifier binary: fans task events out over Server-Sent Events,
//! alongside heartbeat and stale-connection eviction ticks.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::mpsc;

use taskwave::domain::OwnerId;
use taskwave::infrastructure::config::{self, BrokerConfig, DatabaseConfig, HttpConfig, LoggingConfig};
use taskwave::infrastructure::http::{self, DaprSubscription, DispatchOutcome};
use taskwave::infrastructure::{db, logging};
use taskwave::notifier::{Frame, Notifier};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    http: HttpConfig,
    database: DatabaseConfig,
    broker: BrokerConfig,
    logging: LoggingConfig,
    heartbeat_tick_ms: u64,
    eviction_tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig { port: 8082 },
            database: DatabaseConfig::default(),
            broker: BrokerConfig::default(),
            logging: LoggingConfig::default(),
            heartbeat_tick_ms: 30_000,
            eviction_tick_ms: 60_000,
        }
    }
}

impl Config {
    fn validate(&self) -> Result<(), config::ConfigError> {
        config::validate_common(&self.http, &self.database, &self.logging)?;
        config::validate_tick_ms(self.heartbeat_tick_ms)?;
        config::validate_tick_ms(self.eviction_tick_ms)
    }
}

#[derive(Clone)]
struct AppState {
    notifier: Arc<Notifier>,
    pool: SqlitePool,
}

fn subscriptions() -> Vec<DaprSubscription> {
    [
        "tasks.created",
        "tasks.updated",
        "tasks.completed",
        "tasks.deleted",
        "tasks.reminder-triggered",
    ]
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
        state.notifier.handle_event(&envelope).await;
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
struct StreamParams {
    /// Authentication/session resolution is out of scope for this fabric;
    /// the gateway in front of this worker is expected to have already
    /// authenticated the caller and forwards their resolved owner id here.
    owner_id: OwnerId,
}

/// Unregisters the connection when the SSE stream is dropped, whether that
/// is a normal close (queue drained and closed) or axum dropping the stream
/// early on client disconnect. Unregister is async, so `Drop` spawns it
/// rather than blocking -- this is what makes cleanup immediate instead of
/// waiting on the 60s eviction tick.
struct ConnectionGuard {
    notifier: Arc<Notifier>,
    owner_id: OwnerId,
    connection_id: uuid::Uuid,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let notifier = self.notifier.clone();
        let owner_id = self.owner_id;
        let connection_id = self.connection_id;
        tokio::spawn(async move {
            notifier.unregister(owner_id, connection_id).await;
        });
    }
}

async fn stream(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    let (connection, receiver) = state
        .notifier
        .register(params.owner_id)
        .await
        .map_err(|_| StatusCode::TOO_MANY_REQUESTS)?;

    let guard = ConnectionGuard {
        notifier: state.notifier.clone(),
        owner_id: connection.owner_id,
        connection_id: connection.id,
    };
    let frames = receiver_stream(receiver, guard).map(|frame| Ok(Event::default().data(frame.to_sse_data())));

    Ok(Sse::new(frames))
}

fn receiver_stream(receiver: mpsc::Receiver<Frame>, guard: ConnectionGuard) -> impl Stream<Item = Frame> {
    stream::unfold((receiver, guard), |(mut receiver, guard)| async move {
        receiver.recv().await.map(|frame| (frame, (receiver, guard)))
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config: Config = config::load("NOTIFIER_", "config/notifier.yaml")?;
    config.validate()?;
    logging::init(&config.logging.level, config.logging.format)?;

    let pool = db::connect(&config.database.path, config.database.max_connections).await?;
    db::migrate(&pool).await?;

    let notifier = Arc::new(Notifier::new());
    let heartbeat = tokio::spawn(
        notifier
            .clone()
            .run_heartbeat_loop(Duration::from_millis(config.heartbeat_tick_ms)),
    );
    let eviction = tokio::spawn(
        notifier
            .clone()
            .run_eviction_loop(Duration::from_millis(config.eviction_tick_ms)),
    );

    let state = AppState {
        notifier: notifier.clone(),
        pool,
    };
    let app = Router::new()
        .route("/health/live", get(http::live))
        .route("/health/ready", get(ready))
        .route("/dapr/subscribe", get(dapr_subscribe))
        .route("/dapr/subscribe/tasks-created", post(dispatch))
        .route("/dapr/subscribe/tasks-updated", post(dispatch))
        .route("/dapr/subscribe/tasks-completed", post(dispatch))
        .route("/dapr/subscribe/tasks-deleted", post(dispatch))
        .route("/dapr/subscribe/tasks-reminder-triggered", post(dispatch))
        .route("/api/v1/notifications/stream", get(stream))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "notifier listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    notifier.stop();
    heartbeat.abort();
    eviction.abort();
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received, draining");
}
