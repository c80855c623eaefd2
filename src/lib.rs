//! Documentation of the engagement counter service.
//!
//! Per-item like/dislike voting for the forum backend. Live state (who voted
//! what, and the per-item totals) sits in Redis for atomic, O(1) operations;
//! a background reconciler folds the totals into the Meilisearch item index
//! so search ranking and cold reads survive a cache restart.
//!
//! # Consistency model
//!
//! Redis is the system of record for live counts. Meilisearch is a lagging
//! copy, refreshed every sweep interval and eagerly after each vote, and is
//! never consulted on the vote read path. Eventual consistency between the
//! two is an accepted tradeoff; what is NOT accepted is losing the exclusivity
//! invariant (a user simultaneously liking and disliking one item) or letting
//! a counter go negative, both of which the vote service and the floored
//! decrement rule out even under concurrent or replayed requests.

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{
    net::TcpListener,
    signal,
    sync::{Notify, watch},
};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod reconcile;
pub mod routes;
pub mod snapshot;
pub mod state;
pub mod types;
pub mod vote;

use config::Config;
use database::{RedisStore, init_redis};
use reconcile::Reconciler;
use routes::{dislike_handler, like_handler, status_handler, undislike_handler, unlike_handler};
use snapshot::{MeiliSnapshots, SnapshotStore, init_meilisearch};
use state::AppState;
use vote::VoteService;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/items/{id}/like", post(like_handler))
        .route("/items/{id}/unlike", post(unlike_handler))
        .route("/items/{id}/dislike", post(dislike_handler))
        .route("/items/{id}/undislike", post(undislike_handler))
        .route("/items/{id}/engagement", get(status_handler))
        .with_state(state)
}

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load();

    info!("Connecting to Redis...");
    let redis_connection = init_redis(&config.redis_url)
        .await
        .expect("Redis unreachable at startup");
    let store = Arc::new(RedisStore::new(redis_connection));

    info!("Connecting to Meilisearch...");
    let meili_client = init_meilisearch(&config.meili_url, &config.meili_key)
        .await
        .expect("Meilisearch unreachable at startup");
    let snapshots: Arc<dyn SnapshotStore> = Arc::new(MeiliSnapshots::new(meili_client));

    let sweep_wakeup = Arc::new(Notify::new());
    let (stop_reconciler, stop_signal) = watch::channel(false);

    let votes = VoteService::new(store.clone(), store.clone(), sweep_wakeup.clone());
    let reconciler = Reconciler::new(
        store,
        snapshots.clone(),
        config.sweep_interval,
        sweep_wakeup,
        stop_signal,
    );
    let reconciler_handle = tokio::spawn(reconciler.run());

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let app = router(AppState::new(votes, snapshots)).layer(cors);

    let address = format!("0.0.0.0:{}", config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    // Stop the reconciler after the last request has drained.
    let _ = stop_reconciler.send(true);
    let _ = reconciler_handle.await;

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
