//! HTTP surface of the service
//!
//! # Modules
//!
//! - [`handlers`]: `PUT /check`, `GET /packages` and `GET /`
//! - [`response`]: Response bodies and error-to-status mapping

pub mod handlers;
pub mod response;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, put};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::release::{PypiRegistry, Registry, ReleaseResolver};
use crate::store::Store;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<Store>,
    pub resolver: Arc<ReleaseResolver<Store>>,
}

impl AppState {
    pub fn new(config: ServerConfig, store: Arc<Store>, registry: Arc<dyn Registry>) -> Self {
        let resolver = ReleaseResolver::new(
            Arc::clone(&store),
            registry,
            config.release_refresh_interval,
        );

        Self {
            config: Arc::new(config),
            store,
            resolver: Arc::new(resolver),
        }
    }
}

/// CORS for the usage report: echo the request origin only on exact match
fn packages_cors(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter(|origin| {
            let wildcard = origin.trim() == "*";
            if wildcard {
                warn!("Ignoring wildcard entry in allowed origins");
            }
            !wildcard
        })
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| warn!("Ignoring invalid allowed origin {:?}", origin))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET])
}

pub fn router(state: AppState) -> Router {
    let cors = packages_cors(&state.config.allowed_origins);

    Router::new()
        .route("/", get(handlers::home))
        .route("/check", put(handlers::check))
        .route("/packages", get(handlers::packages).layer(cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Open storage, build the router and serve until interrupted
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let db_path = config.database_path();
    let store = Arc::new(
        Store::new(&db_path)
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?,
    );
    let registry: Arc<dyn Registry> = Arc::new(PypiRegistry::new(config.registry_url.clone()));

    let addr = format!("{}:{}", config.bind_address, config.port);
    let app = router(AppState::new(config, store, registry));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Update checker listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}
