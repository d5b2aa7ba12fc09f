// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use cadence_core::{CadenceError, StorageAdapter};
use cadence_dispatch::Dispatcher;
use cadence_identity::IdentityResolver;
use cadence_reconcile::EventReconciler;
use cadence_sequence::SequenceScheduler;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Durable engine state.
    pub storage: Arc<dyn StorageAdapter>,
    /// The dispatcher run by the tick endpoint.
    pub dispatcher: Arc<Dispatcher>,
    /// The reconciler fed by the event webhook.
    pub reconciler: Arc<EventReconciler>,
    /// Resolver behind the enrollment endpoint.
    pub resolver: Arc<IdentityResolver>,
    /// Scheduler behind the enrollment endpoint.
    pub scheduler: Arc<SequenceScheduler>,
    /// Process start time for uptime reporting.
    pub start_time: std::time::Instant,
}

/// Gateway server configuration (mirrors GatewayConfig from cadence-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Bearer token for auth (None = auth disabled).
    pub bearer_token: Option<String>,
}

/// Build the gateway router.
///
/// Routes:
/// - `POST /v1/tick` (with auth) -- run one dispatch pass
/// - `POST /v1/events` (with auth) -- ingest a provider event
/// - `POST /v1/enrollments` (with auth) -- import a contact into a campaign
/// - `GET /health` (public) -- liveness for process supervisors
pub fn build_router(config: &ServerConfig, state: GatewayState) -> Router {
    let auth = AuthConfig {
        bearer_token: config.bearer_token.clone(),
    };

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/tick", post(handlers::post_tick))
        .route("/v1/events", post(handlers::post_events))
        .route("/v1/enrollments", post(handlers::post_enrollments))
        .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
}

/// Start the gateway HTTP server and serve until the process exits.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), CadenceError> {
    let app = build_router(config, state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CadenceError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| CadenceError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
