// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cadence serve` and `cadence tick` command implementations.
//!
//! `serve` wires storage, channel adapters, dispatcher, and reconciler
//! together, starts the gateway, and drives the dispatcher from a tokio
//! interval so deployments without an external trigger still make progress.
//! `tick` runs one synchronous pass for cron-style deployments and prints
//! the summary.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};

use cadence_channels::{ChannelRegistry, EmailChannel, NetworkChannel};
use cadence_config::model::CadenceConfig;
use cadence_core::{CadenceError, StorageAdapter};
use cadence_dispatch::Dispatcher;
use cadence_gateway::{GatewayState, ServerConfig};
use cadence_identity::IdentityResolver;
use cadence_reconcile::EventReconciler;
use cadence_sequence::SequenceScheduler;
use cadence_storage::SqliteStorage;

/// Initialize the tracing subscriber from the configured log level.
///
/// `RUST_LOG` overrides the config value when set.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cadence={log_level},info")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Build the channel registry from configuration.
///
/// Channels with incomplete configuration are skipped with a warning; a
/// campaign bound to an unregistered channel surfaces `AdapterNotFound` at
/// dispatch time rather than failing startup.
fn build_channel_registry(config: &CadenceConfig) -> ChannelRegistry {
    let mut registry = ChannelRegistry::new();

    if config.smtp.host.is_some() {
        match EmailChannel::from_config(&config.smtp) {
            Ok(channel) => {
                info!("email channel registered");
                registry.register(Arc::new(channel));
            }
            Err(e) => warn!(error = %e, "email channel not registered"),
        }
    }

    if config.network.api_base.is_some() {
        match NetworkChannel::from_config(&config.network) {
            Ok(channel) => {
                info!("network channel registered");
                registry.register(Arc::new(channel));
            }
            Err(e) => warn!(error = %e, "network channel not registered"),
        }
    }

    registry
}

/// Open and initialize storage from configuration.
async fn open_storage(config: &CadenceConfig) -> Result<Arc<SqliteStorage>, CadenceError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    Ok(Arc::new(storage))
}

/// Runs the `cadence serve` command.
pub async fn run_serve(config: CadenceConfig) -> Result<(), CadenceError> {
    info!("starting cadence serve");

    let storage = open_storage(&config).await?;
    let registry = Arc::new(build_channel_registry(&config));

    let dispatcher = Arc::new(Dispatcher::new(
        storage.clone(),
        registry,
        config.dispatch.clone(),
    ));
    let reconciler = Arc::new(EventReconciler::new(storage.clone()));

    // Internal periodic trigger. External schedulers may also POST /v1/tick;
    // concurrent passes arbitrate through the atomic claim.
    let tick_dispatcher = dispatcher.clone();
    let tick_interval = config.engine.tick_interval_secs;
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(tick_interval));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut rng = StdRng::from_entropy();
        loop {
            interval.tick().await;
            match tick_dispatcher.tick(chrono::Utc::now(), &mut rng).await {
                Ok(summary) => {
                    if summary != cadence_dispatch::TickSummary::default() {
                        info!(
                            attempted = summary.attempted,
                            sent = summary.sent,
                            deferred = summary.deferred,
                            failed = summary.failed,
                            "periodic tick"
                        );
                    }
                }
                Err(e) => error!(error = %e, "periodic tick failed"),
            }
        }
    });

    let state = GatewayState {
        storage: storage.clone(),
        dispatcher,
        reconciler,
        resolver: Arc::new(IdentityResolver::new(storage.clone())),
        scheduler: Arc::new(SequenceScheduler::new(storage.clone())),
        start_time: std::time::Instant::now(),
    };
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
        bearer_token: config.gateway.bearer_token.clone(),
    };

    let server = cadence_gateway::start_server(&server_config, state);
    tokio::select! {
        result = server => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            storage.close().await?;
        }
    }

    Ok(())
}

/// Runs the `cadence tick` command: one pass, summary on stdout.
pub async fn run_tick(config: CadenceConfig) -> Result<(), CadenceError> {
    let storage = open_storage(&config).await?;
    let registry = Arc::new(build_channel_registry(&config));
    let dispatcher = Dispatcher::new(storage.clone(), registry, config.dispatch.clone());

    let mut rng = StdRng::from_entropy();
    let summary = dispatcher.tick(chrono::Utc::now(), &mut rng).await?;
    println!(
        "{}",
        serde_json::to_string(&summary)
            .map_err(|e| CadenceError::Internal(format!("cannot render summary: {e}")))?
    );

    storage.close().await?;
    Ok(())
}
