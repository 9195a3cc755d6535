//! Firewatch Server - alarm trigger surface
//!
//! HTTP API for detectors and operators: trigger incidents, follow their
//! status, and stand them down. Also hosts the wiring shared with the
//! `firewatch` binary.

pub mod config;
pub mod http;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use firewatch_core::{
    Addressing, AlertConfig, ConfigError, EscalationController, EscalationPolicy, GatewayError,
    IncidentDispatcher, NotificationGateway, RecipientDirectory, ResolutionFailure,
};

pub use config::{AppConfig, ServerConfig};

/// Errors that stop the service from starting
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("None of the {0} configured admin phone numbers could be resolved")]
    NoRecipients(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state
pub struct AppState {
    pub dispatcher: IncidentDispatcher,
    /// Wording used when a trigger omits title or description
    pub alert: AlertConfig,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(dispatcher: IncidentDispatcher, alert: AlertConfig) -> Self {
        Self {
            dispatcher,
            alert,
            started_at: Utc::now(),
        }
    }

    /// Resolve the admin directory through `gateway` and assemble the dispatcher.
    ///
    /// Individual resolution failures are returned for reporting; it is an
    /// error only when phones are configured and none of them resolve.
    pub async fn build(
        config: &AppConfig,
        gateway: Arc<dyn NotificationGateway>,
    ) -> Result<(Self, Vec<ResolutionFailure>), StartupError> {
        let phones = &config.core.directory.admin_phones;
        let (directory, failures) = RecipientDirectory::resolve_all(gateway.as_ref(), phones).await;
        if !phones.is_empty() && directory.is_empty() {
            return Err(StartupError::NoRecipients(phones.len()));
        }
        tracing::info!(
            "Directory ready: {} recipients, {} unresolved",
            directory.len(),
            failures.len()
        );

        let controller = EscalationController::new(
            gateway,
            EscalationPolicy::from(&config.core.escalation),
            Addressing::from(&config.core.target),
        );
        let dispatcher = IncidentDispatcher::new(
            Arc::new(controller),
            Arc::new(directory),
            config.core.escalation.initial_tier,
        )
        .with_cooldown(config.core.dispatch.cooldown())
        .with_history_limit(config.core.dispatch.history_limit);

        Ok((Self::new(dispatcher, config.core.alert.clone()), failures))
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Incident endpoints
        .route("/incidents", get(http::list_incidents))
        .route("/incidents", post(http::trigger_incident))
        .route("/incidents/{id}", get(http::get_incident))
        .route("/incidents/{id}/stand-down", put(http::stand_down_incident))
        // System endpoints
        .route("/status", get(http::get_status))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server; running incidents are aborted once it stops
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), StartupError> {
    let app = create_router(state.clone());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Firewatch server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.dispatcher.shutdown();
    tracing::info!("Firewatch server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
