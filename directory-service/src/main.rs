use directory_service::{
    build_router,
    config::DirectoryConfig,
    services::{
        Diocese, EmailProvider, HttpIdentityProvider, LogOnlyEmailProvider, MongoAccessRequestStore,
        MongoContactStore, MongoDb, SmtpProvider,
    },
    AppState,
};
use service_core::error::AppError;
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = DirectoryConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    directory_service::services::metrics::init_metrics();

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting directory service"
    );

    tracing::info!("Initializing database connection");
    let db = MongoDb::connect(&config.mongodb).await?;
    db.initialize_indexes().await?;
    tracing::info!("Database initialized successfully");

    let diocese = Diocese::load(config.workflow.diocese_data_path.as_deref())
        .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;
    tracing::info!(foranes = diocese.foranes().len(), "Diocese directory loaded");

    let identity = HttpIdentityProvider::new(&config.identity)
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Identity provider: {}", e)))?;
    tracing::info!(endpoint = %config.identity.endpoint, "Identity provider client initialized");

    let email: Arc<dyn EmailProvider> = if config.smtp.enabled {
        Arc::new(
            SmtpProvider::new(&config.smtp)
                .map_err(|e| AppError::ConfigError(anyhow::anyhow!("SMTP provider: {}", e)))?,
        )
    } else {
        tracing::warn!("SMTP disabled; notifications are logged only");
        Arc::new(LogOnlyEmailProvider)
    };

    let state = AppState::new(
        config.clone(),
        Arc::new(MongoAccessRequestStore::new(db.clone())),
        Arc::new(MongoContactStore::new(db)),
        Arc::new(identity),
        email,
        Arc::new(diocese),
    );

    let app = build_router(state).await?;

    let addr = config.common.socket_addr();

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );
    let _guard = service_span.enter();

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
