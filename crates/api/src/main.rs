use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use recon_core::checklist::memory::InMemoryObjectStore;
use recon_core::checklist::ports::{StorageSigner, StorageUploader};
use recon_core::checklist::service::{ChecklistPorts, ChecklistService};
use recon_core::migration::{ChecklistApiRouter, MigrationFlags, MigrationMetrics};
use recon_db::adapters::{
    PgChecklistItemRepository, PgChecklistRepository, PgChecklistUnitOfWork, PgEvidenceRepository,
    PgVehicleStatusWriter,
};
use recon_db::legacy::LegacyChecklistApi;
use recon_events::{BusTimelinePublisher, EventBus, EventPersistence};
use recon_storage::{S3Storage, StorageConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recon_api::config::{LogFormat, ServerConfig};
use recon_api::router::build_app_router;
use recon_api::state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenvy::dotenv().ok();

    // --- Configuration and tracing ---
    let config = ServerConfig::from_env();
    init_tracing(config.log_format);
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = config
        .database_url
        .clone()
        .ok_or("DATABASE_URL must be set")?;
    let pool = recon_db::create_pool(&database_url, config.db_max_connections).await?;
    recon_db::health_check(&pool).await?;
    recon_db::run_migrations(&pool).await?;
    tracing::info!("Database ready, migrations applied");

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let persistence_handle = tokio::spawn(EventPersistence::run(pool.clone(), event_bus.subscribe()));

    // --- Evidence storage ---
    let (signer, uploader) = build_storage().await;
    let signed_url_ttl = Duration::from_secs(config.signed_url_ttl_secs);

    // --- Checklist paths ---
    let service = ChecklistService::new(ChecklistPorts {
        checklists: Arc::new(PgChecklistRepository::new(pool.clone())),
        items: Arc::new(PgChecklistItemRepository::new(pool.clone())),
        evidences: Arc::new(PgEvidenceRepository::new(pool.clone())),
        unit_of_work: Arc::new(PgChecklistUnitOfWork::new(pool.clone())),
        timeline: Arc::new(BusTimelinePublisher::new(Arc::clone(&event_bus))),
        vehicles: Arc::new(PgVehicleStatusWriter::new(pool.clone())),
        signer: Arc::clone(&signer),
        uploader,
    })
    .with_signed_url_ttl(signed_url_ttl);
    let legacy = LegacyChecklistApi::new(pool.clone(), signer).with_signed_url_ttl(signed_url_ttl);

    let flags = MigrationFlags::from_env();
    tracing::info!(
        submit = flags.submit,
        anomalies = flags.anomalies,
        init = flags.init,
        load = flags.load,
        "Checklist migration flags"
    );
    let router = ChecklistApiRouter::new(
        Arc::new(service),
        Arc::new(legacy),
        flags,
        Arc::new(MigrationMetrics::new()),
    );

    // --- App ---
    let state = AppState {
        pool: Some(pool),
        config: Arc::new(config.clone()),
        checklists: Arc::new(router),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(config.host.parse()?, config.port);
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- Post-shutdown cleanup ---
    // The app, and with it every publisher clone, is gone; dropping the last
    // bus handle closes the channel so persistence drains and exits.
    drop(event_bus);
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, persistence_handle).await.is_err() {
        tracing::warn!("Timeline persistence did not drain before the shutdown timeout");
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "recon_api=debug,recon_core=info,recon_db=info,recon_events=info,recon_storage=info,tower_http=debug"
            .into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// S3 when a bucket is configured, otherwise an in-process store.
async fn build_storage() -> (Arc<dyn StorageSigner>, Arc<dyn StorageUploader>) {
    match StorageConfig::from_env() {
        Some(storage) => {
            let s3 = Arc::new(S3Storage::from_config(&storage).await);
            let signer: Arc<dyn StorageSigner> = s3.clone();
            let uploader: Arc<dyn StorageUploader> = s3;
            (signer, uploader)
        }
        None => {
            tracing::warn!("S3_BUCKET not set, evidence media is kept in memory");
            let store = Arc::new(InMemoryObjectStore::new());
            let signer: Arc<dyn StorageSigner> = store.clone();
            let uploader: Arc<dyn StorageUploader> = store;
            (signer, uploader)
        }
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
