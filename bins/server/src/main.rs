//! Satang API Server
//!
//! Main entry point for the Satang back-office service.

use std::sync::Arc;

use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use satang_api::{AppState, create_router};
use satang_core::storage::DocumentStore;
use satang_db::connect;
use satang_db::migration::Migrator;
use satang_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing; LOG_MODE=production switches to JSON output
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "satang=debug,tower_http=debug".into()),
    );
    if AppConfig::production_logging() {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Load configuration
    let config = AppConfig::load()?;

    // Connect to database
    let db = connect(&config.database.url).await?;
    info!("Connected to database");

    // INIT_DB=true runs pending migrations on boot
    if AppConfig::init_db_requested() {
        Migrator::up(&db, None).await?;
        info!("Migrations applied");
    }

    // Create JWT service
    let jwt_config = JwtConfig {
        secret: config.jwt.secret.clone(),
        #[allow(clippy::cast_possible_wrap)]
        access_token_expires_minutes: (config.jwt.access_token_expiry_secs / 60) as i64,
    };
    let jwt_service = JwtService::new(jwt_config);

    // Open the receipt/report tree and the read-only template tree
    let store = DocumentStore::open(&config.storage.data_root)?;
    let templates = DocumentStore::open(&config.storage.templates_root)?;
    info!(
        data_root = %config.storage.data_root,
        templates_root = %config.storage.templates_root,
        "Document storage configured"
    );

    // Create application state
    let state = AppState {
        db: Arc::new(db),
        jwt_service: Arc::new(jwt_service),
        store: Arc::new(store),
        templates: Arc::new(templates),
        config: Arc::new(config.clone()),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
