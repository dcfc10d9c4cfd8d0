//! Kakeibo API Server
//!
//! Main entry point for the Kakeibo backend service.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kakeibo_api::{AppState, create_router};
use kakeibo_core::expense::ExpenseService;
use kakeibo_db::{
    AuditLogRepository, ExpenseRepository, FamilyRepository, UserRepository, connect,
};
use kakeibo_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kakeibo=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load()?;

    // Connect to database
    let db = connect(&config.database.url, config.database.max_connections).await?;
    info!("Connected to database");

    // Create JWT service
    #[allow(clippy::cast_possible_wrap)]
    let jwt_service = JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        access_token_expires_secs: config.jwt.access_token_expiry_secs as i64,
    });

    // Wire the expense service with its collaborators; everything is
    // constructed here and passed down, no ambient lookups.
    let db = Arc::new(db);
    let users = Arc::new(UserRepository::new((*db).clone()));
    let families = Arc::new(FamilyRepository::new((*db).clone()));
    let store = Arc::new(ExpenseRepository::new((*db).clone()));
    let audit = Arc::new(AuditLogRepository::new((*db).clone()));
    let expenses = Arc::new(ExpenseService::new(users, families, store, audit));

    // Create application state
    let state = AppState {
        db,
        jwt_service: Arc::new(jwt_service),
        expenses,
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
