use custodia::{
    api::{self, AppState},
    config::{self, database},
    core::user,
    errors::{Error, Result},
    notify,
    storage::UploadStore,
};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also come from the environment
    dotenv().ok();

    // 3. Resolve settings (config.toml + environment)
    let settings = config::load_settings()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    info!("Configuration loaded.");

    // 4. Connect and make sure the schema exists
    let db = database::create_connection(&settings.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed the first administrator when the users table is empty
    match &settings.admin {
        Some(seed) => {
            user::ensure_admin_seed(&db, seed)
                .await
                .inspect_err(|e| error!("Failed to seed administrator: {}", e))?;
        }
        None => info!("No administrator seed configured (ADMIN_EMAIL / ADMIN_PASSWORD)."),
    }

    // 6. Build shared state and serve
    if settings.mail_webhook_url.is_none() {
        info!("MAIL_WEBHOOK_URL not set; signature mails will only be logged.");
    }
    let mailer = notify::mailer_from_settings(&settings)
        .inspect_err(|e| error!("Failed to set up mail delivery: {}", e))?;
    let state = AppState {
        mailer,
        uploads: UploadStore::new(settings.upload_dir.clone()),
        settings: Arc::new(settings),
        db,
    };
    info!("Signed documents stored under {}", state.uploads.root().display());
    let bind_addr = state.settings.bind_addr.clone();

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", bind_addr, e))?;
    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Error::from)?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, finishing in-flight requests.");
}
