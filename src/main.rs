use anyhow::{Result, bail};
use catalog_api::{
    build_app,
    config::{AppConfig, RunMode, StoreKind},
    handlers::function_handlers,
    services::{
        catalog_service::CatalogService,
        image_urls::PublicBucketResolver,
        product_store::ProductStore,
        rest_store::RestProductStore,
        sqlite_store::SqliteProductStore,
    },
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{io::ErrorKind, path::Path, str::FromStr, sync::Arc};
use tokio::{io::AsyncReadExt, net::TcpListener};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup (stderr, so --invoke output stays clean) ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // --- Parse config + run mode ---
    let (cfg, mode) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting catalog-api with config: {:?}", cfg);

    // --- Initialize backing store ---
    let store: Arc<dyn ProductStore> = match cfg.store {
        StoreKind::Sqlite => {
            let sqlite = connect_sqlite(&cfg.database_url).await?;
            if mode == RunMode::Migrate {
                let applied = sqlite.migrate().await?;
                tracing::info!("Database migration complete ({} statements).", applied);
                return Ok(()); // exit after migration
            }
            Arc::new(sqlite)
        }
        StoreKind::Rest => {
            if mode == RunMode::Migrate {
                bail!("--migrate only applies to the sqlite store");
            }
            let (Some(url), Some(key)) = (cfg.rest_url.as_deref(), cfg.rest_api_key.clone()) else {
                bail!("the rest store needs CATALOG_REST_URL and CATALOG_REST_API_KEY");
            };
            Arc::new(RestProductStore::new(url, key))
        }
    };

    // --- Initialize core service ---
    let images = Arc::new(PublicBucketResolver::new(
        &cfg.storage_public_url,
        &cfg.image_bucket,
    )?);
    let service = CatalogService::new(store, images);

    // --- Single function invocation ---
    if mode == RunMode::Invoke {
        let mut raw = String::new();
        tokio::io::stdin().read_to_string(&mut raw).await?;
        let output = function_handlers::invoke_json(&service, &raw).await?;
        println!("{}", output);
        return Ok(());
    }

    // --- Build router ---
    let app = build_app(service);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Open (creating if needed) the SQLite database behind `db_url`.
async fn connect_sqlite(db_url: &str) -> Result<SqliteProductStore> {
    tracing::debug!("Connecting using raw URL => {}", db_url);

    // Extract the local file path SQLx will use
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");

    // Create parent directory if needed
    if !db_path.starts_with(":memory:") {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                tracing::info!("Created missing directory {:?}", parent);
            }
        }
    }

    let options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(SqliteProductStore::new(Arc::new(pool)))
}
