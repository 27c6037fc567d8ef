use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::env;

/// Which backing store serves product rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Local SQLite database (`database_url`).
    Sqlite,
    /// Hosted PostgREST endpoint (`rest_url` + `rest_api_key`).
    Rest,
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreKind,
    pub database_url: String,
    pub rest_url: Option<String>,
    pub rest_api_key: Option<String>,
    pub storage_public_url: String,
    pub image_bucket: String,
}

// Hand-written so the API key never reaches the logs.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("store", &self.store)
            .field("database_url", &self.database_url)
            .field("rest_url", &self.rest_url)
            .field("rest_api_key", &self.rest_api_key.as_ref().map(|_| "<redacted>"))
            .field("storage_public_url", &self.storage_public_url)
            .field("image_bucket", &self.image_bucket)
            .finish()
    }
}

/// What the binary should do after configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Serve,
    /// Apply the SQLite schema and exit.
    Migrate,
    /// Read one function event from stdin, print the response, and exit.
    Invoke,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Read-only product catalog API")]
pub struct Args {
    /// Host to bind to (overrides CATALOG_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides CATALOG_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Backing store (overrides CATALOG_STORE)
    #[arg(long, value_enum)]
    pub store: Option<StoreKind>,

    /// SQLite database URL (overrides CATALOG_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Hosted backend base URL (overrides CATALOG_REST_URL)
    #[arg(long)]
    pub rest_url: Option<String>,

    /// Hosted backend API key (overrides CATALOG_REST_API_KEY)
    #[arg(long)]
    pub rest_api_key: Option<String>,

    /// Base URL public image URLs are built on (overrides CATALOG_STORAGE_PUBLIC_URL)
    #[arg(long)]
    pub storage_public_url: Option<String>,

    /// Storage bucket holding product images (overrides CATALOG_IMAGE_BUCKET)
    #[arg(long)]
    pub image_bucket: Option<String>,

    /// Run migrations and exit
    #[arg(long, conflicts_with = "invoke")]
    pub migrate: bool,

    /// Handle one serverless function event read from stdin and exit
    #[arg(long)]
    pub invoke: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and run mode.
    pub fn from_env_and_args() -> Result<(Self, RunMode)> {
        Self::merge(Args::parse(), |key| env::var(key))
    }

    /// Merge CLI args over values looked up through `lookup`.
    pub fn merge(
        args: Args,
        lookup: impl Fn(&str) -> Result<String, env::VarError>,
    ) -> Result<(Self, RunMode)> {
        let var = |key: &str| -> Result<Option<String>> {
            match lookup(key) {
                Ok(value) => Ok(Some(value)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(err) => Err(err).with_context(|| format!("reading {}", key)),
            }
        };

        // --- Environment fallback ---
        let env_host = var("CATALOG_HOST")?.unwrap_or_else(|| "0.0.0.0".into());
        let env_port = match var("CATALOG_PORT")? {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing CATALOG_PORT value `{}`", value))?,
            None => 3000,
        };
        let env_store = match var("CATALOG_STORE")? {
            Some(value) => StoreKind::from_str(&value, true)
                .map_err(|e| anyhow::anyhow!("parsing CATALOG_STORE value `{}`: {}", value, e))?,
            None => StoreKind::Sqlite,
        };
        let env_db = var("CATALOG_DATABASE_URL")?
            .unwrap_or_else(|| "sqlite://./data/catalog.db".into());

        // --- Merge ---
        let rest_url = args.rest_url.or(var("CATALOG_REST_URL")?);
        let rest_api_key = args.rest_api_key.or(var("CATALOG_REST_API_KEY")?);
        let storage_public_url = args
            .storage_public_url
            .or(var("CATALOG_STORAGE_PUBLIC_URL")?)
            .or_else(|| rest_url.clone())
            .unwrap_or_else(|| "http://localhost:54321".into());
        let image_bucket = args
            .image_bucket
            .or(var("CATALOG_IMAGE_BUCKET")?)
            .unwrap_or_else(|| "product-images".into());

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            store: args.store.unwrap_or(env_store),
            database_url: args.database_url.unwrap_or(env_db),
            rest_url,
            rest_api_key,
            storage_public_url,
            image_bucket,
        };

        if cfg.store == StoreKind::Rest && (cfg.rest_url.is_none() || cfg.rest_api_key.is_none()) {
            bail!("the rest store needs CATALOG_REST_URL and CATALOG_REST_API_KEY");
        }

        let mode = if args.migrate {
            RunMode::Migrate
        } else if args.invoke {
            RunMode::Invoke
        } else {
            RunMode::Serve
        };

        Ok((cfg, mode))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
