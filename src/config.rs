use anyhow::{Context, Result};
use clap::Parser;
use std::env;
use std::fmt;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageConfig,
    /// Build the listing cache at startup instead of on first request.
    pub warm_cache: bool,
}

/// Everything the object-storage client needs.
///
/// The bucket is optional on purpose: the process boots without storage
/// configured and only fails when a gallery request actually needs it.
#[derive(Clone)]
pub struct StorageConfig {
    pub region: String,
    pub bucket: Option<String>,
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    /// Lifetime of presigned URLs, in seconds.
    pub presign_expiration: u64,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Photography studio gallery API")]
pub struct Args {
    /// Host to bind to (overrides GALLERY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GALLERY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Storage region (overrides GALLERY_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Bucket holding the gallery images (overrides GALLERY_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Custom storage endpoint (overrides GALLERY_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Use path-style addressing against the endpoint
    #[arg(long)]
    pub force_path_style: bool,

    /// Presigned URL lifetime in seconds (overrides GALLERY_PRESIGN_EXPIRATION)
    #[arg(long)]
    pub presign_expiration: Option<u64>,

    /// Build the listing cache before serving
    #[arg(long)]
    pub warm_cache: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::merge(Args::parse())
    }

    fn merge(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("GALLERY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("GALLERY_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing GALLERY_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading GALLERY_PORT"),
        };
        let env_region = env::var("GALLERY_REGION").unwrap_or_else(|_| "us-east-1".into());
        let env_bucket = env::var("GALLERY_BUCKET").ok().filter(|v| !v.is_empty());
        let env_endpoint = env::var("GALLERY_ENDPOINT").ok().filter(|v| !v.is_empty());
        let env_path_style = env::var("GALLERY_FORCE_PATH_STYLE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let env_expiration = match env::var("GALLERY_PRESIGN_EXPIRATION") {
            Ok(value) => Some(value.parse::<u64>().with_context(|| {
                format!("parsing GALLERY_PRESIGN_EXPIRATION value `{}`", value)
            })?),
            Err(_) => None,
        };

        // Credentials come from the standard variables only; no CLI flags.
        let access_key_id = env::var("AWS_ACCESS_KEY_ID").ok().filter(|v| !v.is_empty());
        let secret_access_key = env::var("AWS_SECRET_ACCESS_KEY")
            .ok()
            .filter(|v| !v.is_empty());

        // --- Merge ---
        let storage = StorageConfig {
            region: args.region.unwrap_or(env_region),
            bucket: args.bucket.or(env_bucket),
            endpoint: args.endpoint.or(env_endpoint),
            force_path_style: args.force_path_style || env_path_style,
            presign_expiration: args
                .presign_expiration
                .or(env_expiration)
                .unwrap_or(StorageConfig::DEFAULT_PRESIGN_EXPIRATION),
            access_key_id,
            secret_access_key,
        };

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage,
            warm_cache: args.warm_cache,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl StorageConfig {
    pub const DEFAULT_PRESIGN_EXPIRATION: u64 = 900;
}

// The config is logged at startup; the secret key must never reach the logs.
impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("force_path_style", &self.force_path_style)
            .field("presign_expiration", &self.presign_expiration)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
