//! Configuration module
//!
//! Everything is read from the process environment (optionally seeded from a
//! `.env` file). Missing bucket, images prefix or store credentials are fatal
//! at startup.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use crate::constants::{DEFAULT_DISPLAY_URL_TTL_SECS, DEFAULT_TEMPLATE_NAME};
use crate::storage_types::{DocumentStoreBackend, StorageBackend};

const SERVER_PORT: u16 = 4000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MIN_SIGNING_SECRET_LEN: usize = 32;
const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Jakarta;

#[derive(Clone, Debug)]
pub struct RecordServiceConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    // Document store
    pub document_store: DocumentStoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Object storage
    pub storage_backend: StorageBackend,
    pub storage_bucket: String,
    pub images_prefix: String,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub storage_signing_secret: Option<String>,
    // Rendering
    pub templates_dir: PathBuf,
    pub default_template: String,
    pub display_timezone: Tz,
    pub display_url_ttl_secs: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<RecordServiceConfig>);

impl Config {
    fn inner(&self) -> &RecordServiceConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production(&self.inner().environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = RecordServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().environment
    }

    pub fn document_store(&self) -> DocumentStoreBackend {
        self.inner().document_store
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().db_timeout_seconds
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn storage_bucket(&self) -> &str {
        &self.inner().storage_bucket
    }

    pub fn images_prefix(&self) -> &str {
        &self.inner().images_prefix
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.inner().aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.inner().local_storage_base_url.as_deref()
    }

    pub fn storage_signing_secret(&self) -> Option<&str> {
        self.inner().storage_signing_secret.as_deref()
    }

    pub fn templates_dir(&self) -> &std::path::Path {
        &self.inner().templates_dir
    }

    pub fn default_template(&self) -> &str {
        &self.inner().default_template
    }

    pub fn display_timezone(&self) -> Tz {
        self.inner().display_timezone
    }

    pub fn display_url_ttl(&self) -> Duration {
        Duration::from_secs(self.inner().display_url_ttl_secs)
    }
}

fn is_production(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_var(name: &str) -> Result<String, anyhow::Error> {
    optional_var(name).ok_or_else(|| anyhow::anyhow!("{} must be set", name))
}

impl RecordServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if is_production(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let storage_bucket = required_var("STORAGE_BUCKET")?;
        let images_prefix = required_var("STORAGE_IMAGES_PREFIX")?
            .trim_matches('/')
            .to_string();
        if images_prefix.is_empty() {
            return Err(anyhow::anyhow!(
                "STORAGE_IMAGES_PREFIX must contain at least one path segment"
            ));
        }

        let storage_backend = match optional_var("STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => StorageBackend::S3,
        };
        let document_store = match optional_var("DOCUMENT_STORE") {
            Some(value) => value.parse()?,
            None => DocumentStoreBackend::Postgres,
        };

        let display_timezone = match optional_var("DISPLAY_TIMEZONE") {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("Invalid DISPLAY_TIMEZONE '{}': {}", name, e))?,
            None => DEFAULT_TIMEZONE,
        };

        Ok(RecordServiceConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .unwrap_or(SERVER_PORT),
            cors_origins,
            environment,
            document_store,
            database_url: optional_var("DATABASE_URL"),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_backend,
            storage_bucket,
            images_prefix,
            s3_region: optional_var("S3_REGION"),
            s3_endpoint: optional_var("S3_ENDPOINT"),
            aws_region: optional_var("AWS_REGION"),
            local_storage_path: optional_var("LOCAL_STORAGE_PATH"),
            local_storage_base_url: optional_var("LOCAL_STORAGE_BASE_URL"),
            storage_signing_secret: optional_var("STORAGE_SIGNING_SECRET"),
            templates_dir: optional_var("TEMPLATES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("templates")),
            default_template: optional_var("DEFAULT_TEMPLATE")
                .unwrap_or_else(|| DEFAULT_TEMPLATE_NAME.to_string()),
            display_timezone,
            display_url_ttl_secs: env::var("DISPLAY_URL_TTL_SECS")
                .unwrap_or_else(|_| DEFAULT_DISPLAY_URL_TTL_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_DISPLAY_URL_TTL_SECS),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.storage_bucket.trim().is_empty() {
            return Err(anyhow::anyhow!("STORAGE_BUCKET must be set"));
        }
        if self.images_prefix.is_empty() || self.images_prefix.contains("..") {
            return Err(anyhow::anyhow!(
                "STORAGE_IMAGES_PREFIX must be a plain relative path"
            ));
        }

        if self.document_store == DocumentStoreBackend::Postgres {
            match self.database_url.as_deref() {
                Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => {}
                Some(_) => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ))
                }
                None => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be set when DOCUMENT_STORE=postgres"
                    ))
                }
            }
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
                match self.storage_signing_secret.as_deref() {
                    Some(secret) if secret.len() >= MIN_SIGNING_SECRET_LEN => {}
                    _ => {
                        return Err(anyhow::anyhow!(
                            "STORAGE_SIGNING_SECRET must be at least {} characters long",
                            MIN_SIGNING_SECRET_LEN
                        ))
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> RecordServiceConfig {
        RecordServiceConfig {
            server_port: SERVER_PORT,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            document_store: DocumentStoreBackend::Memory,
            database_url: None,
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            storage_backend: StorageBackend::Local,
            storage_bucket: "berita-acara".to_string(),
            images_prefix: "images".to_string(),
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: Some("/tmp/acara".to_string()),
            local_storage_base_url: Some("http://localhost:4000/api/v0/storage".to_string()),
            storage_signing_secret: Some("0123456789abcdef0123456789abcdef".to_string()),
            templates_dir: PathBuf::from("templates"),
            default_template: DEFAULT_TEMPLATE_NAME.to_string(),
            display_timezone: DEFAULT_TIMEZONE,
            display_url_ttl_secs: DEFAULT_DISPLAY_URL_TTL_SECS,
        }
    }

    #[test]
    fn test_local_config_validates() {
        assert!(local_config().validate().is_ok());
    }

    #[test]
    fn test_short_signing_secret_rejected() {
        let mut config = local_config();
        config.storage_signing_secret = Some("short".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("STORAGE_SIGNING_SECRET"));
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let mut config = local_config();
        config.document_store = DocumentStoreBackend::Postgres;
        assert!(config.validate().is_err());

        config.database_url = Some("mysql://localhost/db".to_string());
        assert!(config.validate().is_err());

        config.database_url = Some("postgres://localhost/acara".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_s3_requires_region() {
        let mut config = local_config();
        config.storage_backend = StorageBackend::S3;
        assert!(config.validate().is_err());

        config.aws_region = Some("ap-southeast-3".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_getters() {
        let config = Config(Box::new(local_config()));
        assert_eq!(config.images_prefix(), "images");
        assert_eq!(config.display_url_ttl(), Duration::from_secs(3600));
        assert!(!config.is_production());
        assert_eq!(config.display_timezone(), chrono_tz::Asia::Jakarta);
    }
}
