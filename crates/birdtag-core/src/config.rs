//! Configuration module
//!
//! Configuration structures for the API and services: server, metadata store,
//! object storage, messaging, detector and notification settings.

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const SIGNED_URL_TTL_SECS: u64 = 3600;
const TRANSIENT_RESULT_TTL_SECS: u64 = 300;
const DETECTOR_TIMEOUT_SECS: u64 = 120;
const CHANGE_FEED_CAPACITY: usize = 1024;
const DEFAULT_TOPIC_PREFIX: &str = "notify-";
const DEFAULT_THUMBNAIL_PREFIX: &str = "thumbnails/";
const DEFAULT_THUMBNAIL_SUFFIX: &str = "-thumb";

/// Where media records, subscriptions and transient results are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataBackend {
    Postgres,
    Memory,
}

impl FromStr for MetadataBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(MetadataBackend::Postgres),
            "memory" => Ok(MetadataBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid metadata backend: {}", s)),
        }
    }
}

impl fmt::Display for MetadataBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataBackend::Postgres => write!(f, "postgres"),
            MetadataBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Where subscription topics live and notifications are published
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagingBackend {
    Sns,
    Log,
}

impl FromStr for MessagingBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sns" => Ok(MessagingBackend::Sns),
            "log" => Ok(MessagingBackend::Log),
            _ => Err(anyhow::anyhow!("Invalid messaging backend: {}", s)),
        }
    }
}

impl fmt::Display for MessagingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessagingBackend::Sns => write!(f, "sns"),
            MessagingBackend::Log => write!(f, "log"),
        }
    }
}

/// Base configuration shared by every binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
}

/// Tag index configuration
#[derive(Clone, Debug)]
pub struct BirdTagConfig {
    pub base: BaseConfig,
    pub metadata_backend: MetadataBackend,
    pub database_url: Option<String>,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub signed_url_ttl_secs: u64,
    pub thumbnail_prefix: String,
    pub thumbnail_suffix: String,
    // Messaging configuration
    pub messaging_backend: MessagingBackend,
    pub aws_account_id: Option<String>,
    pub topic_prefix: String,
    pub change_feed_capacity: usize,
    // Detection / upload matching
    pub detector_url: Option<String>,
    pub detector_timeout_secs: u64,
    pub transient_result_ttl_secs: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<BirdTagConfig>);

impl Config {
    fn inner(&self) -> &BirdTagConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = BirdTagConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn metadata_backend(&self) -> MetadataBackend {
        self.inner().metadata_backend
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    /// Region used for S3 signing and public URLs (S3_REGION wins over AWS_REGION)
    pub fn s3_region(&self) -> Option<&str> {
        self.inner()
            .s3_region
            .as_deref()
            .or(self.inner().aws_region.as_deref())
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

    pub fn signed_url_ttl_secs(&self) -> u64 {
        self.inner().signed_url_ttl_secs
    }

    pub fn thumbnail_prefix(&self) -> &str {
        &self.inner().thumbnail_prefix
    }

    pub fn thumbnail_suffix(&self) -> &str {
        &self.inner().thumbnail_suffix
    }

    pub fn messaging_backend(&self) -> MessagingBackend {
        self.inner().messaging_backend
    }

    pub fn aws_account_id(&self) -> Option<&str> {
        self.inner().aws_account_id.as_deref()
    }

    pub fn topic_prefix(&self) -> &str {
        &self.inner().topic_prefix
    }

    pub fn change_feed_capacity(&self) -> usize {
        self.inner().change_feed_capacity
    }

    pub fn detector_url(&self) -> Option<&str> {
        self.inner().detector_url.as_deref()
    }

    pub fn detector_timeout_secs(&self) -> u64 {
        self.inner().detector_timeout_secs
    }

    pub fn transient_result_ttl_secs(&self) -> u64 {
        self.inner().transient_result_ttl_secs
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl BirdTagConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env_parse("PORT", 3000),
            cors_origins,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_parse("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            environment,
        };

        let metadata_backend = match env_opt("METADATA_BACKEND") {
            Some(value) => value.parse::<MetadataBackend>()?,
            None => MetadataBackend::Postgres,
        };

        let storage_backend = match env_opt("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::S3,
        };

        let messaging_backend = match env_opt("MESSAGING_BACKEND") {
            Some(value) => value.parse::<MessagingBackend>()?,
            None => MessagingBackend::Sns,
        };

        Ok(BirdTagConfig {
            base,
            metadata_backend,
            database_url: env_opt("DATABASE_URL"),
            storage_backend,
            s3_region: env_opt("S3_REGION"),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            aws_region: env_opt("AWS_REGION"),
            local_storage_path: env_opt("LOCAL_STORAGE_PATH"),
            local_storage_base_url: env_opt("LOCAL_STORAGE_BASE_URL"),
            signed_url_ttl_secs: env_parse("SIGNED_URL_TTL_SECS", SIGNED_URL_TTL_SECS),
            thumbnail_prefix: env::var("THUMBNAIL_PREFIX")
                .unwrap_or_else(|_| DEFAULT_THUMBNAIL_PREFIX.to_string()),
            thumbnail_suffix: env::var("THUMBNAIL_SUFFIX")
                .unwrap_or_else(|_| DEFAULT_THUMBNAIL_SUFFIX.to_string()),
            messaging_backend,
            aws_account_id: env_opt("AWS_ACCOUNT_ID"),
            topic_prefix: env::var("TOPIC_PREFIX")
                .unwrap_or_else(|_| DEFAULT_TOPIC_PREFIX.to_string()),
            change_feed_capacity: env_parse("CHANGE_FEED_CAPACITY", CHANGE_FEED_CAPACITY),
            detector_url: env_opt("DETECTOR_URL"),
            detector_timeout_secs: env_parse("DETECTOR_TIMEOUT_SECS", DETECTOR_TIMEOUT_SECS),
            transient_result_ttl_secs: env_parse(
                "TRANSIENT_RESULT_TTL_SECS",
                TRANSIENT_RESULT_TTL_SECS,
            ),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.metadata_backend == MetadataBackend::Postgres {
            match self.database_url.as_deref() {
                Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => {}
                _ => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string when METADATA_BACKEND=postgres"
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
            }
        }

        if self.messaging_backend == MessagingBackend::Sns && self.aws_account_id.is_none() {
            return Err(anyhow::anyhow!(
                "AWS_ACCOUNT_ID must be set when using the SNS messaging backend"
            ));
        }

        if self.topic_prefix.is_empty() {
            return Err(anyhow::anyhow!("TOPIC_PREFIX must not be empty"));
        }

        if self.thumbnail_prefix.is_empty() && self.thumbnail_suffix.is_empty() {
            return Err(anyhow::anyhow!(
                "THUMBNAIL_PREFIX and THUMBNAIL_SUFFIX cannot both be empty"
            ));
        }

        if self.change_feed_capacity == 0 {
            return Err(anyhow::anyhow!("CHANGE_FEED_CAPACITY must be greater than 0"));
        }

        if self.signed_url_ttl_secs == 0 || self.transient_result_ttl_secs == 0 {
            return Err(anyhow::anyhow!(
                "SIGNED_URL_TTL_SECS and TRANSIENT_RESULT_TTL_SECS must be greater than 0"
            ));
        }

        Ok(())
    }
}
