use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// What the decoder does with a payload that is not a JSON object
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Emit an event with every field null; it flows downstream and matches nothing
    #[default]
    NullFill,
    /// Skip the record entirely
    Drop,
}

/// Where a consumer group without committed offsets starts reading
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OffsetReset {
    Earliest,
    #[default]
    Latest,
}

impl OffsetReset {
    pub fn as_str(&self) -> &'static str {
        match self {
            OffsetReset::Earliest => "earliest",
            OffsetReset::Latest => "latest",
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// S3-compatible object store endpoint
    #[serde(default = "default_s3_endpoint")]
    pub s3_endpoint: String,

    /// Bucket holding the song catalog
    #[serde(default = "default_s3_bucket")]
    pub s3_bucket: String,

    /// Object key of the catalog CSV inside the bucket
    #[serde(default = "default_catalog_key")]
    pub catalog_key: String,

    #[serde(default = "default_minio_credential")]
    pub s3_access_key: String,

    #[serde(default = "default_minio_credential")]
    pub s3_secret_key: String,

    #[serde(default = "default_s3_region")]
    pub s3_region: String,

    /// Kafka bootstrap address
    #[serde(default = "default_kafka_bootstrap_servers")]
    pub kafka_bootstrap_servers: String,

    /// Topic carrying user preference events
    #[serde(default = "default_kafka_topic")]
    pub kafka_topic: String,

    #[serde(default = "default_kafka_group_id")]
    pub kafka_group_id: String,

    #[serde(default)]
    pub kafka_offset_reset: OffsetReset,

    /// How long the broker check at subscribe may wait for metadata
    #[serde(default = "default_kafka_metadata_timeout_ms")]
    pub kafka_metadata_timeout_ms: u64,

    /// Longest time a micro-batch stays open after its first message
    #[serde(default = "default_trigger_interval_ms")]
    pub trigger_interval_ms: u64,

    /// Message count that closes a micro-batch early
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Matching rows printed per event
    #[serde(default = "default_display_limit")]
    pub display_limit: usize,

    #[serde(default)]
    pub decode_policy: DecodePolicy,

    #[serde(default = "default_status_api_enabled")]
    pub status_api_enabled: bool,

    /// Status API host address
    #[serde(default = "default_host")]
    pub status_host: String,

    /// Status API port
    #[serde(default = "default_port")]
    pub status_port: u16,
}

fn default_s3_endpoint() -> String {
    "http://minio:9000".to_string()
}

fn default_s3_bucket() -> String {
    "music-data".to_string()
}

fn default_catalog_key() -> String {
    "Music Info.csv".to_string()
}

fn default_minio_credential() -> String {
    "minioadmin".to_string()
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

fn default_kafka_bootstrap_servers() -> String {
    "kafka:9092".to_string()
}

fn default_kafka_topic() -> String {
    "user-preference".to_string()
}

fn default_kafka_group_id() -> String {
    "song-recommender".to_string()
}

fn default_kafka_metadata_timeout_ms() -> u64 {
    10_000
}

fn default_trigger_interval_ms() -> u64 {
    1000
}

fn default_max_batch_size() -> usize {
    500
}

fn default_display_limit() -> usize {
    5
}

fn default_status_api_enabled() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the driver cannot run with
    pub fn validate(&self) -> AppResult<()> {
        if self.max_batch_size == 0 {
            return Err(AppError::Config(
                "MAX_BATCH_SIZE must be greater than zero".to_string(),
            ));
        }
        if self.trigger_interval_ms == 0 {
            return Err(AppError::Config(
                "TRIGGER_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }
        if self.kafka_topic.trim().is_empty() {
            return Err(AppError::Config("KAFKA_TOPIC cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn trigger_interval(&self) -> Duration {
        Duration::from_millis(self.trigger_interval_ms)
    }

    pub fn kafka_metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.kafka_metadata_timeout_ms)
    }

    pub fn status_addr(&self) -> String {
        format!("{}:{}", self.status_host, self.status_port)
    }
}
