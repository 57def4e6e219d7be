//! Song catalog loading
//!
//! The catalog is a CSV object in an S3-compatible store (MinIO in the demo
//! deployment). Only the five catalog columns are kept; anything else in the
//! file is ignored.

use std::sync::Arc;

use bytes::Bytes;
use object_store::{aws::AmazonS3Builder, path::Path, ObjectStore};
use tracing::instrument;

use crate::{
    config::Config,
    error::LoadError,
    models::{Catalog, CatalogEntry, CATALOG_COLUMNS},
};

/// Trait for catalog storage backends
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the raw catalog object
    async fn fetch(&self) -> Result<Bytes, LoadError>;

    /// Human-readable location for logging
    fn describe(&self) -> String;
}

/// Reads the catalog from any [`ObjectStore`]
pub struct ObjectStoreCatalogSource {
    store: Arc<dyn ObjectStore>,
    location: Path,
    label: String,
}

impl ObjectStoreCatalogSource {
    pub fn new(store: Arc<dyn ObjectStore>, key: &str) -> Self {
        Self {
            store,
            location: Path::from(key),
            label: key.to_string(),
        }
    }

    /// Builds a path-style S3 client from configuration
    pub fn from_config(config: &Config) -> Result<Self, LoadError> {
        if config.s3_bucket.trim().is_empty() {
            return Err(LoadError::Config("S3_BUCKET cannot be empty".to_string()));
        }

        let store = AmazonS3Builder::new()
            .with_endpoint(&config.s3_endpoint)
            .with_bucket_name(&config.s3_bucket)
            .with_region(&config.s3_region)
            .with_access_key_id(&config.s3_access_key)
            .with_secret_access_key(&config.s3_secret_key)
            .with_virtual_hosted_style_request(false)
            .with_allow_http(config.s3_endpoint.starts_with("http://"))
            .build()
            .map_err(|e| LoadError::Config(e.to_string()))?;

        let mut source = Self::new(Arc::new(store), &config.catalog_key);
        source.label = format!(
            "s3://{}/{} via {}",
            config.s3_bucket, config.catalog_key, config.s3_endpoint
        );
        Ok(source)
    }
}

#[async_trait::async_trait]
impl CatalogSource for ObjectStoreCatalogSource {
    async fn fetch(&self) -> Result<Bytes, LoadError> {
        let result = self.store.get(&self.location).await?;
        Ok(result.bytes().await?)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Fetches and parses the catalog
#[instrument(skip_all, fields(source = %source.describe()))]
pub async fn load_catalog(source: &dyn CatalogSource) -> Result<Catalog, LoadError> {
    let data = source.fetch().await?;
    let entries = parse_catalog(&data)?;
    let rows = entries.len();

    let (catalog, duplicates) = Catalog::from_entries(entries);
    if duplicates > 0 {
        tracing::warn!(duplicates, "Catalog rows share a track_id; all are kept");
    }
    if catalog.is_empty() {
        tracing::warn!("Catalog has no entries; no preference will match");
    }

    tracing::info!(rows, entries = catalog.len(), "Catalog loaded");
    Ok(catalog)
}

/// Parses CSV text with a header row into catalog entries
pub fn parse_catalog(data: &[u8]) -> Result<Vec<CatalogEntry>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let mut positions = [0usize; 5];
    let mut missing = Vec::new();

    for (slot, column) in positions.iter_mut().zip(CATALOG_COLUMNS) {
        match headers.iter().position(|h| h.trim() == column) {
            Some(index) => *slot = index,
            None => missing.push(column.to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }

    let mut entries = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let field = |index: usize| {
            record.get(positions[index]).map(str::to_string).ok_or_else(|| {
                LoadError::Malformed(format!(
                    "row {} has {} fields, expected column {}",
                    row + 1,
                    record.len(),
                    CATALOG_COLUMNS[index]
                ))
            })
        };

        entries.push(CatalogEntry {
            track_id: field(0)?,
            track_name: field(1)?,
            artist_name: field(2)?,
            genre: field(3)?,
            language: field(4)?,
        });
    }

    Ok(entries)
}
