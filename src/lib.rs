//! Streaming song matcher
//!
//! Loads a song catalog from object storage once, then joins every micro-batch
//! of user preference events from Kafka against it by exact
//! `(genre, artist, language)` equality.

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod services;

pub use config::{Config, DecodePolicy, OffsetReset};
pub use context::PipelineContext;
pub use error::{AppError, AppResult, LoadError};
