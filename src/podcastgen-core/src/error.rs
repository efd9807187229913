//! Error types for the podcast pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PodcastError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot sequence podcast: {0}")]
    Structure(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("Mixing failed: {0}")]
    Mixing(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Unsupported publication service: {0}")]
    UnsupportedService(String),

    #[error("Weather lookup failed: {0}")]
    Weather(String),

    #[error("Content ingestion failed: {0}")]
    Ingestion(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
