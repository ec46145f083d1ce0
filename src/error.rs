//! Error types for schema loading and content seeding.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading a schema registry.
#[derive(Debug, Error)]
pub enum SchemaError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid schema in {path}: {source}")]
    InvalidSchemaFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("not a project directory: {path} has neither src/api nor src/components")]
    NotAProject { path: PathBuf },
}

impl SchemaError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SchemaError::FileNotFound { .. } | SchemaError::ReadError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors while talking to the content API during seeding.
#[cfg(feature = "remote")]
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {collection} failed: {status} {body}")]
    Status {
        method: &'static str,
        collection: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    #[error(transparent)]
    Manifest(#[from] SchemaError),
}

#[cfg(feature = "remote")]
impl SeedError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SeedError::Network { .. } => 3,
            SeedError::Manifest(e) => e.exit_code(),
            _ => 1,
        }
    }
}
