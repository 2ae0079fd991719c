use std::io;
use thiserror::Error;

use crate::core::exporter::Query;

/// Error type for the exporter
#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Failed to query {query} on device {uuid}: {message}")]
    Query {
        uuid: String,
        query: Query,
        message: String,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Registry error: {0}")]
    Registry(#[from] prometheus::Error),
}

/// Result type alias for the exporter
pub type Result<T> = std::result::Result<T, ExporterError>;

impl ExporterError {
    /// Create an initialization error (NVML init or device enumeration)
    pub fn initialization<S: Into<String>>(msg: S) -> Self {
        ExporterError::Initialization(msg.into())
    }

    /// Create a query error for a single device reading
    pub fn query<U: Into<String>, S: Into<String>>(uuid: U, query: Query, msg: S) -> Self {
        ExporterError::Query {
            uuid: uuid.into(),
            query,
            message: msg.into(),
        }
    }

    /// Create a protocol error (bind, serve, encode)
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        ExporterError::Protocol(msg.into())
    }

    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        ExporterError::Config(msg.into())
    }
}
