//! Centralized error handling for Tabshelf
//!
//! This module provides a unified error type that covers all error scenarios
//! in the application: file I/O, configuration, durable storage, and the
//! network calls made while probing embeddability.

use log::warn;
use std::io;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Custom Result Type Alias
// ─────────────────────────────────────────────────────────────────────────────

/// A specialized `Result` type for the application.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error source used where the underlying error type varies.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// The centralized error type for the application.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // File I/O Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Generic I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failed to write file contents
    #[error("Failed to write '{}': {source}", .path.display())]
    FileWrite { path: PathBuf, source: io::Error },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to load configuration file
    #[error("Failed to load configuration from '{}': {source}", .path.display())]
    ConfigLoad { path: PathBuf, source: BoxedSource },

    /// Failed to save configuration file
    #[error("Failed to save configuration to '{}': {source}", .path.display())]
    ConfigSave { path: PathBuf, source: BoxedSource },

    /// Failed to parse configuration (invalid JSON/format)
    #[error("Invalid configuration format: {message}")]
    ConfigParse { message: String },

    /// Configuration directory not found or inaccessible
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    // ─────────────────────────────────────────────────────────────────────────
    // Storage Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to read a persisted value
    #[error("Failed to read stored value '{key}': {source}")]
    StoreRead { key: String, source: BoxedSource },

    /// Failed to persist a value
    #[error("Failed to write stored value '{key}': {source}")]
    StoreWrite { key: String, source: BoxedSource },

    // ─────────────────────────────────────────────────────────────────────────
    // Network Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// The request could not be completed (DNS, TLS, relay unreachable, timeout)
    #[error("Request to '{url}' failed: {source}")]
    Network { url: String, source: BoxedSource },

    /// The request completed with a non-success status
    #[error("Request to '{url}' returned status {status}")]
    HttpStatus { url: String, status: u16 },

    /// The response body could not be interpreted
    #[error("Unexpected response from '{url}': {message}")]
    InvalidPayload { url: String, message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Application Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Generic application error with a message
    #[error("{0}")]
    Application(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigParse {
            message: err.to_string(),
        }
    }
}

impl Error {
    /// Whether this error came from a network call.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Error::Network { .. } | Error::HttpStatus { .. } | Error::InvalidPayload { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Graceful Degradation Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for Result to support graceful degradation.
pub trait ResultExt<T> {
    /// If the result is an error, log it at warning level and return the provided default.
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T;
}

impl<T> ResultExt<T> for Result<T> {
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                warn!("{}: {}. Using default.", context, err);
                default
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
