//! Common error types for mdfix

use thiserror::Error;

/// Common result type for mdfix operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving configuration
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
