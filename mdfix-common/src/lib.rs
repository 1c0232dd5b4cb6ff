//! # mdfix Common Library
//!
//! Shared code for the mdfix tagging tools:
//! - Error type used by configuration loading
//! - Configuration loading (TOML, environment, command line)
//! - Progress event types reported by the tagging pipeline

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::Progress;
