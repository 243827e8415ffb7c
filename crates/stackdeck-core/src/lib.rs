//! stackdeck-core — shared types and `stackdeck.toml` parsing.

pub mod config;
pub mod error;
pub mod types;

pub use config::StackConfig;
pub use error::{ConfigError, ConfigResult};
pub use types::*;
