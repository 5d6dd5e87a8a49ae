//! Configuration for the battle mediation server.
//!
//! Supports a `config.json` file plus environment-variable overrides, with
//! `BATTLE_PORT`, `LOG_LEVEL`, and `LLM_API_KEY` (spec.md §6) always honoured
//! last regardless of file contents.
//!
//! # Module structure
//! - [`types`]: root [`Config`] struct
//! - [`server`]: timing/threshold settings for rooms and matches
//! - [`ai`]: tier-5 AI (LLM) settings
//! - [`logging`]: log level/format
//! - [`loader`]: [`load`] entry point
//! - [`validation`]: [`validate_config`] sanity checks

pub mod ai;
pub mod defaults;
pub mod loader;
pub mod logging;
pub mod server;
pub mod types;
pub mod validation;

pub use ai::AiConfig;
pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use server::ServerConfig;
pub use types::Config;
pub use validation::{validate_config, ConfigError};
