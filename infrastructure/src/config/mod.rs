//! Configuration file loading for xpilot
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `XPILOT_*` environment variables (`__` separates nested keys)
//! 2. `--config <path>` specified file
//! 3. Project root: `./xpilot.toml` or `./.xpilot.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/xpilot/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigIssue, FileConfig, FileEndpointConfig, FileLlmConfig, FileLoggingConfig,
    FileProvidersConfig, FileReviewConfig, Severity,
};
pub use loader::{ConfigError, ConfigLoader};
