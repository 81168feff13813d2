//! Agent configuration persistence.
//!
//! The persisted model itself lives in `dk_protocol::config_models`; this
//! module handles reading and writing it as `config.json`.

pub mod error;
pub mod loader;

pub use error::ConfigError;
pub use error::ConfigResult;
pub use loader::load_config;
pub use loader::save_config;
