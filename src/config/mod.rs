//! Viewer configuration
//!
//! Three layers, later layers winning:
//! 1. Built-in defaults
//! 2. Config file (TOML), if given
//! 3. CLI flags

mod defaults;
mod merge;
mod viewer;

pub use defaults::BuiltinDefaults;
pub use merge::{deep_merge, merge_layers};
pub use viewer::{
    ConfigError, ConfigOrigin, ConfigSource, FetchSettings, LoadedConfig, RenderSettings,
    ViewerConfig,
};
