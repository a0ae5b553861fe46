//! Client configuration: schema, discovery and loading.
//!
//! Config is read from `parlor.{toml,yaml,yml,json}` in the working directory
//! or `~/.config/parlor/`, with `${ENV_VAR}` placeholders substituted before
//! parsing and a handful of `PARLOR_*` environment overrides applied after.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{
        apply_env_overrides, clear_config_dir, config_dir, data_dir, discover_and_load,
        load_config, set_config_dir,
    },
    schema::{AuthConfig, ParlorConfig, RealtimeConfig, ServerConfig, StorageConfig, TransportKind},
};
