//! Configuration module for prism.
//!
//! Handles the TOML settings file and its defaults.

mod settings;

pub use settings::{
    AuthorizationSettings, BackendSettings, GeoSettings, LimitSettings, Settings, SettingsError,
    CONFIG_ENV_VAR,
};
