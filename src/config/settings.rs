//! TOML-based configuration for prism.
//!
//! Example configuration:
//! ```toml
//! [limits]
//! max_depth = 16
//! max_width = 500
//!
//! [authorization]
//! missing_dimension = "unconstrained"   # drop | unconstrained | deny
//!
//! [geo]
//! dimensions = ["country", "region", "district"]
//!
//! [backend]
//! field_dimension = "field"
//! dialect = "postgres"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::Dialect;
use crate::filter::{
    CompileOptions, DeserializeLimits, FilterRegistry, DEFAULT_FIELD_DIMENSION, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_WIDTH,
};
use crate::permission::MissingDimensionPolicy;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "PRISM_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Bounds applied while decoding wire filters.
    pub limits: LimitSettings,

    /// How grants and query needs are combined.
    pub authorization: AuthorizationSettings,

    /// Geographic hierarchy used for map boundaries.
    pub geo: GeoSettings,

    /// Filter compilation target.
    pub backend: BackendSettings,
}

/// Deserialization limits.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Maximum nesting depth of a filter tree.
    pub max_depth: usize,

    /// Maximum number of children or set values per node.
    pub max_width: usize,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_width: DEFAULT_MAX_WIDTH,
        }
    }
}

/// How grant sets from different sources are intersected.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthorizationSettings {
    /// Dimensions only some grant sets mention.
    pub missing_dimension: MissingDimensionPolicy,
}

impl Default for AuthorizationSettings {
    fn default() -> Self {
        Self {
            missing_dimension: MissingDimensionPolicy::Unconstrained,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeoSettings {
    /// Geographic dimensions, coarsest first.
    pub dimensions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Dimension that field identifiers compile onto.
    pub field_dimension: String,

    /// SQL dialect for rendered predicates.
    pub dialect: Dialect,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            field_dimension: DEFAULT_FIELD_DIMENSION.to_string(),
            dialect: Dialect::default(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `PRISM_CONFIG`
    /// 2. `./prism.toml`
    /// 3. `<config dir>/prism/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("prism.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("prism").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.limits.max_depth == 0 {
            return Err(SettingsError::InvalidConfig(
                "limits.max_depth must be at least 1".to_string(),
            ));
        }
        if self.limits.max_width == 0 {
            return Err(SettingsError::InvalidConfig(
                "limits.max_width must be at least 1".to_string(),
            ));
        }
        if self.backend.field_dimension.is_empty() {
            return Err(SettingsError::InvalidConfig(
                "backend.field_dimension must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn deserialize_limits(&self) -> DeserializeLimits {
        DeserializeLimits {
            max_depth: self.limits.max_depth,
            max_width: self.limits.max_width,
        }
    }

    /// The standard registry bounded by the configured limits.
    pub fn registry(&self) -> FilterRegistry {
        FilterRegistry::standard().with_limits(self.deserialize_limits())
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions::default().with_field_dimension(self.backend.field_dimension.clone())
    }
}
