//! Configuration for a [`Context`](crate::context::Context).
//!
//! Configuration is read from TOML. Every key is optional:
//!
//! ```toml
//! # Distance (and angle, in degrees) below which two values are considered equal.
//! tolerance = 1e-9
//! # Prefix of the port names assigned by automatic renaming.
//! port_prefix = "o"
//! ```

use std::path::Path;

use anyhow::{anyhow, Context as _, Result};
use serde::{Deserialize, Serialize};

/// The environment variable pointing to a configuration file.
pub const CONFIG_ENV_VAR: &str = "CELLKIT_CONFIG";

/// The default comparison tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// The default prefix for automatically assigned port names.
pub const DEFAULT_PORT_PREFIX: &str = "o";

/// Context-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Tolerance used when comparing positions, widths, and angles.
    pub tolerance: f64,
    /// Prefix of port names assigned by [`auto_rename_ports`](crate::rename::auto_rename_ports).
    pub port_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            port_prefix: DEFAULT_PORT_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Parses a configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(s).with_context(|| "failed to parse configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration file {path:?}"))?;
        Self::from_toml_str(&s).with_context(|| format!("invalid configuration file {path:?}"))
    }

    /// Reads the file named by [`CONFIG_ENV_VAR`], or returns the default
    /// configuration if the variable is not set.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => {
                tracing::debug!(path = ?path, "loading configuration");
                Self::from_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Checks that all settings are in range.
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.) {
            return Err(anyhow!(
                "tolerance must be positive and finite, got {}",
                self.tolerance
            ));
        }
        if self.port_prefix.is_empty() {
            return Err(anyhow!("port prefix must not be empty"));
        }
        Ok(())
    }
}
