//! Configuration and environment selection.
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;

/// ZATCA environment the credentials were issued for.
///
/// The environment selects the certificate template name embedded in CSRs and decides whether
/// degraded certificate handling (sandbox issuer/serial fallback, missing CA signature) is
/// tolerated.
/// - Sandbox: what ZATCA calls the "Developer Portal" or "Integration Sandbox".
/// - Simulation: the "Simulation Test Environment" taxpayers onboard to before going live.
/// - Production: the live environment. Never degrades.
///
/// # Examples
/// ```rust
/// use std::str::FromStr;
/// use zatca_core::config::EnvironmentType;
///
/// let env = EnvironmentType::from_str("simulation")?;
/// assert_eq!(env, EnvironmentType::Simulation);
/// # Ok::<(), zatca_core::config::EnvironmentParseError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentType {
    #[default]
    Sandbox,
    Simulation,
    Production,
}

/// Error returned when parsing an [`EnvironmentType`] from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvironmentParseError {
    #[error("invalid environment type: {input}")]
    Invalid { input: String },
}

impl FromStr for EnvironmentType {
    type Err = EnvironmentParseError;
    fn from_str(env: &str) -> Result<EnvironmentType, EnvironmentParseError> {
        match env.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "non_production" | "developer-portal" => Ok(EnvironmentType::Sandbox),
            "simulation" => Ok(EnvironmentType::Simulation),
            "production" => Ok(EnvironmentType::Production),
            _ => Err(EnvironmentParseError::Invalid {
                input: env.to_string(),
            }),
        }
    }
}

impl EnvironmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentType::Sandbox => "sandbox",
            EnvironmentType::Simulation => "simulation",
            EnvironmentType::Production => "production",
        }
    }

    /// Certificate template name carried by the `1.3.6.1.4.1.311.20.2` CSR extension.
    pub const fn template_name(&self) -> &'static str {
        match self {
            EnvironmentType::Production => "ZATCA-Code-Signing",
            EnvironmentType::Sandbox | EnvironmentType::Simulation => "TSTZATCA-Code-Signing",
        }
    }

    /// Whether certificate problems may fall back to sandbox defaults instead of failing.
    pub const fn allows_degraded_certificates(&self) -> bool {
        !matches!(self, EnvironmentType::Production)
    }
}

impl std::fmt::Display for EnvironmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime configuration for the subprocess-backed providers.
///
/// # Examples
/// ```rust
/// use zatca_core::config::{Config, EnvironmentType};
///
/// let config = Config::new(EnvironmentType::Sandbox).with_openssl_path("/usr/bin/openssl");
/// assert_eq!(config.openssl_path().to_str(), Some("/usr/bin/openssl"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    env: EnvironmentType,
    openssl_path: PathBuf,
    temp_root: PathBuf,
}

impl Config {
    pub const ENV_ENVIRONMENT: &'static str = "ZATCA_ENVIRONMENT";
    pub const ENV_OPENSSL_PATH: &'static str = "ZATCA_OPENSSL_PATH";
    pub const ENV_TEMP_DIR: &'static str = "ZATCA_TEMP_DIR";

    pub fn new(env: EnvironmentType) -> Self {
        Self {
            env,
            ..Self::default()
        }
    }

    /// Build a configuration from `ZATCA_*` environment variables, defaulting anything unset.
    ///
    /// # Errors
    /// Returns [`EnvironmentParseError`] if `ZATCA_ENVIRONMENT` holds an unknown value.
    pub fn from_env() -> Result<Self, EnvironmentParseError> {
        let mut config = Self::default();
        if let Ok(env) = std::env::var(Self::ENV_ENVIRONMENT) {
            config.env = env.parse()?;
        }
        if let Some(path) = std::env::var_os(Self::ENV_OPENSSL_PATH) {
            config.openssl_path = PathBuf::from(path);
        }
        if let Some(path) = std::env::var_os(Self::ENV_TEMP_DIR) {
            config.temp_root = PathBuf::from(path);
        }
        Ok(config)
    }

    pub fn with_openssl_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.openssl_path = path.into();
        self
    }

    pub fn with_temp_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.temp_root = path.into();
        self
    }

    pub fn env(&self) -> EnvironmentType {
        self.env
    }

    pub fn openssl_path(&self) -> &Path {
        &self.openssl_path
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            env: EnvironmentType::Sandbox,
            openssl_path: PathBuf::from("openssl"),
            temp_root: std::env::temp_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_environment_aliases() {
        assert_eq!(
            "non_production".parse::<EnvironmentType>(),
            Ok(EnvironmentType::Sandbox)
        );
        assert_eq!(
            " Production ".parse::<EnvironmentType>(),
            Ok(EnvironmentType::Production)
        );
        assert!(matches!(
            "staging".parse::<EnvironmentType>(),
            Err(EnvironmentParseError::Invalid { .. })
        ));
    }

    #[test]
    fn template_name_depends_on_production_only() {
        assert_eq!(
            EnvironmentType::Production.template_name(),
            "ZATCA-Code-Signing"
        );
        assert_eq!(
            EnvironmentType::Sandbox.template_name(),
            "TSTZATCA-Code-Signing"
        );
        assert_eq!(
            EnvironmentType::Simulation.template_name(),
            "TSTZATCA-Code-Signing"
        );
    }

    #[test]
    fn production_never_degrades() {
        assert!(!EnvironmentType::Production.allows_degraded_certificates());
        assert!(EnvironmentType::Sandbox.allows_degraded_certificates());
        assert!(EnvironmentType::Simulation.allows_degraded_certificates());
    }
}
