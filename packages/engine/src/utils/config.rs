// packages/engine/src/utils/config.rs
//! Engine configuration
//!
//! Configuration is layered with the `config` crate:
//!
//! 1. Built-in defaults
//! 2. Optional config file (TOML, JSON or YAML, chosen by extension)
//! 3. Environment variables, e.g. `SRPROXY__MODULE__TARGET_PACKAGE`

use crate::utils::errors::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SRPROXY";

/// Package the module attaches to unless configured otherwise
pub const DEFAULT_TARGET_PACKAGE: &str = "com.miHoYo.hkrpgcb";

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub module: ModuleConfig,
    pub settings: SettingsConfig,
    pub trust: TrustConfig,
    pub logging: LoggingConfig,
}

/// Which process the module attaches to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Package name of the target application
    pub target_package: String,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            target_package: DEFAULT_TARGET_PACKAGE.to_string(),
        }
    }
}

impl ModuleConfig {
    /// Exact package-name comparison
    pub fn should_attach(&self, package: &str) -> bool {
        self.target_package == package
    }
}

/// Location of the persisted override settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub path: PathBuf,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("serverConfig.json"),
        }
    }
}

/// Trust override installation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Install the certificate-validation bypass at attach time
    pub install: bool,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self { install: true }
    }
}

/// Logging output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from defaults and environment only
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering an optional file under the environment
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            debug!("Loading configuration file {:?}", path);
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Render the defaults as TOML-style text for `--print-config`
    pub fn example() -> String {
        let defaults = Self::default();
        format!(
            "[module]\ntarget_package = \"{}\"\n\n[settings]\npath = \"{}\"\n\n[trust]\ninstall = {}\n\n[logging]\nlevel = \"{}\"\njson = {}\n",
            defaults.module.target_package,
            defaults.settings.path.display(),
            defaults.trust.install,
            defaults.logging.level,
            defaults.logging.json,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.module.target_package, DEFAULT_TARGET_PACKAGE);
        assert!(config.trust.install);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_should_attach_is_exact() {
        let module = ModuleConfig::default();
        assert!(module.should_attach("com.miHoYo.hkrpgcb"));
        assert!(!module.should_attach("com.mihoyo.hkrpgcb"));
        assert!(!module.should_attach("com.miHoYo.hkrpgcb.extra"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[module]\ntarget_package = \"org.example.app\"\n\n[trust]\ninstall = false\n"
        )
        .unwrap();

        let config = EngineConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(config.module.target_package, "org.example.app");
        assert!(!config.trust.install);
        // Unspecified sections keep their defaults
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_example_parses() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", EngineConfig::example()).unwrap();

        let config = EngineConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = EngineConfig::load_from(Some(Path::new("/nonexistent/srproxy.toml")));
        assert!(result.is_err());
    }
}
