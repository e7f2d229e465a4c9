//! Configuration file support for bgadvise.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/bgadvise/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub targets: Targets,

    #[serde(default)]
    pub titration: TitrationConfig,
}

/// Glycaemic targets in mmol/L used by the titration engine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Targets {
    #[serde(default = "default_fasting_low")]
    pub fasting_low: f64,

    #[serde(default = "default_fasting_high")]
    pub fasting_high: f64,

    /// Post-prandial ceiling for the afternoon/evening window
    #[serde(default = "default_pp_high")]
    pub pp_high: f64,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            fasting_low: default_fasting_low(),
            fasting_high: default_fasting_high(),
            pp_high: default_pp_high(),
        }
    }
}

/// Titration engine parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TitrationConfig {
    /// Number of most recent calendar days considered
    #[serde(default = "default_lookback_days")]
    pub lookback_days: usize,
}

impl Default for TitrationConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
        }
    }
}

// Default value functions
fn default_fasting_low() -> f64 {
    4.0
}

fn default_fasting_high() -> f64 {
    8.0
}

fn default_pp_high() -> f64 {
    11.0
}

fn default_lookback_days() -> usize {
    3
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        match Self::default_config_path() {
            Some(config_path) if config_path.exists() => Self::load_from(&config_path),
            other => {
                tracing::info!("No config file found at {:?}, using defaults", other);
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    ///
    /// `None` when the platform has no config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|base| base.join("bgadvise").join("config.toml"))
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check targets and titration parameters for sanity
    pub fn validate(&self) -> Result<()> {
        let t = &self.targets;
        for (name, value) in [
            ("fasting_low", t.fasting_low),
            ("fasting_high", t.fasting_high),
            ("pp_high", t.pp_high),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Config(format!(
                    "targets.{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        if t.fasting_low >= t.fasting_high {
            return Err(Error::Config(format!(
                "targets.fasting_low ({}) must be below targets.fasting_high ({})",
                t.fasting_low, t.fasting_high
            )));
        }

        if self.titration.lookback_days == 0 {
            return Err(Error::Config(
                "titration.lookback_days must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.targets.fasting_low, 4.0);
        assert_eq!(config.targets.fasting_high, 8.0);
        assert_eq!(config.targets.pp_high, 11.0);
        assert_eq!(config.titration.lookback_days, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[targets]
fasting_high = 7.0
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.targets.fasting_high, 7.0);
        assert_eq!(config.targets.pp_high, 11.0); // default
        assert_eq!(config.titration.lookback_days, 3); // default
    }

    #[test]
    fn test_inverted_fasting_range_rejected() {
        let mut config = Config::default();
        config.targets.fasting_low = 9.0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("fasting_low"));
    }

    #[test]
    fn test_zero_lookback_rejected() {
        let mut config = Config::default();
        config.titration.lookback_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.titration.lookback_days = 5;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.titration.lookback_days, 5);
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[targets]\npp_high = -1.0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
