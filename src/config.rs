use crate::error::ConfigError;
use crate::format::{DecimalPolicy, Grouping};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const MAX_PAGES: usize = 9;
pub const MAX_RATES: usize = 3;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ledger: LedgerConfig,
    pub tax: TaxConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub pages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxConfig {
    pub default_rate: f64,
    pub rates: Vec<f64>,
    pub gst_mode: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub decimals: DecimalPolicy,
    pub grouping: Grouping,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { pages: 4 }
    }
}

impl Default for TaxConfig {
    fn default() -> Self {
        Self {
            default_rate: 18.0,
            rates: vec![5.0, 18.0, 40.0],
            gst_mode: false,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
            })
            .join("tabcalc")
    }

    /// Load config from the default location, or return defaults if not found
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`. A missing or broken file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        let mut config = if path.exists() {
            match Self::read(path) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded config");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "using default config");
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.validate();
        config
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate and clamp config values to acceptable ranges
    fn validate(&mut self) {
        self.ledger.pages = self.ledger.pages.clamp(1, MAX_PAGES);

        self.tax.rates.retain(|r| r.is_finite() && *r >= 0.0);
        self.tax.rates.truncate(MAX_RATES);
        if self.tax.rates.is_empty() {
            self.tax.rates = TaxConfig::default().rates;
        }
        if !self.tax.default_rate.is_finite() || self.tax.default_rate < 0.0 {
            self.tax.default_rate = TaxConfig::default().default_rate;
        }

        if let DecimalPolicy::Fixed(places) = self.display.decimals {
            self.display.decimals = DecimalPolicy::Fixed(places.min(10));
        }
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn format(&self, value: f64) -> String {
        crate::format::format_number(value, self.display.decimals, self.display.grouping)
    }
}
