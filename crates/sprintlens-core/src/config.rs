//! TOML-based engine configuration.
//!
//! Tunes the thresholds the reports use:
//! - Forecast deadline derivation (offset and target weekday)
//! - Deadline bucket horizons
//! - Throughput percentiles and percentile method
//! - Estimation accuracy tolerance
//!
//! Every key is optional; missing keys take the defaults below.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, CoreError};
use crate::flow::PercentileMethod;

/// Longest accepted day offset for any horizon key (ten years).
const MAX_HORIZON_DAYS: i64 = 3650;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Days added to an iteration end before rolling to `forecast_weekday`
    #[serde(default = "default_forecast_offset_days")]
    pub forecast_offset_days: i64,
    /// Weekday forecast deadlines are moved to ("Mon" .. "Sun")
    #[serde(default = "default_forecast_weekday")]
    pub forecast_weekday: String,
    #[serde(default = "default_due_soon_days")]
    pub due_soon_days: i64,
    #[serde(default = "default_due_month_days")]
    pub due_month_days: i64,
    #[serde(default)]
    pub percentile_method: PercentileMethod,
    /// Conservative throughput percentile
    #[serde(default = "default_low_percentile")]
    pub low_percentile: f64,
    /// Optimistic throughput percentile
    #[serde(default = "default_high_percentile")]
    pub high_percentile: f64,
    /// Accuracy within +/- this percentage counts as on target
    #[serde(default = "default_accuracy_tolerance_pct")]
    pub accuracy_tolerance_pct: f64,
}

fn default_forecast_offset_days() -> i64 {
    5
}
fn default_forecast_weekday() -> String {
    "Fri".into()
}
fn default_due_soon_days() -> i64 {
    7
}
fn default_due_month_days() -> i64 {
    30
}
fn default_low_percentile() -> f64 {
    50.0
}
fn default_high_percentile() -> f64 {
    80.0
}
fn default_accuracy_tolerance_pct() -> f64 {
    10.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            forecast_offset_days: default_forecast_offset_days(),
            forecast_weekday: default_forecast_weekday(),
            due_soon_days: default_due_soon_days(),
            due_month_days: default_due_month_days(),
            percentile_method: PercentileMethod::default(),
            low_percentile: default_low_percentile(),
            high_percentile: default_high_percentile(),
            accuracy_tolerance_pct: default_accuracy_tolerance_pct(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or a value fails
    /// [`EngineConfig::validate`].
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: EngineConfig = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self::from_toml_str(&content)?)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "using default engine config");
                Self::default()
            }
        }
    }

    /// Write to a TOML file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=MAX_HORIZON_DAYS).contains(&self.forecast_offset_days) {
            return Err(invalid("forecast_offset_days", "must be within 0..=3650"));
        }
        self.forecast_weekday
            .parse::<Weekday>()
            .map_err(|_| invalid("forecast_weekday", "expected a weekday such as \"Fri\""))?;
        if self.due_soon_days < 1 {
            return Err(invalid("due_soon_days", "must be at least 1"));
        }
        if self.due_month_days < self.due_soon_days {
            return Err(invalid("due_month_days", "must be at least due_soon_days"));
        }
        if self.due_month_days > MAX_HORIZON_DAYS {
            return Err(invalid("due_month_days", "must not exceed 3650"));
        }
        for (key, value) in [("low_percentile", self.low_percentile), ("high_percentile", self.high_percentile)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(invalid(key, "must be within 0..=100"));
            }
        }
        if self.low_percentile > self.high_percentile {
            return Err(invalid("low_percentile", "must not exceed high_percentile"));
        }
        if !(self.accuracy_tolerance_pct >= 0.0) {
            return Err(invalid("accuracy_tolerance_pct", "must not be negative"));
        }
        Ok(())
    }

    /// Parsed forecast weekday, Friday when the stored value is unusable.
    pub fn weekday(&self) -> Weekday {
        self.forecast_weekday.parse().unwrap_or(Weekday::Fri)
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_roundtrip() {
        let cfg = EngineConfig::default();
        let toml_str = cfg.to_toml_string().unwrap();
        let parsed = EngineConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.forecast_offset_days, 5);
        assert_eq!(cfg.weekday(), Weekday::Fri);
        assert_eq!(cfg.due_soon_days, 7);
        assert_eq!(cfg.due_month_days, 30);
        assert_eq!(cfg.percentile_method, PercentileMethod::Linear);
        assert_eq!(cfg.low_percentile, 50.0);
        assert_eq!(cfg.high_percentile, 80.0);
    }

    #[test]
    fn partial_document_overrides_only_given_keys() {
        let cfg = EngineConfig::from_toml_str(
            "percentile_method = \"nearest_rank\"\nforecast_weekday = \"Thu\"\n",
        )
        .unwrap();
        assert_eq!(cfg.percentile_method, PercentileMethod::NearestRank);
        assert_eq!(cfg.weekday(), Weekday::Thu);
        assert_eq!(cfg.due_soon_days, 7);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(EngineConfig::from_toml_str("forecast_weekday = \"Someday\"").is_err());
        assert!(EngineConfig::from_toml_str("due_soon_days = 10\ndue_month_days = 5").is_err());
        assert!(EngineConfig::from_toml_str("low_percentile = 90.0").is_err());
        assert!(EngineConfig::from_toml_str("high_percentile = 120.0").is_err());
        assert!(EngineConfig::from_toml_str("forecast_offset_days = \"five\"").is_err());
        assert!(EngineConfig::from_toml_str("due_month_days = 9000000000000").is_err());
        assert!(EngineConfig::from_toml_str("due_soon_days = 4000\ndue_month_days = 4000").is_err());
        assert!(EngineConfig::from_toml_str("forecast_offset_days = 9000000000000").is_err());
        assert!(EngineConfig::from_toml_str("due_month_days = 3650\nforecast_offset_days = 3650").is_ok());
    }

    #[test]
    fn load_from_file_and_fallback() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "due_soon_days = 5").unwrap();
        let cfg = EngineConfig::load(file.path()).unwrap();
        assert_eq!(cfg.due_soon_days, 5);

        let missing = file.path().with_extension("missing");
        assert!(EngineConfig::load(&missing).is_err());
        assert_eq!(EngineConfig::load_or_default(&missing), EngineConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("engine.toml");
        let cfg = EngineConfig {
            due_month_days: 45,
            ..EngineConfig::default()
        };
        cfg.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), cfg);
    }
}
