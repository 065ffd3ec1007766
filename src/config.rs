//! TOML configuration.
//!
//! Only `[db]` is required; every other section has defaults. See
//! `config/comex.example.toml` for an annotated example.

use anyhow::{Context, Result};
use comex_core::opportunity::EngineParams;
use comex_core::scoring::ScoreWeights;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub trade_data: Option<TradeDataConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    #[serde(default = "default_demand_weight")]
    pub demand_weight: f64,
    #[serde(default = "default_tariff_weight")]
    pub tariff_weight: f64,
    #[serde(default = "default_ease_weight")]
    pub ease_weight: f64,
    #[serde(default = "default_fob_price")]
    pub default_fob_price: f64,
    #[serde(default = "default_logistics_cost")]
    pub logistics_cost_estimate: f64,
    #[serde(default = "default_final_limit")]
    pub final_limit: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            demand_weight: default_demand_weight(),
            tariff_weight: default_tariff_weight(),
            ease_weight: default_ease_weight(),
            default_fob_price: default_fob_price(),
            logistics_cost_estimate: default_logistics_cost(),
            final_limit: default_final_limit(),
        }
    }
}

fn default_demand_weight() -> f64 {
    0.4
}
fn default_tariff_weight() -> f64 {
    0.3
}
fn default_ease_weight() -> f64 {
    0.3
}
fn default_fob_price() -> f64 {
    10_000.0
}
fn default_logistics_cost() -> f64 {
    1_500.0
}
fn default_final_limit() -> usize {
    10
}

impl ScoringConfig {
    pub fn weights(&self) -> ScoreWeights {
        ScoreWeights {
            demand: self.demand_weight,
            tariff: self.tariff_weight,
            ease: self.ease_weight,
        }
    }

    pub fn engine_params(&self) -> EngineParams {
        EngineParams {
            weights: self.weights(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "default_classifier_provider")]
    pub provider: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: default_classifier_provider(),
            url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_classifier_provider() -> String {
    "keyword".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}

/// Remote trade-volume source queried before stored rows.
#[derive(Debug, Deserialize, Clone)]
pub struct TradeDataConfig {
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Config {
    /// Config with defaults and the given database path. Used by tests and
    /// embedding applications that do not read a TOML file.
    pub fn minimal(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            server: ServerConfig::default(),
            scoring: ScoringConfig::default(),
            classifier: ClassifierConfig::default(),
            trade_data: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.scoring
            .weights()
            .validate()
            .context("invalid [scoring] weights")?;

        if self.scoring.final_limit < 1 {
            anyhow::bail!("scoring.final_limit must be >= 1");
        }
        if !(self.scoring.default_fob_price >= 0.0) {
            anyhow::bail!("scoring.default_fob_price must be >= 0");
        }
        if !(self.scoring.logistics_cost_estimate >= 0.0) {
            anyhow::bail!("scoring.logistics_cost_estimate must be >= 0");
        }

        match self.classifier.provider.as_str() {
            "keyword" => {}
            "remote" => {
                if self.classifier.url.is_none() {
                    anyhow::bail!("classifier.url must be specified when provider is 'remote'");
                }
            }
            other => anyhow::bail!(
                "Unknown classifier provider: '{}'. Must be keyword or remote.",
                other
            ),
        }

        if let Some(ref td) = self.trade_data {
            if td.url.trim().is_empty() {
                anyhow::bail!("trade_data.url must not be empty");
            }
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse("[db]\npath = \"./data/comex.sqlite\"\n").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.scoring.weights(), ScoreWeights::default());
        assert_eq!(config.scoring.final_limit, 10);
        assert_eq!(config.classifier.provider, "keyword");
        assert!(config.trade_data.is_none());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let err = parse(
            "[db]\npath = \"x.sqlite\"\n[scoring]\ndemand_weight = 0.5\ntariff_weight = 0.5\nease_weight = 0.5\n",
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("sum to 1.0"));
    }

    #[test]
    fn test_custom_weights() {
        let config = parse(
            "[db]\npath = \"x.sqlite\"\n[scoring]\ndemand_weight = 0.6\ntariff_weight = 0.2\nease_weight = 0.2\n",
        )
        .unwrap();
        assert!((config.scoring.weights().demand - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_remote_classifier_requires_url() {
        let err = parse("[db]\npath = \"x.sqlite\"\n[classifier]\nprovider = \"remote\"\n").unwrap_err();
        assert!(err.to_string().contains("classifier.url"));
    }

    #[test]
    fn test_unknown_classifier_provider() {
        assert!(parse("[db]\npath = \"x.sqlite\"\n[classifier]\nprovider = \"magic\"\n").is_err());
    }

    #[test]
    fn test_negative_price_rejected() {
        assert!(parse("[db]\npath = \"x.sqlite\"\n[scoring]\ndefault_fob_price = -1.0\n").is_err());
    }

    #[test]
    fn test_trade_data_section() {
        let config = parse(
            "[db]\npath = \"x.sqlite\"\n[trade_data]\nurl = \"http://localhost:9000/trade\"\n",
        )
        .unwrap();
        let td = config.trade_data.unwrap();
        assert_eq!(td.url, "http://localhost:9000/trade");
        assert_eq!(td.timeout_secs, 10);
    }
}
