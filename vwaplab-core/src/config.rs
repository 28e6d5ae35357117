//! Serializable strategy configuration, loaded from TOML.
//!
//! ```toml
//! initial_cash = 10000.0
//!
//! [strategy]
//! type = "vwap_retest"
//! ema_period = 13
//!
//! [strategy.params]
//! tolerance = 0.001
//! vwap_candle_threshold = 8
//! ```
//!
//! Every parameter is optional and falls back to its default.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::fingerprint::ConfigHash;
use crate::signals::{CrossoverParams, InputError, RetestParams};

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] InputError),
}

/// Which evaluator a session runs, with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyKind {
    VwapRetest {
        /// Period of the fast EMA used for the take-profit exit.
        #[serde(default = "default_retest_ema_period")]
        ema_period: usize,
        #[serde(default)]
        params: RetestParams,
    },
    EmaCrossover {
        #[serde(default)]
        params: CrossoverParams,
    },
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::VwapRetest { .. } => "vwap_retest",
            Self::EmaCrossover { .. } => "ema_crossover",
        }
    }

    /// EMA periods the strategy reads: (fast, optional slow).
    pub fn ema_periods(&self) -> (usize, Option<usize>) {
        match self {
            Self::VwapRetest { ema_period, .. } => (*ema_period, None),
            Self::EmaCrossover { params } => (params.fast_period, Some(params.slow_period)),
        }
    }

    /// Bars the session must keep for one evaluation.
    pub fn window_len(&self) -> usize {
        match self {
            Self::VwapRetest { params, .. } => params.active_bars(),
            Self::EmaCrossover { .. } => 2,
        }
    }
}

fn default_retest_ema_period() -> usize {
    13
}

fn default_initial_cash() -> f64 {
    10_000.0
}

/// Complete configuration for a replay session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Starting cash of the session's account.
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
    pub strategy: StrategyKind,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::vwap_retest(RetestParams::default())
    }
}

impl StrategyConfig {
    pub fn vwap_retest(params: RetestParams) -> Self {
        Self {
            initial_cash: params.account_value,
            strategy: StrategyKind::VwapRetest {
                ema_period: default_retest_ema_period(),
                params,
            },
        }
    }

    pub fn ema_crossover(params: CrossoverParams) -> Self {
        Self {
            initial_cash: default_initial_cash(),
            strategy: StrategyKind::EmaCrossover { params },
        }
    }

    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), strategy = config.strategy.name(), "config loaded");
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if !(self.initial_cash.is_finite() && self.initial_cash >= 0.0) {
            return Err(InputError::InvalidParams(
                "initial_cash must be finite and >= 0".into(),
            ));
        }
        match &self.strategy {
            StrategyKind::VwapRetest { ema_period, params } => {
                if *ema_period == 0 {
                    return Err(InputError::InvalidParams("ema_period must be >= 1".into()));
                }
                params.validate()
            }
            StrategyKind::EmaCrossover { params } => params.validate(),
        }
    }

    /// Exact identity of this configuration (strategy type + every parameter).
    pub fn full_hash(&self) -> ConfigHash {
        // Struct fields serialize in declaration order, so the JSON is canonical.
        match serde_json::to_string(self) {
            Ok(json) => ConfigHash::from_bytes(json.as_bytes()),
            Err(_) => ConfigHash::from_bytes(format!("{self:?}").as_bytes()),
        }
    }
}
