//! Engine configuration.
//!
//! Every field has a default, so a JSON document only needs the settings it
//! changes:
//!
//! ```json
//! { "ignore_overlap": true, "tie_break": "last_in_order",
//!   "thermostat": { "temperature": 1.5, "interval": 10 } }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default cap on events resolved inside one `do_step`.
pub const DEFAULT_MAX_EVENTS_PER_STEP: usize = 1_000_000;

/// Which agent wins when several predict exactly the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The agent earliest in the index order.
    #[default]
    FirstInOrder,
    /// The agent latest in the index order.
    LastInOrder,
}

/// Isothermal velocity rescaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thermostat {
    /// Target kinetic temperature (k_B = 1).
    pub temperature: f64,
    /// Rescale after every `interval` calls to `do_step`.
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_interval() -> u64 {
    1
}

fn default_max_events() -> usize {
    DEFAULT_MAX_EVENTS_PER_STEP
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Treat overlapping, approaching atoms as an immediate event instead of a fatal error.
    pub ignore_overlap: bool,
    /// Events allowed inside one `do_step` before the cascade is declared unresolved.
    #[serde(default = "default_max_events")]
    pub max_events_per_step: usize,
    /// Policy for exactly simultaneous predictions.
    pub tie_break: TieBreak,
    /// Optional isothermal rescaling.
    pub thermostat: Option<Thermostat>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ignore_overlap: false,
            max_events_per_step: DEFAULT_MAX_EVENTS_PER_STEP,
            tie_break: TieBreak::default(),
            thermostat: None,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_events_per_step == 0 {
            return Err(Error::InvalidParam(
                "max_events_per_step must be > 0".into(),
            ));
        }
        if let Some(th) = &self.thermostat {
            if !th.temperature.is_finite() || th.temperature <= 0.0 {
                return Err(Error::InvalidParam(
                    "thermostat temperature must be finite and > 0".into(),
                ));
            }
            if th.interval == 0 {
                return Err(Error::InvalidParam(
                    "thermostat interval must be > 0".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() -> Result<()> {
        let cfg = EngineConfig::from_json_str("{}")?;
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.max_events_per_step, DEFAULT_MAX_EVENTS_PER_STEP);
        Ok(())
    }

    #[test]
    fn partial_document_overrides_fields() -> Result<()> {
        let cfg = EngineConfig::from_json_str(
            r#"{ "ignore_overlap": true, "tie_break": "last_in_order",
                 "thermostat": { "temperature": 1.5 } }"#,
        )?;
        assert!(cfg.ignore_overlap);
        assert_eq!(cfg.tie_break, TieBreak::LastInOrder);
        let th = cfg.thermostat.ok_or_else(|| Error::InvalidParam("missing".into()))?;
        assert_eq!(th.temperature, 1.5);
        assert_eq!(th.interval, 1);
        Ok(())
    }

    #[test]
    fn unknown_fields_and_bad_values_rejected() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "ignore_overlaps": true }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "max_events_per_step": 0 }"#),
            Err(Error::InvalidParam(_))
        ));
        assert!(EngineConfig::from_json_str(r#"{ "thermostat": { "temperature": -1.0 } }"#).is_err());
    }

    #[test]
    fn round_trips_through_json() -> Result<()> {
        let cfg = EngineConfig {
            ignore_overlap: true,
            max_events_per_step: 50,
            tie_break: TieBreak::LastInOrder,
            thermostat: Some(Thermostat {
                temperature: 2.0,
                interval: 5,
            }),
        };
        let back = EngineConfig::from_json_str(&cfg.to_json_string()?)?;
        assert_eq!(back, cfg);
        Ok(())
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            EngineConfig::from_path("/definitely/not/here.json"),
            Err(Error::Io(_))
        ));
    }
}
