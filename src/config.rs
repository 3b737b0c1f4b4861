//! Analysis configuration and parameter metadata
//!
//! Numeric settings are described by [`ParamMeta`] records, enabling:
//! - validation of values coming from a form or a config file
//! - parameter documentation
//! - automatic configuration UI generation
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use candlestat::config::AnalysisConfig;
//!
//! let mut params = HashMap::new();
//! params.insert("max_segment_count", 8.0);
//!
//! let config = AnalysisConfig::with_params(&params).unwrap();
//! assert_eq!(config.max_segment_count, 8);
//! assert_eq!(config.max_pattern_len, 64);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::MatchMode;
use crate::{AnalysisError, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Positive integer
    Count,
    /// 0.0 or 1.0
    Flag,
}

/// Metadata for a single configuration parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
    /// Parameter name (e.g., "max_segment_count")
    pub name: &'static str,
    pub param_type: ParamType,
    pub default: f64,
    /// Accepted range: (min, max)
    pub range: (f64, f64),
    pub description: &'static str,
}

impl ParamMeta {
    pub const fn count(
        name: &'static str,
        default: f64,
        range: (f64, f64),
        description: &'static str,
    ) -> Self {
        Self { name, param_type: ParamType::Count, default, range, description }
    }

    pub const fn flag(name: &'static str, default: bool, description: &'static str) -> Self {
        Self {
            name,
            param_type: ParamType::Flag,
            default: if default { 1.0 } else { 0.0 },
            range: (0.0, 1.0),
            description,
        }
    }

    /// Validate a value for this parameter
    pub fn validate(&self, value: f64) -> Result<()> {
        let (min, max) = self.range;
        if value.is_nan() || value < min || value > max {
            return Err(AnalysisError::OutOfRange { field: self.name, value, min, max });
        }
        match self.param_type {
            ParamType::Count => {
                if value.fract() != 0.0 {
                    return Err(AnalysisError::InvalidConfig(format!(
                        "{} must be a whole number, got {value}",
                        self.name
                    )));
                }
            },
            ParamType::Flag => {
                if value != 0.0 && value != 1.0 {
                    return Err(AnalysisError::InvalidConfig(format!(
                        "{} must be 0 or 1, got {value}",
                        self.name
                    )));
                }
            },
        }
        Ok(())
    }
}

static PARAMS: [ParamMeta; 3] = [
    ParamMeta::count(
        "max_segment_count",
        5.0,
        (1.0, 100.0),
        "Largest repeat count accepted for a single pattern segment",
    ),
    ParamMeta::count(
        "max_pattern_len",
        64.0,
        (1.0, 4096.0),
        "Largest compiled pattern length",
    ),
    ParamMeta::flag(
        "validate_data",
        false,
        "Reject bars whose high/low do not bracket open and close",
    ),
];

// ============================================================
// ANALYSIS CONFIG
// ============================================================

/// Settings shared by every request an engine serves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub max_segment_count: usize,
    pub max_pattern_len: usize,
    pub match_mode: MatchMode,
    pub validate_data: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_segment_count: 5,
            max_pattern_len: 64,
            match_mode: MatchMode::Exact,
            validate_data: false,
        }
    }
}

impl AnalysisConfig {
    /// Metadata for all numeric parameters
    pub fn param_meta() -> &'static [ParamMeta] {
        &PARAMS
    }

    /// Build a config from a `name → value` map.
    ///
    /// Missing parameters use their default values; unknown names are rejected.
    pub fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        for name in params.keys() {
            if !PARAMS.iter().any(|p| p.name == *name) {
                return Err(AnalysisError::InvalidConfig(format!("unknown parameter {name}")));
            }
        }

        let value = |meta: &ParamMeta| -> Result<f64> {
            let v = params.get(meta.name).copied().unwrap_or(meta.default);
            meta.validate(v)?;
            Ok(v)
        };

        let config = Self {
            max_segment_count: value(&PARAMS[0])? as usize,
            max_pattern_len: value(&PARAMS[1])? as usize,
            validate_data: value(&PARAMS[2])? != 0.0,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter against its metadata and against each other
    pub fn validate(&self) -> Result<()> {
        PARAMS[0].validate(self.max_segment_count as f64)?;
        PARAMS[1].validate(self.max_pattern_len as f64)?;
        if self.max_segment_count > self.max_pattern_len {
            return Err(AnalysisError::InvalidConfig(format!(
                "max_segment_count ({}) exceeds max_pattern_len ({})",
                self.max_segment_count, self.max_pattern_len
            )));
        }
        Ok(())
    }
}

// ============================================================
// TESTS
// ============================================================
