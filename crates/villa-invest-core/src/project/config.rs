use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VillaInvestError;
use crate::types::*;
use crate::VillaInvestResult;

/// Final-year profit multiple used as terminal value in date-weighted mode.
pub const DEFAULT_TERMINAL_VALUE_MULTIPLE: Multiple = dec!(10);
pub const MAX_TERMINAL_VALUE_MULTIPLE: Multiple = dec!(1000);

/// How cash flows are discounted and rates solved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateMethod {
    /// Evenly spaced annual flows, no terminal value
    #[default]
    Periodic,
    /// Flows dated one calendar year apart, actual/365 exponents, terminal value appended
    DateWeighted,
}

impl fmt::Display for RateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateMethod::Periodic => f.write_str("periodic"),
            RateMethod::DateWeighted => f.write_str("date_weighted"),
        }
    }
}

impl FromStr for RateMethod {
    type Err = VillaInvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "periodic" => Ok(RateMethod::Periodic),
            "date_weighted" | "dated" | "xirr" => Ok(RateMethod::DateWeighted),
            other => Err(VillaInvestError::InvalidInput {
                field: "rate_method".into(),
                reason: format!("Unknown rate method '{other}'; expected periodic or date_weighted"),
            }),
        }
    }
}

/// Share of construction cost covered by the subsidy programme
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubsidyRange {
    pub min: Rate,
    pub max: Rate,
}

impl Default for SubsidyRange {
    fn default() -> Self {
        Self {
            min: dec!(0.20),
            max: dec!(0.30),
        }
    }
}

/// Engine mode switches shared by every evaluation in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deduct first-year loan interest before tax
    pub financing_aware: bool,
    pub rate_method: RateMethod,
    pub subsidy: SubsidyRange,
    pub terminal_value_multiple: Multiple,
    /// Date of flow 0 in date-weighted mode; today when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valuation_date: Option<NaiveDate>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            financing_aware: true,
            rate_method: RateMethod::Periodic,
            subsidy: SubsidyRange::default(),
            terminal_value_multiple: DEFAULT_TERMINAL_VALUE_MULTIPLE,
            valuation_date: None,
        }
    }
}

impl EngineConfig {
    pub fn valuation_date(&self) -> NaiveDate {
        self.valuation_date.unwrap_or_else(|| Utc::now().date_naive())
    }

    pub fn validate(&self) -> VillaInvestResult<()> {
        for (field, value) in [("subsidy.min", self.subsidy.min), ("subsidy.max", self.subsidy.max)] {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(VillaInvestError::InvalidInput {
                    field: field.into(),
                    reason: format!("Subsidy fraction must be between 0 and 1, got {value}"),
                });
            }
        }
        if self.subsidy.min > self.subsidy.max {
            return Err(VillaInvestError::InvalidInput {
                field: "subsidy".into(),
                reason: "Minimum subsidy must not exceed maximum".into(),
            });
        }
        if self.terminal_value_multiple < Decimal::ZERO
            || self.terminal_value_multiple > MAX_TERMINAL_VALUE_MULTIPLE
        {
            return Err(VillaInvestError::InvalidInput {
                field: "terminal_value_multiple".into(),
                reason: format!(
                    "Terminal value multiple must be between 0 and {MAX_TERMINAL_VALUE_MULTIPLE}"
                ),
            });
        }
        Ok(())
    }
}
