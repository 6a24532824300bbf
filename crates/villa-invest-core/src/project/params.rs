use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::VillaInvestError;
use crate::financing::RepaymentScheme;
use crate::project::metrics::{
    annual_revenue, fixed_operating_cost, total_construction_cost, variable_operating_cost,
};
use crate::types::*;
use crate::VillaInvestResult;

/// Largest development the engine evaluates.
pub const MAX_VILLA_COUNT: u32 = 10_000;

/// Inputs describing one villa development scenario.
///
/// Missing fields in a JSON/YAML document fall back to the defaults of the
/// reference 10-villa project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectParameters {
    pub villa_count: u32,
    /// Built area per villa in square metres
    pub villa_size_sqm: Decimal,
    pub price_per_night: Money,
    /// Fraction of nights booked (0.40 = 40%)
    pub occupancy_rate: Rate,
    pub land_cost_per_villa: Money,
    pub construction_cost_per_sqm: Money,
    pub monthly_operating_cost_per_villa: Money,
    pub annual_marketing_cost: Money,
    pub land_development_cost: Money,
    /// Public areas and parking
    pub public_area_development_cost: Money,
    pub reception_logistics_cost: Money,
    pub event_hall_cost: Money,
    pub planning_consultants_cost: Money,
    pub cleaning_cost_per_night: Money,
    pub accessories_cost_per_night: Money,
    pub annual_insurance_per_villa: Money,
    /// Carried for reporting; cash flows are not indexed
    pub inflation_rate: Rate,
    pub discount_rate: Rate,
    pub prime_rate: Rate,
    /// Margin over prime charged on the development loan
    pub additional_rate_spread: Rate,
    pub equity_amount: Money,
    pub loan_term_years: u32,
    pub repayment_scheme: RepaymentScheme,
    pub tax_rate: Rate,
}

impl Default for ProjectParameters {
    fn default() -> Self {
        Self {
            villa_count: 10,
            villa_size_sqm: dec!(200),
            price_per_night: dec!(3500),
            occupancy_rate: dec!(0.40),
            land_cost_per_villa: dec!(500000),
            construction_cost_per_sqm: dec!(15000),
            monthly_operating_cost_per_villa: dec!(4000),
            annual_marketing_cost: dec!(600000),
            land_development_cost: dec!(200000),
            public_area_development_cost: dec!(1000000),
            reception_logistics_cost: dec!(700000),
            event_hall_cost: dec!(700000),
            planning_consultants_cost: dec!(150000),
            cleaning_cost_per_night: dec!(200),
            accessories_cost_per_night: dec!(50),
            annual_insurance_per_villa: dec!(5000),
            inflation_rate: dec!(0.02),
            discount_rate: dec!(0.08),
            prime_rate: dec!(0.035),
            additional_rate_spread: Decimal::ZERO,
            equity_amount: dec!(1000000),
            loan_term_years: 15,
            repayment_scheme: RepaymentScheme::LevelPayment,
            tax_rate: dec!(0.075),
        }
    }
}

impl ProjectParameters {
    /// Annual loan rate: prime plus spread.
    pub fn loan_rate(&self) -> Rate {
        self.prime_rate + self.additional_rate_spread
    }

    /// Amount borrowed once equity is applied. Negative when equity exceeds cost.
    pub fn loan_principal(&self, total_construction_cost: Money) -> Money {
        total_construction_cost - self.equity_amount
    }

    /// Reject records the engine cannot evaluate meaningfully.
    pub fn validate(&self) -> VillaInvestResult<()> {
        if self.villa_count == 0 {
            return Err(VillaInvestError::InvalidInput {
                field: "villa_count".into(),
                reason: "At least one villa is required".into(),
            });
        }
        if self.villa_count > MAX_VILLA_COUNT {
            return Err(VillaInvestError::InvalidInput {
                field: "villa_count".into(),
                reason: format!("At most {MAX_VILLA_COUNT} villas are supported"),
            });
        }
        if self.loan_term_years == 0 || self.loan_term_years > MAX_TERM_YEARS {
            return Err(VillaInvestError::InvalidInput {
                field: "loan_term_years".into(),
                reason: format!("Loan term must be between 1 and {MAX_TERM_YEARS} years"),
            });
        }

        let fractions = [
            ("occupancy_rate", self.occupancy_rate),
            ("inflation_rate", self.inflation_rate),
            ("discount_rate", self.discount_rate),
            ("prime_rate", self.prime_rate),
            ("additional_rate_spread", self.additional_rate_spread),
            ("tax_rate", self.tax_rate),
        ];
        for (field, value) in fractions {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(VillaInvestError::InvalidInput {
                    field: field.into(),
                    reason: format!("Must be a fraction between 0 and 1, got {value}"),
                });
            }
        }

        let amounts = [
            ("villa_size_sqm", self.villa_size_sqm),
            ("price_per_night", self.price_per_night),
            ("land_cost_per_villa", self.land_cost_per_villa),
            ("construction_cost_per_sqm", self.construction_cost_per_sqm),
            ("monthly_operating_cost_per_villa", self.monthly_operating_cost_per_villa),
            ("annual_marketing_cost", self.annual_marketing_cost),
            ("land_development_cost", self.land_development_cost),
            ("public_area_development_cost", self.public_area_development_cost),
            ("reception_logistics_cost", self.reception_logistics_cost),
            ("event_hall_cost", self.event_hall_cost),
            ("planning_consultants_cost", self.planning_consultants_cost),
            ("cleaning_cost_per_night", self.cleaning_cost_per_night),
            ("accessories_cost_per_night", self.accessories_cost_per_night),
            ("annual_insurance_per_villa", self.annual_insurance_per_villa),
            ("equity_amount", self.equity_amount),
        ];
        for (field, value) in amounts {
            if value < Decimal::ZERO || value > MAX_AMOUNT {
                return Err(VillaInvestError::InvalidInput {
                    field: field.into(),
                    reason: format!("Must be between 0 and {MAX_AMOUNT}, got {value}"),
                });
            }
        }

        let totals = [
            ("total_construction_cost", total_construction_cost(self)?),
            ("annual_revenue", annual_revenue(self)?),
            ("variable_operating_cost", variable_operating_cost(self)?),
            ("fixed_operating_cost", fixed_operating_cost(self)?),
        ];
        for (field, value) in totals {
            if value > MAX_AMOUNT {
                return Err(VillaInvestError::InvalidInput {
                    field: field.into(),
                    reason: format!("Exceeds {MAX_AMOUNT}, got {value}"),
                });
            }
        }

        Ok(())
    }
}
