pub mod export;
pub mod financing;
pub mod project;
pub mod scenarios;

use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use villa_invest_core::financing::RepaymentScheme;
use villa_invest_core::project::{ProjectInput, ProjectParameters, RateMethod};

use crate::input;

/// Project parameters and engine switches shared by every evaluating command.
///
/// Values are layered: defaults, then `--input` file or piped JSON, then flags.
/// Percentage flags take whole percentages (`--occupancy-pct 40`).
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Path to a JSON or YAML project file
    #[arg(long)]
    pub input: Option<String>,

    /// Number of villas
    #[arg(long)]
    pub villas: Option<u32>,

    /// Built area per villa (m²)
    #[arg(long)]
    pub villa_size: Option<Decimal>,

    /// Nightly price per villa (₪)
    #[arg(long)]
    pub price_per_night: Option<Decimal>,

    /// Occupancy rate in percent
    #[arg(long)]
    pub occupancy_pct: Option<Decimal>,

    /// Land cost per villa (₪)
    #[arg(long)]
    pub land_cost_per_villa: Option<Decimal>,

    /// Construction cost per m² (₪)
    #[arg(long)]
    pub construction_cost_per_sqm: Option<Decimal>,

    /// Monthly operating cost per villa (₪)
    #[arg(long)]
    pub monthly_operating_cost: Option<Decimal>,

    /// Annual marketing budget (₪)
    #[arg(long)]
    pub marketing_cost: Option<Decimal>,

    /// Land development cost (₪)
    #[arg(long)]
    pub land_development_cost: Option<Decimal>,

    /// Public areas and parking development cost (₪)
    #[arg(long)]
    pub public_area_cost: Option<Decimal>,

    /// Reception and logistics building cost (₪)
    #[arg(long)]
    pub reception_cost: Option<Decimal>,

    /// Event hall cost (₪)
    #[arg(long)]
    pub event_hall_cost: Option<Decimal>,

    /// Planning and consultants cost (₪)
    #[arg(long)]
    pub planning_cost: Option<Decimal>,

    /// Cleaning cost per booked night (₪)
    #[arg(long)]
    pub cleaning_cost: Option<Decimal>,

    /// Accessories cost per booked night (₪)
    #[arg(long)]
    pub accessories_cost: Option<Decimal>,

    /// Annual insurance per villa (₪)
    #[arg(long)]
    pub insurance_per_villa: Option<Decimal>,

    /// Annual inflation in percent (reported only)
    #[arg(long)]
    pub inflation_pct: Option<Decimal>,

    /// Discount rate in percent
    #[arg(long)]
    pub discount_pct: Option<Decimal>,

    /// Prime rate in percent
    #[arg(long)]
    pub prime_pct: Option<Decimal>,

    /// Loan margin over prime in percent
    #[arg(long)]
    pub spread_pct: Option<Decimal>,

    /// Equity invested (₪)
    #[arg(long)]
    pub equity: Option<Decimal>,

    /// Loan term in years
    #[arg(long)]
    pub term_years: Option<u32>,

    /// Repayment scheme: level_payment, equal_principal, bullet
    #[arg(long)]
    pub scheme: Option<RepaymentScheme>,

    /// Tax rate in percent
    #[arg(long)]
    pub tax_pct: Option<Decimal>,

    /// Ignore loan interest when computing net profit
    #[arg(long)]
    pub no_financing: bool,

    /// Rate method: periodic or date_weighted
    #[arg(long)]
    pub rate_method: Option<RateMethod>,

    /// Minimum subsidy in percent of construction cost
    #[arg(long)]
    pub subsidy_min_pct: Option<Decimal>,

    /// Maximum subsidy in percent of construction cost
    #[arg(long)]
    pub subsidy_max_pct: Option<Decimal>,

    /// Terminal value as a multiple of final-year profit (date-weighted mode)
    #[arg(long)]
    pub terminal_multiple: Option<Decimal>,

    /// Date of the construction outlay, YYYY-MM-DD (defaults to today)
    #[arg(long)]
    pub valuation_date: Option<NaiveDate>,
}

fn pct(value: Decimal) -> Decimal {
    value / dec!(100)
}

/// Interpret a document as a full `ProjectInput` or as bare parameters.
pub fn project_input_from_value(value: Value) -> Result<ProjectInput, Box<dyn std::error::Error>> {
    let is_envelope = value
        .as_object()
        .is_some_and(|m| m.contains_key("parameters") || m.contains_key("config"));
    if is_envelope {
        Ok(serde_json::from_value(value)?)
    } else {
        let parameters: ProjectParameters = serde_json::from_value(value)?;
        Ok(ProjectInput {
            parameters,
            ..Default::default()
        })
    }
}

impl ProjectArgs {
    /// Build the project input from file/stdin/defaults, then apply flag overrides.
    pub fn resolve(&self) -> Result<ProjectInput, Box<dyn std::error::Error>> {
        let mut project = if let Some(ref path) = self.input {
            project_input_from_value(input::file::read_value(path)?)?
        } else if let Some(data) = input::stdin::read_stdin()? {
            project_input_from_value(data)?
        } else {
            ProjectInput::default()
        };
        self.apply(&mut project);
        log::debug!("resolved project input: {:?}", project);
        Ok(project)
    }

    fn apply(&self, project: &mut ProjectInput) {
        let p = &mut project.parameters;
        if let Some(v) = self.villas {
            p.villa_count = v;
        }
        if let Some(v) = self.villa_size {
            p.villa_size_sqm = v;
        }
        if let Some(v) = self.price_per_night {
            p.price_per_night = v;
        }
        if let Some(v) = self.occupancy_pct {
            p.occupancy_rate = pct(v);
        }
        if let Some(v) = self.land_cost_per_villa {
            p.land_cost_per_villa = v;
        }
        if let Some(v) = self.construction_cost_per_sqm {
            p.construction_cost_per_sqm = v;
        }
        if let Some(v) = self.monthly_operating_cost {
            p.monthly_operating_cost_per_villa = v;
        }
        if let Some(v) = self.marketing_cost {
            p.annual_marketing_cost = v;
        }
        if let Some(v) = self.land_development_cost {
            p.land_development_cost = v;
        }
        if let Some(v) = self.public_area_cost {
            p.public_area_development_cost = v;
        }
        if let Some(v) = self.reception_cost {
            p.reception_logistics_cost = v;
        }
        if let Some(v) = self.event_hall_cost {
            p.event_hall_cost = v;
        }
        if let Some(v) = self.planning_cost {
            p.planning_consultants_cost = v;
        }
        if let Some(v) = self.cleaning_cost {
            p.cleaning_cost_per_night = v;
        }
        if let Some(v) = self.accessories_cost {
            p.accessories_cost_per_night = v;
        }
        if let Some(v) = self.insurance_per_villa {
            p.annual_insurance_per_villa = v;
        }
        if let Some(v) = self.inflation_pct {
            p.inflation_rate = pct(v);
        }
        if let Some(v) = self.discount_pct {
            p.discount_rate = pct(v);
        }
        if let Some(v) = self.prime_pct {
            p.prime_rate = pct(v);
        }
        if let Some(v) = self.spread_pct {
            p.additional_rate_spread = pct(v);
        }
        if let Some(v) = self.equity {
            p.equity_amount = v;
        }
        if let Some(v) = self.term_years {
            p.loan_term_years = v;
        }
        if let Some(v) = self.scheme {
            p.repayment_scheme = v;
        }
        if let Some(v) = self.tax_pct {
            p.tax_rate = pct(v);
        }

        let c = &mut project.config;
        if self.no_financing {
            c.financing_aware = false;
        }
        if let Some(v) = self.rate_method {
            c.rate_method = v;
        }
        if let Some(v) = self.subsidy_min_pct {
            c.subsidy.min = pct(v);
        }
        if let Some(v) = self.subsidy_max_pct {
            c.subsidy.max = pct(v);
        }
        if let Some(v) = self.terminal_multiple {
            c.terminal_value_multiple = v;
        }
        if let Some(v) = self.valuation_date {
            c.valuation_date = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_percent_flags_become_fractions() {
        let args = ProjectArgs {
            occupancy_pct: Some(dec!(55)),
            prime_pct: Some(dec!(4.5)),
            subsidy_max_pct: Some(dec!(35)),
            no_financing: true,
            ..Default::default()
        };
        let mut project = ProjectInput::default();
        args.apply(&mut project);
        assert_eq!(project.parameters.occupancy_rate, dec!(0.55));
        assert_eq!(project.parameters.prime_rate, dec!(0.045));
        assert_eq!(project.config.subsidy.max, dec!(0.35));
        assert!(!project.config.financing_aware);
        assert_eq!(project.parameters.villa_count, 10);
    }

    #[test]
    fn test_bare_parameters_document() {
        let project = project_input_from_value(json!({"villa_count": 12})).unwrap();
        assert_eq!(project.parameters.villa_count, 12);
        assert!(project.config.financing_aware);
    }

    #[test]
    fn test_full_input_document() {
        let project = project_input_from_value(json!({
            "parameters": {"villa_count": 8},
            "config": {"rate_method": "date_weighted", "valuation_date": "2025-01-01"}
        }))
        .unwrap();
        assert_eq!(project.parameters.villa_count, 8);
        assert_eq!(project.config.rate_method, RateMethod::DateWeighted);
    }
}
