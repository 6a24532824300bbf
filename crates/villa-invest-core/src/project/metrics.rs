use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::VillaInvestError;
use crate::financing::{amortize, first_year_interest, LoanPayment};
use crate::project::cash_flows::{
    annual_series, cash_flow_table, date_series, discounted_profile, with_terminal_value,
    CashFlowRow, DiscountedProfitPoint,
};
use crate::project::config::{EngineConfig, RateMethod};
use crate::project::params::ProjectParameters;
use crate::time_value;
use crate::types::*;
use crate::VillaInvestResult;

const NIGHTS_PER_YEAR: Decimal = dec!(365);
const MONTHS_PER_YEAR: Decimal = dec!(12);
const PERIODIC_IRR_GUESS: Rate = dec!(0.10);

/// Verdicts shown alongside the metrics: NPV above zero and IRR above the discount rate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitabilityAssessment {
    pub npv_positive_min: bool,
    pub irr_exceeds_discount_min: bool,
    pub profitable_min: bool,
    pub npv_positive_max: bool,
    pub irr_exceeds_discount_max: bool,
    pub profitable_max: bool,
}

/// Everything the engine derives for one scenario.
///
/// `_min` / `_max` suffixes refer to the minimum and maximum subsidy bound.
/// `None` marks a value that is undefined for these inputs (rendered "N/A").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub total_construction_cost: Money,
    pub annual_revenue: Money,
    pub variable_operating_cost: Money,
    pub fixed_operating_cost: Money,
    pub annual_operational_cost: Money,
    pub gross_annual_profit: Money,
    pub operating_profit: Money,
    /// First-year loan interest; present only in financing-aware mode
    pub annual_financing_cost: Option<Money>,
    pub net_annual_profit_before_subsidy: Money,
    pub annual_subsidy_min: Money,
    pub annual_subsidy_max: Money,
    pub net_annual_profit_with_subsidy_min: Money,
    pub net_annual_profit_with_subsidy_max: Money,
    /// Construction cost net of the subsidy
    pub net_investment_min: Money,
    pub net_investment_max: Money,
    pub npv_min: Money,
    pub npv_max: Money,
    pub irr_min: Option<Rate>,
    pub irr_max: Option<Rate>,
    /// Simple ROI over the loan term, in percent
    pub roi_min_pct: Option<Decimal>,
    pub roi_max_pct: Option<Decimal>,
    /// Rate zeroing the dated net-investment series (date-weighted mode only)
    pub annualized_roi_min: Option<Rate>,
    pub annualized_roi_max: Option<Rate>,
    pub payback_years_min: Option<Decimal>,
    pub payback_years_max: Option<Decimal>,
    pub assessment: ProfitabilityAssessment,
}

/// Input for a full project evaluation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectInput {
    #[serde(default)]
    pub parameters: ProjectParameters,
    #[serde(default)]
    pub config: EngineConfig,
}

/// Metrics plus the series that charts and exports bind to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEvaluation {
    pub metrics: FinancialMetrics,
    pub loan_principal: Money,
    pub loan_rate: Rate,
    pub loan_schedule: Vec<LoanPayment>,
    pub valuation_date: NaiveDate,
    pub cash_flows: Vec<CashFlowRow>,
    pub discounted_profit: Vec<DiscountedProfitPoint>,
}

fn out_of_range(quantity: &str) -> VillaInvestError {
    VillaInvestError::InvalidInput {
        field: quantity.into(),
        reason: "Amount is too large to compute".into(),
    }
}

fn checked_product(quantity: &str, factors: &[Decimal]) -> VillaInvestResult<Money> {
    factors
        .iter()
        .try_fold(Decimal::ONE, |acc, f| acc.checked_mul(*f))
        .ok_or_else(|| out_of_range(quantity))
}

fn checked_sum(quantity: &str, terms: &[Money]) -> VillaInvestResult<Money> {
    terms
        .iter()
        .try_fold(Decimal::ZERO, |acc, t| acc.checked_add(*t))
        .ok_or_else(|| out_of_range(quantity))
}

/// Construction cost: building, land, and the five site-development items.
pub fn total_construction_cost(params: &ProjectParameters) -> VillaInvestResult<Money> {
    const FIELD: &str = "total_construction_cost";
    let villas = Decimal::from(params.villa_count);
    checked_sum(
        FIELD,
        &[
            checked_product(FIELD, &[params.construction_cost_per_sqm, params.villa_size_sqm, villas])?,
            checked_product(FIELD, &[params.land_cost_per_villa, villas])?,
            params.land_development_cost,
            params.public_area_development_cost,
            params.reception_logistics_cost,
            params.event_hall_cost,
            params.planning_consultants_cost,
        ],
    )
}

pub fn annual_revenue(params: &ProjectParameters) -> VillaInvestResult<Money> {
    checked_product(
        "annual_revenue",
        &[
            params.price_per_night,
            params.occupancy_rate,
            NIGHTS_PER_YEAR,
            Decimal::from(params.villa_count),
        ],
    )
}

/// Per-night costs scaled by booked nights.
pub fn variable_operating_cost(params: &ProjectParameters) -> VillaInvestResult<Money> {
    const FIELD: &str = "variable_operating_cost";
    let per_night = checked_sum(
        FIELD,
        &[params.cleaning_cost_per_night, params.accessories_cost_per_night],
    )?;
    checked_product(
        FIELD,
        &[per_night, NIGHTS_PER_YEAR, params.occupancy_rate, Decimal::from(params.villa_count)],
    )
}

pub fn fixed_operating_cost(params: &ProjectParameters) -> VillaInvestResult<Money> {
    const FIELD: &str = "fixed_operating_cost";
    let villas = Decimal::from(params.villa_count);
    checked_sum(
        FIELD,
        &[
            checked_product(FIELD, &[params.monthly_operating_cost_per_villa, MONTHS_PER_YEAR, villas])?,
            checked_product(FIELD, &[params.annual_insurance_per_villa, villas])?,
            params.annual_marketing_cost,
        ],
    )
}

fn push_warning(warnings: &mut Vec<String>, message: String) {
    log::warn!("{message}");
    warnings.push(message);
}

/// Shared inputs for the min and max subsidy evaluations
struct BoundContext<'a> {
    config: &'a EngineConfig,
    construction_cost: Money,
    net_profit_before_subsidy: Money,
    term_years: u32,
    discount_rate: Rate,
    valuation_date: NaiveDate,
}

/// Results for one subsidy fraction
struct BoundOutcome {
    annual_subsidy: Money,
    net_profit: Money,
    net_investment: Money,
    npv: Money,
    irr: Option<Rate>,
    roi_pct: Option<Decimal>,
    annualized_roi: Option<Rate>,
    payback_years: Option<Decimal>,
    flows: Vec<Money>,
}

fn evaluate_bound(
    label: &str,
    fraction: Rate,
    ctx: &BoundContext<'_>,
    warnings: &mut Vec<String>,
) -> VillaInvestResult<BoundOutcome> {
    let term = Decimal::from(ctx.term_years);
    let annual_subsidy = ctx.construction_cost * fraction / term;
    let net_profit = ctx.net_profit_before_subsidy + annual_subsidy;
    let net_investment = ctx.construction_cost * (Decimal::ONE - fraction);

    let base_flows = annual_series(ctx.construction_cost, net_profit, ctx.term_years);

    let (flows, npv, irr) = match ctx.config.rate_method {
        RateMethod::Periodic => {
            let npv = time_value::npv(ctx.discount_rate, &base_flows)?;
            let irr = match time_value::irr(&base_flows, PERIODIC_IRR_GUESS) {
                Ok(rate) => rate,
                Err(e) => {
                    push_warning(
                        warnings,
                        format!("IRR ({label} subsidy) could not be solved, reported as 0: {e}"),
                    );
                    Decimal::ZERO
                }
            };
            (base_flows, npv, Some(irr))
        }
        RateMethod::DateWeighted => {
            let flows = with_terminal_value(base_flows, ctx.config.terminal_value_multiple);
            let dated: Vec<_> = date_series(&flows, ctx.valuation_date)?
                .iter()
                .map(CashFlow::as_pair)
                .collect();
            let npv = time_value::xnpv(ctx.discount_rate, &dated)?;
            let irr = match time_value::xirr(&dated, Decimal::ZERO) {
                Ok(rate) => Some(rate),
                Err(e) => {
                    push_warning(
                        warnings,
                        format!("Date-weighted IRR ({label} subsidy) is undefined: {e}"),
                    );
                    None
                }
            };
            (flows, npv, irr)
        }
    };

    let roi_pct = if net_investment.is_zero() {
        push_warning(
            warnings,
            format!("ROI ({label} subsidy) is undefined: subsidy covers the full construction cost"),
        );
        None
    } else {
        let roi = (net_profit * term - net_investment)
            .checked_div(net_investment)
            .and_then(|r| r.checked_mul(dec!(100)));
        if roi.is_none() {
            push_warning(
                warnings,
                format!("ROI ({label} subsidy) is out of range for a net investment of {net_investment}"),
            );
        }
        roi
    };

    let annualized_roi = match ctx.config.rate_method {
        RateMethod::Periodic => None,
        RateMethod::DateWeighted => {
            let equity_flows = with_terminal_value(
                annual_series(net_investment, net_profit, ctx.term_years),
                ctx.config.terminal_value_multiple,
            );
            let dated: Vec<_> = date_series(&equity_flows, ctx.valuation_date)?
                .iter()
                .map(CashFlow::as_pair)
                .collect();
            match time_value::xirr(&dated, Decimal::ZERO) {
                Ok(rate) => Some(rate),
                Err(e) => {
                    push_warning(
                        warnings,
                        format!("Annualized ROI ({label} subsidy) is undefined: {e}"),
                    );
                    None
                }
            }
        }
    };

    let payback_years = if net_profit > Decimal::ZERO {
        let years = net_investment.checked_div(net_profit);
        if years.is_none() {
            push_warning(
                warnings,
                format!("Payback period ({label} subsidy) is out of range for annual net profit {net_profit}"),
            );
        }
        years
    } else {
        push_warning(
            warnings,
            format!("Payback period ({label} subsidy) is undefined: annual net profit {net_profit} is not positive"),
        );
        None
    };

    Ok(BoundOutcome {
        annual_subsidy,
        net_profit,
        net_investment,
        npv,
        irr,
        roi_pct,
        annualized_roi,
        payback_years,
        flows,
    })
}

/// Engine run including the series needed for chart output
struct EngineRun {
    metrics: FinancialMetrics,
    flows_min: Vec<Money>,
    flows_max: Vec<Money>,
    valuation_date: NaiveDate,
}

/// Runs the engine on inputs that have already been validated.
fn run_engine(
    params: &ProjectParameters,
    config: &EngineConfig,
    schedule: Option<&[LoanPayment]>,
    warnings: &mut Vec<String>,
) -> VillaInvestResult<EngineRun> {
    log::debug!(
        "evaluating {} villas (financing_aware={}, rate_method={})",
        params.villa_count,
        config.financing_aware,
        config.rate_method
    );

    let construction_cost = total_construction_cost(params)?;
    let revenue = annual_revenue(params)?;
    let variable_cost = variable_operating_cost(params)?;
    let fixed_cost = fixed_operating_cost(params)?;
    let operational_cost = variable_cost + fixed_cost;
    let gross_profit = revenue;
    let operating_profit = gross_profit - operational_cost;

    let annual_financing_cost = if config.financing_aware {
        let computed;
        let payments = match schedule {
            Some(payments) => payments,
            None => {
                computed = amortize(
                    params.loan_principal(construction_cost),
                    params.loan_rate(),
                    params.loan_term_years,
                    params.repayment_scheme,
                )?;
                &computed
            }
        };
        let interest = first_year_interest(payments);
        if interest < Decimal::ZERO {
            push_warning(
                warnings,
                "Equity exceeds construction cost; financing cost floored at 0".into(),
            );
            Some(Decimal::ZERO)
        } else {
            Some(interest)
        }
    } else {
        None
    };

    let net_profit_before_subsidy = (operating_profit - annual_financing_cost.unwrap_or(Decimal::ZERO))
        * (Decimal::ONE - params.tax_rate);

    let ctx = BoundContext {
        config,
        construction_cost,
        net_profit_before_subsidy,
        term_years: params.loan_term_years,
        discount_rate: params.discount_rate,
        valuation_date: config.valuation_date(),
    };
    let min = evaluate_bound("min", config.subsidy.min, &ctx, warnings)?;
    let max = evaluate_bound("max", config.subsidy.max, &ctx, warnings)?;

    let irr_beats = |irr: Option<Rate>| irr.is_some_and(|r| r > params.discount_rate);
    let npv_positive_min = min.npv > Decimal::ZERO;
    let npv_positive_max = max.npv > Decimal::ZERO;
    let assessment = ProfitabilityAssessment {
        npv_positive_min,
        irr_exceeds_discount_min: irr_beats(min.irr),
        profitable_min: npv_positive_min && irr_beats(min.irr),
        npv_positive_max,
        irr_exceeds_discount_max: irr_beats(max.irr),
        profitable_max: npv_positive_max && irr_beats(max.irr),
    };

    let metrics = FinancialMetrics {
        total_construction_cost: construction_cost,
        annual_revenue: revenue,
        variable_operating_cost: variable_cost,
        fixed_operating_cost: fixed_cost,
        annual_operational_cost: operational_cost,
        gross_annual_profit: gross_profit,
        operating_profit,
        annual_financing_cost,
        net_annual_profit_before_subsidy: net_profit_before_subsidy,
        annual_subsidy_min: min.annual_subsidy,
        annual_subsidy_max: max.annual_subsidy,
        net_annual_profit_with_subsidy_min: min.net_profit,
        net_annual_profit_with_subsidy_max: max.net_profit,
        net_investment_min: min.net_investment,
        net_investment_max: max.net_investment,
        npv_min: min.npv,
        npv_max: max.npv,
        irr_min: min.irr,
        irr_max: max.irr,
        roi_min_pct: min.roi_pct,
        roi_max_pct: max.roi_pct,
        annualized_roi_min: min.annualized_roi,
        annualized_roi_max: max.annualized_roi,
        payback_years_min: min.payback_years,
        payback_years_max: max.payback_years,
        assessment,
    };

    Ok(EngineRun {
        metrics,
        flows_min: min.flows,
        flows_max: max.flows,
        valuation_date: ctx.valuation_date,
    })
}

/// Evaluate one scenario, returning the metrics and any degenerate-state warnings.
///
/// When `schedule` is `None` and the config is financing-aware, the loan
/// schedule is derived from the parameters.
pub fn evaluate_with_warnings(
    params: &ProjectParameters,
    config: &EngineConfig,
    schedule: Option<&[LoanPayment]>,
) -> VillaInvestResult<(FinancialMetrics, Vec<String>)> {
    params.validate()?;
    config.validate()?;
    let mut warnings = Vec::new();
    let run = run_engine(params, config, schedule, &mut warnings)?;
    Ok((run.metrics, warnings))
}

/// Evaluate one scenario. Warnings are logged and dropped.
pub fn evaluate(
    params: &ProjectParameters,
    config: &EngineConfig,
    schedule: Option<&[LoanPayment]>,
) -> VillaInvestResult<FinancialMetrics> {
    evaluate_with_warnings(params, config, schedule).map(|(metrics, _)| metrics)
}

/// Validate, amortize, evaluate and assemble chart series for one project.
pub fn evaluate_project(
    input: &ProjectInput,
) -> VillaInvestResult<ComputationOutput<ProjectEvaluation>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let params = &input.parameters;
    let config = &input.config;

    params.validate()?;
    config.validate()?;

    let loan_principal = params.loan_principal(total_construction_cost(params)?);
    if loan_principal <= Decimal::ZERO {
        push_warning(
            &mut warnings,
            format!("Equity covers the construction cost; loan principal is {loan_principal}"),
        );
    }
    let loan_schedule = amortize(
        loan_principal,
        params.loan_rate(),
        params.loan_term_years,
        params.repayment_scheme,
    )?;

    let run = run_engine(params, config, Some(&loan_schedule), &mut warnings)?;

    let cash_flows = cash_flow_table(
        &run.flows_min,
        &run.flows_max,
        run.valuation_date,
        config.rate_method == RateMethod::DateWeighted,
    )?;
    let discounted_profit = discounted_profile(
        run.metrics.net_annual_profit_with_subsidy_min,
        run.metrics.net_annual_profit_with_subsidy_max,
        params.discount_rate,
        params.loan_term_years,
    )?;

    let output = ProjectEvaluation {
        metrics: run.metrics,
        loan_principal,
        loan_rate: params.loan_rate(),
        loan_schedule,
        valuation_date: run.valuation_date,
        cash_flows,
        discounted_profit,
    };

    let methodology = match (config.financing_aware, config.rate_method) {
        (true, RateMethod::DateWeighted) => {
            "Villa Project Appraisal: financing-aware, date-weighted NPV/XIRR with terminal value"
        }
        (true, RateMethod::Periodic) => "Villa Project Appraisal: financing-aware, periodic NPV/IRR",
        (false, RateMethod::DateWeighted) => {
            "Villa Project Appraisal: operating profit, date-weighted NPV/XIRR with terminal value"
        }
        (false, RateMethod::Periodic) => "Villa Project Appraisal: operating profit, periodic NPV/IRR",
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        methodology,
        &serde_json::json!({
            "villa_count": params.villa_count,
            "discount_rate": params.discount_rate.to_string(),
            "loan_rate": params.loan_rate().to_string(),
            "loan_term_years": params.loan_term_years,
            "repayment_scheme": params.repayment_scheme.as_str(),
            "subsidy_min": config.subsidy.min.to_string(),
            "subsidy_max": config.subsidy.max.to_string(),
            "terminal_value_multiple": config.terminal_value_multiple.to_string(),
            "inflation_rate": params.inflation_rate.to_string(),
            "inflation_applied": false,
        }),
        warnings,
        elapsed,
        output,
    ))
}
