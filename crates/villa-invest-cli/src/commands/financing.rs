use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use villa_invest_core::financing::{self, LoanInput, RepaymentScheme};
use villa_invest_core::project::total_construction_cost;

use super::ProjectArgs;

/// Arguments for a loan amortization schedule
#[derive(Args)]
pub struct ScheduleArgs {
    /// Loan principal (₪); derived from the project cost less equity when omitted
    #[arg(long, allow_hyphen_values = true)]
    pub principal: Option<Decimal>,

    /// Annual loan rate in percent; prime plus spread when omitted
    #[arg(long)]
    pub rate_pct: Option<Decimal>,

    /// Keep unrounded amounts instead of whole shekels
    #[arg(long)]
    pub exact: bool,

    #[command(flatten)]
    pub project: ProjectArgs,
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let project = args.project.resolve()?;
    let params = &project.parameters;
    params.validate()?;

    let principal = match args.principal {
        Some(principal) => principal,
        None => params.loan_principal(total_construction_cost(params)?),
    };
    let loan = LoanInput {
        principal,
        annual_rate: args
            .rate_pct
            .map(|r| r / dec!(100))
            .unwrap_or_else(|| params.loan_rate()),
        term_years: params.loan_term_years,
        scheme: params.repayment_scheme,
    };

    let mut result = financing::build_loan_schedule(&loan)?;
    if !args.exact {
        let out = &mut result.result;
        out.payments = out.payments.iter().map(|p| p.rounded()).collect();
    }
    Ok(serde_json::to_value(result)?)
}

/// Arguments for comparing first-year financing cost across schemes
#[derive(Args)]
pub struct SchemesArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

/// First-year interest and totals for each repayment scheme on the same loan.
pub fn run_schemes(args: SchemesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let project = args.project.resolve()?;
    let params = &project.parameters;
    params.validate()?;
    let principal = params.loan_principal(total_construction_cost(params)?);

    let mut rows = Vec::with_capacity(RepaymentScheme::ALL.len());
    for scheme in RepaymentScheme::ALL {
        let out = financing::build_loan_schedule(&LoanInput {
            principal,
            annual_rate: params.loan_rate(),
            term_years: params.loan_term_years,
            scheme,
        })?
        .result;
        rows.push(serde_json::json!({
            "scheme": scheme.as_str(),
            "first_payment": out.payments.first().map(|p| p.payment.round()).unwrap_or(Decimal::ZERO),
            "first_year_interest": out.first_year_interest.round(),
            "total_interest": out.total_interest.round(),
            "total_paid": out.total_paid.round(),
        }));
    }
    Ok(Value::Array(rows))
}
