use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::error::VillaInvestError;
use crate::time_value;
use crate::types::*;
use crate::VillaInvestResult;

const MONTHS_PER_YEAR: u32 = 12;
/// Annual loan rate ceiling (1000%).
const MAX_ANNUAL_RATE: Rate = dec!(10);

/// Repayment scheme for the development loan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepaymentScheme {
    /// Constant monthly payment; the interest/principal mix shifts over time (Spitzer)
    #[default]
    LevelPayment,
    /// Constant principal portion; interest and total payment decline
    EqualPrincipal,
    /// Interest only until the final month, which repays all principal
    Bullet,
}

impl RepaymentScheme {
    pub const ALL: [RepaymentScheme; 3] = [
        RepaymentScheme::LevelPayment,
        RepaymentScheme::EqualPrincipal,
        RepaymentScheme::Bullet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RepaymentScheme::LevelPayment => "level_payment",
            RepaymentScheme::EqualPrincipal => "equal_principal",
            RepaymentScheme::Bullet => "bullet",
        }
    }
}

impl fmt::Display for RepaymentScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepaymentScheme {
    type Err = VillaInvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "level_payment" | "level" | "annuity" | "spitzer" => Ok(RepaymentScheme::LevelPayment),
            "equal_principal" | "equal" | "linear" => Ok(RepaymentScheme::EqualPrincipal),
            "bullet" | "interest_only" => Ok(RepaymentScheme::Bullet),
            other => Err(VillaInvestError::InvalidInput {
                field: "repayment_scheme".into(),
                reason: format!(
                    "Unknown scheme '{other}'; expected level_payment, equal_principal or bullet"
                ),
            }),
        }
    }
}

/// One monthly row of the amortization schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanPayment {
    pub period: u32,
    pub principal: Money,
    pub interest: Money,
    pub payment: Money,
    pub remaining_balance: Money,
}

impl LoanPayment {
    /// Display copy rounded to whole currency units.
    pub fn rounded(&self) -> LoanPayment {
        LoanPayment {
            period: self.period,
            principal: self.principal.round(),
            interest: self.interest.round(),
            payment: self.payment.round(),
            remaining_balance: self.remaining_balance.round(),
        }
    }
}

/// Input for a loan schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanInput {
    pub principal: Money,
    /// Annual nominal rate (e.g. prime + spread)
    pub annual_rate: Rate,
    pub term_years: u32,
    #[serde(default)]
    pub scheme: RepaymentScheme,
}

/// Full schedule with totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanScheduleOutput {
    pub scheme: RepaymentScheme,
    pub monthly_rate: Rate,
    pub payments: Vec<LoanPayment>,
    pub total_interest: Money,
    pub total_principal: Money,
    pub total_paid: Money,
    /// Sum of interest over the first twelve months
    pub first_year_interest: Money,
}

/// Sum of the interest portions of the first 12 monthly payments.
pub fn first_year_interest(payments: &[LoanPayment]) -> Money {
    payments
        .iter()
        .take(MONTHS_PER_YEAR as usize)
        .map(|p| p.interest)
        .sum()
}

/// Build the monthly amortization schedule for a loan.
///
/// Amounts are kept unrounded; use [`LoanPayment::rounded`] for display.
/// A negative principal (equity exceeds cost) yields a schedule of
/// negative amounts rather than an error.
pub fn amortize(
    principal: Money,
    annual_rate: Rate,
    term_years: u32,
    scheme: RepaymentScheme,
) -> VillaInvestResult<Vec<LoanPayment>> {
    if term_years == 0 || term_years > MAX_TERM_YEARS {
        return Err(VillaInvestError::InvalidInput {
            field: "term_years".into(),
            reason: format!("Loan term must be between 1 and {MAX_TERM_YEARS} years"),
        });
    }
    if annual_rate <= dec!(-1) || annual_rate > MAX_ANNUAL_RATE {
        return Err(VillaInvestError::InvalidInput {
            field: "annual_rate".into(),
            reason: "Annual rate must be greater than -100% and at most 1000%".into(),
        });
    }
    if principal.abs() > MAX_AMOUNT {
        return Err(VillaInvestError::InvalidInput {
            field: "principal".into(),
            reason: format!("Principal must not exceed {MAX_AMOUNT} in magnitude"),
        });
    }

    let monthly_rate = annual_rate / Decimal::from(MONTHS_PER_YEAR);
    let num_payments = term_years * MONTHS_PER_YEAR;
    let mut payments = Vec::with_capacity(num_payments as usize);
    let mut balance = principal;

    match scheme {
        RepaymentScheme::LevelPayment => {
            let monthly_payment = time_value::pmt(monthly_rate, num_payments, -principal, Decimal::ZERO)?;
            for period in 1..=num_payments {
                let interest = balance * monthly_rate;
                let principal_part = monthly_payment - interest;
                balance -= principal_part;
                payments.push(LoanPayment {
                    period,
                    principal: principal_part,
                    interest,
                    payment: monthly_payment,
                    remaining_balance: balance,
                });
            }
        }
        RepaymentScheme::EqualPrincipal => {
            let monthly_principal = principal / Decimal::from(num_payments);
            for period in 1..=num_payments {
                let interest = balance * monthly_rate;
                // Final period clears any division residue
                let principal_part = if period == num_payments { balance } else { monthly_principal };
                balance -= principal_part;
                payments.push(LoanPayment {
                    period,
                    principal: principal_part,
                    interest,
                    payment: principal_part + interest,
                    remaining_balance: balance,
                });
            }
        }
        RepaymentScheme::Bullet => {
            for period in 1..=num_payments {
                let interest = balance * monthly_rate;
                let principal_part = if period == num_payments { balance } else { Decimal::ZERO };
                balance -= principal_part;
                payments.push(LoanPayment {
                    period,
                    principal: principal_part,
                    interest,
                    payment: principal_part + interest,
                    remaining_balance: balance,
                });
            }
        }
    }

    Ok(payments)
}

/// Build a loan schedule with totals, wrapped in the computation envelope.
pub fn build_loan_schedule(
    input: &LoanInput,
) -> VillaInvestResult<ComputationOutput<LoanScheduleOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.principal <= Decimal::ZERO {
        warnings.push(format!(
            "Loan principal {} is not positive; equity covers the project and no financing is needed",
            input.principal
        ));
    }

    let payments = amortize(input.principal, input.annual_rate, input.term_years, input.scheme)?;

    let total_interest: Money = payments.iter().map(|p| p.interest).sum();
    let total_principal: Money = payments.iter().map(|p| p.principal).sum();
    let output = LoanScheduleOutput {
        scheme: input.scheme,
        monthly_rate: input.annual_rate / Decimal::from(MONTHS_PER_YEAR),
        first_year_interest: first_year_interest(&payments),
        total_interest,
        total_principal,
        total_paid: total_interest + total_principal,
        payments,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly Loan Amortization",
        &serde_json::json!({
            "principal": input.principal.to_string(),
            "annual_rate": input.annual_rate.to_string(),
            "term_years": input.term_years,
            "scheme": input.scheme.as_str(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn loan(scheme: RepaymentScheme) -> LoanInput {
        LoanInput {
            principal: dec!(120000),
            annual_rate: dec!(0.06),
            term_years: 5,
            scheme,
        }
    }

    #[test]
    fn test_level_payment_amortizes_to_zero() {
        let input = loan(RepaymentScheme::LevelPayment);
        let rows = amortize(input.principal, input.annual_rate, input.term_years, input.scheme).unwrap();
        assert_eq!(rows.len(), 60);
        assert!(rows.last().unwrap().remaining_balance.abs() < dec!(0.000001));

        // Constant payment, principal share grows
        assert!(rows.iter().all(|r| r.payment == rows[0].payment));
        assert!(rows[59].principal > rows[0].principal);
        // 120,000 at 0.5%/month over 60 months ≈ 2,319.94
        assert!((rows[0].payment - dec!(2319.94)).abs() < dec!(0.01));
    }

    #[test]
    fn test_level_payment_zero_rate() {
        let rows = amortize(dec!(1200), Decimal::ZERO, 1, RepaymentScheme::LevelPayment).unwrap();
        assert!(rows.iter().all(|r| r.payment == dec!(100) && r.interest.is_zero()));
        assert_eq!(rows[11].remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn test_equal_principal_declining_payment() {
        let input = loan(RepaymentScheme::EqualPrincipal);
        let rows = amortize(input.principal, input.annual_rate, input.term_years, input.scheme).unwrap();
        assert_eq!(rows[0].principal, dec!(2000));
        assert_eq!(rows[0].interest, dec!(600));
        assert_eq!(rows[0].payment, dec!(2600));
        for w in rows.windows(2) {
            assert!(w[1].payment < w[0].payment);
        }
        assert_eq!(rows.last().unwrap().remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn test_bullet_interest_only_then_principal() {
        let input = loan(RepaymentScheme::Bullet);
        let rows = amortize(input.principal, input.annual_rate, input.term_years, input.scheme).unwrap();
        for r in &rows[..59] {
            assert_eq!(r.principal, Decimal::ZERO);
            assert_eq!(r.interest, dec!(600));
            assert_eq!(r.remaining_balance, dec!(120000));
        }
        let last = &rows[59];
        assert_eq!(last.principal, dec!(120000));
        assert_eq!(last.payment, dec!(120600));
        assert_eq!(last.remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn test_negative_principal_does_not_fail() {
        let rows = amortize(dec!(-50000), dec!(0.05), 2, RepaymentScheme::LevelPayment).unwrap();
        assert_eq!(rows.len(), 24);
        assert!(rows[0].payment < Decimal::ZERO);
        assert!(rows.last().unwrap().remaining_balance.abs() < dec!(0.000001));
    }

    #[test]
    fn test_zero_term_error() {
        assert!(amortize(dec!(1000), dec!(0.05), 0, RepaymentScheme::Bullet).is_err());
    }

    #[test]
    fn test_out_of_range_loans_rejected() {
        let scheme = RepaymentScheme::LevelPayment;
        assert!(amortize(dec!(1000), dec!(0.05), MAX_TERM_YEARS + 1, scheme).is_err());
        assert!(amortize(dec!(1000), dec!(11), 10, scheme).is_err());
        assert!(amortize(MAX_AMOUNT * dec!(2), dec!(0.05), 10, scheme).is_err());
        // Longest term at a 200% rate still amortizes
        let long = amortize(MAX_AMOUNT, dec!(2), MAX_TERM_YEARS, scheme).unwrap();
        assert_eq!(long.len(), 1200);
    }

    #[test]
    fn test_rounded_copy() {
        let row = LoanPayment {
            period: 1,
            principal: dec!(10.6),
            interest: dec!(0.4),
            payment: dec!(11.0),
            remaining_balance: dec!(989.4),
        };
        let r = row.rounded();
        assert_eq!(r.principal, dec!(11));
        assert_eq!(r.interest, dec!(0));
        assert_eq!(r.remaining_balance, dec!(989));
    }

    #[test]
    fn test_schedule_totals_and_warning() {
        let result = build_loan_schedule(&loan(RepaymentScheme::Bullet)).unwrap();
        let out = &result.result;
        assert_eq!(out.total_principal, dec!(120000));
        assert_eq!(out.total_interest, dec!(36000));
        assert_eq!(out.first_year_interest, dec!(7200));
        assert!(result.warnings.is_empty());

        let mut negative = loan(RepaymentScheme::Bullet);
        negative.principal = dec!(-1);
        let result = build_loan_schedule(&negative).unwrap();
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_scheme_parsing() {
        assert_eq!("bullet".parse::<RepaymentScheme>().unwrap(), RepaymentScheme::Bullet);
        assert_eq!("Equal-Principal".parse::<RepaymentScheme>().unwrap(), RepaymentScheme::EqualPrincipal);
        assert_eq!("spitzer".parse::<RepaymentScheme>().unwrap(), RepaymentScheme::LevelPayment);
        assert!("balloon".parse::<RepaymentScheme>().is_err());
    }
}
