use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::VillaInvestError;
use crate::types::{Money, Rate};
use crate::VillaInvestResult;

/// |NPV| below which a candidate rate is accepted as the root.
pub const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const STEP_THRESHOLD: Decimal = dec!(0.000000000001);
const MAX_IRR_ITERATIONS: u32 = 100;
const MAX_BISECTION_ITERATIONS: u32 = 200;
const RATE_FLOOR: Decimal = dec!(-0.99);
const RATE_CEILING: Decimal = dec!(10);
const DAYS_PER_YEAR: Decimal = dec!(365);

/// Rates sampled (in order) when looking for a sign change to bisect.
const BRACKET_LADDER: [Decimal; 14] = [
    dec!(-0.9),
    dec!(-0.75),
    dec!(-0.5),
    dec!(-0.25),
    dec!(-0.1),
    dec!(0),
    dec!(0.05),
    dec!(0.1),
    dec!(0.2),
    dec!(0.35),
    dec!(0.5),
    dec!(1),
    dec!(3),
    dec!(10),
];

/// Net Present Value of a series of cash flows (flow 0 undiscounted)
pub fn npv(rate: Rate, cash_flows: &[Money]) -> VillaInvestResult<Money> {
    if rate <= dec!(-1) {
        return Err(VillaInvestError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            match discount.checked_mul(one_plus_r) {
                Some(d) => discount = d,
                // Remaining flows are discounted to nothing
                None => break,
            }
        }
        if discount.is_zero() {
            return Err(VillaInvestError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result += cf.checked_div(discount).ok_or_else(|| VillaInvestError::InvalidInput {
            field: "rate".into(),
            reason: format!("Discounted value at period {t} is out of range"),
        })?;
    }

    Ok(result)
}

/// Elapsed years between two dates on an actual/365 basis.
pub fn year_fraction(from: NaiveDate, to: NaiveDate) -> Decimal {
    Decimal::from((to - from).num_days()) / DAYS_PER_YEAR
}

/// Net Present Value of dated cash flows, discounted to the first flow's date
pub fn xnpv(rate: Rate, dated_flows: &[(NaiveDate, Money)]) -> VillaInvestResult<Money> {
    if rate <= dec!(-1) {
        return Err(VillaInvestError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    let Some(&(base_date, _)) = dated_flows.first() else {
        return Ok(Decimal::ZERO);
    };

    let times: Vec<Decimal> = dated_flows
        .iter()
        .map(|(date, _)| year_fraction(base_date, *date))
        .collect();
    let amounts: Vec<Money> = dated_flows.iter().map(|(_, amount)| *amount).collect();

    npv_and_derivative(&times, &amounts, rate)
        .map(|(value, _)| value)
        .ok_or_else(|| VillaInvestError::InvalidInput {
            field: "rate".into(),
            reason: "Discount factors out of range for the given cash flows".into(),
        })
}

/// NPV and dNPV/dr at `rate` for flows at times `times` (in periods).
///
/// Uses v = 1/(1+r) so that high rates underflow to zero rather than
/// overflow. Returns None when a term is not representable, which only
/// happens for deeply negative rates.
fn npv_and_derivative(times: &[Decimal], amounts: &[Money], rate: Rate) -> Option<(Money, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }
    let v = Decimal::ONE.checked_div(one_plus_r)?;

    let mut npv_val = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;

    for (t, cf) in times.iter().zip(amounts) {
        let factor = if t.is_zero() {
            Decimal::ONE
        } else if t.fract().is_zero() {
            v.checked_powi(t.to_i64()?)?
        } else {
            v.checked_powd(*t)?
        };
        let term = cf.checked_mul(factor)?;
        npv_val = npv_val.checked_add(term)?;
        if !t.is_zero() {
            let d = t.checked_mul(term)?.checked_mul(v)?;
            dnpv = dnpv.checked_sub(d)?;
        }
    }

    Some((npv_val, dnpv))
}

/// Newton-Raphson from `guess`, falling back to bisection over a bracket.
fn solve_rate(function: &str, times: &[Decimal], amounts: &[Money], guess: Rate) -> VillaInvestResult<Rate> {
    let has_positive = amounts.iter().any(|cf| *cf > Decimal::ZERO);
    let has_negative = amounts.iter().any(|cf| *cf < Decimal::ZERO);
    if !has_positive || !has_negative {
        return Err(VillaInvestError::ConvergenceFailure {
            function: function.into(),
            iterations: 0,
            last_delta: amounts.iter().copied().sum(),
        });
    }

    let mut rate = guess;
    for _ in 0..MAX_IRR_ITERATIONS {
        let Some((npv_val, dnpv)) = npv_and_derivative(times, amounts, rate) else {
            break;
        };

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return Ok(rate);
        }
        if dnpv.is_zero() {
            break;
        }
        let Some(step) = npv_val.checked_div(dnpv) else {
            break;
        };

        let next = (rate - step).max(RATE_FLOOR).min(RATE_CEILING);
        if (next - rate).abs() < STEP_THRESHOLD {
            return Ok(next);
        }
        rate = next;
    }

    log::debug!("{function}: Newton-Raphson did not settle, falling back to bisection");
    bisect_rate(function, times, amounts)
}

fn bisect_rate(function: &str, times: &[Decimal], amounts: &[Money]) -> VillaInvestResult<Rate> {
    let samples: Vec<(Rate, Money)> = BRACKET_LADDER
        .iter()
        .filter_map(|r| npv_and_derivative(times, amounts, *r).map(|(v, _)| (*r, v)))
        .collect();

    let bracket = samples
        .windows(2)
        .find(|w| w[0].1.is_sign_negative() != w[1].1.is_sign_negative());

    let Some(&[(mut low, mut npv_low), (mut high, _)]) = bracket else {
        return Err(VillaInvestError::ConvergenceFailure {
            function: function.into(),
            iterations: 0,
            last_delta: samples.last().map(|p| p.1).unwrap_or_default(),
        });
    };

    for _ in 0..MAX_BISECTION_ITERATIONS {
        let mid = (low + high) / dec!(2);
        let Some((npv_mid, _)) = npv_and_derivative(times, amounts, mid) else {
            break;
        };

        if npv_mid.abs() < CONVERGENCE_THRESHOLD || (high - low) / dec!(2) < STEP_THRESHOLD {
            return Ok(mid);
        }

        if npv_mid.is_sign_negative() == npv_low.is_sign_negative() {
            low = mid;
            npv_low = npv_mid;
        } else {
            high = mid;
        }
    }

    Err(VillaInvestError::ConvergenceFailure {
        function: function.into(),
        iterations: MAX_BISECTION_ITERATIONS,
        last_delta: high - low,
    })
}

/// Internal Rate of Return for evenly spaced periodic flows
pub fn irr(cash_flows: &[Money], guess: Rate) -> VillaInvestResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(VillaInvestError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }

    let times: Vec<Decimal> = (0..cash_flows.len()).map(|t| Decimal::from(t as i64)).collect();
    solve_rate("IRR", &times, cash_flows, guess)
}

/// Extended IRR for irregular cash flow dates (actual/365 exponents)
pub fn xirr(dated_flows: &[(NaiveDate, Money)], guess: Rate) -> VillaInvestResult<Rate> {
    if dated_flows.len() < 2 {
        return Err(VillaInvestError::InsufficientData(
            "XIRR requires at least 2 cash flows".into(),
        ));
    }

    let base_date = dated_flows[0].0;
    if dated_flows.iter().any(|(date, _)| *date < base_date) {
        return Err(VillaInvestError::DateError(
            "XIRR cash flows must not precede the first flow".into(),
        ));
    }

    let times: Vec<Decimal> = dated_flows
        .iter()
        .map(|(date, _)| year_fraction(base_date, *date))
        .collect();
    let amounts: Vec<Money> = dated_flows.iter().map(|(_, amount)| *amount).collect();
    solve_rate("XIRR", &times, &amounts, guess)
}

/// Payment (PMT)
pub fn pmt(rate: Rate, nper: u32, present_value: Money, future_value: Money) -> VillaInvestResult<Money> {
    if nper == 0 {
        return Err(VillaInvestError::InvalidInput {
            field: "nper".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    if rate.is_zero() {
        return Ok(-(present_value + future_value) / Decimal::from(nper));
    }

    // Discounting form: stays in range for long terms where (1+r)^n would overflow
    let one_plus_r = Decimal::ONE + rate;
    let out_of_range = || VillaInvestError::InvalidInput {
        field: "rate".into(),
        reason: "Compounding factor out of range".into(),
    };
    let v = Decimal::ONE.checked_div(one_plus_r).ok_or_else(out_of_range)?;
    let v_n = v.checked_powu(nper as u64).ok_or_else(out_of_range)?;
    let denominator = Decimal::ONE - v_n;

    if denominator.is_zero() {
        return Err(VillaInvestError::DivisionByZero {
            context: "PMT annuity factor".into(),
        });
    }

    future_value
        .checked_mul(v_n)
        .and_then(|fv| present_value.checked_add(fv))
        .and_then(|total| total.checked_mul(rate))
        .and_then(|scaled| scaled.checked_div(denominator))
        .map(|payment| -payment)
        .ok_or_else(out_of_range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // NPV at 10%: -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(0.01));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        let result = npv(dec!(0.0), &cfs).unwrap();
        assert_eq!(result, dec!(50));
    }

    #[test]
    fn test_npv_rejects_rate_below_minus_one() {
        assert!(npv(dec!(-1), &[dec!(-100), dec!(110)]).is_err());
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let result = irr(&cfs, dec!(0.10)).unwrap();
        // IRR should be ~9.7%
        assert!((result - dec!(0.097)).abs() < dec!(0.001));
    }

    #[test]
    fn test_irr_seeded_at_zero() {
        let cfs = vec![dec!(-100), dec!(0), dec!(121)];
        let result = irr(&cfs, Decimal::ZERO).unwrap();
        assert!((result - dec!(0.10)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_irr_no_sign_change() {
        let cfs = vec![dec!(100), dec!(50), dec!(50)];
        assert!(matches!(
            irr(&cfs, dec!(0.1)),
            Err(VillaInvestError::ConvergenceFailure { .. })
        ));
    }

    #[test]
    fn test_irr_needs_two_flows() {
        assert!(matches!(
            irr(&[dec!(-100)], dec!(0.1)),
            Err(VillaInvestError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_irr_from_far_guess_uses_fallback() {
        // Long series where Newton from a wild guess lands on the clamp
        let mut cfs = vec![dec!(-10000)];
        cfs.extend(vec![dec!(900); 30]);
        let result = irr(&cfs, dec!(9.5)).unwrap();
        let check = npv(result, &cfs).unwrap();
        assert!(check.abs() < dec!(0.01), "NPV at IRR was {check}");
    }

    #[test]
    fn test_xirr_one_year_exact() {
        let flows = vec![(date(2023, 1, 1), dec!(-1000)), (date(2024, 1, 1), dec!(1100))];
        let result = xirr(&flows, Decimal::ZERO).unwrap();
        assert!((result - dec!(0.10)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_xnpv_matches_npv_on_365_day_years() {
        // 2021-2023 has no leap day, so every gap is exactly 365 days
        let flows = vec![
            (date(2021, 1, 1), dec!(-1000)),
            (date(2022, 1, 1), dec!(600)),
            (date(2023, 1, 1), dec!(600)),
        ];
        let dated = xnpv(dec!(0.08), &flows).unwrap();
        let periodic = npv(dec!(0.08), &[dec!(-1000), dec!(600), dec!(600)]).unwrap();
        assert!((dated - periodic).abs() < dec!(0.0001));
    }

    #[test]
    fn test_xirr_rejects_backdated_flows() {
        let flows = vec![(date(2024, 1, 1), dec!(-1000)), (date(2023, 1, 1), dec!(1100))];
        assert!(matches!(
            xirr(&flows, Decimal::ZERO),
            Err(VillaInvestError::DateError(_))
        ));
    }

    #[test]
    fn test_pmt_annuity() {
        // 100,000 over 12 months at 1% per month ≈ 8,884.88
        let payment = pmt(dec!(0.01), 12, dec!(-100000), Decimal::ZERO).unwrap();
        assert!((payment - dec!(8884.88)).abs() < dec!(0.01));
    }

    #[test]
    fn test_pmt_long_term_stays_in_range() {
        // (1 + 1/6)^1200 is far beyond Decimal range; the payment tends to pv * r
        let rate = Decimal::ONE / dec!(6);
        let payment = pmt(rate, 1200, dec!(-1000000), Decimal::ZERO).unwrap();
        assert!((payment - dec!(1000000) * rate).abs() < dec!(0.0001));
    }

    #[test]
    fn test_pmt_zero_rate() {
        let payment = pmt(Decimal::ZERO, 10, dec!(-1000), Decimal::ZERO).unwrap();
        assert_eq!(payment, dec!(100));
    }
}
