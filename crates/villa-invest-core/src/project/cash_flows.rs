use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::VillaInvestError;
use crate::types::*;
use crate::VillaInvestResult;

/// One year of the projected cash-flow series for both subsidy bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowRow {
    pub year: u32,
    pub date: NaiveDate,
    pub flow_min_subsidy: Money,
    pub flow_max_subsidy: Money,
    pub is_terminal: bool,
}

/// Discounted annual profit for the cash-flow chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountedProfitPoint {
    pub year: u32,
    pub discounted_profit_min: Money,
    pub discounted_profit_max: Money,
}

/// Level annuity series: `-outlay` at year 0 then `annual_profit` for each year of the term.
pub fn annual_series(outlay: Money, annual_profit: Money, term_years: u32) -> Vec<Money> {
    let mut flows = Vec::with_capacity(term_years as usize + 2);
    flows.push(-outlay);
    flows.extend(std::iter::repeat(annual_profit).take(term_years as usize));
    flows
}

/// Append `multiple` × last flow as a terminal value one year after the term.
pub fn with_terminal_value(mut flows: Vec<Money>, multiple: Multiple) -> Vec<Money> {
    if let Some(&last) = flows.last() {
        flows.push(last * multiple);
    }
    flows
}

/// Date of flow `k`: exactly `k` calendar years after the valuation date.
pub fn flow_date(valuation_date: NaiveDate, year: u32) -> VillaInvestResult<NaiveDate> {
    valuation_date
        .checked_add_months(Months::new(year * 12))
        .ok_or_else(|| {
            VillaInvestError::DateError(format!("Cannot date flow {year} years after {valuation_date}"))
        })
}

/// Attach dates (flow k at valuation date + k years) to a periodic series.
pub fn date_series(flows: &[Money], valuation_date: NaiveDate) -> VillaInvestResult<Vec<CashFlow>> {
    flows
        .iter()
        .enumerate()
        .map(|(k, amount)| {
            let label = match k {
                0 => "construction".to_string(),
                k => format!("year {k}"),
            };
            Ok(CashFlow {
                date: flow_date(valuation_date, k as u32)?,
                amount: *amount,
                label: Some(label),
            })
        })
        .collect()
}

/// Side-by-side rows of the min and max subsidy series.
pub fn cash_flow_table(
    flows_min: &[Money],
    flows_max: &[Money],
    valuation_date: NaiveDate,
    has_terminal: bool,
) -> VillaInvestResult<Vec<CashFlowRow>> {
    let last = flows_min.len().saturating_sub(1);
    flows_min
        .iter()
        .zip(flows_max)
        .enumerate()
        .map(|(k, (min, max))| {
            Ok(CashFlowRow {
                year: k as u32,
                date: flow_date(valuation_date, k as u32)?,
                flow_min_subsidy: *min,
                flow_max_subsidy: *max,
                is_terminal: has_terminal && k == last,
            })
        })
        .collect()
}

/// Annual profit discounted at `rate` for years 1..=term, for both subsidy bounds.
pub fn discounted_profile(
    profit_min: Money,
    profit_max: Money,
    rate: Rate,
    term_years: u32,
) -> VillaInvestResult<Vec<DiscountedProfitPoint>> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return Err(VillaInvestError::InvalidInput {
            field: "discount_rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut points = Vec::with_capacity(term_years as usize);
    let mut factor = Some(Decimal::ONE);
    for year in 1..=term_years {
        factor = factor.and_then(|f| f.checked_mul(one_plus_r));
        // Past the representable factor, profit is discounted to nothing
        let discount = |profit: Money| {
            factor
                .and_then(|f| profit.checked_div(f))
                .unwrap_or(Decimal::ZERO)
        };
        points.push(DiscountedProfitPoint {
            year,
            discounted_profit_min: discount(profit_min),
            discounted_profit_max: discount(profit_max),
        });
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_annual_series_shape() {
        let flows = annual_series(dec!(1000), dec!(150), 3);
        assert_eq!(flows, vec![dec!(-1000), dec!(150), dec!(150), dec!(150)]);
    }

    #[test]
    fn test_terminal_value_appended() {
        let flows = with_terminal_value(annual_series(dec!(1000), dec!(150), 2), dec!(10));
        assert_eq!(flows.len(), 4);
        assert_eq!(flows[3], dec!(1500));
    }

    #[test]
    fn test_dates_are_whole_years_apart() {
        let dated = date_series(&[dec!(-1), dec!(1), dec!(1)], date(2024, 2, 29)).unwrap();
        assert_eq!(dated[0].date, date(2024, 2, 29));
        // Leap day clamps to the end of February
        assert_eq!(dated[1].date, date(2025, 2, 28));
        assert_eq!(dated[2].date, date(2026, 2, 28));
        assert_eq!(dated[0].label.as_deref(), Some("construction"));
    }

    #[test]
    fn test_discounted_profile() {
        let points = discounted_profile(dec!(108), dec!(216), dec!(0.08), 2).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].discounted_profit_min, dec!(100));
        assert_eq!(points[0].discounted_profit_max, dec!(200));
        assert!(points[1].discounted_profit_min < points[0].discounted_profit_min);
    }

    #[test]
    fn test_discounted_profile_past_factor_range() {
        let points = discounted_profile(dec!(1000), dec!(2000), Decimal::ONE, 100).unwrap();
        assert_eq!(points.len(), 100);
        assert_eq!(points[0].discounted_profit_min, dec!(500));
        assert_eq!(points[99].discounted_profit_max, Decimal::ZERO);
        assert!(points.windows(2).all(|w| w[1].discounted_profit_min <= w[0].discounted_profit_min));
    }

    #[test]
    fn test_cash_flow_table_marks_terminal() {
        let min = with_terminal_value(annual_series(dec!(100), dec!(10), 2), dec!(10));
        let max = with_terminal_value(annual_series(dec!(100), dec!(20), 2), dec!(10));
        let rows = cash_flow_table(&min, &max, date(2025, 1, 1), true).unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows[3].is_terminal);
        assert!(!rows[2].is_terminal);
        assert_eq!(rows[3].flow_max_subsidy, dec!(200));
    }
}
