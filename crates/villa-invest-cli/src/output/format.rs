use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use std::str::FromStr;

const NOT_AVAILABLE: &str = "N/A";

const MONEY_HINTS: [&str; 14] = [
    "cost", "revenue", "profit", "npv", "subsidy", "investment", "principal", "interest",
    "payment", "balance", "price", "equity", "paid", "flow",
];

/// Decimal from a JSON string or number.
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        _ => None,
    }
}

/// Whole units with thousands separators: 37750000 → "37,750,000".
pub fn group_thousands(amount: Decimal) -> String {
    let rounded = amount.round();
    let digits = rounded.abs().trunc().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn shekels(amount: Option<Decimal>) -> String {
    amount
        .map(|a| format!("{} ₪", group_thousands(a)))
        .unwrap_or_else(|| NOT_AVAILABLE.into())
}

/// Fraction to percent: 0.0584 → "5.84%".
pub fn percent(rate: Option<Decimal>) -> String {
    rate.map(|r| format!("{:.2}%", (r * dec!(100)).round_dp(2)))
        .unwrap_or_else(|| NOT_AVAILABLE.into())
}

/// Value already in percent: 91.0865 → "91.09%".
pub fn percent_points(pct: Option<Decimal>) -> String {
    pct.map(|p| format!("{:.2}%", p.round_dp(2)))
        .unwrap_or_else(|| NOT_AVAILABLE.into())
}

pub fn years(value: Option<Decimal>) -> String {
    value
        .map(|y| format!("{:.2} years", y.round_dp(2)))
        .unwrap_or_else(|| NOT_AVAILABLE.into())
}

/// Render a result field for humans, guided by its name.
pub fn display_field(key: &str, value: &Value) -> String {
    match value {
        Value::Null => return NOT_AVAILABLE.into(),
        Value::Bool(b) => return if *b { "yes".into() } else { "no".into() },
        _ => {}
    }
    let Some(number) = parse_decimal(value) else {
        return match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
    };

    let key = key.to_lowercase();
    if key.ends_with("_pct") {
        percent_points(Some(number))
    } else if key.contains("irr") || key.contains("annualized_roi") || key.ends_with("rate") {
        percent(Some(number))
    } else if key.starts_with("payback") {
        years(Some(number))
    } else if MONEY_HINTS.iter().any(|hint| key.contains(hint)) {
        shekels(Some(number))
    } else {
        number.normalize().to_string()
    }
}
