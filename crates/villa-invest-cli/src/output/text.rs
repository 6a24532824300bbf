use colored::Colorize;
use serde_json::{Map, Value};

use super::format::{display_field, parse_decimal, percent, percent_points, shekels, years};

/// Plain-language investment report for a project evaluation.
///
/// Anything that does not carry a `metrics` block is printed as `field: value` lines.
pub fn print_text(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result.as_object().and_then(|r| r.get("metrics")).and_then(Value::as_object) {
        Some(metrics) => {
            for line in report_lines(metrics) {
                println!("{line}");
            }
            for alert in alert_lines(metrics) {
                println!("{alert}");
            }
        }
        None => {
            let mut lines = Vec::new();
            flatten_lines("", result, &mut lines);
            for line in lines {
                println!("{line}");
            }
        }
    }

    if let Some(Value::Array(warnings)) = value.as_object().and_then(|m| m.get("warnings")) {
        for w in warnings.iter().filter_map(Value::as_str) {
            println!("{} {}", "warning:".yellow(), w);
        }
    }
}

fn report_lines(m: &Map<String, Value>) -> Vec<String> {
    let get = |key: &str| m.get(key).and_then(parse_decimal);

    let mut lines = vec![
        format!("Total construction cost: {}", shekels(get("total_construction_cost"))),
        format!("Annual operational cost: {}", shekels(get("annual_operational_cost"))),
        format!("Gross annual profit: {}", shekels(get("gross_annual_profit"))),
    ];
    if let Some(financing) = get("annual_financing_cost") {
        lines.push(format!("Annual financing cost: {}", shekels(Some(financing))));
    }
    lines.extend([
        format!(
            "Net annual profit before subsidy: {}",
            shekels(get("net_annual_profit_before_subsidy"))
        ),
        format!(
            "Net annual profit with min subsidy: {}",
            shekels(get("net_annual_profit_with_subsidy_min"))
        ),
        format!(
            "Net annual profit with max subsidy: {}",
            shekels(get("net_annual_profit_with_subsidy_max"))
        ),
        format!("ROI (min subsidy): {}", percent_points(get("roi_min_pct"))),
        format!("ROI (max subsidy): {}", percent_points(get("roi_max_pct"))),
        format!("NPV (min subsidy): {}", shekels(get("npv_min"))),
        format!("NPV (max subsidy): {}", shekels(get("npv_max"))),
        format!("IRR (min subsidy): {}", percent(get("irr_min"))),
        format!("IRR (max subsidy): {}", percent(get("irr_max"))),
        format!("Payback period (min subsidy): {}", years(get("payback_years_min"))),
        format!("Payback period (max subsidy): {}", years(get("payback_years_max"))),
    ]);
    if get("annualized_roi_min").is_some() || get("annualized_roi_max").is_some() {
        lines.push(format!(
            "Annualized ROI (min / max subsidy): {} / {}",
            percent(get("annualized_roi_min")),
            percent(get("annualized_roi_max"))
        ));
    }
    lines
}

fn alert_lines(m: &Map<String, Value>) -> Vec<String> {
    let Some(assessment) = m.get("assessment").and_then(Value::as_object) else {
        return Vec::new();
    };
    let flag = |key: &str| assessment.get(key).and_then(Value::as_bool).unwrap_or(false);

    [("min", "profitable_min"), ("max", "profitable_max")]
        .iter()
        .map(|(bound, key)| {
            if flag(key) {
                format!("{} with {bound} subsidy", "Project is profitable".green().bold())
            } else {
                format!(
                    "{} with {bound} subsidy (NPV not positive or IRR below discount rate)",
                    "Project is not profitable".red().bold()
                )
            }
        })
        .collect()
}

fn flatten_lines(prefix: &str, value: &Value, lines: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_lines(&name, val, lines);
            }
        }
        Value::Array(arr) => lines.push(format!("{prefix}: {} entries", arr.len())),
        other => {
            let leaf = prefix.rsplit('.').next().unwrap_or(prefix);
            lines.push(format!("{prefix}: {}", display_field(leaf, other)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_uses_na_for_missing_irr() {
        let metrics = json!({
            "total_construction_cost": "37750000",
            "npv_min": "-4819902.26",
            "irr_min": null,
            "roi_min_pct": "91.0865066225",
            "payback_years_min": "7.8498"
        });
        let lines = report_lines(metrics.as_object().unwrap());
        assert!(lines.contains(&"Total construction cost: 37,750,000 ₪".to_string()));
        assert!(lines.contains(&"NPV (min subsidy): -4,819,902 ₪".to_string()));
        assert!(lines.contains(&"IRR (min subsidy): N/A".to_string()));
        assert!(lines.contains(&"ROI (min subsidy): 91.09%".to_string()));
        assert!(lines.contains(&"Payback period (min subsidy): 7.85 years".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Annual financing cost")));
    }

    #[test]
    fn test_flatten_lines_formats_leaves() {
        let mut lines = Vec::new();
        flatten_lines("", &json!({"result": {"total_interest": "100", "payments": [1, 2]}}), &mut lines);
        assert_eq!(
            lines,
            vec!["result.payments: 2 entries".to_string(), "result.total_interest: 100 ₪".to_string()]
        );
    }
}
