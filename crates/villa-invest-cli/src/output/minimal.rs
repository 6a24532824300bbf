use serde_json::Value;

/// Key answer fields, most telling first.
const PRIORITY_KEYS: [&str; 7] = [
    "npv_min",
    "roi_min_pct",
    "irr_min",
    "first_year_interest",
    "total_interest",
    "base_case_value",
    "directory",
];

/// Print just the key answer value from the output.
///
/// Looks inside `result` (and its `metrics` block when present) for the first
/// non-null priority field, then falls back to the first field.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);
    let target = result_obj
        .as_object()
        .and_then(|m| m.get("metrics"))
        .filter(|m| m.is_object())
        .unwrap_or(result_obj);

    println!("{}", minimal_line(target));
}

fn minimal_line(target: &Value) -> String {
    if let Value::Object(map) = target {
        for key in &PRIORITY_KEYS {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    return format_minimal(val);
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, format_minimal(val));
        }
    }

    format_minimal(target)
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_skips_null_priority_fields() {
        let metrics = json!({"irr_min": "0.05", "npv_min": null, "roi_min_pct": "91.08"});
        assert_eq!(minimal_line(&metrics), "91.08");
    }

    #[test]
    fn test_falls_back_to_first_field() {
        assert_eq!(minimal_line(&json!({"villa_count": 5})), "villa_count: 5");
    }
}
