use serde_json::{Map, Value};
use std::io;

/// Row collections a result may carry; the first one present is written as the table.
const ROW_KEYS: [&str; 5] = ["payments", "loan_schedule", "points", "rows", "cash_flows"];

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        Value::Object(map) => {
            if let Some(rows) = ROW_KEYS
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_array))
            {
                write_array_csv(&mut wtr, rows);
            } else {
                write_field_csv(&mut wtr, map);
            }
        }
        other => {
            let _ = wtr.write_record([&format_csv_value(other)]);
        }
    }

    let _ = wtr.flush();
}

fn write_field_csv(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    let mut rows = Vec::new();
    flatten("", &Value::Object(map.clone()), &mut rows);
    for (key, val) in rows {
        let _ = wtr.write_record([key, val]);
    }
}

/// Nested objects become dotted keys; arrays are kept as inline JSON.
fn flatten(prefix: &str, value: &Value, rows: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&name, val, rows);
            }
        }
        other => rows.push((prefix.to_string(), format_csv_value(other))),
    }
}

fn write_array_csv(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let mut headers = Vec::new();
        flatten("", &Value::Object(first.clone()), &mut headers);
        let headers: Vec<String> = headers.into_iter().map(|(k, _)| k).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            let mut cells = Vec::new();
            flatten("", item, &mut cells);
            let row: Vec<String> = headers
                .iter()
                .map(|h| {
                    cells
                        .iter()
                        .find(|(k, _)| k == h)
                        .map(|(_, v)| v.clone())
                        .unwrap_or_default()
                })
                .collect();
            let _ = wtr.write_record(&row);
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
