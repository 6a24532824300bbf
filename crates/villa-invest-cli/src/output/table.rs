use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::format::display_field;

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result(result);
                print_envelope_notes(map);
            } else {
                print_section(None, map);
            }
        }
        Value::Array(arr) => print_array_table(None, arr),
        _ => println!("{}", value),
    }
}

fn print_result(result: &Value) {
    match result {
        Value::Object(map) if is_sensitivity_grid(map) => print_grid(map),
        Value::Object(map) => print_section(None, map),
        Value::Array(arr) => print_array_table(None, arr),
        other => println!("{}", other),
    }
}

/// Scalars in one Field/Value table; nested objects and arrays as their own tables.
fn print_section(title: Option<&str>, map: &Map<String, Value>) {
    let scalars: Vec<(&String, &Value)> = map
        .iter()
        .filter(|(_, v)| !v.is_object() && !is_row_array(v))
        .collect();
    if !scalars.is_empty() {
        if let Some(title) = title {
            println!("\n{}", title);
        }
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in scalars {
            builder.push_record([key.as_str(), &display_field(key, val)]);
        }
        println!("{}", Table::from(builder));
    }

    for (key, val) in map {
        match val {
            Value::Object(nested) => print_section(Some(key), nested),
            Value::Array(arr) if is_row_array(val) => print_array_table(Some(key), arr),
            _ => {}
        }
    }
}

fn is_row_array(value: &Value) -> bool {
    matches!(value, Value::Array(arr) if arr.first().is_some_and(Value::is_object))
}

fn print_array_table(title: Option<&str>, arr: &[Value]) {
    if let Some(title) = title {
        println!("\n{}", title);
    }
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        // Nested records (e.g. full metrics per sweep point) are shown as JSON
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        map.get(h.as_str())
                            .map(|v| match v {
                                Value::Object(_) | Value::Array(_) => {
                                    serde_json::to_string(v).unwrap_or_default()
                                }
                                _ => display_field(h, v),
                            })
                            .unwrap_or_default()
                    })
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", display_field("", item));
        }
    }
}

fn is_sensitivity_grid(map: &Map<String, Value>) -> bool {
    map.contains_key("matrix")
        && map.contains_key("variable_1_values")
        && map.contains_key("variable_2_values")
}

/// Rows = variable 1, columns = variable 2.
fn print_grid(map: &Map<String, Value>) {
    let empty = Vec::new();
    let as_array = |key: &str| map.get(key).and_then(Value::as_array).unwrap_or(&empty);
    let name = |key: &str| map.get(key).and_then(Value::as_str).unwrap_or_default().to_string();

    let metric = name("output_metric");
    let var1 = name("variable_1_name");
    let var2 = name("variable_2_name");

    let mut builder = Builder::default();
    let mut header = vec![format!("{var1} \\ {var2}")];
    header.extend(as_array("variable_2_values").iter().map(|v| display_field(&var2, v)));
    builder.push_record(header);

    for (v1, row) in as_array("variable_1_values").iter().zip(as_array("matrix")) {
        let mut record = vec![display_field(&var1, v1)];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(|c| display_field(&metric, c)));
        }
        builder.push_record(record);
    }

    println!("{}: {}", "Metric", metric);
    println!("{}", Table::from(builder));
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}
