use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::installment_strip;

/// Format output as tables. Object fields become a Field/Value table; nested
/// arrays of objects (schedule rows, record lists) get a table of their own.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => print_envelope(result, map),
            None => print_object(map),
        },
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{value}"),
    }
}

fn print_envelope(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => print_object(res_map),
        other => print_table(other),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {meth}");
    }
}

fn print_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut nested: Vec<(&str, &Vec<Value>)> = Vec::new();

    for (key, val) in map {
        match val {
            Value::Array(arr) if arr.first().is_some_and(Value::is_object) => {
                nested.push((key.as_str(), arr));
            }
            _ => builder.push_record([key.as_str(), &format_value(val)]),
        }
    }
    println!("{}", Table::from(builder));

    for (key, arr) in nested {
        println!("\n{key}:");
        print_array_table(arr);
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => installment_strip(arr).unwrap_or_else(|| {
            arr.iter().map(format_value).collect::<Vec<_>>().join(", ")
        }),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k}={}", format_value(v)))
            .collect::<Vec<_>>()
            .join(" "),
    }
}
