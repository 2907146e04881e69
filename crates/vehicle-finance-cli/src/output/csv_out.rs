use serde_json::{Map, Value};
use std::io;

use super::installment_strip;

type CsvWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// An amortization schedule exports its month rows; record lists export one
/// line per record; anything else becomes field,value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => match result.get("rows") {
                Some(Value::Array(rows)) => write_array_csv(&mut wtr, rows),
                _ => write_pairs(&mut wtr, result),
            },
            _ => write_pairs(&mut wtr, map),
        },
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_pairs(wtr: &mut CsvWriter<'_>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
}

fn write_array_csv(wtr: &mut CsvWriter<'_>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([format_csv_value(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    let _ = wtr.write_record(&headers);

    for map in arr.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&row);
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => installment_strip(arr)
            .unwrap_or_else(|| serde_json::to_string(value).unwrap_or_default()),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
