use serde_json::Value;

use super::installment_strip;

/// Print just the key answer value from the output.
///
/// Looks for well-known loan figures in priority order, then falls back to
/// the first field of the result object.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "monthly_installment",
        "score",
        "percent",
        "total_payable",
        "installments",
        "id",
    ];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => installment_strip(arr)
            .unwrap_or_else(|| serde_json::to_string(value).unwrap_or_default()),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
