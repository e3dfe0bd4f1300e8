pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("JSON serialization error: {e}"),
    }
}

/// Flatten nested objects into dotted keys (`outcome.new_amount`).
/// Arrays and scalars stay as they are.
pub fn flatten(map: &Map<String, Value>) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into(&mut out, None, map);
    out
}

fn flatten_into(out: &mut Vec<(String, Value)>, prefix: Option<&str>, map: &Map<String, Value>) {
    for (key, val) in map {
        let full = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key.clone(),
        };
        match val {
            Value::Object(inner) => flatten_into(out, Some(&full), inner),
            _ => out.push((full, val.clone())),
        }
    }
}

/// Column headers for an array of objects: every flattened key, in the
/// order first seen.
pub fn union_headers(rows: &[Vec<(String, Value)>]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for row in rows {
        for (key, _) in row {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    headers
}

/// Render a scalar for a table cell or CSV field.
pub fn format_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_cell).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nests_with_dots() {
        let value = json!({"index": 0, "outcome": {"outcome": "applied", "new_amount": "1100.00"}});
        let flat = flatten(value.as_object().unwrap());
        let keys: Vec<&str> = flat.iter().map(|(k, _)| k.as_str()).collect();
        // serde_json maps iterate in key order
        assert_eq!(keys, vec!["index", "outcome.new_amount", "outcome.outcome"]);
    }

    #[test]
    fn test_union_headers_keeps_first_seen_order() {
        let a = flatten(json!({"date": "2026-01-01", "new_amount": "1"}).as_object().unwrap());
        let b = json!({"date": "2026-07-01", "factor": "1.1", "new_amount": "2"});
        let b = flatten(b.as_object().unwrap());
        assert_eq!(union_headers(&[a, b]), vec!["date", "new_amount", "factor"]);
    }

    #[test]
    fn test_null_cells_are_blank() {
        assert_eq!(format_cell(&Value::Null), "");
        assert_eq!(format_cell(&json!(["a", 1])), "a, 1");
    }
}
