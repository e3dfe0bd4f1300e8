use colored::Colorize;
use serde_json::Value;

/// Fields that answer the question a command was asked, in priority order.
const PRIORITY_KEYS: [&str; 7] = [
    "status",
    "amount",
    "value",
    "username",
    "logged_out",
    "deleted",
    "new_amount",
];

/// Print just the key answer value from the output.
///
/// Arrays print one line per element; listings come out as
/// `index tenant amount status`.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Array(items) => {
            for item in items {
                println!("{}", summarize_row(item));
            }
        }
        other => println!("{}", key_answer(other)),
    }
}

fn key_answer(value: &Value) -> String {
    let Value::Object(map) = value else {
        return format_minimal(value);
    };
    for key in PRIORITY_KEYS {
        if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
            return if key == "status" {
                colorize_status(&format_minimal(val))
            } else {
                format_minimal(val)
            };
        }
    }
    map.iter()
        .next()
        .map(|(key, val)| format!("{}: {}", key, format_minimal(val)))
        .unwrap_or_default()
}

fn summarize_row(item: &Value) -> String {
    let Value::Object(map) = item else {
        return format_minimal(item);
    };
    let field = |k: &str| map.get(k).map(format_minimal).unwrap_or_default();
    if map.contains_key("tenant") {
        format!(
            "{}\t{}\t{}\t{}",
            field("index"),
            field("tenant"),
            field("amount"),
            colorize_status(&field("status"))
        )
    } else if map.contains_key("new_amount") {
        format!("{}\t{} -> {}", field("date"), field("previous_amount"), field("new_amount"))
    } else {
        key_answer(item)
    }
}

fn colorize_status(status: &str) -> String {
    match status {
        "overdue" => status.red().bold().to_string(),
        "due-soon" => status.yellow().bold().to_string(),
        "current" => status.green().to_string(),
        other => other.to_string(),
    }
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
