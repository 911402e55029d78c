use serde_json::Value;
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
///
/// Scenario reports print the step log as one table and the ledger summary
/// as another; calculator envelopes print a flat field/value table.
pub fn print_table(value: &Value) {
    let Some(map) = value.as_object() else {
        println!("{}", value);
        return;
    };

    match map.get("result") {
        Some(Value::Object(result)) if result.contains_key("steps") => {
            print_scenario_report(result);
        }
        Some(Value::Object(result)) => {
            print_field_table(result);
        }
        _ => {
            print_field_table(map);
        }
    }

    if let Some(Value::Array(warnings)) = map.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for warning in warnings {
                if let Value::String(s) = warning {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(methodology)) = map.get("methodology") {
        println!("\nMethodology: {}", methodology);
    }
}

fn print_scenario_report(result: &serde_json::Map<String, Value>) {
    if let Some(Value::Array(steps)) = result.get("steps") {
        let mut builder = Builder::default();
        builder.push_record(["at", "action", "ok", "detail"]);
        for step in steps {
            let Some(step) = step.as_object() else {
                continue;
            };
            let detail = step
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| step.get("detail").map(render_value))
                .unwrap_or_default();
            builder.push_record([
                step.get("timestamp").map(render_value).unwrap_or_default(),
                step.get("action").map(render_value).unwrap_or_default(),
                step.get("ok").map(render_value).unwrap_or_default(),
                detail,
            ]);
        }
        println!("{}", Table::from(builder));
    }

    let mut builder = Builder::default();
    builder.push_record(["summary", "value"]);
    for key in ["reserve_balance"] {
        if let Some(v) = result.get(key) {
            builder.push_record([key.to_string(), render_value(v)]);
        }
    }
    for key in ["pools", "credit_lines", "tickets"] {
        if let Some(Value::Array(items)) = result.get(key) {
            builder.push_record([key.to_string(), items.len().to_string()]);
        }
    }
    println!("\n{}", Table::from(builder));
}

fn print_field_table(map: &serde_json::Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, value) in map {
        builder.push_record([key.to_string(), render_value(value)]);
    }
    println!("{}", Table::from(builder));
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
