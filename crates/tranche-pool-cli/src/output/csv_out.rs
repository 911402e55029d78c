use serde_json::Value;
use std::io;

/// Write output as CSV to stdout. Scenario reports emit the step log;
/// calculator envelopes emit field/value rows.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut writer = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) if result.contains_key("steps") => {
                if let Some(Value::Array(steps)) = result.get("steps") {
                    write_records(&mut writer, steps);
                }
            }
            Some(Value::Object(result)) => {
                write_fields(&mut writer, result);
            }
            _ => write_fields(&mut writer, map),
        },
        Value::Array(items) => write_records(&mut writer, items),
        _ => {
            let _ = writer.write_record([format_csv_value(value)]);
        }
    }

    let _ = writer.flush();
}

fn write_fields(writer: &mut csv::Writer<io::StdoutLock<'_>>, map: &serde_json::Map<String, Value>) {
    let _ = writer.write_record(["field", "value"]);
    for (key, value) in map {
        let _ = writer.write_record([key.to_string(), format_csv_value(value)]);
    }
}

fn write_records(writer: &mut csv::Writer<io::StdoutLock<'_>>, items: &[Value]) {
    let Some(Value::Object(first)) = items.first() else {
        for item in items {
            let _ = writer.write_record([format_csv_value(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    let _ = writer.write_record(&headers);
    for item in items {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                .collect();
            let _ = writer.write_record(&row);
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
