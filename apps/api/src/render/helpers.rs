//! Handlebars helpers available to every layout.
//!
//! All helpers take `Json` params so a missing field renders as empty instead
//! of failing the render.

use chrono::NaiveDate;
use handlebars::{handlebars_helper, Handlebars};
use serde_json::Value;

handlebars_helper!(format_date: |value: Json| format_month_year(as_text(value)));

handlebars_helper!(date_range: |start: Json, end: Json| {
    let start = as_text(start).trim();
    if start.is_empty() {
        String::new()
    } else {
        format!("{} – {}", format_month_year(start), format_month_year(as_text(end)))
    }
});

handlebars_helper!(join: |items: Json, sep: Json| join_items(items, as_text(sep)));

handlebars_helper!(upper: |value: Json| change_case(as_text(value), str::to_uppercase));

handlebars_helper!(lower: |value: Json| change_case(as_text(value), str::to_lowercase));

handlebars_helper!(has_items: |items: Json| list_has_items(items));

pub fn register_helpers(registry: &mut Handlebars<'static>) {
    registry.register_helper("formatDate", Box::new(format_date));
    registry.register_helper("dateRange", Box::new(date_range));
    registry.register_helper("join", Box::new(join));
    registry.register_helper("upper", Box::new(upper));
    registry.register_helper("lower", Box::new(lower));
    registry.register_helper("hasItems", Box::new(has_items));
}

fn as_text(value: &Value) -> &str {
    value.as_str().unwrap_or("")
}

/// `2023-05` / `2023-05-12` → `May 2023`; blank or "present" → `Present`.
/// Anything else (a bare year, free text) is returned unchanged.
pub fn format_month_year(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("present") {
        return "Present".to_string();
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d"))
        .or_else(|_| {
            // datetime strings from the form store, e.g. 2023-05-12T00:00:00.000Z
            raw.get(..10)
                .ok_or(())
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|_| ()))
        });

    match date {
        Ok(date) => date.format("%b %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Applies `convert` to the text between entity references. Sanitized strings
/// carry `&amp;`, `&lt;`, `&nbsp;` and the like, which must keep their case.
fn change_case(text: &str, convert: fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&convert(&rest[..amp]));
        let tail = &rest[amp..];
        let entity_len = tail[1..]
            .find(';')
            .filter(|&end| end > 0 && end <= 32)
            .filter(|&end| {
                tail[1..=end]
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '#')
            })
            .map(|end| end + 2);

        match entity_len {
            Some(len) => {
                out.push_str(&tail[..len]);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(&convert(rest));
    out
}

fn join_items(items: &Value, sep: &str) -> String {
    let sep = if sep.is_empty() { ", " } else { sep };
    match items {
        Value::Array(values) => values
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                Value::Object(map) => map
                    .get("name")
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(sep),
        Value::String(s) => s.clone(),
        _ => String::new(),
    }
}

/// True when a list holds at least one entry with visible content.
/// Form lists carry blank placeholder rows (`["English", ""]`, `[{ "name": "" }]`).
fn list_has_items(items: &Value) -> bool {
    match items {
        Value::Array(values) => values.iter().any(has_content),
        _ => false,
    }
}

fn has_content(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(values) => values.iter().any(has_content),
        Value::Object(map) => map
            .iter()
            .filter(|(key, _)| key.as_str() != "id")
            .any(|(_, v)| has_content(v)),
        Value::Null => false,
        Value::Bool(_) | Value::Number(_) => true,
    }
}
