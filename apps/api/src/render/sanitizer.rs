//! Structured-data sanitizer: strips markup from every string in a record.
//!
//! Output strings are HTML-safe text. Tags and attributes are removed, `script`
//! and `style` lose their content, and the remaining `<`, `>` and `&` come back
//! entity-encoded. The template renderer relies on this and does not escape again.

use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use serde_json::{Map, Value};

use crate::models::resume::ResumeRecord;

pub struct Sanitizer {
    cleaner: AmmoniaBuilder<'static>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sanitizer {
    pub fn new() -> Self {
        let mut cleaner = AmmoniaBuilder::empty();
        cleaner.clean_content_tags(HashSet::from(["script", "style"]));
        Self { cleaner }
    }

    /// Returns a sanitized copy of `record`.
    pub fn sanitize_record(&self, record: &ResumeRecord) -> ResumeRecord {
        ResumeRecord::from_map(self.sanitize_map(record.as_map()))
    }

    /// Recursively cleans strings inside objects and arrays. Other scalars pass through.
    pub fn sanitize_value(&self, value: &Value) -> Value {
        match value {
            Value::String(text) => Value::String(self.clean_text(text)),
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.sanitize_value(item)).collect())
            }
            Value::Object(map) => Value::Object(self.sanitize_map(map)),
            other => other.clone(),
        }
    }

    pub fn clean_text(&self, text: &str) -> String {
        self.cleaner.clean(text).to_string()
    }

    fn sanitize_map(&self, map: &Map<String, Value>) -> Map<String, Value> {
        map.iter()
            .map(|(key, value)| (key.clone(), self.sanitize_value(value)))
            .collect()
    }
}
