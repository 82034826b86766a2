//! Message templates
//!
//! Templates use `{name}` placeholders. Unknown placeholders are left as written.

use regex::{Captures, Regex};

/// Placeholder values for one message
#[derive(Clone, Debug, Default)]
pub struct MessageParams {
    entries: Vec<(String, String)>,
}

impl MessageParams {
    /// No placeholders
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a placeholder value
    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        let key = key.into();
        let value = value.to_string();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    /// Builder form of [`MessageParams::set`]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    /// Value for a placeholder
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Copy scalar members of a JSON options object
    pub fn extend_from_options(&mut self, options: &serde_json::Value) {
        if let serde_json::Value::Object(map) = options {
            for (key, value) in map {
                let text = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                self.set(key.clone(), text);
            }
        }
    }
}

/// Fill `{name}` placeholders in `template`
pub fn render(placeholder: &Regex, template: &str, params: &MessageParams) -> String {
    placeholder
        .replace_all(template, |caps: &Captures| match params.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Human readable byte size
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
